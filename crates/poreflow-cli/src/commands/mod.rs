pub mod inspect;
pub mod migrate;
pub mod recover;
pub mod simulate;

use crate::error::{CliError, Result};
use poreflow::core::io::network_file::{LoadReport, NetworkFile};
use poreflow::core::io::result_file::ResultReadOptions;
use poreflow::core::io::traits::RecordFile;
use poreflow::core::models::network::PoreNetworkModel;
use std::path::Path;
use tracing::{info, warn};

pub(crate) fn load_network(path: &Path) -> Result<PoreNetworkModel> {
    info!("Loading pore network from {:?}", path);
    let (network, report) =
        NetworkFile::read_from_path(path).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
    log_network_report(&report);
    Ok(network)
}

/// Logs every repair applied while reading a network file.
pub(crate) fn log_network_report(report: &LoadReport) {
    if report.is_clean() {
        return;
    }
    if let Some(byte) = report.control_prefix {
        warn!(byte, "Skipped a stray control byte before the file header.");
    }
    if report.truncated {
        warn!(
            pores = report.pores_read,
            declared_pores = report.declared_pores,
            throats = report.throats_read,
            declared_throats = report.declared_throats,
            "Network file is truncated; kept the records read before the end."
        );
    }
    if !report.dropped_throats.is_empty() {
        warn!(
            count = report.dropped_throats.len(),
            "Dropped throats that reference pores missing from the file."
        );
    }
    if report.porosity_clamped {
        warn!("Stored porosity was outside [0, 1] and has been clamped.");
    }
    if report.tortuosity_raised {
        warn!("Stored tortuosity was below 1 and has been raised to 1.");
    }
    if report.pixel_size_reset {
        warn!("Stored pixel size was not positive and has been reset to 1.");
    }
}

/// Read options for result files, taking the legacy tortuosity fallback from `network`.
pub(crate) fn result_read_options(network: Option<&Path>) -> Result<ResultReadOptions> {
    match network {
        Some(path) => Ok(ResultReadOptions {
            fallback_tortuosity: load_network(path)?.tortuosity(),
        }),
        None => Ok(ResultReadOptions::default()),
    }
}
