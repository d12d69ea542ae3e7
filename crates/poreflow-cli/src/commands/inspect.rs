use super::{load_network, result_read_options};
use crate::cli::InspectArgs;
use crate::error::{CliError, Result};
use poreflow::core::io::result_file::ResultFile;
use poreflow::core::io::traits::RecordFile;
use poreflow::core::io::{FileKind, detect_kind};
use poreflow::core::models::network::PoreNetworkModel;
use std::path::Path;
use tracing::info;

pub async fn run(args: InspectArgs) -> Result<()> {
    let kind = detect_kind(&args.file)?;
    info!(?kind, "Detected file kind for {:?}", &args.file);
    match kind {
        FileKind::Network => {
            let network = load_network(&args.file)?;
            print!("{}", describe_network(&network));
        }
        FileKind::Result => inspect_result(&args.file, args.network.as_deref())?,
        FileKind::Unknown => return Err(CliError::UnknownFormat(args.file)),
    }
    Ok(())
}

fn inspect_result(path: &Path, network: Option<&Path>) -> Result<()> {
    let options = result_read_options(network)?;
    let (result, report) =
        ResultFile::read_from_path_with(path, &options).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;

    println!("Result file, format version {}", report.version);
    if let Some(section) = report.truncated_section {
        println!("  truncated in section: {}", section);
    }
    if report.tortuosity_fallback {
        println!(
            "  tortuosity not stored; using {:.4}",
            options.fallback_tortuosity
        );
    }
    for (legacy, method) in &report.migrated_slots {
        println!("  legacy slot '{}' read as {}", legacy, method);
    }
    if let Some(timestamp) = &result.timestamp {
        println!("  created: {}", timestamp);
    }
    println!(
        "  inlet pores: {}, outlet pores: {}, throat flows: {}",
        result.inlet_pores.len(),
        result.outlet_pores.len(),
        result.throat_flow_rates.len()
    );
    print!("{}", result.summary());
    Ok(())
}

fn describe_network(network: &PoreNetworkModel) -> String {
    format!(
        "Pore network: {} pores, {} throats\n  pixel size {:e} m, porosity {:.4}, tortuosity {:.4}\n  pore volume {:e} m³, throat volume {:e} m³\n",
        network.pores().len(),
        network.throats().len(),
        network.pixel_size(),
        network.porosity(),
        network.tortuosity(),
        network.total_pore_volume(),
        network.total_throat_volume(),
    )
}
