use super::result_read_options;
use crate::cli::MigrateArgs;
use crate::error::{CliError, Result};
use poreflow::core::io::migration::CURRENT_VERSION;
use poreflow::core::io::result_file::ResultFile;
use poreflow::core::io::traits::RecordFile;
use tracing::{info, warn};

pub async fn run(args: MigrateArgs) -> Result<()> {
    let options = result_read_options(args.network.as_deref())?;
    let (result, report) = ResultFile::read_from_path_with(&args.input, &options).map_err(|e| {
        CliError::FileParsing {
            path: args.input.clone(),
            source: e.into(),
        }
    })?;

    if let Some(section) = report.truncated_section {
        warn!(
            section,
            "Input is truncated; fields from this section on keep their defaults."
        );
    }
    for (legacy, method) in &report.migrated_slots {
        info!(legacy = *legacy, method = %method, "Mapped legacy method slot.");
    }

    ResultFile::write_to_path(&result, &args.output).map_err(|e| CliError::FileWriting {
        path: args.output.clone(),
        source: e.into(),
    })?;

    println!(
        "✓ Migrated result from version {} to version {}: {}",
        report.version,
        CURRENT_VERSION,
        args.output.display()
    );
    Ok(())
}
