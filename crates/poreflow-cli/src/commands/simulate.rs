use super::load_network;
use crate::cli::SimulateArgs;
use crate::config::PartialSimulationConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use poreflow::core::io::result_file::ResultFile;
use poreflow::core::io::traits::RecordFile;
use poreflow::engine::cancel::CancellationToken;
use poreflow::engine::progress::ProgressReporter;
use poreflow::workflows;
use tracing::{info, warn};

pub async fn run(args: SimulateArgs) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let params = PartialSimulationConfig::load(&args)?.merge_with_cli(&args)?;
    let network = load_network(&args.network)?;
    info!(
        pores = network.pores().len(),
        throats = network.throats().len(),
        axis = %params.axis,
        "Network loaded."
    );

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling the simulation...");
            signal_token.cancel();
        }
    });

    let progress_handler = CliProgressHandler::new();
    let callback = progress_handler.get_callback();

    println!("Starting permeability simulation...");
    info!("Invoking the core simulation workflow...");

    let outcome = tokio::task::spawn_blocking(move || {
        let reporter = ProgressReporter::with_callback(callback);
        workflows::simulate::run(&network, &params, &reporter, &cancel)
    })
    .await
    .map_err(|e| CliError::Other(anyhow::anyhow!("Simulation task failed: {}", e)))?;
    signal_task.abort();
    let result = outcome?;

    if result.used_methods().next().is_none() {
        warn!("Simulation finished but no flow method completed.");
        println!("Warning: no flow method completed; see the log for details.");
    }

    ResultFile::write_to_path(&result, &args.output).map_err(|e| CliError::FileWriting {
        path: args.output.clone(),
        source: e.into(),
    })?;

    print!("{}", result.summary());
    println!("✓ Result written to: {}", args.output.display());
    Ok(())
}
