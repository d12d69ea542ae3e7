use clap::{Args, Parser, Subcommand};
use poreflow::core::models::axis::FlowAxis;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "PoreFlow Developers",
    version,
    about = "PoreFlow CLI - Estimate the permeability of a porous medium from its pore-throat network.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a permeability simulation on a pore network and write the result file.
    Simulate(SimulateArgs),
    /// Print a summary of a network or result file.
    Inspect(InspectArgs),
    /// Rebuild a network file from a headerless dump of pore and throat records.
    Recover(RecoverArgs),
    /// Rewrite a result file of any supported version in the current format.
    Migrate(MigrateArgs),
}

/// Arguments for the `simulate` subcommand.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    // --- Core Arguments ---
    /// Path to the input pore network file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub network: PathBuf,

    /// Path for the output result file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Path to an optional configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Physical Overrides ---
    /// Axis along which the pressure differential is applied (x, y or z).
    #[arg(short, long, value_name = "AXIS")]
    pub axis: Option<FlowAxis>,

    /// Dynamic viscosity of the fluid, in Pa·s.
    #[arg(long, value_name = "FLOAT")]
    pub viscosity: Option<f64>,

    /// Pressure applied to the inlet pores, in Pa.
    #[arg(long, value_name = "FLOAT", allow_negative_numbers = true)]
    pub input_pressure: Option<f64>,

    /// Pressure applied to the outlet pores, in Pa.
    #[arg(long, value_name = "FLOAT", allow_negative_numbers = true)]
    pub output_pressure: Option<f64>,

    // --- Method Selection ---
    /// Select flow methods on the command line; replaces the `[methods]` table when any is given.
    #[command(flatten)]
    pub methods: MethodFlags,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S solver.lattice.relaxation-time=0.8
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Independent method switches; any combination may be given.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct MethodFlags {
    /// Run the Darcy network solver.
    #[arg(long)]
    pub darcy: bool,
    /// Run the lattice Boltzmann solver.
    #[arg(long)]
    pub lattice: bool,
    /// Run the inertial Navier–Stokes solver.
    #[arg(long)]
    pub navier_stokes: bool,
}

impl MethodFlags {
    pub fn any(&self) -> bool {
        self.darcy || self.lattice || self.navier_stokes
    }
}

/// Arguments for the `inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// The network or result file to inspect.
    #[arg(required = true, value_name = "PATH")]
    pub file: PathBuf,

    /// Network whose tortuosity is used when a legacy result file stores none.
    #[arg(long, value_name = "PATH")]
    pub network: Option<PathBuf>,
}

/// Arguments for the `recover` subcommand.
#[derive(Args, Debug)]
pub struct RecoverArgs {
    /// The headerless record dump.
    #[arg(required = true, value_name = "PATH")]
    pub raw: PathBuf,

    /// Path for the rebuilt network file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Number of pore records in the dump.
    #[arg(long, required = true, value_name = "INT")]
    pub pores: usize,

    /// Number of throat records in the dump.
    #[arg(long, required = true, value_name = "INT")]
    pub throats: usize,

    /// Voxel edge length of the source scan, in metres.
    #[arg(long, required = true, value_name = "FLOAT")]
    pub pixel_size: f64,
}

/// Arguments for the `migrate` subcommand.
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// The result file to read.
    #[arg(required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the rewritten result file.
    #[arg(required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Network whose tortuosity is used when a legacy result file stores none.
    #[arg(long, value_name = "PATH")]
    pub network: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulate_parses_method_flags_and_overrides() {
        let cli = Cli::parse_from([
            "poreflow",
            "simulate",
            "-n",
            "in.pnm",
            "-o",
            "out.perm",
            "--axis",
            "y",
            "--darcy",
            "--navier-stokes",
            "--input-pressure",
            "-5",
            "-S",
            "fluid.viscosity=0.002",
        ]);
        let Commands::Simulate(args) = cli.command else {
            panic!("Expected 'simulate' subcommand");
        };
        assert_eq!(args.axis, Some(FlowAxis::Y));
        assert!(args.methods.darcy && args.methods.navier_stokes && !args.methods.lattice);
        assert_eq!(args.input_pressure, Some(-5.0));
        assert_eq!(args.set_values, vec!["fluid.viscosity=0.002".to_string()]);
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        let result = Cli::try_parse_from(["poreflow", "-v", "-q", "inspect", "file.perm"]);
        assert!(result.is_err());
    }

    #[test]
    fn recover_requires_layout() {
        let result = Cli::try_parse_from(["poreflow", "recover", "dump.bin", "-o", "out.pnm"]);
        assert!(result.is_err());
    }
}
