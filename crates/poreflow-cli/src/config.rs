use crate::cli::SimulateArgs;
use crate::error::{CliError, Result};
use poreflow::core::models::axis::FlowAxis;
use poreflow::core::models::method::{Method, MethodSelection};
use poreflow::engine::config::{
    DarcySolverConfig, InertialSolverConfig, LatticeSolverConfig, SolverConfigBuilder,
};
use poreflow::workflows::simulate::SimulationParameters;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

const DEFAULT_VISCOSITY: f64 = 1.0e-3;
const DEFAULT_INPUT_PRESSURE: f64 = 1000.0;
const DEFAULT_OUTPUT_PRESSURE: f64 = 0.0;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialFluidConfig {
    viscosity: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialPressureConfig {
    input: Option<f64>,
    output: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialBoundaryConfig {
    axis: Option<FlowAxis>,
    fraction: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialMethodsConfig {
    darcy: Option<bool>,
    #[serde(rename = "lattice-boltzmann")]
    lattice_boltzmann: Option<bool>,
    #[serde(rename = "navier-stokes")]
    navier_stokes: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialSolverConfig {
    darcy: Option<DarcySolverConfig>,
    lattice: Option<LatticeSolverConfig>,
    inertial: Option<InertialSolverConfig>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialSimulationConfig {
    fluid: Option<PartialFluidConfig>,
    pressure: Option<PartialPressureConfig>,
    boundary: Option<PartialBoundaryConfig>,
    methods: Option<PartialMethodsConfig>,
    solver: Option<PartialSolverConfig>,
}

impl PartialSimulationConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Loads the file named by `--config`, or starts empty when none was given.
    pub fn load(args: &SimulateArgs) -> Result<Self> {
        match &args.config {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn merge_with_cli(mut self, args: &SimulateArgs) -> Result<SimulationParameters> {
        self.apply_set_values(&args.set_values)?;

        let fluid = self.fluid.take().unwrap_or_default();
        let pressure = self.pressure.take().unwrap_or_default();
        let boundary = self.boundary.take().unwrap_or_default();
        let solver = self.solver.take().unwrap_or_default();

        let axis = args.axis.or(boundary.axis).unwrap_or_default();
        let viscosity = args
            .viscosity
            .or(fluid.viscosity)
            .unwrap_or(DEFAULT_VISCOSITY);
        let input_pressure = args
            .input_pressure
            .or(pressure.input)
            .unwrap_or(DEFAULT_INPUT_PRESSURE);
        let output_pressure = args
            .output_pressure
            .or(pressure.output)
            .unwrap_or(DEFAULT_OUTPUT_PRESSURE);
        let methods = self.merge_methods(args);

        let mut builder = SolverConfigBuilder::new()
            .darcy(solver.darcy.unwrap_or_default())
            .lattice(solver.lattice.unwrap_or_default())
            .inertial(solver.inertial.unwrap_or_default());
        if let Some(fraction) = boundary.fraction {
            builder = builder.boundary_fraction(fraction);
        }
        let solver_config = builder
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        Ok(
            SimulationParameters::new(axis, viscosity, input_pressure, output_pressure, methods)
                .with_solver_config(solver_config),
        )
    }

    /// Command-line switches replace the file's table; with neither, only Darcy runs.
    fn merge_methods(&self, args: &SimulateArgs) -> MethodSelection {
        if args.methods.any() {
            return MethodSelection {
                darcy: args.methods.darcy,
                lattice_boltzmann: args.methods.lattice,
                navier_stokes: args.methods.navier_stokes,
            };
        }
        match &self.methods {
            Some(file) => MethodSelection {
                darcy: file.darcy.unwrap_or(false),
                lattice_boltzmann: file.lattice_boltzmann.unwrap_or(false),
                navier_stokes: file.navier_stokes.unwrap_or(false),
            },
            None => MethodSelection::only(Method::Darcy),
        }
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };
            let (key, value_str) = (key.trim(), value_str.trim());

            match key {
                "fluid.viscosity" => {
                    self.fluid.get_or_insert_with(Default::default).viscosity =
                        Some(parse_value(key, value_str)?);
                }
                "pressure.input" => {
                    self.pressure.get_or_insert_with(Default::default).input =
                        Some(parse_value(key, value_str)?);
                }
                "pressure.output" => {
                    self.pressure.get_or_insert_with(Default::default).output =
                        Some(parse_value(key, value_str)?);
                }
                "boundary.axis" => {
                    self.boundary.get_or_insert_with(Default::default).axis =
                        Some(parse_value(key, value_str)?);
                }
                "boundary.fraction" => {
                    self.boundary.get_or_insert_with(Default::default).fraction =
                        Some(parse_value(key, value_str)?);
                }
                "methods.darcy" => {
                    self.methods.get_or_insert_with(Default::default).darcy =
                        Some(parse_value(key, value_str)?);
                }
                "methods.lattice-boltzmann" => {
                    self.methods
                        .get_or_insert_with(Default::default)
                        .lattice_boltzmann = Some(parse_value(key, value_str)?);
                }
                "methods.navier-stokes" => {
                    self.methods
                        .get_or_insert_with(Default::default)
                        .navier_stokes = Some(parse_value(key, value_str)?);
                }
                _ => self.apply_solver_value(key, value_str)?,
            }
        }
        Ok(())
    }

    fn apply_solver_value(&mut self, key: &str, value_str: &str) -> Result<()> {
        let solver = self.solver.get_or_insert_with(Default::default);
        match key {
            "solver.darcy.direct-solve-limit" => {
                solver.darcy.get_or_insert_with(Default::default).direct_solve_limit =
                    parse_value(key, value_str)?;
            }
            "solver.darcy.tolerance" => {
                solver.darcy.get_or_insert_with(Default::default).tolerance =
                    parse_value(key, value_str)?;
            }
            "solver.darcy.max-iterations" => {
                solver.darcy.get_or_insert_with(Default::default).max_iterations =
                    parse_value(key, value_str)?;
            }
            "solver.darcy.conservation-tolerance" => {
                solver
                    .darcy
                    .get_or_insert_with(Default::default)
                    .conservation_tolerance = parse_value(key, value_str)?;
            }
            "solver.lattice.relaxation-time" => {
                solver.lattice.get_or_insert_with(Default::default).relaxation_time =
                    parse_value(key, value_str)?;
            }
            "solver.lattice.tolerance" => {
                solver.lattice.get_or_insert_with(Default::default).tolerance =
                    parse_value(key, value_str)?;
            }
            "solver.lattice.max-iterations" => {
                solver.lattice.get_or_insert_with(Default::default).max_iterations =
                    parse_value(key, value_str)?;
            }
            "solver.lattice.check-interval" => {
                solver.lattice.get_or_insert_with(Default::default).check_interval =
                    parse_value(key, value_str)?;
            }
            "solver.inertial.fluid-density" => {
                solver.inertial.get_or_insert_with(Default::default).fluid_density =
                    parse_value(key, value_str)?;
            }
            "solver.inertial.loss-coefficient" => {
                solver
                    .inertial
                    .get_or_insert_with(Default::default)
                    .loss_coefficient = parse_value(key, value_str)?;
            }
            "solver.inertial.tolerance" => {
                solver.inertial.get_or_insert_with(Default::default).tolerance =
                    parse_value(key, value_str)?;
            }
            "solver.inertial.max-iterations" => {
                solver.inertial.get_or_insert_with(Default::default).max_iterations =
                    parse_value(key, value_str)?;
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value_str: &str) -> Result<T> {
    value_str.parse().map_err(|_| {
        CliError::Config(format!("Invalid value for {}: {}", key, value_str))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_config_file(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("poreflow.toml");
        fs::write(&path, content).unwrap();
        path
    }

    fn simulate_args(extra: &[&str]) -> SimulateArgs {
        let mut argv = vec!["poreflow", "simulate", "-n", "in.pnm", "-o", "out.perm"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Simulate(args) => args,
            _ => panic!("Expected 'simulate' subcommand"),
        }
    }

    #[test]
    fn defaults_apply_without_a_config_file() {
        let args = simulate_args(&[]);
        let params = PartialSimulationConfig::load(&args)
            .unwrap()
            .merge_with_cli(&args)
            .unwrap();

        assert_eq!(params.axis, FlowAxis::X);
        assert_eq!(params.viscosity, DEFAULT_VISCOSITY);
        assert_eq!(params.input_pressure, DEFAULT_INPUT_PRESSURE);
        assert_eq!(params.output_pressure, DEFAULT_OUTPUT_PRESSURE);
        assert_eq!(params.methods, MethodSelection::only(Method::Darcy));
        assert_eq!(params.solver, Default::default());
    }

    #[test]
    fn file_values_are_loaded_and_cli_overrides_them() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config_file(
            &dir,
            r#"
            [fluid]
            viscosity = 0.002

            [pressure]
            input = 500.0 # Will be overridden
            output = 10.0

            [boundary]
            axis = "z"
            fraction = 0.2

            [methods]
            darcy = true
            lattice-boltzmann = true

            [solver.lattice]
            relaxation-time = 0.8

            [solver.inertial]
            fluid-density = 998.0
            "#,
        );
        let path_str = path.to_str().unwrap();
        let args = simulate_args(&["-c", path_str, "--input-pressure", "2000"]);
        let params = PartialSimulationConfig::load(&args)
            .unwrap()
            .merge_with_cli(&args)
            .unwrap();

        assert_eq!(params.axis, FlowAxis::Z);
        assert_eq!(params.viscosity, 0.002);
        assert_eq!(params.input_pressure, 2000.0);
        assert_eq!(params.output_pressure, 10.0);
        assert!(params.methods.darcy && params.methods.lattice_boltzmann);
        assert!(!params.methods.navier_stokes);
        assert_eq!(params.solver.boundary_fraction, 0.2);
        assert_eq!(params.solver.lattice.relaxation_time, 0.8);
        assert_eq!(params.solver.lattice.max_iterations, 200_000);
        assert_eq!(params.solver.inertial.fluid_density, 998.0);
    }

    #[test]
    fn method_flags_replace_the_methods_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config_file(&dir, "[methods]\ndarcy = true\n");
        let args = simulate_args(&["-c", path.to_str().unwrap(), "--navier-stokes"]);
        let params = PartialSimulationConfig::load(&args)
            .unwrap()
            .merge_with_cli(&args)
            .unwrap();
        assert_eq!(params.methods, MethodSelection::only(Method::NavierStokes));
    }

    #[test]
    fn set_values_override_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config_file(&dir, "[fluid]\nviscosity = 0.002\n");
        let args = simulate_args(&[
            "-c",
            path.to_str().unwrap(),
            "-S",
            "fluid.viscosity=0.004",
            "-S",
            "solver.darcy.direct-solve-limit=16",
            "-S",
            "boundary.axis=y",
        ]);
        let params = PartialSimulationConfig::load(&args)
            .unwrap()
            .merge_with_cli(&args)
            .unwrap();
        assert_eq!(params.viscosity, 0.004);
        assert_eq!(params.solver.darcy.direct_solve_limit, 16);
        assert_eq!(params.solver.darcy.max_iterations, 10_000);
        assert_eq!(params.axis, FlowAxis::Y);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config_file(&dir, "[fluid]\ndensity = 1000.0\n");
        let result = PartialSimulationConfig::from_file(&path);
        assert!(matches!(result, Err(CliError::FileParsing { .. })));

        let args = simulate_args(&["-S", "solver.darcy.speed=3"]);
        let result = PartialSimulationConfig::default().merge_with_cli(&args);
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("solver.darcy.speed")));
    }

    #[test]
    fn malformed_set_values_are_rejected() {
        let args = simulate_args(&["-S", "fluid.viscosity"]);
        let result = PartialSimulationConfig::default().merge_with_cli(&args);
        assert!(matches!(result, Err(CliError::Config(_))));

        let args = simulate_args(&["-S", "pressure.input=high"]);
        let result = PartialSimulationConfig::default().merge_with_cli(&args);
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("pressure.input")));
    }

    #[test]
    fn out_of_range_solver_values_are_config_errors() {
        let args = simulate_args(&["-S", "solver.lattice.relaxation-time=0.4"]);
        let result = PartialSimulationConfig::default().merge_with_cli(&args);
        assert!(matches!(result, Err(CliError::Config(_))));
    }
}
