use crate::core::models::axis::FlowAxis;
use crate::core::models::method::{Method, MethodSelection};
use crate::core::models::network::PoreNetworkModel;
use crate::core::models::result::PermeabilitySimulationResult;
use crate::engine::aggregator::{ResultAggregator, timestamp_now};
use crate::engine::boundary;
use crate::engine::cancel::CancellationToken;
use crate::engine::config::{ConfigError, SolverConfig};
use crate::engine::error::{SimulationError, SolverError};
use crate::engine::progress::{Progress, ProgressBand, ProgressReporter};
use crate::engine::solvers::{FlowProblem, FlowSolver, Solver};
use tracing::{info, instrument, warn};

/// Share of the progress range reserved for validation and boundary selection.
const SETUP_PERCENT: f64 = 5.0;
/// Progress reached once every selected method has run.
const SOLVE_PERCENT: f64 = 95.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParameters {
    pub axis: FlowAxis,
    /// Dynamic viscosity in Pa·s.
    pub viscosity: f64,
    pub input_pressure: f64,
    pub output_pressure: f64,
    pub methods: MethodSelection,
    pub solver: SolverConfig,
}

impl SimulationParameters {
    pub fn new(
        axis: FlowAxis,
        viscosity: f64,
        input_pressure: f64,
        output_pressure: f64,
        methods: MethodSelection,
    ) -> Self {
        Self {
            axis,
            viscosity,
            input_pressure,
            output_pressure,
            methods,
            solver: SolverConfig::default(),
        }
    }

    pub fn with_solver_config(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    fn validate(&self) -> Result<(), SimulationError> {
        if !(self.viscosity.is_finite() && self.viscosity > 0.0) {
            return Err(SimulationError::invalid(
                "viscosity",
                format!("{} must be positive and finite", self.viscosity),
            ));
        }
        if !(self.input_pressure.is_finite() && self.output_pressure.is_finite()) {
            return Err(SimulationError::invalid("pressure", "pressures must be finite"));
        }
        if self.input_pressure == self.output_pressure {
            return Err(SimulationError::invalid(
                "pressure",
                "input and output pressure must differ",
            ));
        }
        if self.methods.is_empty() {
            return Err(SimulationError::invalid("methods", "no flow method selected"));
        }
        self.solver.validate().map_err(|e| match e {
            ConfigError::InvalidValue { name, reason } => SimulationError::invalid(name, reason),
        })
    }
}

fn phase_name(method: Method) -> &'static str {
    match method {
        Method::Darcy => "Darcy Solve",
        Method::LatticeBoltzmann => "Lattice Boltzmann Solve",
        Method::NavierStokes => "Navier-Stokes Solve",
    }
}

/// Runs every selected flow method on `network` and aggregates the outcomes.
///
/// A numerical failure disables only the method that raised it. Invalid input, a failed
/// boundary selection or cancellation fail the whole run.
#[instrument(skip_all, name = "simulate_workflow", fields(axis = %params.axis))]
pub fn run(
    network: &PoreNetworkModel,
    params: &SimulationParameters,
    reporter: &ProgressReporter,
    cancel: &CancellationToken,
) -> Result<PermeabilitySimulationResult, SimulationError> {
    // === Phase 0: Validation and boundary selection ===
    reporter.report(Progress::PhaseStart { name: "Preparation" });
    reporter.percent(0.0);
    params.validate()?;
    network.validate()?;
    if cancel.is_cancelled() {
        return Err(SimulationError::Cancelled);
    }

    let boundary = boundary::select(network, params.axis, params.solver.boundary_fraction)?;
    reporter.percent(SETUP_PERCENT);
    reporter.report(Progress::PhaseFinish);

    // === Phase 1: Independent method solves ===
    let problem = FlowProblem {
        network,
        boundary: &boundary,
        viscosity: params.viscosity,
        input_pressure: params.input_pressure,
        output_pressure: params.output_pressure,
    };
    let mut aggregator = ResultAggregator::new(
        network,
        &boundary,
        params.axis,
        params.viscosity,
        params.input_pressure,
        params.output_pressure,
    );

    let methods: Vec<Method> = params.methods.methods().collect();
    let bands = ProgressBand::new(SETUP_PERCENT, SOLVE_PERCENT).split(methods.len());
    for (method, band) in methods.into_iter().zip(bands) {
        if cancel.is_cancelled() {
            info!("Simulation cancelled between methods.");
            return Err(SimulationError::Cancelled);
        }
        reporter.report(Progress::PhaseStart {
            name: phase_name(method),
        });
        let solver = Solver::for_method(method, &params.solver);
        let outcome = solver.solve_observed(&problem, cancel, &|fraction| {
            reporter.percent(band.at(fraction))
        });
        match outcome {
            Ok(solution) => aggregator.record(method, Ok(solution)),
            Err(SolverError::Numerical(error)) => {
                warn!(method = %method, error = %error, "Flow method failed.");
                reporter.report(Progress::Message(format!("{} failed: {}", method, error)));
                aggregator.record(method, Err(error));
            }
            Err(SolverError::Cancelled) => {
                info!(method = %method, "Simulation cancelled during solve.");
                return Err(SimulationError::Cancelled);
            }
        }
        reporter.percent(band.end);
        reporter.report(Progress::PhaseFinish);
    }

    // === Phase 2: Aggregation ===
    reporter.report(Progress::PhaseStart { name: "Aggregation" });
    let completed = aggregator.completed();
    let result = aggregator.finish(network, Some(timestamp_now()));
    reporter.percent(100.0);
    reporter.report(Progress::PhaseFinish);

    info!(
        completed,
        total_flow = result.total_flow_rate,
        "Simulation complete."
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ids::PoreId;
    use crate::core::models::network::PoreNetworkModelBuilder;
    use crate::core::models::pore::Pore;
    use crate::engine::config::DarcySolverConfig;
    use crate::engine::error::BoundaryError;
    use crate::engine::solvers::test_networks;
    use nalgebra::Point3;
    use std::sync::Mutex;

    fn params(methods: MethodSelection) -> SimulationParameters {
        SimulationParameters::new(FlowAxis::X, 1e-3, 1000.0, 0.0, methods)
    }

    #[test]
    fn all_methods_complete_and_progress_reaches_completion() {
        let network = test_networks::grid(6, 3);
        let percents = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::Percent(p) = event {
                percents.lock().unwrap().push(p);
            }
        }));

        let result = run(
            &network,
            &params(MethodSelection::all()),
            &reporter,
            &CancellationToken::new(),
        )
        .unwrap();
        drop(reporter);

        assert!(result.used_darcy && result.used_lattice_boltzmann && result.used_navier_stokes);
        let tau2 = network.tortuosity() * network.tortuosity();
        for method in Method::ALL {
            let k = result.permeability(method);
            assert!(k.raw_darcy > 0.0);
            assert_eq!(k.corrected_darcy, k.raw_darcy / tau2);
        }
        assert_eq!(result.pressure_field, result.darcy_pressures);
        assert!(result.timestamp.is_some());

        let percents = percents.into_inner().unwrap();
        assert_eq!(percents.first().copied(), Some(0.0));
        assert_eq!(percents.last().copied(), Some(100.0));
        assert!(percents.iter().all(|p| (0.0..=100.0).contains(p)));
    }

    #[test]
    fn cancelled_token_aborts_the_run() {
        let network = test_networks::grid(4, 2);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = run(
            &network,
            &params(MethodSelection::all()),
            &ProgressReporter::new(),
            &cancel,
        )
        .unwrap_err();
        assert!(matches!(err, SimulationError::Cancelled));
    }

    #[test]
    fn missing_extent_along_axis_is_a_boundary_error() {
        let network = test_networks::grid(4, 2);
        let mut p = params(MethodSelection::all());
        p.axis = FlowAxis::Z;
        let err = run(&network, &p, &ProgressReporter::new(), &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(
            err,
            SimulationError::Boundary(BoundaryError::ZeroSpan { axis: FlowAxis::Z })
        ));
    }

    #[test]
    fn failing_method_does_not_stop_the_others() {
        let network = test_networks::grid(6, 3);
        let mut methods = MethodSelection::only(Method::Darcy);
        methods.set(Method::LatticeBoltzmann, true);
        let mut solver = SolverConfig::default();
        solver.darcy = DarcySolverConfig {
            direct_solve_limit: 0,
            max_iterations: 1,
            ..Default::default()
        };
        let p = params(methods).with_solver_config(solver);

        let result = run(&network, &p, &ProgressReporter::new(), &CancellationToken::new())
            .unwrap();
        assert!(!result.used_darcy);
        assert_eq!(result.darcy.raw_darcy, 0.0);
        assert!(result.used_lattice_boltzmann);
        assert_eq!(result.pressure_field, result.lattice_boltzmann_pressures);
    }

    #[test]
    fn disconnected_network_leaves_every_method_unused() {
        let network = test_networks::split_chain();
        let result = run(
            &network,
            &params(MethodSelection::all()),
            &ProgressReporter::new(),
            &CancellationToken::new(),
        )
        .unwrap();
        assert_eq!(result.used_methods().count(), 0);
        assert!(result.pressure_field.is_empty());
        assert_eq!(result.inlet_pores.len(), 1);
    }

    #[test]
    fn invalid_parameters_are_rejected_before_solving() {
        let network = test_networks::grid(4, 2);
        let reporter = ProgressReporter::new();
        let cancel = CancellationToken::new();

        let mut p = params(MethodSelection::all());
        p.viscosity = 0.0;
        assert!(matches!(
            run(&network, &p, &reporter, &cancel),
            Err(SimulationError::InvalidParameter { name: "viscosity", .. })
        ));

        let p = params(MethodSelection::default());
        assert!(matches!(
            run(&network, &p, &reporter, &cancel),
            Err(SimulationError::InvalidParameter { name: "methods", .. })
        ));

        let mut p = params(MethodSelection::all());
        p.output_pressure = p.input_pressure;
        assert!(matches!(
            run(&network, &p, &reporter, &cancel),
            Err(SimulationError::InvalidParameter { name: "pressure", .. })
        ));
    }

    #[test]
    fn single_pore_network_cannot_define_boundaries() {
        let mut builder = PoreNetworkModelBuilder::new();
        builder
            .add_pore(Pore::new(PoreId(0), Point3::origin(), 1e-6, 1.0, 1.0))
            .unwrap();
        let network = builder.build().unwrap();
        let err = run(
            &network,
            &params(MethodSelection::all()),
            &ProgressReporter::new(),
            &CancellationToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, SimulationError::Boundary(_)));
    }
}
