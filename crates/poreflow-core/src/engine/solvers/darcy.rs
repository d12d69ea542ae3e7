use super::graph::FlowGraph;
use super::linear::solve_pressures;
use super::{FlowProblem, FlowSolution, FlowSolver};
use crate::core::models::method::Method;
use crate::engine::cancel::CancellationToken;
use crate::engine::config::DarcySolverConfig;
use crate::engine::error::SolverError;
use tracing::{info, instrument};

/// Steady laminar flow with Hagen–Poiseuille throat conductances.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DarcySolver {
    config: DarcySolverConfig,
}

impl DarcySolver {
    pub fn new(config: DarcySolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DarcySolverConfig {
        &self.config
    }
}

impl FlowSolver for DarcySolver {
    fn method(&self) -> Method {
        Method::Darcy
    }

    #[instrument(skip_all, name = "darcy_solver")]
    fn solve_observed(
        &self,
        problem: &FlowProblem<'_>,
        cancel: &CancellationToken,
        progress: &dyn Fn(f64),
    ) -> Result<FlowSolution, SolverError> {
        let graph = FlowGraph::build(problem)?;
        progress(0.1);
        if cancel.is_cancelled() {
            return Err(SolverError::Cancelled);
        }

        let conductances = graph.conductances();
        let (pressures, iterations) = solve_pressures(
            &graph,
            &conductances,
            problem,
            None,
            &self.config,
            cancel,
        )?;
        progress(0.9);

        let flows = graph.edge_flows(&pressures, &conductances);
        let solution = graph.finish(
            problem,
            &pressures,
            &flows,
            iterations,
            self.config.conservation_tolerance,
        )?;
        progress(1.0);

        info!(
            pores = graph.len(),
            throats = graph.edges.len(),
            total_flow = solution.total_flow,
            permeability_darcy = solution.raw_darcy,
            "Darcy solve complete."
        );
        Ok(solution)
    }
}
