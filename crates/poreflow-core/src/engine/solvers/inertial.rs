use super::graph::FlowGraph;
use super::linear::solve_pressures;
use super::{FlowProblem, FlowSolution, FlowSolver};
use crate::core::models::method::Method;
use crate::core::physics::hydraulics::{
    forchheimer_conductance, inertial_resistance, reynolds_number,
};
use crate::engine::cancel::CancellationToken;
use crate::engine::config::{DarcySolverConfig, InertialSolverConfig};
use crate::engine::error::{NumericalError, SolverError};
use tracing::{debug, info, instrument};

/// Network flow with a quadratic inertial loss per throat, `ΔP = q/g + β q|q|`.
///
/// Solved by Picard iteration: each pass fixes secant conductances from the previous pressure
/// field and solves the resulting linear network. At low Reynolds number the result reduces to
/// the Darcy solution.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InertialSolver {
    config: InertialSolverConfig,
    linear: DarcySolverConfig,
}

impl InertialSolver {
    pub fn new(config: InertialSolverConfig, linear: DarcySolverConfig) -> Self {
        Self { config, linear }
    }

    pub fn config(&self) -> &InertialSolverConfig {
        &self.config
    }
}

impl FlowSolver for InertialSolver {
    fn method(&self) -> Method {
        Method::NavierStokes
    }

    #[instrument(skip_all, name = "inertial_solver")]
    fn solve_observed(
        &self,
        problem: &FlowProblem<'_>,
        cancel: &CancellationToken,
        progress: &dyn Fn(f64),
    ) -> Result<FlowSolution, SolverError> {
        let graph = FlowGraph::build(problem)?;
        let linear = graph.conductances();
        let beta: Vec<f64> = graph
            .edges
            .iter()
            .map(|e| {
                inertial_resistance(
                    e.radius,
                    self.config.fluid_density,
                    self.config.loss_coefficient,
                )
            })
            .collect();

        let mut effective = linear.clone();
        let mut pressures: Option<Vec<f64>> = None;
        let mut previous_total: Option<f64> = None;
        let mut change = f64::INFINITY;
        let mut linear_iterations = 0;

        for iteration in 1..=self.config.max_iterations {
            if cancel.is_cancelled() {
                return Err(SolverError::Cancelled);
            }
            let (solved, steps) = solve_pressures(
                &graph,
                &effective,
                problem,
                pressures.as_deref(),
                &self.linear,
                cancel,
            )?;
            linear_iterations += steps;

            let flows = graph.edge_flows(&solved, &effective);
            let (total, _) = graph.boundary_flows(&flows);
            if let Some(previous) = previous_total {
                change = (total - previous).abs() / total.abs().max(f64::MIN_POSITIVE);
                debug!(iteration, total_flow = total, change, "Picard iteration.");
                if change < self.config.tolerance {
                    let solution = graph.finish(
                        problem,
                        &solved,
                        &flows,
                        iteration,
                        self.linear.conservation_tolerance,
                    )?;
                    self.log_reynolds(&graph, &flows, problem);
                    progress(1.0);
                    info!(
                        iterations = iteration,
                        linear_iterations,
                        total_flow = solution.total_flow,
                        permeability_darcy = solution.raw_darcy,
                        "Inertial solve converged."
                    );
                    return Ok(solution);
                }
            }
            previous_total = Some(total);

            for (k, e) in graph.edges.iter().enumerate() {
                let drop = solved[e.a] - solved[e.b];
                effective[k] = forchheimer_conductance(linear[k], beta[k], drop);
            }
            pressures = Some(solved);
            progress(iteration as f64 / self.config.max_iterations as f64);
        }

        Err(NumericalError::NotConverged {
            iterations: self.config.max_iterations,
            residual: change,
        }
        .into())
    }
}

impl InertialSolver {
    fn log_reynolds(&self, graph: &FlowGraph, flows: &[f64], problem: &FlowProblem<'_>) {
        let max_reynolds = graph
            .edges
            .iter()
            .zip(flows)
            .map(|(e, q)| reynolds_number(*q, e.radius, self.config.fluid_density, problem.viscosity))
            .fold(0.0_f64, f64::max);
        info!(max_reynolds, "Maximum throat Reynolds number.");
    }
}
