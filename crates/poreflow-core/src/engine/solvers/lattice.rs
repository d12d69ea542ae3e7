//! Mesoscopic link-population scheme on the pore graph.
//!
//! Every pore keeps one population per incident throat. A step collides the populations of
//! each pore towards the local equilibrium `f_eq = g·p` with BGK relaxation `ω = 1/τ`, then
//! streams each post-collision population across its throat. The fixed point satisfies
//! Kirchhoff's law for any `ω ∈ (0, 2)`, and the net population exchange on a throat scaled by
//! `(2−ω)/ω` recovers its flow rate.

use super::graph::FlowGraph;
use super::{FlowProblem, FlowSolution, FlowSolver};
use crate::core::models::method::Method;
use crate::engine::cancel::CancellationToken;
use crate::engine::config::LatticeSolverConfig;
use crate::engine::error::{NumericalError, SolverError};
use tracing::{debug, info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Allowed relative mismatch between inlet and outlet flow of a converged lattice.
const CONSERVATION_TOLERANCE: f64 = 1e-5;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LatticeSolver {
    config: LatticeSolverConfig,
}

impl LatticeSolver {
    pub fn new(config: LatticeSolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LatticeSolverConfig {
        &self.config
    }
}

/// Populations laid out slot by slot; the slots of one node are contiguous.
struct Lattice {
    /// First slot of each node, plus a final sentinel.
    offsets: Vec<usize>,
    slot_node: Vec<usize>,
    slot_edge: Vec<usize>,
    /// Slot at the other end of the same throat.
    partner: Vec<usize>,
    /// Normalised conductance of the slot's throat.
    slot_g: Vec<f64>,
    /// Summed normalised conductance of each node.
    node_g: Vec<f64>,
    fixed: Vec<Option<f64>>,
    populations: Vec<f64>,
    post: Vec<f64>,
    pressures: Vec<f64>,
    scale: f64,
}

impl Lattice {
    fn new(graph: &FlowGraph, problem: &FlowProblem<'_>) -> Self {
        let n = graph.len();
        let scale = graph
            .edges
            .iter()
            .map(|e| e.conductance)
            .fold(0.0_f64, f64::max);
        let scale = if scale > 0.0 { scale } else { 1.0 };

        let mut offsets = Vec::with_capacity(n + 1);
        let mut slot_node = Vec::new();
        let mut slot_edge = Vec::new();
        for node in 0..n {
            offsets.push(slot_node.len());
            for &k in &graph.incident[node] {
                slot_node.push(node);
                slot_edge.push(k);
            }
        }
        offsets.push(slot_node.len());

        let mut partner = vec![0; slot_node.len()];
        let mut first_slot: Vec<Option<usize>> = vec![None; graph.edges.len()];
        for (s, &k) in slot_edge.iter().enumerate() {
            match first_slot[k] {
                None => first_slot[k] = Some(s),
                Some(other) => {
                    partner[s] = other;
                    partner[other] = s;
                }
            }
        }

        let slot_g: Vec<f64> = slot_edge
            .iter()
            .map(|&k| graph.edges[k].conductance / scale)
            .collect();
        let mut node_g = vec![0.0; n];
        for (s, &node) in slot_node.iter().enumerate() {
            node_g[node] += slot_g[s];
        }

        let fixed: Vec<Option<f64>> = (0..n).map(|i| graph.fixed_pressure(i, problem)).collect();
        let pressures = initial_pressures(graph, problem, &fixed);
        let populations: Vec<f64> = slot_node
            .iter()
            .zip(&slot_g)
            .map(|(&node, g)| g * pressures[node])
            .collect();
        let post = vec![0.0; populations.len()];

        Self {
            offsets,
            slot_node,
            slot_edge,
            partner,
            slot_g,
            node_g,
            fixed,
            populations,
            post,
            pressures,
            scale,
        }
    }

    /// Recomputes pore pressures from the incoming populations.
    fn update_pressures(&mut self) {
        let offsets = &self.offsets;
        let populations = &self.populations;
        let node_g = &self.node_g;
        let fixed = &self.fixed;
        let pressure = |node: usize, current: f64| -> f64 {
            if let Some(p) = fixed[node] {
                return p;
            }
            if node_g[node] <= 0.0 {
                return current;
            }
            let density: f64 = populations[offsets[node]..offsets[node + 1]].iter().sum();
            density / node_g[node]
        };

        #[cfg(not(feature = "parallel"))]
        let iterator = self.pressures.iter_mut().enumerate();

        #[cfg(feature = "parallel")]
        let iterator = self.pressures.par_iter_mut().enumerate();

        iterator.for_each(|(node, p)| *p = pressure(node, *p));
    }

    /// BGK collision towards `g·p`, then streaming across each throat.
    fn step(&mut self, omega: f64) {
        self.update_pressures();

        let slot_node = &self.slot_node;
        let slot_g = &self.slot_g;
        let pressures = &self.pressures;
        let populations = &self.populations;

        #[cfg(not(feature = "parallel"))]
        let iterator = self.post.iter_mut().enumerate();

        #[cfg(feature = "parallel")]
        let iterator = self.post.par_iter_mut().enumerate();

        iterator.for_each(|(s, out)| {
            let equilibrium = slot_g[s] * pressures[slot_node[s]];
            *out = populations[s] + omega * (equilibrium - populations[s]);
        });

        for (s, value) in self.populations.iter_mut().enumerate() {
            *value = self.post[self.partner[s]];
        }
    }

    /// Flow per edge, positive from the edge's `a` end to its `b` end, in m³/s.
    fn edge_flows(&self, graph: &FlowGraph, omega: f64) -> Vec<f64> {
        let factor = (2.0 - omega) / omega * self.scale;
        let mut flows = vec![0.0; graph.edges.len()];
        for (s, &k) in self.slot_edge.iter().enumerate() {
            // Incoming population at `b` came from `a`, and vice versa.
            if self.slot_node[s] == graph.edges[k].b {
                flows[k] += factor * self.populations[s];
            } else {
                flows[k] -= factor * self.populations[s];
            }
        }
        flows
    }
}

fn initial_pressures(
    graph: &FlowGraph,
    problem: &FlowProblem<'_>,
    fixed: &[Option<f64>],
) -> Vec<f64> {
    let (lo, hi) = graph
        .positions
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
            (lo.min(x), hi.max(x))
        });
    let span = hi - lo;
    fixed
        .iter()
        .zip(&graph.positions)
        .map(|(fixed, &x)| {
            fixed.unwrap_or_else(|| {
                let t = if span > 0.0 { (x - lo) / span } else { 0.5 };
                problem.input_pressure + t * (problem.output_pressure - problem.input_pressure)
            })
        })
        .collect()
}

impl FlowSolver for LatticeSolver {
    fn method(&self) -> Method {
        Method::LatticeBoltzmann
    }

    #[instrument(skip_all, name = "lattice_solver")]
    fn solve_observed(
        &self,
        problem: &FlowProblem<'_>,
        cancel: &CancellationToken,
        progress: &dyn Fn(f64),
    ) -> Result<FlowSolution, SolverError> {
        let graph = FlowGraph::build(problem)?;
        let omega = 1.0 / self.config.relaxation_time;
        let interval = self.config.check_interval.max(1);
        let pressure_scale = problem
            .input_pressure
            .abs()
            .max(problem.output_pressure.abs())
            .max(problem.pressure_drop().abs());

        let mut lattice = Lattice::new(&graph, problem);
        debug!(
            pores = graph.len(),
            populations = lattice.populations.len(),
            omega,
            "Lattice initialised."
        );

        let mut previous = lattice.pressures.clone();
        let mut first_change = None;
        let mut change = f64::INFINITY;
        let mut iterations = 0;
        let mut converged = false;
        while iterations < self.config.max_iterations {
            let steps = interval.min(self.config.max_iterations - iterations);
            for _ in 0..steps {
                lattice.step(omega);
            }
            iterations += steps;
            lattice.update_pressures();

            change = lattice
                .pressures
                .iter()
                .zip(&previous)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0_f64, f64::max)
                / pressure_scale;
            if !change.is_finite() {
                return Err(NumericalError::NonFinite.into());
            }
            previous.copy_from_slice(&lattice.pressures);

            if change < self.config.tolerance {
                converged = true;
                break;
            }
            if cancel.is_cancelled() {
                return Err(SolverError::Cancelled);
            }

            let start = *first_change.get_or_insert(change);
            if start > self.config.tolerance && change < start {
                let fraction = (start / change).ln() / (start / self.config.tolerance).ln();
                progress(fraction.clamp(0.0, 0.99));
            }
        }
        if !converged {
            return Err(NumericalError::NotConverged {
                iterations,
                residual: change,
            }
            .into());
        }

        let flows = lattice.edge_flows(&graph, omega);
        let solution = graph.finish(
            problem,
            &lattice.pressures,
            &flows,
            iterations,
            CONSERVATION_TOLERANCE,
        )?;
        progress(1.0);

        info!(
            iterations,
            total_flow = solution.total_flow,
            permeability_darcy = solution.raw_darcy,
            "Lattice solve converged."
        );
        Ok(solution)
    }
}
