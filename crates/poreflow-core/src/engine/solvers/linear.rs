//! Pressure solve for a conductance network with Dirichlet boundary pores.
//!
//! Interior pores satisfy `Σ g_ij (p_i − p_j) = 0`. Conductances are normalised by their
//! maximum before assembly, which leaves the pressures unchanged.

use super::FlowProblem;
use super::graph::FlowGraph;
use crate::engine::cancel::CancellationToken;
use crate::engine::config::DarcySolverConfig;
use crate::engine::error::{NumericalError, SolverError};
use nalgebra::{DMatrix, DVector};
use tracing::debug;

const CANCEL_CHECK_INTERVAL: usize = 64;

/// Row of the reduced system: diagonal entry and off-diagonal couplings to other unknowns.
struct Row {
    diagonal: f64,
    couplings: Vec<(usize, f64)>,
}

struct ReducedSystem {
    /// Node index of each unknown.
    nodes: Vec<usize>,
    rows: Vec<Row>,
    rhs: Vec<f64>,
}

impl ReducedSystem {
    fn assemble(graph: &FlowGraph, conductances: &[f64], problem: &FlowProblem<'_>) -> Self {
        let scale = conductances.iter().copied().fold(0.0_f64, f64::max);
        let scale = if scale > 0.0 { scale } else { 1.0 };

        let mut unknown = vec![None; graph.len()];
        let mut nodes = Vec::new();
        for node in 0..graph.len() {
            if graph.fixed_pressure(node, problem).is_none() {
                unknown[node] = Some(nodes.len());
                nodes.push(node);
            }
        }

        let mut rows = Vec::with_capacity(nodes.len());
        let mut rhs = Vec::with_capacity(nodes.len());
        for &node in &nodes {
            let mut row = Row {
                diagonal: 0.0,
                couplings: Vec::with_capacity(graph.incident[node].len()),
            };
            let mut b = 0.0;
            for &k in &graph.incident[node] {
                let g = conductances[k] / scale;
                let other = graph.edges[k].other(node);
                row.diagonal += g;
                match unknown[other] {
                    Some(col) => row.couplings.push((col, g)),
                    None => b += g * graph.fixed_pressure(other, problem).unwrap_or_default(),
                }
            }
            rows.push(row);
            rhs.push(b);
        }
        Self { nodes, rows, rhs }
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn apply(&self, x: &[f64], out: &mut [f64]) {
        for (i, row) in self.rows.iter().enumerate() {
            let mut sum = row.diagonal * x[i];
            for &(j, g) in &row.couplings {
                sum -= g * x[j];
            }
            out[i] = sum;
        }
    }

    fn solve_dense(&self) -> Result<Vec<f64>, NumericalError> {
        let n = self.len();
        let mut matrix = DMatrix::<f64>::zeros(n, n);
        for (i, row) in self.rows.iter().enumerate() {
            matrix[(i, i)] = row.diagonal;
            for &(j, g) in &row.couplings {
                matrix[(i, j)] -= g;
            }
        }
        let rhs = DVector::from_column_slice(&self.rhs);
        let solution = matrix.lu().solve(&rhs).ok_or(NumericalError::Singular)?;
        Ok(solution.iter().copied().collect())
    }

    /// Jacobi-preconditioned conjugate gradients from the initial guess `x`.
    fn solve_iterative(
        &self,
        mut x: Vec<f64>,
        config: &DarcySolverConfig,
        cancel: &CancellationToken,
    ) -> Result<(Vec<f64>, usize), SolverError> {
        let n = self.len();
        if self.rows.iter().any(|r| !(r.diagonal > 0.0)) {
            return Err(NumericalError::Singular.into());
        }
        let b_norm = norm(&self.rhs);
        if b_norm == 0.0 {
            return Ok((vec![0.0; n], 0));
        }

        let mut r = vec![0.0; n];
        self.apply(&x, &mut r);
        for (ri, bi) in r.iter_mut().zip(&self.rhs) {
            *ri = bi - *ri;
        }
        let precondition = |r: &[f64], z: &mut [f64]| {
            for ((zi, ri), row) in z.iter_mut().zip(r).zip(&self.rows) {
                *zi = ri / row.diagonal;
            }
        };
        let mut z = vec![0.0; n];
        precondition(&r, &mut z);
        let mut p = z.clone();
        let mut rz = dot(&r, &z);
        let mut ap = vec![0.0; n];

        let mut residual = norm(&r) / b_norm;
        for iteration in 1..=config.max_iterations {
            if residual <= config.tolerance {
                return Ok((x, iteration - 1));
            }
            if (iteration - 1) % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                return Err(SolverError::Cancelled);
            }
            self.apply(&p, &mut ap);
            let curvature = dot(&p, &ap);
            if !(curvature > 0.0) {
                return Err(NumericalError::Singular.into());
            }
            let alpha = rz / curvature;
            for i in 0..n {
                x[i] += alpha * p[i];
                r[i] -= alpha * ap[i];
            }
            residual = norm(&r) / b_norm;
            precondition(&r, &mut z);
            let rz_next = dot(&r, &z);
            let beta = rz_next / rz;
            rz = rz_next;
            for i in 0..n {
                p[i] = z[i] + beta * p[i];
            }
        }
        if residual <= config.tolerance {
            return Ok((x, config.max_iterations));
        }
        Err(NumericalError::NotConverged {
            iterations: config.max_iterations,
            residual,
        }
        .into())
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

/// Solves for every node pressure of `graph` under the given conductances.
///
/// `initial` is a full node-pressure vector used as the starting guess of the iterative path.
/// Returns the pressures and the iteration count (0 for the direct path).
pub(crate) fn solve_pressures(
    graph: &FlowGraph,
    conductances: &[f64],
    problem: &FlowProblem<'_>,
    initial: Option<&[f64]>,
    config: &DarcySolverConfig,
    cancel: &CancellationToken,
) -> Result<(Vec<f64>, usize), SolverError> {
    let system = ReducedSystem::assemble(graph, conductances, problem);

    let (values, iterations) = if system.len() == 0 {
        (Vec::new(), 0)
    } else if system.len() <= config.direct_solve_limit {
        debug!(unknowns = system.len(), "Solving pressure system by dense LU.");
        (system.solve_dense()?, 0)
    } else {
        debug!(
            unknowns = system.len(),
            "Solving pressure system by preconditioned conjugate gradients."
        );
        let guess = match initial {
            Some(full) => system.nodes.iter().map(|&n| full[n]).collect(),
            None => vec![0.0; system.len()],
        };
        system.solve_iterative(guess, config, cancel)?
    };

    let mut pressures: Vec<f64> = (0..graph.len())
        .map(|node| graph.fixed_pressure(node, problem).unwrap_or_default())
        .collect();
    for (&node, value) in system.nodes.iter().zip(values) {
        pressures[node] = value;
    }
    if pressures.iter().any(|p| !p.is_finite()) {
        return Err(NumericalError::NonFinite.into());
    }
    Ok((pressures, iterations))
}
