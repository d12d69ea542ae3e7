//! The three interchangeable flow formulations.
//!
//! Every solver consumes the same [`FlowProblem`] and produces the same [`FlowSolution`];
//! [`Solver`] selects one by [`Method`]. Failures are [`SolverError`]s scoped to the method
//! that raised them.

pub mod darcy;
pub(crate) mod graph;
pub mod inertial;
pub mod lattice;
pub(crate) mod linear;

use super::boundary::Boundary;
use super::cancel::CancellationToken;
use super::config::SolverConfig;
use super::error::SolverError;
use crate::core::models::method::Method;
use crate::core::models::network::PoreNetworkModel;
use crate::core::models::result::{PressureField, ThroatFlowMap};

pub use darcy::DarcySolver;
pub use inertial::InertialSolver;
pub use lattice::LatticeSolver;

/// Read-only inputs shared by every solver.
#[derive(Debug, Clone, Copy)]
pub struct FlowProblem<'a> {
    pub network: &'a PoreNetworkModel,
    pub boundary: &'a Boundary,
    pub viscosity: f64,
    pub input_pressure: f64,
    pub output_pressure: f64,
}

impl FlowProblem<'_> {
    pub fn pressure_drop(&self) -> f64 {
        self.input_pressure - self.output_pressure
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlowSolution {
    pub pressures: PressureField,
    /// Signed flow rate per throat, positive from `pore1` towards `pore2`.
    pub throat_flows: ThroatFlowMap,
    /// Net flow leaving the inlet pores.
    pub inlet_flow: f64,
    /// Net flow entering the outlet pores.
    pub outlet_flow: f64,
    pub total_flow: f64,
    /// Permeability from Darcy's law before tortuosity correction, in Darcy.
    pub raw_darcy: f64,
    pub iterations: usize,
}

pub trait FlowSolver {
    fn method(&self) -> Method;

    /// Solves `problem`, reporting local completion in `[0, 1]` through `progress`.
    fn solve_observed(
        &self,
        problem: &FlowProblem<'_>,
        cancel: &CancellationToken,
        progress: &dyn Fn(f64),
    ) -> Result<FlowSolution, SolverError>;

    fn solve(
        &self,
        problem: &FlowProblem<'_>,
        cancel: &CancellationToken,
    ) -> Result<FlowSolution, SolverError> {
        self.solve_observed(problem, cancel, &|_| {})
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Solver {
    Darcy(DarcySolver),
    Lattice(LatticeSolver),
    Inertial(InertialSolver),
}

impl Solver {
    pub fn for_method(method: Method, config: &SolverConfig) -> Self {
        match method {
            Method::Darcy => Solver::Darcy(DarcySolver::new(config.darcy.clone())),
            Method::LatticeBoltzmann => Solver::Lattice(LatticeSolver::new(config.lattice.clone())),
            Method::NavierStokes => Solver::Inertial(InertialSolver::new(
                config.inertial.clone(),
                config.darcy.clone(),
            )),
        }
    }
}

impl FlowSolver for Solver {
    fn method(&self) -> Method {
        match self {
            Solver::Darcy(s) => s.method(),
            Solver::Lattice(s) => s.method(),
            Solver::Inertial(s) => s.method(),
        }
    }

    fn solve_observed(
        &self,
        problem: &FlowProblem<'_>,
        cancel: &CancellationToken,
        progress: &dyn Fn(f64),
    ) -> Result<FlowSolution, SolverError> {
        match self {
            Solver::Darcy(s) => s.solve_observed(problem, cancel, progress),
            Solver::Lattice(s) => s.solve_observed(problem, cancel, progress),
            Solver::Inertial(s) => s.solve_observed(problem, cancel, progress),
        }
    }
}
