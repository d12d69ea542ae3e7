//! # Workflows Module
//!
//! High-level entry points that run a complete permeability simulation on a loaded network.
//!
//! ## Overview
//!
//! A workflow validates its parameters, selects boundary pores, runs each selected flow
//! method in turn and aggregates the outcomes into one
//! [`PermeabilitySimulationResult`](crate::core::models::result::PermeabilitySimulationResult).
//! Progress is reported by phase and as an overall percentage, and the run can be cancelled
//! cooperatively at any point.
//!
//! - **Simulation Workflow** ([`simulate`]) - Boundary selection, Darcy, lattice and
//!   Navier–Stokes solves, and result aggregation.

pub mod simulate;
