//! # PoreFlow Core Library
//!
//! Estimates the effective fluid permeability of a porous medium represented as a
//! pore-throat network extracted from a segmented volumetric scan.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`PoreNetworkModel`,
//!   `PermeabilitySimulationResult`), physical formulas (Hagen–Poiseuille conductance,
//!   Kozeny–Carman, tortuosity correction) and the versioned binary file formats.
//!
//! - **[`engine`]: The Logic Core.** Boundary selection, the three interchangeable flow
//!   solvers (Darcy network, lattice, inertial) sharing a single contract, the result
//!   aggregator, progress reporting and cancellation.
//!
//! - **[`workflows`]: The Public API.** The `simulate` entry point that ties boundary
//!   selection, the selected solvers and aggregation into one cancellable unit of work.

pub mod core;
pub mod engine;
pub mod workflows;
