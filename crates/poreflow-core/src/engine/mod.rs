//! # Engine Module
//!
//! This module implements the flow-simulation engine: it turns a pore network and a pressure
//! differential into per-method pressure fields, throat flow rates and permeabilities.
//!
//! ## Architecture
//!
//! - **Boundary Selection** ([`boundary`]) - Inlet/outlet pore sets and sample geometry
//! - **Solvers** ([`solvers`]) - Darcy, lattice and inertial formulations behind one contract
//! - **Aggregation** ([`aggregator`]) - Per-method outcomes merged into one result record
//! - **Configuration** ([`config`]) - Boundary band width and per-solver tuning
//! - **Progress Monitoring** ([`progress`]) - Phase and percentage reporting
//! - **Cancellation** ([`cancel`]) - Cooperative stop requests checked between and inside solves
//! - **Error Handling** ([`error`]) - Boundary, numerical, solver and simulation errors
//!
//! Solvers only read the network; none of them mutates it or shares intermediate state, so a
//! failure in one method never affects another.

pub mod aggregator;
pub mod boundary;
pub mod cancel;
pub mod config;
pub mod error;
pub mod progress;
pub mod solvers;
