//! # Core Module
//!
//! The fundamental building blocks of PoreFlow: the pore-network data model, the
//! simulation result record, the physical formulas shared by every solver, and the
//! binary persistence formats.
//!
//! ## Architecture
//!
//! - **Data Models** ([`models`]) - Pores, throats, the network model and the result record
//! - **Physics** ([`physics`]) - Unit conversions, hydraulic conductance, Kozeny–Carman and
//!   the tortuosity correction law
//! - **File I/O** ([`io`]) - Versioned, magic-prefixed network and result files, including
//!   truncation recovery and legacy-version migration
//!
//! Nothing in this module holds mutable global state; every function is a pure
//! transformation of its inputs.

pub mod io;
pub mod models;
pub mod physics;
