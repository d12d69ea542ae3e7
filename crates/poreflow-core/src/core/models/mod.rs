//! # Core Models Module
//!
//! Data structures describing the pore network a simulation operates on and the record a
//! simulation produces.
//!
//! ## Key Components
//!
//! - [`pore`] - Pores (void-space nodes) and throats (conduits between pores)
//! - [`network`] - The immutable pore-throat graph and its validating builder
//! - [`ids`] - Stable identifier types for pores and throats
//! - [`axis`] - The principal flow axes
//! - [`method`] - The selectable flow formulations and their selection flags
//! - [`result`] - The per-run permeability result record
//!
//! ## Usage
//!
//! ```ignore
//! use poreflow::core::models::{ids::*, network::PoreNetworkModelBuilder, pore::*};
//!
//! let mut builder = PoreNetworkModelBuilder::new();
//! builder.porosity(0.2).tortuosity(1.3);
//! builder.add_pore(Pore::new(PoreId(0), Point3::new(0.0, 0.0, 0.0), 1e-6, 1e-18, 1e-12))?;
//! builder.add_pore(Pore::new(PoreId(1), Point3::new(1e-5, 0.0, 0.0), 1e-6, 1e-18, 1e-12))?;
//! builder.add_throat(Throat::new(ThroatId(0), PoreId(0), PoreId(1), 5e-7, 1e-5, 1e-20))?;
//! let network = builder.build()?;
//! ```

pub mod axis;
pub mod ids;
pub mod method;
pub mod network;
pub mod pore;
pub mod result;
