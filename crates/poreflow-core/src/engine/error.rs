use thiserror::Error;

use crate::core::models::axis::FlowAxis;
use crate::core::models::network::ModelError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BoundaryError {
    #[error("The network has no pores")]
    NoPores,

    #[error("Pore centres do not extend along the {axis} axis")]
    ZeroSpan { axis: FlowAxis },

    #[error("No inlet pores found at the minimum {axis} face")]
    NoInletPores { axis: FlowAxis },

    #[error("No outlet pores found at the maximum {axis} face")]
    NoOutletPores { axis: FlowAxis },

    #[error("Degenerate model geometry (length {length:e} m, area {area:e} m²)")]
    DegenerateGeometry { length: f64, area: f64 },

    #[error("Boundary fraction must lie in (0, 0.5), got {0}")]
    InvalidFraction(f64),
}

/// A failure scoped to one flow method. The run continues with the other methods.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NumericalError {
    #[error("The pressure system is singular")]
    Singular,

    #[error("No outlet pore is reachable from any inlet pore")]
    Disconnected,

    #[error("Failed to converge after {iterations} iterations (residual {residual:e})")]
    NotConverged { iterations: usize, residual: f64 },

    #[error("Flow is not conserved (inlet {inlet:e} m³/s, outlet {outlet:e} m³/s)")]
    ConservationViolated { inlet: f64, outlet: f64 },

    #[error("Solution contains non-finite values")]
    NonFinite,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolverError {
    #[error(transparent)]
    Numerical(#[from] NumericalError),

    #[error("Solve cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Invalid network: {0}")]
    InvalidNetwork(#[from] ModelError),

    #[error("Boundary condition error: {0}")]
    Boundary(#[from] BoundaryError),

    #[error("Simulation cancelled")]
    Cancelled,
}

impl SimulationError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
