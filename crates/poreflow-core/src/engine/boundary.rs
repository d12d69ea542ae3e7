use super::error::BoundaryError;
use crate::core::models::axis::FlowAxis;
use crate::core::models::ids::PoreId;
use crate::core::models::network::PoreNetworkModel;
use std::collections::BTreeSet;
use tracing::{info, instrument};

/// Inlet/outlet pore sets and the sample geometry used by Darcy's law.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    pub axis: FlowAxis,
    pub inlet: BTreeSet<PoreId>,
    pub outlet: BTreeSet<PoreId>,
    /// Extent of the sample along the flow axis, in metres.
    pub model_length: f64,
    /// Cross-sectional extent perpendicular to the flow axis, in square metres.
    pub model_area: f64,
}

impl Boundary {
    #[inline]
    pub fn is_inlet(&self, id: PoreId) -> bool {
        self.inlet.contains(&id)
    }

    #[inline]
    pub fn is_outlet(&self, id: PoreId) -> bool {
        self.outlet.contains(&id)
    }
}

#[derive(Debug, Clone, Copy)]
struct Extent {
    min: f64,
    max: f64,
}

impl Extent {
    fn empty() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    fn include(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// Selects inlet and outlet pores in bands of relative width `fraction` at the minimum and
/// maximum faces of `axis`.
///
/// Bands are measured on pore centres. Length and area are measured on pore bounding boxes,
/// so a single row of pores still has a finite cross-section.
#[instrument(skip(network), fields(pores = network.pores().len()))]
pub fn select(
    network: &PoreNetworkModel,
    axis: FlowAxis,
    fraction: f64,
) -> Result<Boundary, BoundaryError> {
    if !(fraction > 0.0 && fraction < 0.5) {
        return Err(BoundaryError::InvalidFraction(fraction));
    }
    if network.is_empty() {
        return Err(BoundaryError::NoPores);
    }

    let mut centres = Extent::empty();
    let mut boxes = [Extent::empty(); 3];
    for pore in network.pores() {
        centres.include(axis.coordinate(&pore.center));
        let r = pore.radius.max(0.0);
        for (i, extent) in boxes.iter_mut().enumerate() {
            extent.include(pore.center[i] - r);
            extent.include(pore.center[i] + r);
        }
    }

    let span = centres.span();
    if !(span.is_finite() && span > 0.0) {
        return Err(BoundaryError::ZeroSpan { axis });
    }

    let inlet_limit = centres.min + fraction * span;
    let outlet_limit = centres.max - fraction * span;
    let mut inlet = BTreeSet::new();
    let mut outlet = BTreeSet::new();
    for pore in network.pores() {
        let c = axis.coordinate(&pore.center);
        if c <= inlet_limit {
            inlet.insert(pore.id);
        } else if c >= outlet_limit {
            outlet.insert(pore.id);
        }
    }
    if inlet.is_empty() {
        return Err(BoundaryError::NoInletPores { axis });
    }
    if outlet.is_empty() {
        return Err(BoundaryError::NoOutletPores { axis });
    }

    let model_length = boxes[axis.index()].span();
    let [a, b] = axis.transverse();
    let model_area = boxes[a.index()].span() * boxes[b.index()].span();
    if !(model_length.is_finite() && model_length > 0.0 && model_area.is_finite() && model_area > 0.0)
    {
        return Err(BoundaryError::DegenerateGeometry {
            length: model_length,
            area: model_area,
        });
    }

    info!(
        inlet = inlet.len(),
        outlet = outlet.len(),
        model_length,
        model_area,
        "Boundary pores selected."
    );
    Ok(Boundary {
        axis,
        inlet,
        outlet,
        model_length,
        model_area,
    })
}
