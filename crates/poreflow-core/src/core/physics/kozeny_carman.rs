use super::units::square_meters_to_darcy;
use crate::core::models::network::PoreNetworkModel;
use tracing::debug;

/// Kozeny shape constant for near-circular conduits.
pub const KOZENY_SHAPE_CONSTANT: f64 = 2.5;

/// Kozeny–Carman permeability in square metres from porosity and the specific surface
/// per unit solid volume, `k = φ³ / (K₀ · S² · (1−φ)²)`.
///
/// Returns `None` when the inputs do not describe a valid porous medium.
pub fn permeability_m2(porosity: f64, specific_surface: f64) -> Option<f64> {
    if !(porosity > 0.0 && porosity < 1.0) {
        return None;
    }
    if !(specific_surface.is_finite() && specific_surface > 0.0) {
        return None;
    }
    let solid = 1.0 - porosity;
    Some(porosity.powi(3) / (KOZENY_SHAPE_CONSTANT * specific_surface.powi(2) * solid * solid))
}

/// Specific surface per unit solid volume derived from the network's aggregate geometry.
///
/// The wetted surface is the sum of pore surface areas and throat lateral areas; the bulk
/// volume is inferred from the void volume and the porosity.
pub fn specific_surface(network: &PoreNetworkModel) -> Option<f64> {
    let porosity = network.porosity();
    if !(porosity > 0.0 && porosity < 1.0) {
        return None;
    }
    let surface: f64 = network.pores().iter().map(|p| p.area).sum::<f64>()
        + network
            .throats()
            .iter()
            .filter(|t| t.is_conductive())
            .map(|t| t.lateral_area())
            .sum::<f64>();
    let void_volume = network.total_pore_volume() + network.total_throat_volume();
    if !(surface > 0.0 && void_volume > 0.0) {
        return None;
    }
    let bulk_volume = void_volume / porosity;
    let solid_volume = bulk_volume * (1.0 - porosity);
    Some(surface / solid_volume)
}

/// Kozeny–Carman reference permeability of a network, in Darcy.
///
/// Computed from aggregate geometry only; no graph traversal is involved.
pub fn estimate_darcy(network: &PoreNetworkModel) -> Option<f64> {
    let estimate = specific_surface(network)
        .and_then(|s| permeability_m2(network.porosity(), s))
        .map(square_meters_to_darcy);
    if estimate.is_none() {
        debug!(
            porosity = network.porosity(),
            "Kozeny-Carman estimate unavailable for this network geometry."
        );
    }
    estimate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ids::{PoreId, ThroatId};
    use crate::core::models::network::PoreNetworkModelBuilder;
    use crate::core::models::pore::{Pore, Throat};
    use nalgebra::Point3;

    const TOLERANCE: f64 = 1e-12;

    #[test]
    fn permeability_matches_closed_form() {
        let k = permeability_m2(0.3, 2.0).unwrap();
        let expected = 0.027 / (KOZENY_SHAPE_CONSTANT * 4.0 * 0.49);
        assert!((k - expected).abs() < TOLERANCE);
    }

    #[test]
    fn permeability_rejects_degenerate_porosity() {
        assert!(permeability_m2(0.0, 1.0).is_none());
        assert!(permeability_m2(1.0, 1.0).is_none());
        assert!(permeability_m2(0.5, 0.0).is_none());
    }

    #[test]
    fn permeability_grows_with_porosity() {
        let low = permeability_m2(0.1, 1.0).unwrap();
        let high = permeability_m2(0.4, 1.0).unwrap();
        assert!(high > low);
    }

    #[test]
    fn estimate_uses_pore_and_throat_surfaces() {
        let mut builder = PoreNetworkModelBuilder::new();
        builder.porosity(0.5);
        builder
            .add_pore(Pore::new(PoreId(0), Point3::origin(), 1.0, 1.0, 2.0))
            .unwrap();
        builder
            .add_pore(Pore::new(PoreId(1), Point3::new(1.0, 0.0, 0.0), 1.0, 1.0, 2.0))
            .unwrap();
        builder
            .add_throat(Throat::new(ThroatId(0), PoreId(0), PoreId(1), 0.1, 1.0, 0.0))
            .unwrap();
        let network = builder.build().unwrap();

        let surface = 4.0 + 2.0 * std::f64::consts::PI * 0.1;
        let solid_volume = (2.0 / 0.5) * 0.5;
        let s = specific_surface(&network).unwrap();
        assert!((s - surface / solid_volume).abs() < TOLERANCE);

        let k = estimate_darcy(&network).unwrap();
        let expected = square_meters_to_darcy(permeability_m2(0.5, s).unwrap());
        assert!((k - expected).abs() <= TOLERANCE * expected);
    }

    #[test]
    fn estimate_is_unavailable_for_zero_porosity() {
        let mut builder = PoreNetworkModelBuilder::new();
        builder
            .add_pore(Pore::new(PoreId(0), Point3::origin(), 1.0, 1.0, 2.0))
            .unwrap();
        let network = builder.build().unwrap();
        assert!(estimate_darcy(&network).is_none());
    }
}
