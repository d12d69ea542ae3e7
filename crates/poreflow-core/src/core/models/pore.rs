use super::ids::{PoreId, ThroatId};
use nalgebra::Point3;

/// A void-space node of the pore network.
///
/// All geometric quantities are in SI units: `center` and `radius` in metres,
/// `volume` in cubic metres and `area` (the pore surface area) in square metres.
#[derive(Debug, Clone, PartialEq)]
pub struct Pore {
    pub id: PoreId,
    pub center: Point3<f64>,
    pub radius: f64,
    pub volume: f64,
    pub area: f64,
    /// Number of throats referencing this pore. Owned by the network model, which
    /// recomputes it whenever the throat list is assembled.
    connection_count: i32,
}

impl Pore {
    pub fn new(id: PoreId, center: Point3<f64>, radius: f64, volume: f64, area: f64) -> Self {
        Self {
            id,
            center,
            radius,
            volume,
            area,
            connection_count: 0,
        }
    }

    #[inline]
    pub fn connection_count(&self) -> i32 {
        self.connection_count
    }

    pub(crate) fn set_connection_count(&mut self, count: i32) {
        self.connection_count = count;
    }
}

/// An edge of the pore network, modelled as a cylindrical conduit between two pores.
///
/// Connectivity is undirected; the sign convention for flow is positive from
/// `pore1` towards `pore2`.
#[derive(Debug, Clone, PartialEq)]
pub struct Throat {
    pub id: ThroatId,
    pub pore1: PoreId,
    pub pore2: PoreId,
    pub radius: f64,
    pub length: f64,
    pub volume: f64,
}

impl Throat {
    pub fn new(
        id: ThroatId,
        pore1: PoreId,
        pore2: PoreId,
        radius: f64,
        length: f64,
        volume: f64,
    ) -> Self {
        Self {
            id,
            pore1,
            pore2,
            radius,
            length,
            volume,
        }
    }

    /// Lateral surface area of the cylindrical conduit.
    #[inline]
    pub fn lateral_area(&self) -> f64 {
        2.0 * std::f64::consts::PI * self.radius * self.length
    }

    /// Whether the throat has a usable hydraulic geometry.
    #[inline]
    pub fn is_conductive(&self) -> bool {
        self.radius.is_finite() && self.length.is_finite() && self.radius > 0.0 && self.length > 0.0
    }

    #[inline]
    pub fn connects(&self, pore: PoreId) -> bool {
        self.pore1 == pore || self.pore2 == pore
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_pore_starts_with_zero_connections() {
        let pore = Pore::new(PoreId(1), Point3::origin(), 1.0, 2.0, 3.0);
        assert_eq!(pore.connection_count(), 0);
    }

    #[test]
    fn throat_with_zero_length_is_not_conductive() {
        let throat = Throat::new(ThroatId(0), PoreId(0), PoreId(1), 1e-6, 0.0, 0.0);
        assert!(!throat.is_conductive());
        let throat = Throat::new(ThroatId(0), PoreId(0), PoreId(1), f64::NAN, 1.0, 0.0);
        assert!(!throat.is_conductive());
    }

    #[test]
    fn lateral_area_matches_cylinder_formula() {
        let throat = Throat::new(ThroatId(0), PoreId(0), PoreId(1), 2.0, 3.0, 0.0);
        assert!((throat.lateral_area() - 12.0 * std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn connects_recognises_both_endpoints() {
        let throat = Throat::new(ThroatId(0), PoreId(4), PoreId(7), 1.0, 1.0, 0.0);
        assert!(throat.connects(PoreId(4)));
        assert!(throat.connects(PoreId(7)));
        assert!(!throat.connects(PoreId(5)));
    }
}
