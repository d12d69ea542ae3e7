/// One Darcy expressed in square metres.
pub const SQUARE_METERS_PER_DARCY: f64 = 9.869233e-13;

pub const MILLIDARCY_PER_DARCY: f64 = 1000.0;

#[inline]
pub fn square_meters_to_darcy(k_m2: f64) -> f64 {
    k_m2 / SQUARE_METERS_PER_DARCY
}

#[inline]
pub fn darcy_to_square_meters(k_darcy: f64) -> f64 {
    k_darcy * SQUARE_METERS_PER_DARCY
}

#[inline]
pub fn darcy_to_millidarcy(k_darcy: f64) -> f64 {
    k_darcy * MILLIDARCY_PER_DARCY
}

/// Permeability from Darcy's law, `k = Q·μ·L / (A·ΔP)`, in square metres.
#[inline]
pub fn darcy_law_permeability(
    flow_rate: f64,
    viscosity: f64,
    length: f64,
    area: f64,
    pressure_drop: f64,
) -> f64 {
    flow_rate * viscosity * length / (area * pressure_drop)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    #[test]
    fn one_darcy_round_trips_through_square_meters() {
        let k = darcy_to_square_meters(1.0);
        assert!((square_meters_to_darcy(k) - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn millidarcy_is_thousandth_of_darcy() {
        assert_eq!(darcy_to_millidarcy(0.25), 250.0);
    }

    #[test]
    fn darcy_law_is_linear_in_flow_rate() {
        let k1 = darcy_law_permeability(1.0, 1e-3, 1.0, 1.0, 1.0);
        let k2 = darcy_law_permeability(2.0, 1e-3, 1.0, 1.0, 1.0);
        assert!((k2 - 2.0 * k1).abs() < TOLERANCE);
    }
}
