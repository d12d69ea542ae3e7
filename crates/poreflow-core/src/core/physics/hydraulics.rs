use std::f64::consts::PI;

/// Hagen–Poiseuille hydraulic conductance of a cylindrical conduit, `π r⁴ / (8 μ L)`.
///
/// Returns the conductance in m³/(Pa·s) for a radius and length in metres and a
/// dynamic viscosity in Pa·s.
#[inline]
pub fn hagen_poiseuille_conductance(radius: f64, length: f64, viscosity: f64) -> f64 {
    PI * radius.powi(4) / (8.0 * viscosity * length)
}

#[inline]
pub fn cross_section_area(radius: f64) -> f64 {
    PI * radius * radius
}

/// Throat Reynolds number based on the mean velocity and diameter.
#[inline]
pub fn reynolds_number(flow_rate: f64, radius: f64, density: f64, viscosity: f64) -> f64 {
    let velocity = flow_rate.abs() / cross_section_area(radius);
    density * velocity * 2.0 * radius / viscosity
}

/// Quadratic (Forchheimer) resistance coefficient of a throat, `ρ K / (2 A²)`.
#[inline]
pub fn inertial_resistance(radius: f64, density: f64, loss_coefficient: f64) -> f64 {
    let area = cross_section_area(radius);
    density * loss_coefficient / (2.0 * area * area)
}

/// Secant conductance of a throat obeying `ΔP = q/g + β q|q|` at the given pressure drop.
///
/// Reduces to `g` when `β` or `ΔP` vanishes.
#[inline]
pub fn forchheimer_conductance(linear: f64, beta: f64, pressure_drop: f64) -> f64 {
    let x = 4.0 * linear * linear * beta * pressure_drop.abs();
    2.0 * linear / (1.0 + (1.0 + x).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() <= TOLERANCE * a.abs().max(b.abs()).max(1e-300)
    }

    #[test]
    fn conductance_scales_with_fourth_power_of_radius() {
        let g1 = hagen_poiseuille_conductance(1.0, 1.0, 1.0);
        let g2 = hagen_poiseuille_conductance(2.0, 1.0, 1.0);
        assert!(f64_approx_equal(g2, 16.0 * g1));
    }

    #[test]
    fn conductance_is_inverse_in_length_and_viscosity() {
        let g = hagen_poiseuille_conductance(1.0, 1.0, 1.0);
        assert!(f64_approx_equal(hagen_poiseuille_conductance(1.0, 2.0, 1.0), g / 2.0));
        assert!(f64_approx_equal(hagen_poiseuille_conductance(1.0, 1.0, 4.0), g / 4.0));
        assert!(f64_approx_equal(g, PI / 8.0));
    }

    #[test]
    fn forchheimer_conductance_without_inertia_is_linear() {
        assert!(f64_approx_equal(forchheimer_conductance(3.0, 0.0, 100.0), 3.0));
        assert!(f64_approx_equal(forchheimer_conductance(3.0, 5.0, 0.0), 3.0));
    }

    #[test]
    fn forchheimer_conductance_satisfies_quadratic_law() {
        let (g, beta, dp) = (2.0, 0.5, 10.0);
        let q = forchheimer_conductance(g, beta, dp) * dp;
        let reconstructed = q / g + beta * q * q;
        assert!((reconstructed - dp).abs() < 1e-9);
    }

    #[test]
    fn reynolds_number_is_sign_independent() {
        let re_pos = reynolds_number(1e-9, 1e-6, 1000.0, 1e-3);
        let re_neg = reynolds_number(-1e-9, 1e-6, 1000.0, 1e-3);
        assert!(f64_approx_equal(re_pos, re_neg));
        assert!(re_pos > 0.0);
    }
}
