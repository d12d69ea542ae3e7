/// Applies the tortuosity correction law, `k_corrected = k_raw / τ²`.
///
/// This is the single correction applied to every raw permeability value regardless
/// of the method that produced it.
#[inline]
pub fn correct(raw: f64, tortuosity: f64) -> f64 {
    raw / (tortuosity * tortuosity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_path_leaves_value_unchanged() {
        assert_eq!(correct(3.5, 1.0), 3.5);
    }

    #[test]
    fn correction_divides_by_square_of_tortuosity() {
        assert_eq!(correct(8.0, 2.0), 2.0);
        assert_eq!(correct(1.0, 1.5), 1.0 / 2.25);
    }
}
