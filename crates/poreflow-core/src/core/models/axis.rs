use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the three principal axes along which a pressure differential is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowAxis {
    #[default]
    X,
    Y,
    Z,
}

impl FlowAxis {
    pub const ALL: [FlowAxis; 3] = [FlowAxis::X, FlowAxis::Y, FlowAxis::Z];

    /// Component index into a 3D point (0 for X, 1 for Y, 2 for Z).
    #[inline]
    pub fn index(self) -> usize {
        match self {
            FlowAxis::X => 0,
            FlowAxis::Y => 1,
            FlowAxis::Z => 2,
        }
    }

    /// The two axes spanning the cross-section perpendicular to this one.
    pub fn transverse(self) -> [FlowAxis; 2] {
        match self {
            FlowAxis::X => [FlowAxis::Y, FlowAxis::Z],
            FlowAxis::Y => [FlowAxis::X, FlowAxis::Z],
            FlowAxis::Z => [FlowAxis::X, FlowAxis::Y],
        }
    }

    #[inline]
    pub fn coordinate(self, point: &Point3<f64>) -> f64 {
        point[self.index()]
    }

    /// Integer code used by the binary result format.
    pub fn code(self) -> i32 {
        self.index() as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(FlowAxis::X),
            1 => Some(FlowAxis::Y),
            2 => Some(FlowAxis::Z),
            _ => None,
        }
    }
}

impl fmt::Display for FlowAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FlowAxis::X => "X",
            FlowAxis::Y => "Y",
            FlowAxis::Z => "Z",
        };
        f.write_str(s)
    }
}

impl FromStr for FlowAxis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(FlowAxis::X),
            "y" => Ok(FlowAxis::Y),
            "z" => Ok(FlowAxis::Z),
            other => Err(format!("unknown flow axis '{}', expected x, y or z", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str_is_case_insensitive() {
        assert_eq!("x".parse::<FlowAxis>(), Ok(FlowAxis::X));
        assert_eq!(" Y ".parse::<FlowAxis>(), Ok(FlowAxis::Y));
        assert_eq!("Z".parse::<FlowAxis>(), Ok(FlowAxis::Z));
        assert!("w".parse::<FlowAxis>().is_err());
    }

    #[test]
    fn code_round_trips_for_every_axis() {
        for axis in FlowAxis::ALL {
            assert_eq!(FlowAxis::from_code(axis.code()), Some(axis));
        }
        assert_eq!(FlowAxis::from_code(3), None);
    }

    #[test]
    fn transverse_axes_exclude_the_flow_axis() {
        for axis in FlowAxis::ALL {
            assert!(!axis.transverse().contains(&axis));
        }
    }

    #[test]
    fn coordinate_selects_matching_component() {
        let p = Point3::new(1.0, 2.0, 3.0);
        assert_eq!(FlowAxis::X.coordinate(&p), 1.0);
        assert_eq!(FlowAxis::Y.coordinate(&p), 2.0);
        assert_eq!(FlowAxis::Z.coordinate(&p), 3.0);
    }
}
