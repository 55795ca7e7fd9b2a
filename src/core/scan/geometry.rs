use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

use super::error::ConfigError;

static GEOMETRY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)x(\d+)\+(\d+)\+(\d+)").expect("geometry pattern is valid"));

/// Region of interest, in pixels, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

impl Geometry {
    pub fn new(width: u32, height: u32, x: u32, y: u32) -> Self {
        Self {
            width,
            height,
            x,
            y,
        }
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Checks the rectangle against the frame size of the bound source.
    pub fn validate(&self, frame_width: u32, frame_height: u32) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyGeometry {
                width: self.width,
                height: self.height,
            });
        }

        let right = u64::from(self.x) + u64::from(self.width);
        let bottom = u64::from(self.y) + u64::from(self.height);
        if right > u64::from(frame_width) || bottom > u64::from(frame_height) {
            return Err(ConfigError::GeometryOutOfBounds {
                geometry: self.to_string(),
                frame_width,
                frame_height,
            });
        }

        Ok(())
    }
}

impl FromStr for Geometry {
    type Err = ConfigError;

    /// Parses `WxH+X+Y`. Exactly one such group must appear in the input.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ConfigError::MalformedGeometry(s.to_string());

        let mut matches = GEOMETRY_PATTERN.captures_iter(s);
        let caps = matches.next().ok_or_else(malformed)?;
        if matches.next().is_some() {
            return Err(malformed());
        }

        let field = |i: usize| -> Result<u32, ConfigError> {
            caps[i].parse::<u32>().map_err(|_| malformed())
        };

        Ok(Self {
            width: field(1)?,
            height: field(2)?,
            x: field(3)?,
            y: field(4)?,
        })
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_geometry() {
        let g: Geometry = "120x40+16+900".parse().unwrap();
        assert_eq!(g, Geometry::new(120, 40, 16, 900));
        assert_eq!(g.to_string(), "120x40+16+900");
        assert_eq!(g.area(), 4800);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for input in ["", "pick", "10x10+5", "10x-3+0+0", "1x1+0+0 2x2+0+0"] {
            assert!(
                matches!(
                    input.parse::<Geometry>(),
                    Err(ConfigError::MalformedGeometry(_))
                ),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_rejects_overflow() {
        assert!("99999999999x1+0+0".parse::<Geometry>().is_err());
    }

    #[test]
    fn test_validate_inside_bounds() {
        assert!(Geometry::new(4, 4, 0, 0).validate(4, 4).is_ok());
        assert!(Geometry::new(10, 5, 630, 475).validate(640, 480).is_ok());
        assert!(Geometry::new(1, 1, 639, 479).validate(640, 480).is_ok());
    }

    #[test]
    fn test_validate_out_of_bounds() {
        let cases = [
            Geometry::new(11, 5, 630, 475),
            Geometry::new(10, 6, 630, 475),
            Geometry::new(1, 1, 640, 0),
            Geometry::new(u32::MAX, 1, u32::MAX, 0),
        ];
        for g in cases {
            assert!(matches!(
                g.validate(640, 480),
                Err(ConfigError::GeometryOutOfBounds { .. })
            ));
        }
    }

    #[test]
    fn test_validate_empty() {
        assert!(matches!(
            Geometry::new(0, 5, 0, 0).validate(640, 480),
            Err(ConfigError::EmptyGeometry { .. })
        ));
        assert!(matches!(
            Geometry::new(5, 0, 0, 0).validate(640, 480),
            Err(ConfigError::EmptyGeometry { .. })
        ));
    }
}
