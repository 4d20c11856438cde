//! Operator-drawn rectangles.

use std::str::FromStr;

/// Rectangle on the full-resolution frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// Creates a region from its top-left corner and size.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Zero width or zero height.
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Horizontal center, `x + width / 2`.
    pub fn center_x(&self) -> f64 {
        f64::from(self.x) + f64::from(self.width) / 2.0
    }

    /// Intersects with a `frame_width x frame_height` frame.
    ///
    /// Returns `None` when nothing non-degenerate remains.
    pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> Option<Region> {
        if self.x >= frame_width || self.y >= frame_height {
            return None;
        }
        let width = self.width.min(frame_width - self.x);
        let height = self.height.min(frame_height - self.y);
        let clamped = Region::new(self.x, self.y, width, height);
        (!clamped.is_degenerate()).then_some(clamped)
    }
}

impl FromStr for Region {
    type Err = String;

    /// Parses `x,y,w,h` or `x y w h`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() != 4 {
            return Err(format!("expected 4 values (x y w h), got {}", parts.len()));
        }
        let mut values = [0u32; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| format!("'{part}' is not a non-negative integer"))?;
        }
        let [x, y, width, height] = values;
        Ok(Region::new(x, y, width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::Region;

    #[test]
    fn parses_commas_and_spaces() {
        assert_eq!("10,20,30,40".parse::<Region>().unwrap(), Region::new(10, 20, 30, 40));
        assert_eq!(" 1 2  3 4 ".parse::<Region>().unwrap(), Region::new(1, 2, 3, 4));
        assert!("1,2,3".parse::<Region>().is_err());
        assert!("1,2,-3,4".parse::<Region>().is_err());
    }

    #[test]
    fn clamp_trims_and_rejects_empty() {
        let r = Region::new(1900, 1000, 100, 200);
        assert_eq!(r.clamp_to(1920, 1080), Some(Region::new(1900, 1000, 20, 80)));
        assert_eq!(Region::new(0, 0, 0, 50).clamp_to(1920, 1080), None);
        assert_eq!(Region::new(2000, 0, 50, 50).clamp_to(1920, 1080), None);
    }

    #[test]
    fn center_uses_half_width() {
        assert_eq!(Region::new(400, 0, 64, 10).center_x(), 432.0);
        assert_eq!(Region::new(3, 0, 5, 1).center_x(), 5.5);
    }
}
