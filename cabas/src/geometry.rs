//! Screen-space value types shared by capture, location, and input dispatch.

use serde::{Deserialize, Serialize};

/// An absolute screen coordinate in pixels. Origin is the top-left corner
/// of the primary monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Shifts the point by the given deltas.
    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Clamps the point into `[0, width-1] x [0, height-1]`.
    pub fn clamped_to(&self, width: u32, height: u32) -> Self {
        Self {
            x: self.x.clamp(0, width.saturating_sub(1) as i32),
            y: self.y.clamp(0, height.saturating_sub(1) as i32),
        }
    }
}

/// An axis-aligned screen rectangle. `left`/`top` may be negative on
/// multi-monitor layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.left + self.width as i32 / 2,
            y: self.top + self.height as i32 / 2,
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left
            && p.y >= self.top
            && p.x < self.left + self.width as i32
            && p.y < self.top + self.height as i32
    }

    /// Converts a point expressed relative to this region's origin into
    /// absolute screen coordinates.
    pub fn to_absolute(&self, local: Point) -> Point {
        local.offset(self.left, self.top)
    }

    /// Intersects with a `width x height` screen anchored at the origin.
    /// Returns `None` when nothing remains.
    pub fn clip_to_screen(&self, width: u32, height: u32) -> Option<Region> {
        let left = self.left.max(0);
        let top = self.top.max(0);
        let right = (self.left + self.width as i32).min(width as i32);
        let bottom = (self.top + self.height as i32).min(height as i32);
        if right <= left || bottom <= top {
            return None;
        }
        Some(Region {
            left,
            top,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        })
    }

    /// True when this rectangle covers `other` to within `tolerance` pixels
    /// on every edge.
    pub fn covers(&self, other: &Region, tolerance: i32) -> bool {
        self.left <= other.left + tolerance
            && self.top <= other.top + tolerance
            && self.left + self.width as i32 >= other.left + other.width as i32 - tolerance
            && self.top + self.height as i32 >= other.top + other.height as i32 - tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_into_screen_bounds() {
        let p = Point::new(-5, 9999).clamped_to(1920, 1080);
        assert_eq!(p, Point::new(0, 1079));

        let q = Point::new(500, 500).clamped_to(1920, 1080);
        assert_eq!(q, Point::new(500, 500));

        let corner = Point::new(1920, 1080).clamped_to(1920, 1080);
        assert_eq!(corner, Point::new(1919, 1079));
    }

    #[test]
    fn center_of_odd_sized_region() {
        let r = Region::new(100, 200, 301, 101);
        assert_eq!(r.center(), Point::new(250, 250));
    }

    #[test]
    fn contains_is_half_open() {
        let r = Region::new(0, 0, 10, 10);
        assert!(r.contains(Point::new(0, 0)));
        assert!(r.contains(Point::new(9, 9)));
        assert!(!r.contains(Point::new(10, 9)));
        assert!(!r.contains(Point::new(-1, 5)));
    }

    #[test]
    fn clips_to_screen() {
        let r = Region::new(-50, -50, 200, 200);
        let clipped = r.clip_to_screen(1920, 1080).unwrap();
        assert_eq!(clipped, Region::new(0, 0, 150, 150));

        let offscreen = Region::new(2000, 0, 100, 100);
        assert!(offscreen.clip_to_screen(1920, 1080).is_none());
    }

    #[test]
    fn coverage_with_tolerance() {
        let monitor = Region::new(0, 0, 1920, 1080);
        let maximized = Region::new(-8, -8, 1936, 1096);
        let floating = Region::new(200, 200, 800, 600);
        assert!(maximized.covers(&monitor, 16));
        assert!(!floating.covers(&monitor, 16));
    }

    #[test]
    fn local_to_absolute_offsets_by_region_origin() {
        let r = Region::new(300, 120, 640, 480);
        assert_eq!(r.to_absolute(Point::new(10, 20)), Point::new(310, 140));
    }
}
