//! Overlap resolution primitives shared by movement and interaction checks.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle. Stations, walls and table bounding boxes all use
/// this representation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.w && py >= self.y && py <= self.y + self.h
    }

    /// Closest point on (or inside) the rectangle to the given point.
    pub fn nearest_point(&self, px: f32, py: f32) -> (f32, f32) {
        (
            px.clamp(self.x, self.x + self.w),
            py.clamp(self.y, self.y + self.h),
        )
    }

    pub fn distance_to(&self, px: f32, py: f32) -> f32 {
        let (nx, ny) = self.nearest_point(px, py);
        dist(px, py, nx, ny)
    }

    pub fn is_near(&self, px: f32, py: f32, margin: f32) -> bool {
        self.distance_to(px, py) <= margin
    }
}

pub fn dist(ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    (ax - bx).hypot(ay - by)
}

/// Pushes a circle out of a rectangle it overlaps. Returns the corrected
/// center, or `None` when there is no overlap.
pub fn push_circle_out_of_rect(px: f32, py: f32, pr: f32, rect: &Rect) -> Option<(f32, f32)> {
    let (nx, ny) = rect.nearest_point(px, py);
    let dx = px - nx;
    let dy = py - ny;
    let d2 = dx * dx + dy * dy;
    if d2 >= pr * pr {
        return None;
    }
    // A center exactly on the boundary would give a zero-length normal.
    let d = d2.sqrt().max(1e-4);
    let push = pr - d;
    Some((px + dx / d * push, py + dy / d * push))
}

/// Pushes a circle out of another circle it overlaps. Returns the corrected
/// center of the first circle, or `None` when there is no overlap.
pub fn push_circle_out_of_circle(
    px: f32,
    py: f32,
    pr: f32,
    cx: f32,
    cy: f32,
    cr: f32,
) -> Option<(f32, f32)> {
    let dx = px - cx;
    let dy = py - cy;
    let min_d = pr + cr;
    let d2 = dx * dx + dy * dy;
    if d2 >= min_d * min_d {
        return None;
    }
    let d = d2.sqrt().max(1e-4);
    let push = min_d - d;
    Some((px + dx / d * push, py + dy / d * push))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_push_when_outside() {
        let r = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert!(push_circle_out_of_rect(50.0, 50.0, 5.0, &r).is_none());
        assert!(push_circle_out_of_circle(0.0, 0.0, 5.0, 20.0, 0.0, 5.0).is_none());
    }

    #[test]
    fn pushes_circle_clear_of_rect() {
        let r = Rect::new(0.0, 0.0, 100.0, 10.0);
        // Circle overlapping the bottom edge of the wall gets pushed down.
        let (x, y) = push_circle_out_of_rect(50.0, 14.0, 8.0, &r).expect("overlap");
        assert_eq!(x, 50.0);
        assert!((y - 18.0).abs() < 1e-3);
        assert!(push_circle_out_of_rect(x, y, 8.0, &r).is_none());
    }

    #[test]
    fn pushes_circle_clear_of_circle() {
        let (x, y) = push_circle_out_of_circle(13.0, 0.0, 8.0, 0.0, 0.0, 10.0).expect("overlap");
        assert!((x - 18.0).abs() < 1e-3);
        assert_eq!(y, 0.0);
        assert!(push_circle_out_of_circle(x, y, 8.0, 0.0, 0.0, 10.0).is_none());
    }

    #[test]
    fn rect_distance_is_zero_inside() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(r.distance_to(5.0, 5.0), 0.0);
        assert!(r.is_near(15.0, 5.0, 6.0));
        assert!(!r.is_near(17.0, 5.0, 6.0));
    }
}
