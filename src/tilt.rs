//! Pointer-reactive card tilt.

/// Element bounds in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x < self.left + self.width && y >= self.top && y < self.top + self.height
    }
}

/// `(rotate_x, rotate_y)` in degrees for a pointer at `(x, y)`.
///
/// The card leans toward the pointer: pointer above centre tips the top
/// edge back (positive X rotation), pointer right of centre turns the right
/// edge away (positive Y rotation). Zero outside the card.
pub fn tilt(x: f64, y: f64, rect: &Rect, max_deg: f64) -> (f64, f64) {
    if rect.width <= 0.0 || rect.height <= 0.0 || !rect.contains(x, y) {
        return (0.0, 0.0);
    }
    let nx = ((x - rect.left) / rect.width) * 2.0 - 1.0;
    let ny = ((y - rect.top) / rect.height) * 2.0 - 1.0;
    (-ny * max_deg, nx * max_deg)
}

/// CSS transform for a tilt.
pub fn transform(rotate_x: f64, rotate_y: f64) -> String {
    format!("perspective(1000px) rotateX({rotate_x:.2}deg) rotateY({rotate_y:.2}deg)")
}
