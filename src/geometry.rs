use serde::Serialize;

/// Integer pixel coordinate pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Coords {
    pub x: i32,
    pub y: i32,
}

impl Coords {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, other: Coords) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

/// Rectangle anchored at its top-left origin.
///
/// Layout stores bounds relative to the parent block; the render pass stores
/// absolute bounds separately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Bounds {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn origin(&self) -> Coords {
        Coords::new(self.x, self.y)
    }

    pub fn set_origin(&mut self, at: Coords) {
        self.x = at.x;
        self.y = at.y;
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Inclusive containment after growing every edge by `tolerance`.
    pub fn contains_with_tolerance(&self, x: i32, y: i32, tolerance: i32) -> bool {
        x >= self.x - tolerance
            && x <= self.right() + tolerance
            && y >= self.y - tolerance
            && y <= self.bottom() + tolerance
    }
}

/// Cell index in the sibling packing grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Index2D {
    pub x: usize,
    pub y: usize,
}

impl Index2D {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Round `value` up to the next multiple of `step`.
pub fn round_up(value: i32, step: i32) -> i32 {
    let rem = value % step;
    if rem > 0 { value + (step - rem) } else { value }
}

/// Round `value` down to a multiple of `step` (positive values only move).
pub fn snap_down(value: i32, step: i32) -> i32 {
    let rem = value % step;
    if rem > 0 { value - rem } else { value }
}
