//! Shared geometric and color primitives used across surface, tool and session modules.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn offset(self, delta_x: i32, delta_y: i32) -> Self {
        Self {
            x: self.x.saturating_add(delta_x),
            y: self.y.saturating_add(delta_y),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn rect(self) -> PixelRect {
        PixelRect::new(0, 0, self.width, self.height)
    }
}

/// Half-open pixel rectangle: covers `x..x + width` and `y..y + height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest rectangle containing both corners, inclusive.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let min_x = a.x.min(b.x);
        let min_y = a.y.min(b.y);
        let width = i64::from(a.x.max(b.x)) - i64::from(min_x) + 1;
        let height = i64::from(a.y.max(b.y)) - i64::from(min_y) + 1;
        Self::new(
            min_x,
            min_y,
            u32::try_from(width).unwrap_or(u32::MAX),
            u32::try_from(height).unwrap_or(u32::MAX),
        )
    }

    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let mut min = *first;
        let mut max = *first;
        for point in &points[1..] {
            min.x = min.x.min(point.x);
            min.y = min.y.min(point.y);
            max.x = max.x.max(point.x);
            max.y = max.y.max(point.y);
        }
        Some(Self::from_corners(min, max))
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    pub fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }

    pub fn contains(&self, point: Point) -> bool {
        let x = i64::from(point.x);
        let y = i64::from(point.y);
        x >= i64::from(self.x) && x < self.right() && y >= i64::from(self.y) && y < self.bottom()
    }

    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Self::from_edges(i64::from(x), i64::from(y), right, bottom)
    }

    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let x = i64::from(self.x.max(other.x));
        let y = i64::from(self.y.max(other.y));
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= x || bottom <= y {
            return None;
        }
        Some(Self::from_edges(x, y, right, bottom))
    }

    pub fn clamp_to(&self, extent: Extent) -> Option<Self> {
        self.intersect(&extent.rect())
    }

    /// Grows the rectangle by `amount` pixels on every side.
    pub fn expand(&self, amount: u32) -> Self {
        let amount = i64::from(amount);
        Self::from_edges(
            i64::from(self.x) - amount,
            i64::from(self.y) - amount,
            self.right() + amount,
            self.bottom() + amount,
        )
    }

    fn from_edges(left: i64, top: i64, right: i64, bottom: i64) -> Self {
        let x = left.clamp(i64::from(i32::MIN), i64::from(i32::MAX));
        let y = top.clamp(i64::from(i32::MIN), i64::from(i32::MAX));
        Self::new(
            x as i32,
            y as i32,
            u32::try_from((right - x).max(0)).unwrap_or(u32::MAX),
            u32::try_from((bottom - y).max(0)).unwrap_or(u32::MAX),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(default = "opaque_alpha")]
    pub a: u8,
}

const fn opaque_alpha() -> u8 {
    255
}

impl Color {
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    pub const fn to_rgba(self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, self.a])
    }

    pub const fn from_rgba(pixel: image::Rgba<u8>) -> Self {
        let [r, g, b, a] = pixel.0;
        Self { r, g, b, a }
    }

    /// Largest per-channel distance, alpha included.
    pub fn distance(self, other: Self) -> u8 {
        self.r
            .abs_diff(other.r)
            .max(self.g.abs_diff(other.g))
            .max(self.b.abs_diff(other.b))
            .max(self.a.abs_diff(other.a))
    }
}
