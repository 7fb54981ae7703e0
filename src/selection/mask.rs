use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

use crate::geometry::{Extent, PixelRect, Point};
use crate::surface::PixelSurface;

const INSIDE: Luma<u8> = Luma([255]);

/// Shape used to build or edit a selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum SelectionShape {
    Rectangle { rect: PixelRect },
    /// Ellipse inscribed in `rect`.
    Ellipse { rect: PixelRect },
    /// Free-hand polygon, filled with the even-odd rule at pixel centers.
    Polygon { points: Vec<Point> },
    /// Contiguous area of similar color around `at`.
    Color {
        at: Point,
        #[serde(default)]
        tolerance: u8,
    },
}

/// How a new shape interacts with the existing mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    #[default]
    Replace,
    Add,
    Subtract,
    Intersect,
}

/// Per-pixel selection coverage with the surface's extent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionMask {
    coverage: GrayImage,
}

impl SelectionMask {
    pub fn empty(extent: Extent) -> Self {
        Self {
            coverage: GrayImage::new(extent.width, extent.height),
        }
    }

    pub fn all(extent: Extent) -> Self {
        Self {
            coverage: GrayImage::from_pixel(extent.width, extent.height, INSIDE),
        }
    }

    pub(crate) fn from_coverage(coverage: GrayImage) -> Self {
        Self { coverage }
    }

    pub fn from_shape(shape: &SelectionShape, surface: &PixelSurface) -> Self {
        let extent = surface.extent();
        match shape {
            SelectionShape::Rectangle { rect } => {
                let mut mask = Self::empty(extent);
                if let Some(rect) = rect.clamp_to(extent) {
                    mask.fill_rect(rect);
                }
                mask
            }
            SelectionShape::Ellipse { rect } => Self::ellipse(extent, *rect),
            SelectionShape::Polygon { points } => Self::polygon(extent, points),
            SelectionShape::Color { at, tolerance } => surface
                .contiguous_region(*at, *tolerance)
                .map(Self::from_coverage)
                .unwrap_or_else(|| Self::empty(extent)),
        }
    }

    fn fill_rect(&mut self, rect: PixelRect) {
        let left = rect.x as u32;
        let top = rect.y as u32;
        for y in top..top + rect.height {
            for x in left..left + rect.width {
                self.coverage.put_pixel(x, y, INSIDE);
            }
        }
    }

    fn ellipse(extent: Extent, rect: PixelRect) -> Self {
        let mut mask = Self::empty(extent);
        let Some(visible) = rect.clamp_to(extent) else {
            return mask;
        };
        let rx = f64::from(rect.width) / 2.0;
        let ry = f64::from(rect.height) / 2.0;
        let cx = f64::from(rect.x) + rx;
        let cy = f64::from(rect.y) + ry;
        for y in visible.y..visible.y + visible.height as i32 {
            for x in visible.x..visible.x + visible.width as i32 {
                let dx = (f64::from(x) + 0.5 - cx) / rx;
                let dy = (f64::from(y) + 0.5 - cy) / ry;
                if dx * dx + dy * dy <= 1.0 {
                    mask.coverage.put_pixel(x as u32, y as u32, INSIDE);
                }
            }
        }
        mask
    }

    fn polygon(extent: Extent, points: &[Point]) -> Self {
        let mut mask = Self::empty(extent);
        if points.len() < 3 {
            return mask;
        }
        let Some(visible) = PixelRect::from_points(points).and_then(|rect| rect.clamp_to(extent))
        else {
            return mask;
        };
        let mut crossings = Vec::with_capacity(points.len());
        for y in visible.y..visible.y + visible.height as i32 {
            let scan_y = f64::from(y) + 0.5;
            crossings.clear();
            for (index, start) in points.iter().enumerate() {
                let end = points[(index + 1) % points.len()];
                let (y0, y1) = (f64::from(start.y), f64::from(end.y));
                if (y0 <= scan_y) == (y1 <= scan_y) {
                    continue;
                }
                let (x0, x1) = (f64::from(start.x), f64::from(end.x));
                let t = (scan_y - y0) / (y1 - y0);
                crossings.push(x0 + t * (x1 - x0));
            }
            crossings.sort_by(f64::total_cmp);
            for pair in crossings.chunks_exact(2) {
                for x in visible.x..visible.x + visible.width as i32 {
                    let center = f64::from(x) + 0.5;
                    if center >= pair[0] && center < pair[1] {
                        mask.coverage.put_pixel(x as u32, y as u32, INSIDE);
                    }
                }
            }
        }
        mask
    }

    pub fn extent(&self) -> Extent {
        Extent::new(self.coverage.width(), self.coverage.height())
    }

    /// Coverage in `0..=255`; zero outside the mask's extent.
    pub fn coverage(&self, x: i32, y: i32) -> u8 {
        match (u32::try_from(x), u32::try_from(y)) {
            (Ok(x), Ok(y)) if x < self.coverage.width() && y < self.coverage.height() => {
                self.coverage.get_pixel(x, y)[0]
            }
            _ => 0,
        }
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.coverage
    }

    pub fn is_empty(&self) -> bool {
        self.coverage.pixels().all(|pixel| pixel[0] == 0)
    }

    /// Bounding rectangle of the covered pixels.
    pub fn bounds(&self) -> Option<PixelRect> {
        let mut found: Option<PixelRect> = None;
        for (x, y, pixel) in self.coverage.enumerate_pixels() {
            if pixel[0] == 0 {
                continue;
            }
            let here = PixelRect::new(x as i32, y as i32, 1, 1);
            found = Some(found.map_or(here, |rect| rect.union(&here)));
        }
        found
    }

    pub fn invert(&mut self) {
        for pixel in self.coverage.pixels_mut() {
            pixel[0] = 255 - pixel[0];
        }
    }

    /// Merges `other` into `self` following `mode`. Masks of different
    /// extents are treated as `other` replacing `self`.
    pub fn combine(&mut self, other: Self, mode: SelectionMode) {
        if mode == SelectionMode::Replace || self.extent() != other.extent() {
            *self = other;
            return;
        }
        for (dst, src) in self.coverage.pixels_mut().zip(other.coverage.pixels()) {
            let (d, s) = (dst[0], src[0]);
            dst[0] = match mode {
                SelectionMode::Replace => s,
                SelectionMode::Add => d.max(s),
                SelectionMode::Subtract => d.min(255 - s),
                SelectionMode::Intersect => d.min(s),
            };
        }
    }
}
