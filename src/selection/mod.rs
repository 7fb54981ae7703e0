//! Selection masks over a surface and the floating pixels they can lift.

mod floating;
mod mask;

use image::{GrayImage, Luma};

use crate::geometry::PixelRect;
use crate::surface::PixelSurface;

pub use floating::FloatingSelection;
pub(crate) use floating::clear_masked;
pub use mask::{SelectionMask, SelectionMode, SelectionShape};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionRegion {
    mask: Option<SelectionMask>,
    floating: Option<FloatingSelection>,
}

impl SelectionRegion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mask(&self) -> Option<&SelectionMask> {
        self.mask.as_ref()
    }

    pub fn floating(&self) -> Option<&FloatingSelection> {
        self.floating.as_ref()
    }

    pub fn floating_mut(&mut self) -> Option<&mut FloatingSelection> {
        self.floating.as_mut()
    }

    pub fn is_active(&self) -> bool {
        self.mask.is_some()
    }

    pub fn is_floating(&self) -> bool {
        self.floating.is_some()
    }

    pub fn bounds(&self) -> Option<PixelRect> {
        self.mask.as_ref().and_then(SelectionMask::bounds)
    }

    /// Builds a mask from `shape` and merges it with the current one. Returns
    /// whether a selection remains afterwards.
    pub fn select(
        &mut self,
        shape: &SelectionShape,
        mode: SelectionMode,
        surface: &PixelSurface,
    ) -> bool {
        let incoming = SelectionMask::from_shape(shape, surface);
        let merged = match self.mask.take() {
            Some(mut current) => {
                current.combine(incoming, mode);
                current
            }
            None => match mode {
                SelectionMode::Replace | SelectionMode::Add => incoming,
                SelectionMode::Subtract | SelectionMode::Intersect => return false,
            },
        };
        self.set_mask(merged)
    }

    pub fn select_all(&mut self, surface: &PixelSurface) {
        self.mask = Some(SelectionMask::all(surface.extent()));
    }

    pub fn invert(&mut self, surface: &PixelSurface) -> bool {
        let mask = match self.mask.take() {
            Some(mut mask) => {
                mask.invert();
                mask
            }
            None => SelectionMask::all(surface.extent()),
        };
        self.set_mask(mask)
    }

    fn set_mask(&mut self, mask: SelectionMask) -> bool {
        if mask.is_empty() {
            self.mask = None;
            return false;
        }
        self.mask = Some(mask);
        true
    }

    pub fn clear(&mut self) {
        self.mask = None;
        self.floating = None;
    }

    /// Lifts the selected pixels into a floating selection. The surface is
    /// left untouched. Returns false when nothing is selected.
    pub fn lift(&mut self, surface: &PixelSurface) -> bool {
        if self.floating.is_some() {
            return true;
        }
        let Some(mask) = self.mask.as_ref() else {
            return false;
        };
        self.floating = FloatingSelection::lift(surface, mask);
        self.floating.is_some()
    }

    /// Renders the floating selection onto `surface`: the lifted area is
    /// cleared, then the floating pixels are composited at their position.
    pub fn render_floating(&self, surface: &mut PixelSurface) -> Option<PixelRect> {
        let floating = self.floating.as_ref()?;
        let mask = self.mask.as_ref()?;
        let cleared = clear_masked(surface, mask);
        let placed = floating.composite_onto(surface);
        match (cleared, placed) {
            (Some(a), Some(b)) => Some(a.union(&b)),
            (a, b) => a.or(b),
        }
    }

    /// Drops the floating pixels; the mask is re-anchored on the opaque part
    /// of where they were placed so later edits stay scoped to the moved content.
    pub fn settle(&mut self, surface: &PixelSurface) -> Option<FloatingSelection> {
        let floating = self.floating.take()?;
        let origin = floating.position();
        let pixels = floating.pixels();
        let coverage = GrayImage::from_fn(surface.width(), surface.height(), |x, y| {
            let local_x = i64::from(x) - i64::from(origin.x);
            let local_y = i64::from(y) - i64::from(origin.y);
            let inside = local_x >= 0
                && local_y >= 0
                && local_x < i64::from(pixels.width())
                && local_y < i64::from(pixels.height())
                && pixels.get_pixel(local_x as u32, local_y as u32)[3] > 0;
            Luma([if inside { 255 } else { 0 }])
        });
        self.set_mask(SelectionMask::from_coverage(coverage));
        Some(floating)
    }

    /// Drops the floating pixels without touching the mask.
    pub fn discard_floating(&mut self) -> Option<FloatingSelection> {
        self.floating.take()
    }
}
