use image::RgbaImage;

use super::SelectionMask;
use crate::geometry::{Color, PixelRect, Point};
use crate::surface::{BlendOperator, PixelSurface, SurfaceResult};
use crate::tools::transform::{flip_image, rotate_image, scale_image};
use crate::tools::{FilterKind, FlipAxis, ToolResult};

/// Pixels lifted out of the surface under a selection mask. Pixels outside
/// the mask are fully transparent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloatingSelection {
    pixels: RgbaImage,
    position: Point,
}

impl FloatingSelection {
    /// Copies the masked pixels of `surface`. `None` when the mask is empty.
    pub fn lift(surface: &PixelSurface, mask: &SelectionMask) -> Option<Self> {
        let source = mask.bounds()?;
        let mut pixels = surface.region(source)?;
        for (x, y, pixel) in pixels.enumerate_pixels_mut() {
            let coverage = mask.coverage(source.x + x as i32, source.y + y as i32);
            if coverage < 255 {
                let color = Color::from_rgba(*pixel);
                let alpha = (u16::from(color.a) * u16::from(coverage) / 255) as u8;
                *pixel = color.with_alpha(alpha).to_rgba();
            }
        }
        Some(Self {
            pixels,
            position: Point::new(source.x, source.y),
        })
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn footprint(&self) -> PixelRect {
        PixelRect::new(
            self.position.x,
            self.position.y,
            self.pixels.width(),
            self.pixels.height(),
        )
    }

    pub fn translate(&mut self, delta_x: i32, delta_y: i32) {
        self.position = self.position.offset(delta_x, delta_y);
    }

    pub fn flip(&mut self, axis: FlipAxis) {
        flip_image(&mut self.pixels, axis);
    }

    /// Rotates clockwise around the footprint center.
    pub fn rotate(&mut self, quarter_turns: u8) {
        if quarter_turns % 4 == 0 {
            return;
        }
        let before = self.footprint();
        self.pixels = rotate_image(&self.pixels, quarter_turns);
        self.recenter(before);
    }

    pub fn scale(&mut self, width: u32, height: u32) -> ToolResult<()> {
        self.pixels = scale_image(&self.pixels, width, height)?;
        Ok(())
    }

    /// Runs `filter` over the lifted pixels only.
    pub fn filter(&mut self, filter: &FilterKind) -> SurfaceResult<()> {
        let mut pixels = PixelSurface::from_image(self.pixels.clone())?;
        filter.apply(&mut pixels, None);
        self.pixels = pixels.into_image();
        Ok(())
    }

    fn recenter(&mut self, before: PixelRect) {
        let center_x = i64::from(before.x) * 2 + i64::from(before.width);
        let center_y = i64::from(before.y) * 2 + i64::from(before.height);
        let x = (center_x - i64::from(self.pixels.width())) / 2;
        let y = (center_y - i64::from(self.pixels.height())) / 2;
        self.position = Point::new(
            x.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32,
            y.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32,
        );
    }

    /// Composites the floating pixels over `surface` at the current position.
    /// Returns the touched rectangle, if any part landed on the surface.
    pub fn composite_onto(&self, surface: &mut PixelSurface) -> Option<PixelRect> {
        let footprint = self.footprint().clamp_to(surface.extent())?;
        for (x, y, pixel) in self.pixels.enumerate_pixels() {
            surface.blend_pixel(
                self.position.x.saturating_add(x as i32),
                self.position.y.saturating_add(y as i32),
                Color::from_rgba(*pixel),
                BlendOperator::Over,
                255,
            );
        }
        Some(footprint)
    }
}

/// Clears the masked pixels of `surface` to transparent, weighted by coverage.
pub(crate) fn clear_masked(surface: &mut PixelSurface, mask: &SelectionMask) -> Option<PixelRect> {
    let bounds = mask.bounds()?;
    for y in bounds.y..bounds.y + bounds.height as i32 {
        for x in bounds.x..bounds.x + bounds.width as i32 {
            surface.blend_pixel(
                x,
                y,
                Color::TRANSPARENT,
                BlendOperator::Clear,
                mask.coverage(x, y),
            );
        }
    }
    Some(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::SelectionShape;

    fn checker_surface() -> PixelSurface {
        let mut surface = PixelSurface::new(10, 10, Color::WHITE).expect("surface");
        surface.put_pixel(2, 2, Color::BLACK);
        surface.put_pixel(3, 2, Color::rgb(255, 0, 0));
        surface
    }

    fn rect_mask(surface: &PixelSurface, rect: PixelRect) -> SelectionMask {
        SelectionMask::from_shape(&SelectionShape::Rectangle { rect }, surface)
    }

    #[test]
    fn lift_copies_masked_pixels_only() {
        let surface = checker_surface();
        let mask = rect_mask(&surface, PixelRect::new(2, 2, 2, 1));
        let floating = FloatingSelection::lift(&surface, &mask).expect("non-empty mask");
        assert_eq!(floating.footprint(), PixelRect::new(2, 2, 2, 1));
        assert_eq!(Color::from_rgba(*floating.pixels().get_pixel(0, 0)), Color::BLACK);
    }

    #[test]
    fn lift_of_empty_mask_is_none() {
        let surface = checker_surface();
        let mask = SelectionMask::empty(surface.extent());
        assert!(FloatingSelection::lift(&surface, &mask).is_none());
    }

    #[test]
    fn translate_then_composite_moves_pixels() {
        let mut surface = checker_surface();
        let mask = rect_mask(&surface, PixelRect::new(2, 2, 2, 1));
        let mut floating = FloatingSelection::lift(&surface, &mask).expect("lifted");
        clear_masked(&mut surface, &mask);
        floating.translate(4, 5);

        let touched = floating.composite_onto(&mut surface).expect("on surface");
        assert_eq!(touched, PixelRect::new(6, 7, 2, 1));
        assert_eq!(surface.pixel(6, 7), Some(Color::BLACK));
        assert_eq!(surface.pixel(7, 7), Some(Color::rgb(255, 0, 0)));
        assert_eq!(surface.pixel(2, 2), Some(Color::TRANSPARENT));
    }

    #[test]
    fn rotate_quarter_turn_swaps_dimensions_around_center() {
        let surface = checker_surface();
        let mask = rect_mask(&surface, PixelRect::new(2, 2, 4, 2));
        let mut floating = FloatingSelection::lift(&surface, &mask).expect("lifted");
        floating.rotate(1);
        assert_eq!(floating.footprint(), PixelRect::new(3, 1, 2, 4));
        floating.rotate(4);
        assert_eq!(floating.footprint(), PixelRect::new(3, 1, 2, 4));
    }

    #[test]
    fn filter_only_touches_lifted_pixels() {
        let mut surface = checker_surface();
        let mask = rect_mask(&surface, PixelRect::new(2, 2, 1, 1));
        let mut floating = FloatingSelection::lift(&surface, &mask).expect("lifted");
        floating.filter(&FilterKind::Invert).expect("filter");
        assert_eq!(Color::from_rgba(*floating.pixels().get_pixel(0, 0)), Color::WHITE);
        floating.composite_onto(&mut surface);
        assert_eq!(surface.pixel(2, 2), Some(Color::WHITE));
        assert_eq!(surface.pixel(3, 2), Some(Color::rgb(255, 0, 0)));
    }

    #[test]
    fn flip_horizontal_mirrors_row() {
        let surface = checker_surface();
        let mask = rect_mask(&surface, PixelRect::new(2, 2, 2, 1));
        let mut floating = FloatingSelection::lift(&surface, &mask).expect("lifted");
        floating.flip(FlipAxis::Horizontal);
        assert_eq!(
            Color::from_rgba(*floating.pixels().get_pixel(0, 0)),
            Color::rgb(255, 0, 0)
        );
    }
}
