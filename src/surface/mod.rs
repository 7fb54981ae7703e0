//! Owned RGBA pixel buffer that every tool writes into.

mod blend;
mod flood;

use image::{imageops, RgbaImage};
use thiserror::Error;

use crate::geometry::{Color, Extent, PixelRect, Point};

pub use blend::{lerp, BlendOperator};

pub const MAX_SURFACE_DIMENSION: u32 = 16_384;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("invalid surface dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

pub type SurfaceResult<T> = std::result::Result<T, SurfaceError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelSurface {
    pixels: RgbaImage,
}

fn validate_dimensions(width: u32, height: u32) -> SurfaceResult<()> {
    if width == 0 || height == 0 || width > MAX_SURFACE_DIMENSION || height > MAX_SURFACE_DIMENSION
    {
        return Err(SurfaceError::InvalidDimensions { width, height });
    }
    Ok(())
}

impl PixelSurface {
    pub fn new(width: u32, height: u32, fill: Color) -> SurfaceResult<Self> {
        validate_dimensions(width, height)?;
        Ok(Self {
            pixels: RgbaImage::from_pixel(width, height, fill.to_rgba()),
        })
    }

    pub fn from_image(pixels: RgbaImage) -> SurfaceResult<Self> {
        validate_dimensions(pixels.width(), pixels.height())?;
        Ok(Self { pixels })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn extent(&self) -> Extent {
        Extent::new(self.width(), self.height())
    }

    pub fn bounds(&self) -> PixelRect {
        self.extent().rect()
    }

    pub fn byte_size(&self) -> usize {
        self.pixels.as_raw().len()
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }

    fn index(&self, x: i32, y: i32) -> Option<(u32, u32)> {
        let x = u32::try_from(x).ok()?;
        let y = u32::try_from(y).ok()?;
        (x < self.width() && y < self.height()).then_some((x, y))
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        let (x, y) = self.index(x, y)?;
        Some(Color::from_rgba(*self.pixels.get_pixel(x, y)))
    }

    pub fn put_pixel(&mut self, x: i32, y: i32, color: Color) -> bool {
        match self.index(x, y) {
            Some((x, y)) => {
                self.pixels.put_pixel(x, y, color.to_rgba());
                true
            }
            None => false,
        }
    }

    /// Composites `color` with `operator`, then keeps only `coverage / 255` of
    /// the change. Returns whether the pixel lies on the surface.
    pub fn blend_pixel(
        &mut self,
        x: i32,
        y: i32,
        color: Color,
        operator: BlendOperator,
        coverage: u8,
    ) -> bool {
        let Some((x, y)) = self.index(x, y) else {
            return false;
        };
        if coverage == 0 {
            return true;
        }
        let pixel = self.pixels.get_pixel_mut(x, y);
        let dst = Color::from_rgba(*pixel);
        let out = lerp(dst, operator.composite(dst, color), coverage);
        *pixel = out.to_rgba();
        true
    }

    pub fn fill(&mut self, color: Color) {
        let rgba = color.to_rgba();
        for pixel in self.pixels.pixels_mut() {
            *pixel = rgba;
        }
    }

    /// Copies the part of `rect` that lies on the surface.
    pub fn region(&self, rect: PixelRect) -> Option<RgbaImage> {
        let clamped = rect.clamp_to(self.extent())?;
        Some(
            imageops::crop_imm(
                &self.pixels,
                clamped.x as u32,
                clamped.y as u32,
                clamped.width,
                clamped.height,
            )
            .to_image(),
        )
    }

    /// Raw copy of `source` with its top-left corner at `origin`; parts that
    /// fall outside the surface are dropped.
    pub fn write_region(&mut self, origin: Point, source: &RgbaImage) {
        imageops::replace(
            &mut self.pixels,
            source,
            i64::from(origin.x),
            i64::from(origin.y),
        );
    }

    pub fn replace_image(&mut self, pixels: RgbaImage) -> SurfaceResult<()> {
        validate_dimensions(pixels.width(), pixels.height())?;
        self.pixels = pixels;
        Ok(())
    }

    /// Tightest rectangle inside `within` where `self` and `other` differ.
    /// Surfaces of different extents are reported as fully changed.
    pub fn changed_bounds(&self, other: &Self, within: PixelRect) -> Option<PixelRect> {
        if self.extent() != other.extent() {
            return Some(other.bounds());
        }
        let area = within.clamp_to(self.extent())?;
        let mut changed: Option<(u32, u32, u32, u32)> = None;
        let left = area.x as u32;
        let top = area.y as u32;
        for y in top..top + area.height {
            for x in left..left + area.width {
                if self.pixels.get_pixel(x, y) == other.pixels.get_pixel(x, y) {
                    continue;
                }
                changed = Some(match changed {
                    Some((min_x, min_y, max_x, max_y)) => {
                        (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
                    }
                    None => (x, y, x, y),
                });
            }
        }
        changed.map(|(min_x, min_y, max_x, max_y)| {
            PixelRect::new(
                min_x as i32,
                min_y as i32,
                max_x - min_x + 1,
                max_y - min_y + 1,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_zero_and_oversized_dimensions() {
        assert!(matches!(
            PixelSurface::new(0, 10, Color::WHITE),
            Err(SurfaceError::InvalidDimensions { width: 0, height: 10 })
        ));
        assert!(PixelSurface::new(MAX_SURFACE_DIMENSION + 1, 1, Color::WHITE).is_err());
        assert!(PixelSurface::new(4, 4, Color::WHITE).is_ok());
    }

    #[test]
    fn out_of_range_access_is_a_no_op() {
        let mut surface = PixelSurface::new(4, 4, Color::WHITE).expect("surface");
        assert_eq!(surface.pixel(-1, 0), None);
        assert_eq!(surface.pixel(4, 0), None);
        assert!(!surface.put_pixel(4, 4, Color::BLACK));
        assert!(!surface.blend_pixel(-3, 2, Color::BLACK, BlendOperator::Over, 255));
        assert_eq!(surface, PixelSurface::new(4, 4, Color::WHITE).expect("surface"));
    }

    #[test]
    fn blend_pixel_respects_coverage() {
        let mut surface = PixelSurface::new(2, 2, Color::WHITE).expect("surface");
        surface.blend_pixel(0, 0, Color::BLACK, BlendOperator::Over, 0);
        assert_eq!(surface.pixel(0, 0), Some(Color::WHITE));
        surface.blend_pixel(1, 1, Color::BLACK, BlendOperator::Over, 255);
        assert_eq!(surface.pixel(1, 1), Some(Color::BLACK));
    }

    #[test]
    fn region_and_write_region_clamp_to_surface() {
        let mut surface = PixelSurface::new(6, 6, Color::WHITE).expect("surface");
        surface.put_pixel(5, 5, Color::BLACK);
        let region = surface
            .region(PixelRect::new(4, 4, 10, 10))
            .expect("region should intersect");
        assert_eq!(region.dimensions(), (2, 2));
        assert_eq!(Color::from_rgba(*region.get_pixel(1, 1)), Color::BLACK);

        let patch = RgbaImage::from_pixel(3, 3, Color::rgb(9, 9, 9).to_rgba());
        surface.write_region(Point::new(-1, -1), &patch);
        assert_eq!(surface.pixel(1, 1), Some(Color::rgb(9, 9, 9)));
        assert_eq!(surface.pixel(2, 2), Some(Color::WHITE));
    }

    #[test]
    fn changed_bounds_finds_tight_rectangle() {
        let base = PixelSurface::new(10, 10, Color::WHITE).expect("surface");
        let mut edited = base.clone();
        edited.put_pixel(2, 3, Color::BLACK);
        edited.put_pixel(6, 4, Color::BLACK);
        assert_eq!(
            base.changed_bounds(&edited, base.bounds()),
            Some(PixelRect::new(2, 3, 5, 2))
        );
        assert_eq!(base.changed_bounds(&base.clone(), base.bounds()), None);
    }
}
