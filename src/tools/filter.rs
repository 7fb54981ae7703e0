use image::{imageops, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use super::{Color, PixelRect, Point};
use crate::selection::SelectionMask;
use crate::surface::{lerp, PixelSurface};

/// Whole-image or selection-scoped color filters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterKind {
    Grayscale,
    Invert,
    /// 0 removes all color, 100 keeps the image as is, above 100 boosts it.
    Saturation { percent: u16 },
    /// 0 keeps alpha, 100 makes the pixels fully transparent.
    Transparency { percent: u8 },
    Blur { sigma: f32 },
    Pixelate { block: u32 },
}

impl FilterKind {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Grayscale => "Grayscale",
            Self::Invert => "Invert colors",
            Self::Saturation { .. } => "Saturation",
            Self::Transparency { .. } => "Transparency",
            Self::Blur { .. } => "Blur",
            Self::Pixelate { .. } => "Pixelization",
        }
    }

    /// Filters the masked part of `surface`, or all of it without a mask.
    /// Returns the area that may have changed.
    pub fn apply(
        &self,
        surface: &mut PixelSurface,
        clip: Option<&SelectionMask>,
    ) -> Option<PixelRect> {
        let area = match clip {
            Some(mask) => mask.bounds()?,
            None => surface.bounds(),
        };
        let filtered = match *self {
            Self::Grayscale => map_pixels(surface, area, |color| saturate(color, 0)),
            Self::Invert => map_pixels(surface, area, |color| {
                Color::rgba(255 - color.r, 255 - color.g, 255 - color.b, color.a)
            }),
            Self::Saturation { percent } => {
                map_pixels(surface, area, |color| saturate(color, percent))
            }
            Self::Transparency { percent } => {
                let keep = 100 - u32::from(percent.min(100));
                map_pixels(surface, area, |color| {
                    color.with_alpha((u32::from(color.a) * keep / 100) as u8)
                })
            }
            Self::Blur { sigma } => {
                if !sigma.is_finite() || sigma <= 0.0 {
                    return None;
                }
                blur(surface, area, sigma)?
            }
            Self::Pixelate { block } => {
                if block <= 1 {
                    return None;
                }
                pixelate(surface, area, block)?
            }
        };
        write_back(surface, area, &filtered, clip);
        Some(area)
    }
}

fn map_pixels(surface: &PixelSurface, area: PixelRect, f: impl Fn(Color) -> Color) -> RgbaImage {
    let mut region = surface.region(area).unwrap_or_default();
    for pixel in region.pixels_mut() {
        *pixel = f(Color::from_rgba(*pixel)).to_rgba();
    }
    region
}

fn saturate(color: Color, percent: u16) -> Color {
    let luma = (299 * i32::from(color.r) + 587 * i32::from(color.g) + 114 * i32::from(color.b))
        / 1000;
    let factor = i32::from(percent);
    let channel = |value: u8| {
        let shifted = luma + (i32::from(value) - luma) * factor / 100;
        shifted.clamp(0, 255) as u8
    };
    Color::rgba(channel(color.r), channel(color.g), channel(color.b), color.a)
}

/// Blurs `area` with some surrounding context so edges of a selection do not
/// fade into transparent black.
fn blur(surface: &PixelSurface, area: PixelRect, sigma: f32) -> Option<RgbaImage> {
    let margin = (sigma * 3.0).ceil().min(256.0) as u32;
    let context = area.expand(margin).clamp_to(surface.extent())?;
    let source = surface.region(context)?;
    let blurred = imageops::blur(&source, sigma);
    let offset_x = (area.x - context.x) as u32;
    let offset_y = (area.y - context.y) as u32;
    Some(imageops::crop_imm(&blurred, offset_x, offset_y, area.width, area.height).to_image())
}

fn pixelate(surface: &PixelSurface, area: PixelRect, block: u32) -> Option<RgbaImage> {
    let mut region = surface.region(area)?;
    let (width, height) = region.dimensions();
    for top in (0..height).step_by(block as usize) {
        for left in (0..width).step_by(block as usize) {
            let right = (left + block).min(width);
            let bottom = (top + block).min(height);
            let mut sum = [0u64; 4];
            for y in top..bottom {
                for x in left..right {
                    for (total, channel) in sum.iter_mut().zip(region.get_pixel(x, y).0) {
                        *total += u64::from(channel);
                    }
                }
            }
            let count = u64::from((right - left) * (bottom - top));
            let average = Rgba(sum.map(|total| (total / count) as u8));
            for y in top..bottom {
                for x in left..right {
                    region.put_pixel(x, y, average);
                }
            }
        }
    }
    Some(region)
}

fn write_back(
    surface: &mut PixelSurface,
    area: PixelRect,
    filtered: &RgbaImage,
    clip: Option<&SelectionMask>,
) {
    let Some(mask) = clip else {
        surface.write_region(Point::new(area.x, area.y), filtered);
        return;
    };
    for (x, y, pixel) in filtered.enumerate_pixels() {
        let (sx, sy) = (area.x + x as i32, area.y + y as i32);
        let coverage = mask.coverage(sx, sy);
        if coverage == 0 {
            continue;
        }
        if let Some(current) = surface.pixel(sx, sy) {
            surface.put_pixel(sx, sy, lerp(current, Color::from_rgba(*pixel), coverage));
        }
    }
}
