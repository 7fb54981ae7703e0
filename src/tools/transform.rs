use image::{imageops, RgbaImage};
use serde::{Deserialize, Serialize};

use super::{PixelRect, ToolError, ToolResult};
use crate::surface::MAX_SURFACE_DIMENSION;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlipAxis {
    /// Mirror left to right.
    Horizontal,
    /// Mirror top to bottom.
    Vertical,
}

pub(crate) fn validate_scale(width: u32, height: u32) -> ToolResult<()> {
    if width == 0 || height == 0 || width > MAX_SURFACE_DIMENSION || height > MAX_SURFACE_DIMENSION
    {
        return Err(ToolError::InvalidScale { width, height });
    }
    Ok(())
}

pub(crate) fn scale_image(image: &RgbaImage, width: u32, height: u32) -> ToolResult<RgbaImage> {
    validate_scale(width, height)?;
    if image.dimensions() == (width, height) {
        return Ok(image.clone());
    }
    Ok(imageops::resize(
        image,
        width,
        height,
        imageops::FilterType::Triangle,
    ))
}

/// Cuts `rect` out of `image`. Parts of `rect` beyond the image become
/// transparent, so cropping can also enlarge the canvas.
pub(crate) fn crop_image(image: &RgbaImage, rect: PixelRect) -> ToolResult<RgbaImage> {
    if rect.is_empty() || rect.width > MAX_SURFACE_DIMENSION || rect.height > MAX_SURFACE_DIMENSION
    {
        return Err(ToolError::InvalidCrop);
    }
    let mut cropped = RgbaImage::new(rect.width, rect.height);
    imageops::replace(
        &mut cropped,
        image,
        -i64::from(rect.x),
        -i64::from(rect.y),
    );
    Ok(cropped)
}

pub(crate) fn flip_image(image: &mut RgbaImage, axis: FlipAxis) {
    match axis {
        FlipAxis::Horizontal => imageops::flip_horizontal_in_place(image),
        FlipAxis::Vertical => imageops::flip_vertical_in_place(image),
    }
}

/// Clockwise rotation by whole quarter turns.
pub(crate) fn rotate_image(image: &RgbaImage, quarter_turns: u8) -> RgbaImage {
    match quarter_turns % 4 {
        1 => imageops::rotate90(image),
        2 => imageops::rotate180(image),
        3 => imageops::rotate270(image),
        _ => image.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn marked() -> RgbaImage {
        let mut image = RgbaImage::from_pixel(4, 2, Rgba([255, 255, 255, 255]));
        image.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        image
    }

    #[test]
    fn crop_beyond_edges_pads_with_transparency() {
        let cropped = crop_image(&marked(), PixelRect::new(-1, -1, 6, 4)).expect("crop");
        assert_eq!(cropped.dimensions(), (6, 4));
        assert_eq!(cropped.get_pixel(0, 0)[3], 0);
        assert_eq!(cropped.get_pixel(1, 1), &Rgba([0, 0, 0, 255]));
        assert_eq!(cropped.get_pixel(5, 3)[3], 0);
    }

    #[test]
    fn crop_rejects_empty_rect() {
        assert_eq!(
            crop_image(&marked(), PixelRect::new(0, 0, 0, 3)),
            Err(ToolError::InvalidCrop)
        );
    }

    #[test]
    fn scale_rejects_zero_and_oversized_targets() {
        assert!(scale_image(&marked(), 0, 3).is_err());
        assert!(scale_image(&marked(), MAX_SURFACE_DIMENSION + 1, 3).is_err());
        assert_eq!(
            scale_image(&marked(), 8, 4).expect("scale").dimensions(),
            (8, 4)
        );
    }

    #[test]
    fn rotate_and_flip_move_the_marked_corner() {
        let rotated = rotate_image(&marked(), 1);
        assert_eq!(rotated.dimensions(), (2, 4));
        assert_eq!(rotated.get_pixel(1, 0), &Rgba([0, 0, 0, 255]));

        let mut flipped = marked();
        flip_image(&mut flipped, FlipAxis::Horizontal);
        assert_eq!(flipped.get_pixel(3, 0), &Rgba([0, 0, 0, 255]));
    }
}
