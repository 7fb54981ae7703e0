use image::{GrayImage, Luma};

use super::PixelSurface;
use crate::geometry::{Color, Point};

pub(crate) const REGION_IN: Luma<u8> = Luma([255]);

impl PixelSurface {
    /// Mask of the 4-connected region around `seed` whose pixels are within
    /// `tolerance` of the seed color. `None` when the seed is off-surface.
    pub fn contiguous_region(&self, seed: Point, tolerance: u8) -> Option<GrayImage> {
        let target = self.pixel(seed.x, seed.y)?;
        let width = self.width();
        let height = self.height();
        let mut region = GrayImage::new(width, height);
        let matches = |x: u32, y: u32, region: &GrayImage| {
            region.get_pixel(x, y)[0] == 0
                && Color::from_rgba(*self.as_image().get_pixel(x, y)).distance(target) <= tolerance
        };

        let mut stack = vec![(seed.x as u32, seed.y as u32)];
        while let Some((x, y)) = stack.pop() {
            if !matches(x, y, &region) {
                continue;
            }
            let mut left = x;
            while left > 0 && matches(left - 1, y, &region) {
                left -= 1;
            }
            let mut right = x;
            while right + 1 < width && matches(right + 1, y, &region) {
                right += 1;
            }
            for span_x in left..=right {
                region.put_pixel(span_x, y, REGION_IN);
            }
            for neighbor_y in [y.checked_sub(1), (y + 1 < height).then_some(y + 1)]
                .into_iter()
                .flatten()
            {
                for span_x in left..=right {
                    if matches(span_x, neighbor_y, &region) {
                        stack.push((span_x, neighbor_y));
                    }
                }
            }
        }
        Some(region)
    }
}
