use image::{GrayImage, Luma};

use super::{BlendOperator, Color, PixelRect, Point};
use crate::selection::SelectionMask;
use crate::surface::PixelSurface;

const MARKED: Luma<u8> = Luma([255]);

/// Collects the pixels covered by one or more primitives, then paints them in
/// a single pass so overlapping stamps of a translucent color blend once.
/// Writes are weighted by the selection mask when one is given.
#[derive(Debug)]
pub struct Rasterizer<'a> {
    surface: &'a mut PixelSurface,
    clip: Option<&'a SelectionMask>,
    operator: BlendOperator,
    footprint: GrayImage,
    pending: Option<(i32, i32, i32, i32)>,
    dirty: Option<PixelRect>,
}

impl<'a> Rasterizer<'a> {
    pub fn new(
        surface: &'a mut PixelSurface,
        clip: Option<&'a SelectionMask>,
        operator: BlendOperator,
    ) -> Self {
        let footprint = GrayImage::new(surface.width(), surface.height());
        Self {
            surface,
            clip,
            operator,
            footprint,
            pending: None,
            dirty: None,
        }
    }

    fn mark(&mut self, x: i32, y: i32) {
        let (Ok(ux), Ok(uy)) = (u32::try_from(x), u32::try_from(y)) else {
            return;
        };
        if ux >= self.footprint.width() || uy >= self.footprint.height() {
            return;
        }
        self.footprint.put_pixel(ux, uy, MARKED);
        self.pending = Some(match self.pending {
            Some((min_x, min_y, max_x, max_y)) => {
                (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
            }
            None => (x, y, x, y),
        });
    }

    /// Round brush of diameter `thickness` centered on `center`.
    pub fn stamp(&mut self, center: Point, thickness: u8) {
        let radius = i32::from(thickness.max(1)) / 2;
        if radius == 0 {
            self.mark(center.x, center.y);
            return;
        }
        let limit = radius * radius + radius;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= limit {
                    self.mark(center.x.saturating_add(dx), center.y.saturating_add(dy));
                }
            }
        }
    }

    /// Bresenham line with a brush stamped at every step. Only the part of the
    /// segment a stamp could reach on the surface is walked.
    pub fn line(&mut self, start: Point, end: Point, thickness: u8) {
        let radius = i32::from(thickness.max(1)) / 2;
        let Some((start, end)) = self.clip_segment(start, end, radius + 1) else {
            return;
        };
        let (mut x, mut y) = (i64::from(start.x), i64::from(start.y));
        let (end_x, end_y) = (i64::from(end.x), i64::from(end.y));
        let dx = (end_x - x).abs();
        let dy = -(end_y - y).abs();
        let step_x = if x < end_x { 1 } else { -1 };
        let step_y = if y < end_y { 1 } else { -1 };
        let mut error = dx + dy;
        loop {
            self.stamp(Point::new(x as i32, y as i32), thickness);
            if x == end_x && y == end_y {
                break;
            }
            let doubled = 2 * error;
            if doubled >= dy {
                error += dy;
                x += step_x;
            }
            if doubled <= dx {
                error += dx;
                y += step_y;
            }
        }
    }

    /// Liang-Barsky clip of a segment against the surface grown by `margin`.
    /// Endpoints already inside are kept exactly.
    fn clip_segment(&self, start: Point, end: Point, margin: i32) -> Option<(Point, Point)> {
        let low = -f64::from(margin);
        let right = f64::from(self.footprint.width()) - 1.0 + f64::from(margin);
        let bottom = f64::from(self.footprint.height()) - 1.0 + f64::from(margin);
        let (x0, y0) = (f64::from(start.x), f64::from(start.y));
        let (dx, dy) = (f64::from(end.x) - x0, f64::from(end.y) - y0);
        let (mut enter, mut leave) = (0.0_f64, 1.0_f64);
        for (p, q) in [(-dx, x0 - low), (dx, right - x0), (-dy, y0 - low), (dy, bottom - y0)] {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let t = q / p;
            if p < 0.0 {
                enter = enter.max(t);
            } else {
                leave = leave.min(t);
            }
            if enter > leave {
                return None;
            }
        }
        let at = |t: f64| Point::new((x0 + t * dx).round() as i32, (y0 + t * dy).round() as i32);
        let clipped_start = if enter > 0.0 { at(enter) } else { start };
        let clipped_end = if leave < 1.0 { at(leave) } else { end };
        Some((clipped_start, clipped_end))
    }

    pub fn polyline(&mut self, points: &[Point], thickness: u8) {
        match points {
            [] => {}
            [single] => self.stamp(*single, thickness),
            _ => {
                for pair in points.windows(2) {
                    self.line(pair[0], pair[1], thickness);
                }
            }
        }
    }

    pub fn rect_outline(&mut self, rect: PixelRect, thickness: u8) {
        if rect.is_empty() {
            return;
        }
        let right = (rect.right() - 1) as i32;
        let bottom = (rect.bottom() - 1) as i32;
        let corners = [
            Point::new(rect.x, rect.y),
            Point::new(right, rect.y),
            Point::new(right, bottom),
            Point::new(rect.x, bottom),
            Point::new(rect.x, rect.y),
        ];
        self.polyline(&corners, thickness);
    }

    pub fn rect_fill(&mut self, rect: PixelRect) {
        let Some(visible) = rect.clamp_to(self.surface.extent()) else {
            return;
        };
        for y in visible.y..visible.y + visible.height as i32 {
            for x in visible.x..visible.x + visible.width as i32 {
                self.mark(x, y);
            }
        }
    }

    pub fn ellipse_fill(&mut self, rect: PixelRect) {
        self.ellipse_band(rect, None);
    }

    /// Ring of width `thickness` just inside the ellipse inscribed in `rect`.
    pub fn ellipse_outline(&mut self, rect: PixelRect, thickness: u8) {
        self.ellipse_band(rect, Some(f64::from(thickness.max(1))));
    }

    fn ellipse_band(&mut self, rect: PixelRect, thickness: Option<f64>) {
        let Some(visible) = rect.clamp_to(self.surface.extent()) else {
            return;
        };
        let rx = f64::from(rect.width) / 2.0;
        let ry = f64::from(rect.height) / 2.0;
        let cx = f64::from(rect.x) + rx;
        let cy = f64::from(rect.y) + ry;
        let inner = thickness
            .map(|t| (rx - t, ry - t))
            .filter(|(irx, iry)| *irx > 0.0 && *iry > 0.0);
        for y in visible.y..visible.y + visible.height as i32 {
            for x in visible.x..visible.x + visible.width as i32 {
                let px = f64::from(x) + 0.5 - cx;
                let py = f64::from(y) + 0.5 - cy;
                if (px / rx).powi(2) + (py / ry).powi(2) > 1.0 {
                    continue;
                }
                let in_hole = inner
                    .map(|(irx, iry)| (px / irx).powi(2) + (py / iry).powi(2) < 1.0)
                    .unwrap_or(false);
                if !in_hole {
                    self.mark(x, y);
                }
            }
        }
    }

    /// Marks every pixel set in a coverage image of the surface's extent.
    pub fn region(&mut self, coverage: &GrayImage) {
        for (x, y, pixel) in coverage.enumerate_pixels() {
            if pixel[0] > 0 {
                self.mark(x as i32, y as i32);
            }
        }
    }

    /// Paints everything marked since the last call with `color`.
    pub fn paint(&mut self, color: Color) {
        let Some((min_x, min_y, max_x, max_y)) = self.pending.take() else {
            return;
        };
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let (ux, uy) = (x as u32, y as u32);
                if self.footprint.get_pixel(ux, uy)[0] == 0 {
                    continue;
                }
                self.footprint.put_pixel(ux, uy, Luma([0]));
                let coverage = self.clip.map_or(255, |mask| mask.coverage(x, y));
                self.surface
                    .blend_pixel(x, y, color, self.operator, coverage);
            }
        }
        let painted = PixelRect::from_corners(Point::new(min_x, min_y), Point::new(max_x, max_y));
        self.dirty = Some(self.dirty.map_or(painted, |dirty| dirty.union(&painted)));
    }

    /// Rectangle that may have changed, if anything was painted.
    pub fn finish(self) -> Option<PixelRect> {
        self.dirty
    }
}
