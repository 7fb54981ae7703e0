use image::RgbaImage;

use crate::geometry::{PixelRect, Point};
use crate::surface::{PixelSurface, SurfaceResult};

/// Pixels needed to move a surface one step backward or forward in history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch {
    /// Only the changed rectangle; the surface extent is unchanged.
    Region {
        rect: PixelRect,
        before: RgbaImage,
        after: RgbaImage,
    },
    /// Whole buffers, for edits that change the surface extent.
    Canvas { before: RgbaImage, after: RgbaImage },
}

impl Patch {
    /// Diffs two states of a surface. `dirty` bounds the search for changed
    /// pixels; `None` when nothing changed.
    pub fn capture(
        before: &PixelSurface,
        after: &PixelSurface,
        dirty: PixelRect,
    ) -> Option<Self> {
        if before.extent() != after.extent() {
            return Some(Self::Canvas {
                before: before.as_image().clone(),
                after: after.as_image().clone(),
            });
        }
        let rect = before.changed_bounds(after, dirty)?;
        Some(Self::Region {
            rect,
            before: before.region(rect)?,
            after: after.region(rect)?,
        })
    }

    pub fn byte_size(&self) -> usize {
        match self {
            Self::Region { before, after, .. } | Self::Canvas { before, after } => {
                before.as_raw().len() + after.as_raw().len()
            }
        }
    }

    pub fn revert(&self, surface: &mut PixelSurface) -> SurfaceResult<()> {
        match self {
            Self::Region { rect, before, .. } => {
                surface.write_region(Point::new(rect.x, rect.y), before);
                Ok(())
            }
            Self::Canvas { before, .. } => surface.replace_image(before.clone()),
        }
    }

    pub fn reapply(&self, surface: &mut PixelSurface) -> SurfaceResult<()> {
        match self {
            Self::Region { rect, after, .. } => {
                surface.write_region(Point::new(rect.x, rect.y), after);
                Ok(())
            }
            Self::Canvas { after, .. } => surface.replace_image(after.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Color;

    #[test]
    fn capture_keeps_only_changed_pixels() {
        let before = PixelSurface::new(32, 32, Color::WHITE).expect("surface");
        let mut after = before.clone();
        after.put_pixel(10, 12, Color::BLACK);

        let patch = Patch::capture(&before, &after, before.bounds()).expect("patch");
        match &patch {
            Patch::Region { rect, .. } => assert_eq!(*rect, PixelRect::new(10, 12, 1, 1)),
            Patch::Canvas { .. } => panic!("extent did not change"),
        }
        assert_eq!(patch.byte_size(), 8);
    }

    #[test]
    fn capture_without_changes_is_none() {
        let surface = PixelSurface::new(8, 8, Color::WHITE).expect("surface");
        assert!(Patch::capture(&surface, &surface.clone(), surface.bounds()).is_none());
    }

    #[test]
    fn canvas_patch_restores_extent_both_ways() {
        let before = PixelSurface::new(8, 8, Color::WHITE).expect("surface");
        let after = PixelSurface::new(4, 2, Color::BLACK).expect("surface");
        let patch = Patch::capture(&before, &after, before.bounds()).expect("patch");

        let mut surface = after.clone();
        patch.revert(&mut surface).expect("revert");
        assert_eq!(surface, before);
        patch.reapply(&mut surface).expect("reapply");
        assert_eq!(surface, after);
    }
}
