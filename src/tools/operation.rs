use serde::{Deserialize, Serialize};

use super::raster::Rasterizer;
use super::transform::{crop_image, flip_image, rotate_image, scale_image};
use super::{
    BlendOperator, Color, FilterKind, FlipAxis, PixelRect, Point, ToolError, ToolKind, ToolResult,
};
use crate::selection::{clear_masked, SelectionMask, SelectionMode, SelectionShape};
use crate::surface::PixelSurface;

/// Outline and optional fill of a rectangle or ellipse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeStyle {
    pub outline: Color,
    #[serde(default)]
    pub fill: Option<Color>,
    pub thickness: u8,
    #[serde(default)]
    pub operator: BlendOperator,
}

/// A fully specified edit. Pointer strokes resolve to one of these, and
/// scripts are lists of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolOperation {
    Pencil {
        points: Vec<Point>,
        color: Color,
        thickness: u8,
        #[serde(default)]
        operator: BlendOperator,
    },
    Eraser {
        points: Vec<Point>,
        thickness: u8,
    },
    Highlighter {
        points: Vec<Point>,
        color: Color,
        thickness: u8,
    },
    Line {
        start: Point,
        end: Point,
        color: Color,
        thickness: u8,
        #[serde(default)]
        operator: BlendOperator,
    },
    Rectangle {
        start: Point,
        end: Point,
        style: ShapeStyle,
    },
    Ellipse {
        start: Point,
        end: Point,
        style: ShapeStyle,
    },
    Fill {
        at: Point,
        color: Color,
        #[serde(default)]
        tolerance: u8,
    },
    Select {
        shape: SelectionShape,
        #[serde(default)]
        mode: SelectionMode,
    },
    Filter {
        filter: FilterKind,
    },
    Scale {
        width: u32,
        height: u32,
    },
    Crop {
        rect: PixelRect,
    },
    Flip {
        axis: FlipAxis,
    },
    Rotate {
        quarter_turns: u8,
    },
    MoveSelection {
        dx: i32,
        dy: i32,
    },
    DeleteSelection,
}

impl ToolOperation {
    pub fn kind(&self) -> ToolKind {
        match self {
            Self::Pencil { .. } => ToolKind::Pencil,
            Self::Eraser { .. } => ToolKind::Eraser,
            Self::Highlighter { .. } => ToolKind::Highlighter,
            Self::Line { .. } => ToolKind::Line,
            Self::Rectangle { .. } => ToolKind::Rectangle,
            Self::Ellipse { .. } => ToolKind::Ellipse,
            Self::Fill { .. } => ToolKind::Fill,
            Self::Select { shape, .. } => match shape {
                SelectionShape::Rectangle { .. } | SelectionShape::Ellipse { .. } => {
                    ToolKind::RectSelect
                }
                SelectionShape::Polygon { .. } => ToolKind::FreeSelect,
                SelectionShape::Color { .. } => ToolKind::ColorSelect,
            },
            Self::Filter { .. } => ToolKind::Filters,
            Self::Scale { .. } => ToolKind::Scale,
            Self::Crop { .. } => ToolKind::Crop,
            Self::Flip { .. } => ToolKind::Flip,
            Self::Rotate { .. } => ToolKind::Rotate,
            Self::MoveSelection { .. } | Self::DeleteSelection => ToolKind::RectSelect,
        }
    }

    /// Label shown in the history list.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Select { .. } => "Selection",
            Self::Filter { filter } => filter.label(),
            Self::MoveSelection { .. } => "Move selection",
            Self::DeleteSelection => "Delete selection",
            _ => self.kind().label(),
        }
    }

    /// Whether the operation edits the selection rather than pixels.
    pub fn is_selection_edit(&self) -> bool {
        matches!(self, Self::Select { .. } | Self::MoveSelection { .. })
    }

    /// Whether the operation moves or resizes the whole canvas.
    pub fn is_canvas_transform(&self) -> bool {
        matches!(
            self,
            Self::Scale { .. } | Self::Crop { .. } | Self::Flip { .. } | Self::Rotate { .. }
        )
    }

    /// Applies the operation to `surface`. Painting and filters are weighted
    /// by `clip` when given; canvas transforms ignore it. Returns the area
    /// that may have changed. Selection edits never touch pixels here.
    pub fn apply(
        &self,
        surface: &mut PixelSurface,
        clip: Option<&SelectionMask>,
    ) -> ToolResult<Option<PixelRect>> {
        match self {
            Self::Pencil {
                points,
                color,
                thickness,
                operator,
            } => stroke(surface, clip, points, *color, *thickness, *operator),
            Self::Eraser { points, thickness } => stroke(
                surface,
                clip,
                points,
                Color::TRANSPARENT,
                *thickness,
                BlendOperator::Clear,
            ),
            Self::Highlighter {
                points,
                color,
                thickness,
            } => stroke(surface, clip, points, *color, *thickness, BlendOperator::Over),
            Self::Line {
                start,
                end,
                color,
                thickness,
                operator,
            } => {
                let mut raster = Rasterizer::new(surface, clip, *operator);
                raster.line(*start, *end, *thickness);
                raster.paint(*color);
                Ok(raster.finish())
            }
            Self::Rectangle { start, end, style } => {
                shape(surface, clip, *start, *end, style, |raster, rect, thickness| {
                    match thickness {
                        Some(thickness) => raster.rect_outline(rect, thickness),
                        None => raster.rect_fill(rect),
                    }
                })
            }
            Self::Ellipse { start, end, style } => {
                shape(surface, clip, *start, *end, style, |raster, rect, thickness| {
                    match thickness {
                        Some(thickness) => raster.ellipse_outline(rect, thickness),
                        None => raster.ellipse_fill(rect),
                    }
                })
            }
            Self::Fill {
                at,
                color,
                tolerance,
            } => {
                let region = surface
                    .contiguous_region(*at, *tolerance)
                    .ok_or(ToolError::OutOfCanvas { x: at.x, y: at.y })?;
                let mut raster = Rasterizer::new(surface, clip, BlendOperator::Source);
                raster.region(&region);
                raster.paint(*color);
                Ok(raster.finish())
            }
            Self::Filter { filter } => Ok(filter.apply(surface, clip)),
            Self::Scale { width, height } => {
                let scaled = scale_image(surface.as_image(), *width, *height)?;
                surface.replace_image(scaled)?;
                Ok(Some(surface.bounds()))
            }
            Self::Crop { rect } => {
                let cropped = crop_image(surface.as_image(), *rect)?;
                surface.replace_image(cropped)?;
                Ok(Some(surface.bounds()))
            }
            Self::Flip { axis } => {
                let mut flipped = surface.as_image().clone();
                flip_image(&mut flipped, *axis);
                surface.replace_image(flipped)?;
                Ok(Some(surface.bounds()))
            }
            Self::Rotate { quarter_turns } => {
                let rotated = rotate_image(surface.as_image(), *quarter_turns);
                surface.replace_image(rotated)?;
                Ok(Some(surface.bounds()))
            }
            Self::DeleteSelection => Ok(clip.and_then(|mask| clear_masked(surface, mask))),
            Self::Select { .. } | Self::MoveSelection { .. } => Ok(None),
        }
    }
}

fn stroke(
    surface: &mut PixelSurface,
    clip: Option<&SelectionMask>,
    points: &[Point],
    color: Color,
    thickness: u8,
    operator: BlendOperator,
) -> ToolResult<Option<PixelRect>> {
    if points.is_empty() {
        return Err(ToolError::EmptyStroke);
    }
    let mut raster = Rasterizer::new(surface, clip, operator);
    raster.polyline(points, thickness);
    raster.paint(color);
    Ok(raster.finish())
}

fn shape(
    surface: &mut PixelSurface,
    clip: Option<&SelectionMask>,
    start: Point,
    end: Point,
    style: &ShapeStyle,
    draw: impl Fn(&mut Rasterizer<'_>, PixelRect, Option<u8>),
) -> ToolResult<Option<PixelRect>> {
    if start == end {
        return Err(ToolError::DegenerateShape);
    }
    let rect = PixelRect::from_corners(start, end);
    let mut raster = Rasterizer::new(surface, clip, style.operator);
    if let Some(fill) = style.fill {
        draw(&mut raster, rect, None);
        raster.paint(fill);
    }
    draw(&mut raster, rect, Some(style.thickness));
    raster.paint(style.outline);
    Ok(raster.finish())
}
