use super::{
    PixelRect, PixelSurface, Tool, ToolKind, ToolOperation, ToolOptions, ToolOutcome, ToolResult,
    ToolStroke,
};
use crate::selection::SelectionShape;

/// Rectangle, free-hand and color selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectTool {
    kind: ToolKind,
}

impl SelectTool {
    pub const fn new(kind: ToolKind) -> Self {
        Self { kind }
    }
}

impl Tool for SelectTool {
    fn kind(&self) -> ToolKind {
        self.kind
    }

    fn outcome(
        &self,
        stroke: &ToolStroke,
        options: &ToolOptions,
        _surface: &PixelSurface,
    ) -> ToolResult<ToolOutcome> {
        let (start, end) = stroke.endpoints()?;
        let shape = match self.kind {
            ToolKind::FreeSelect => {
                let points = stroke.points();
                if points.len() < 3 {
                    return Ok(ToolOutcome::Nothing);
                }
                SelectionShape::Polygon { points }
            }
            ToolKind::ColorSelect => SelectionShape::Color {
                at: end,
                tolerance: options.fill_tolerance,
            },
            _ => {
                if start == end {
                    return Ok(ToolOutcome::Nothing);
                }
                SelectionShape::Rectangle {
                    rect: PixelRect::from_corners(start, end),
                }
            }
        };
        Ok(ToolOutcome::Apply(ToolOperation::Select {
            shape,
            mode: options.selection_mode,
        }))
    }
}
