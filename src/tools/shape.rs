use super::{
    PixelSurface, ShapeStyle, Tool, ToolKind, ToolOperation, ToolOptions, ToolOutcome, ToolResult,
    ToolStroke,
};

/// Line, rectangle and ellipse: only the first and last samples matter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeTool {
    kind: ToolKind,
}

impl ShapeTool {
    pub const fn new(kind: ToolKind) -> Self {
        Self { kind }
    }
}

impl Tool for ShapeTool {
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
        // A click without a drag draws nothing.
        if start == end {
            return Ok(ToolOutcome::Nothing);
        }
        let style = ShapeStyle {
            outline: options.main_color,
            fill: options.shape_filled.then_some(options.secondary_color),
            thickness: options.thickness,
            operator: options.operator,
        };
        let operation = match self.kind {
            ToolKind::Rectangle => ToolOperation::Rectangle { start, end, style },
            ToolKind::Ellipse => ToolOperation::Ellipse { start, end, style },
            _ => ToolOperation::Line {
                start,
                end,
                color: options.main_color,
                thickness: options.thickness,
                operator: options.operator,
            },
        };
        Ok(ToolOutcome::Apply(operation))
    }
}
