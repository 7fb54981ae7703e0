use super::{
    PixelSurface, Tool, ToolError, ToolKind, ToolOperation, ToolOptions, ToolOutcome, ToolResult,
    ToolStroke,
};

/// Pencil, eraser and highlighter: the stroke's samples become a polyline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreehandTool {
    kind: ToolKind,
}

impl FreehandTool {
    pub const fn new(kind: ToolKind) -> Self {
        Self { kind }
    }
}

impl Tool for FreehandTool {
    fn kind(&self) -> ToolKind {
        self.kind
    }

    fn outcome(
        &self,
        stroke: &ToolStroke,
        options: &ToolOptions,
        _surface: &PixelSurface,
    ) -> ToolResult<ToolOutcome> {
        let points = stroke.points();
        if points.is_empty() {
            return Err(ToolError::EmptyStroke);
        }
        let thickness = options.thickness;
        let operation = match self.kind {
            ToolKind::Eraser => ToolOperation::Eraser { points, thickness },
            ToolKind::Highlighter => ToolOperation::Highlighter {
                points,
                color: options.main_color.with_alpha(options.highlighter_alpha),
                thickness,
            },
            _ => ToolOperation::Pencil {
                points,
                color: options.main_color,
                thickness,
                operator: options.operator,
            },
        };
        Ok(ToolOutcome::Apply(operation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Color, Point};

    #[test]
    fn highlighter_uses_translucent_main_color() {
        let surface = PixelSurface::new(4, 4, Color::WHITE).expect("surface");
        let mut stroke = ToolStroke::begin(ToolKind::Highlighter, Point::new(0, 0));
        stroke.append(Point::new(3, 0));
        let options = ToolOptions {
            main_color: Color::rgb(255, 255, 0),
            ..ToolOptions::default()
        };
        let outcome = FreehandTool::new(ToolKind::Highlighter)
            .outcome(&stroke, &options, &surface)
            .expect("outcome");
        assert_eq!(
            outcome,
            ToolOutcome::Apply(ToolOperation::Highlighter {
                points: vec![Point::new(0, 0), Point::new(3, 0)],
                color: Color::rgba(255, 255, 0, options.highlighter_alpha),
                thickness: options.thickness,
            })
        );
    }

    #[test]
    fn eraser_ignores_colors() {
        let surface = PixelSurface::new(4, 4, Color::WHITE).expect("surface");
        let stroke = ToolStroke::begin(ToolKind::Eraser, Point::new(1, 1));
        let outcome = FreehandTool::new(ToolKind::Eraser)
            .outcome(&stroke, &ToolOptions::default(), &surface)
            .expect("outcome");
        assert!(matches!(
            outcome,
            ToolOutcome::Apply(ToolOperation::Eraser { .. })
        ));
    }
}
