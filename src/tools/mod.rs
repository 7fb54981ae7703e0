mod filter;
mod freehand;
mod operation;
mod point;
mod raster;
mod select;
mod shape;
mod stroke;
pub(crate) mod transform;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::geometry::{Color, PixelRect, Point};
pub use crate::surface::BlendOperator;
pub use filter::FilterKind;
pub use freehand::FreehandTool;
pub use operation::{ShapeStyle, ToolOperation};
pub use point::{FillTool, PickerTool};
pub use raster::Rasterizer;
pub use select::SelectTool;
pub use shape::ShapeTool;
pub use stroke::{StrokeSample, ToolStroke};
pub use transform::FlipAxis;

use crate::surface::{PixelSurface, SurfaceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Pencil,
    Eraser,
    Highlighter,
    Line,
    Rectangle,
    Ellipse,
    Fill,
    Picker,
    RectSelect,
    FreeSelect,
    ColorSelect,
    Filters,
    Scale,
    Crop,
    Flip,
    Rotate,
}

impl ToolKind {
    pub const ALL: [ToolKind; 16] = [
        Self::Pencil,
        Self::Eraser,
        Self::Highlighter,
        Self::Line,
        Self::Rectangle,
        Self::Ellipse,
        Self::Fill,
        Self::Picker,
        Self::RectSelect,
        Self::FreeSelect,
        Self::ColorSelect,
        Self::Filters,
        Self::Scale,
        Self::Crop,
        Self::Flip,
        Self::Rotate,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pencil => "Pencil",
            Self::Eraser => "Eraser",
            Self::Highlighter => "Highlighter",
            Self::Line => "Line",
            Self::Rectangle => "Rectangle",
            Self::Ellipse => "Oval",
            Self::Fill => "Paint",
            Self::Picker => "Color Picker",
            Self::RectSelect => "Rectangle selection",
            Self::FreeSelect => "Free selection",
            Self::ColorSelect => "Color selection",
            Self::Filters => "Filters",
            Self::Scale => "Scale",
            Self::Crop => "Crop",
            Self::Flip => "Flip",
            Self::Rotate => "Rotate",
        }
    }

    /// Whether pointer strokes drive this tool, as opposed to parameters.
    pub const fn is_pointer_driven(self) -> bool {
        !matches!(
            self,
            Self::Filters | Self::Scale | Self::Crop | Self::Flip | Self::Rotate
        )
    }

    /// Whether the tool works on a floating selection instead of settling it.
    pub const fn accepts_selection(self) -> bool {
        matches!(
            self,
            Self::RectSelect
                | Self::FreeSelect
                | Self::ColorSelect
                | Self::Filters
                | Self::Scale
                | Self::Flip
                | Self::Rotate
        )
    }

    pub const fn uses_color(self) -> bool {
        matches!(
            self,
            Self::Pencil
                | Self::Highlighter
                | Self::Line
                | Self::Rectangle
                | Self::Ellipse
                | Self::Fill
        )
    }

    pub const fn uses_operator(self) -> bool {
        matches!(
            self,
            Self::Pencil | Self::Line | Self::Rectangle | Self::Ellipse
        )
    }

    pub const fn is_selection(self) -> bool {
        matches!(self, Self::RectSelect | Self::FreeSelect | Self::ColorSelect)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolOptions {
    pub main_color: Color,
    pub secondary_color: Color,
    pub thickness: u8,
    pub operator: BlendOperator,
    pub shape_filled: bool,
    pub fill_tolerance: u8,
    pub highlighter_alpha: u8,
    pub selection_mode: crate::selection::SelectionMode,
}

impl Default for ToolOptions {
    fn default() -> Self {
        Self {
            main_color: Color::BLACK,
            secondary_color: Color::WHITE,
            thickness: 5,
            operator: BlendOperator::Over,
            shape_filled: false,
            fill_tolerance: 0,
            highlighter_alpha: 96,
            selection_mode: crate::selection::SelectionMode::Replace,
        }
    }
}

impl ToolOptions {
    pub fn set_main_color(&mut self, color: Color) {
        self.main_color = color;
    }

    pub fn set_secondary_color(&mut self, color: Color) {
        self.secondary_color = color;
    }

    pub fn exchange_colors(&mut self) {
        std::mem::swap(&mut self.main_color, &mut self.secondary_color);
    }

    pub fn set_thickness(&mut self, thickness: u8) {
        self.thickness = thickness.max(1);
    }

    pub fn set_operator(&mut self, operator: BlendOperator) {
        self.operator = operator;
    }

    pub fn set_shape_filled(&mut self, filled: bool) {
        self.shape_filled = filled;
    }

    pub fn set_fill_tolerance(&mut self, tolerance: u8) {
        self.fill_tolerance = tolerance;
    }

    pub fn set_highlighter_alpha(&mut self, alpha: u8) {
        self.highlighter_alpha = alpha.max(1);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("stroke has no samples")]
    EmptyStroke,
    #[error("shape has no area")]
    DegenerateShape,
    #[error("point {x},{y} is outside the canvas")]
    OutOfCanvas { x: i32, y: i32 },
    #[error("invalid scale target {width}x{height}")]
    InvalidScale { width: u32, height: u32 },
    #[error("crop rectangle has no area")]
    InvalidCrop,
    #[error("{0:?} is not driven by pointer strokes")]
    NotPointerDriven(ToolKind),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

pub type ToolResult<T> = std::result::Result<T, ToolError>;

/// What a finished stroke asks the session to do.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Apply(ToolOperation),
    PickColor(Color),
    Nothing,
}

/// Turns a pointer stroke into an outcome. One strategy per family of tools.
pub trait Tool: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> ToolKind;

    fn outcome(
        &self,
        stroke: &ToolStroke,
        options: &ToolOptions,
        surface: &PixelSurface,
    ) -> ToolResult<ToolOutcome>;
}

pub fn strategy_for(kind: ToolKind) -> ToolResult<Box<dyn Tool>> {
    let tool: Box<dyn Tool> = match kind {
        ToolKind::Pencil | ToolKind::Eraser | ToolKind::Highlighter => {
            Box::new(FreehandTool::new(kind))
        }
        ToolKind::Line | ToolKind::Rectangle | ToolKind::Ellipse => Box::new(ShapeTool::new(kind)),
        ToolKind::Fill => Box::new(FillTool),
        ToolKind::Picker => Box::new(PickerTool),
        ToolKind::RectSelect | ToolKind::FreeSelect | ToolKind::ColorSelect => {
            Box::new(SelectTool::new(kind))
        }
        ToolKind::Filters | ToolKind::Scale | ToolKind::Crop | ToolKind::Flip | ToolKind::Rotate => {
            return Err(ToolError::NotPointerDriven(kind));
        }
    };
    Ok(tool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_tools_have_strategies_and_others_do_not() {
        for kind in ToolKind::ALL {
            let strategy = strategy_for(kind);
            if kind.is_pointer_driven() {
                assert_eq!(strategy.expect("pointer tool").kind(), kind);
            } else {
                assert_eq!(strategy.unwrap_err(), ToolError::NotPointerDriven(kind));
            }
        }
    }

    #[test]
    fn paint_tools_use_color_and_selection_tools_accept_selection() {
        for kind in [ToolKind::Pencil, ToolKind::Line, ToolKind::Fill] {
            assert!(kind.uses_color(), "{kind:?} should use color");
            assert!(!kind.accepts_selection(), "{kind:?} should not keep selection");
        }
        for kind in [ToolKind::RectSelect, ToolKind::FreeSelect, ToolKind::ColorSelect] {
            assert!(kind.accepts_selection());
            assert!(kind.is_selection());
            assert!(!kind.uses_color());
        }
    }

    #[test]
    fn options_clamp_and_exchange_colors() {
        let mut options = ToolOptions::default();
        options.set_thickness(0);
        assert_eq!(options.thickness, 1);
        options.exchange_colors();
        assert_eq!(options.main_color, Color::WHITE);
        assert_eq!(options.secondary_color, Color::BLACK);
    }

    #[test]
    fn tool_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ToolKind::ColorSelect).expect("serialize");
        assert_eq!(json, "\"color_select\"");
    }
}
