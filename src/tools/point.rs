use super::{
    PixelSurface, Tool, ToolKind, ToolOperation, ToolOptions, ToolOutcome, ToolResult, ToolStroke,
};

/// Bucket fill at the released position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FillTool;

/// Reads the color under the released position into the main color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PickerTool;

impl Tool for FillTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Fill
    }

    fn outcome(
        &self,
        stroke: &ToolStroke,
        options: &ToolOptions,
        surface: &PixelSurface,
    ) -> ToolResult<ToolOutcome> {
        let (_, at) = stroke.endpoints()?;
        if surface.pixel(at.x, at.y).is_none() {
            return Ok(ToolOutcome::Nothing);
        }
        Ok(ToolOutcome::Apply(ToolOperation::Fill {
            at,
            color: options.main_color,
            tolerance: options.fill_tolerance,
        }))
    }
}

impl Tool for PickerTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Picker
    }

    fn outcome(
        &self,
        stroke: &ToolStroke,
        _options: &ToolOptions,
        surface: &PixelSurface,
    ) -> ToolResult<ToolOutcome> {
        let (_, at) = stroke.endpoints()?;
        Ok(surface
            .pixel(at.x, at.y)
            .map_or(ToolOutcome::Nothing, ToolOutcome::PickColor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Color, Point};

    #[test]
    fn picker_reads_pixel_under_release() {
        let mut surface = PixelSurface::new(4, 4, Color::WHITE).expect("surface");
        surface.put_pixel(2, 3, Color::rgb(1, 2, 3));
        let mut stroke = ToolStroke::begin(ToolKind::Picker, Point::new(0, 0));
        stroke.append(Point::new(2, 3));
        let outcome = PickerTool
            .outcome(&stroke, &ToolOptions::default(), &surface)
            .expect("outcome");
        assert_eq!(outcome, ToolOutcome::PickColor(Color::rgb(1, 2, 3)));
    }

    #[test]
    fn fill_outside_canvas_does_nothing() {
        let surface = PixelSurface::new(4, 4, Color::WHITE).expect("surface");
        let stroke = ToolStroke::begin(ToolKind::Fill, Point::new(-1, 2));
        let outcome = FillTool
            .outcome(&stroke, &ToolOptions::default(), &surface)
            .expect("outcome");
        assert_eq!(outcome, ToolOutcome::Nothing);
    }
}
