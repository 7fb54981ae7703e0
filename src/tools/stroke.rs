use super::{PixelRect, Point, ToolError, ToolKind, ToolResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrokeSample {
    pub point: Point,
}

impl StrokeSample {
    pub const fn new(point: Point) -> Self {
        Self { point }
    }
}

/// Pointer samples collected between press and release for one tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStroke {
    tool: ToolKind,
    samples: Vec<StrokeSample>,
    finished: bool,
}

impl ToolStroke {
    pub fn begin(tool: ToolKind, start: Point) -> Self {
        Self {
            tool,
            samples: vec![StrokeSample::new(start)],
            finished: false,
        }
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    /// Adds a sample; repeats of the last sample are dropped. Returns whether
    /// the stroke grew.
    pub fn append(&mut self, point: Point) -> bool {
        if self.finished || self.last() == Some(point) {
            return false;
        }
        self.samples.push(StrokeSample::new(point));
        true
    }

    pub fn finish(&mut self) {
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn points(&self) -> Vec<Point> {
        self.samples.iter().map(|sample| sample.point).collect()
    }

    pub fn first(&self) -> Option<Point> {
        self.samples.first().map(|sample| sample.point)
    }

    pub fn last(&self) -> Option<Point> {
        self.samples.last().map(|sample| sample.point)
    }

    pub fn endpoints(&self) -> ToolResult<(Point, Point)> {
        match (self.first(), self.last()) {
            (Some(first), Some(last)) => Ok((first, last)),
            _ => Err(ToolError::EmptyStroke),
        }
    }

    pub fn bounds(&self) -> Option<PixelRect> {
        PixelRect::from_points(&self.points())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_collapses_duplicates_and_stops_after_finish() {
        let mut stroke = ToolStroke::begin(ToolKind::Pencil, Point::new(1, 1));
        assert!(!stroke.append(Point::new(1, 1)));
        assert!(stroke.append(Point::new(2, 3)));
        stroke.finish();
        assert!(!stroke.append(Point::new(5, 5)));
        assert_eq!(stroke.points(), vec![Point::new(1, 1), Point::new(2, 3)]);
        assert_eq!(stroke.bounds(), Some(PixelRect::new(1, 1, 2, 3)));
    }

    #[test]
    fn endpoints_report_first_and_last_sample() {
        let mut stroke = ToolStroke::begin(ToolKind::Line, Point::new(0, 0));
        stroke.append(Point::new(4, 0));
        stroke.append(Point::new(9, 2));
        assert_eq!(
            stroke.endpoints(),
            Ok((Point::new(0, 0), Point::new(9, 2)))
        );
    }
}
