//! Bounded undo/redo history of committed surface edits.

mod patch;

use std::collections::VecDeque;

use crate::surface::{PixelSurface, SurfaceResult};
use crate::tools::ToolKind;

pub use patch::Patch;

const DEFAULT_MAX_ENTRIES: usize = 100;
const DEFAULT_MEMORY_BUDGET_BYTES: usize = 256 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLimits {
    pub max_entries: usize,
    pub memory_budget_bytes: usize,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            memory_budget_bytes: DEFAULT_MEMORY_BUDGET_BYTES,
        }
    }
}

impl HistoryLimits {
    pub fn new(max_entries: usize, memory_budget_bytes: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            memory_budget_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: u64,
    pub tool: ToolKind,
    pub label: String,
    pub patch: Patch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HistoryDirection {
    Undo,
    Redo,
}

impl HistoryDirection {
    pub(crate) const fn applied_message(self) -> &'static str {
        match self {
            Self::Undo => "undo applied",
            Self::Redo => "redo applied",
        }
    }

    pub(crate) const fn empty_message(self) -> &'static str {
        match self {
            Self::Undo => "undo stack empty",
            Self::Redo => "redo stack empty",
        }
    }
}

/// Where the last save sits relative to the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SavePoint {
    /// Top undo entry id at save time, `None` for an empty undo stack.
    At(Option<u64>),
    /// The saved state can no longer be reached by undo or redo.
    Lost,
}

#[derive(Debug)]
pub struct UndoStack {
    undo: VecDeque<HistoryEntry>,
    redo: Vec<HistoryEntry>,
    limits: HistoryLimits,
    byte_size: usize,
    next_id: u64,
    save_point: SavePoint,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(HistoryLimits::default())
    }
}

impl UndoStack {
    pub fn new(limits: HistoryLimits) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limits,
            byte_size: 0,
            next_id: 1,
            save_point: SavePoint::At(None),
        }
    }

    pub fn limits(&self) -> HistoryLimits {
        self.limits
    }

    /// Records a committed edit. Clears the redo stack, then evicts the
    /// oldest entries until the limits hold again; the new entry always stays.
    pub fn push(&mut self, tool: ToolKind, label: impl Into<String>, patch: Patch) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);

        if self.redo_holds_save_point() {
            self.save_point = SavePoint::Lost;
        }
        for entry in self.redo.drain(..) {
            self.byte_size -= entry.patch.byte_size();
        }

        self.byte_size += patch.byte_size();
        self.undo.push_back(HistoryEntry {
            id,
            tool,
            label: label.into(),
            patch,
        });
        self.enforce_limits();
        id
    }

    fn redo_holds_save_point(&self) -> bool {
        match self.save_point {
            SavePoint::At(Some(saved)) => self.redo.iter().any(|entry| entry.id == saved),
            SavePoint::At(None) | SavePoint::Lost => false,
        }
    }

    fn enforce_limits(&mut self) {
        while self.undo.len() > 1
            && (self.undo.len() > self.limits.max_entries
                || self.byte_size > self.limits.memory_budget_bytes)
        {
            let Some(evicted) = self.undo.pop_front() else {
                break;
            };
            self.byte_size -= evicted.patch.byte_size();
            // The state after the evicted entry becomes the new base.
            self.save_point = match self.save_point {
                SavePoint::At(None) => SavePoint::Lost,
                SavePoint::At(Some(saved)) if saved == evicted.id => SavePoint::At(None),
                other => other,
            };
            tracing::debug!(
                id = evicted.id,
                label = %evicted.label,
                remaining = self.undo.len(),
                bytes = self.byte_size,
                "evicted oldest history entry"
            );
        }
    }

    /// Reverts the newest entry on `surface`. Returns the entry label, or
    /// `None` when there is nothing to undo.
    pub fn undo(&mut self, surface: &mut PixelSurface) -> SurfaceResult<Option<&str>> {
        self.step(HistoryDirection::Undo, surface)
    }

    pub fn redo(&mut self, surface: &mut PixelSurface) -> SurfaceResult<Option<&str>> {
        self.step(HistoryDirection::Redo, surface)
    }

    fn step(
        &mut self,
        direction: HistoryDirection,
        surface: &mut PixelSurface,
    ) -> SurfaceResult<Option<&str>> {
        let entry = match direction {
            HistoryDirection::Undo => self.undo.pop_back(),
            HistoryDirection::Redo => self.redo.pop(),
        };
        let Some(entry) = entry else {
            tracing::debug!("{}", direction.empty_message());
            return Ok(None);
        };

        let applied = match direction {
            HistoryDirection::Undo => entry.patch.revert(surface),
            HistoryDirection::Redo => entry.patch.reapply(surface),
        };
        if let Err(err) = applied {
            match direction {
                HistoryDirection::Undo => self.undo.push_back(entry),
                HistoryDirection::Redo => self.redo.push(entry),
            }
            return Err(err);
        }

        tracing::debug!(id = entry.id, label = %entry.label, "{}", direction.applied_message());
        let label = match direction {
            HistoryDirection::Undo => {
                self.redo.push(entry);
                self.redo.last()
            }
            HistoryDirection::Redo => {
                self.undo.push_back(entry);
                self.undo.back()
            }
        };
        Ok(label.map(|entry| entry.label.as_str()))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn len(&self) -> usize {
        self.undo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }

    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    /// Labels of undoable entries, oldest first.
    pub fn labels(&self) -> Vec<&str> {
        self.undo.iter().map(|entry| entry.label.as_str()).collect()
    }

    pub fn clear(&mut self) {
        self.save_point = if self.is_modified() {
            SavePoint::Lost
        } else {
            SavePoint::At(None)
        };
        self.undo.clear();
        self.redo.clear();
        self.byte_size = 0;
    }

    pub fn mark_saved(&mut self) {
        self.save_point = SavePoint::At(self.undo.back().map(|entry| entry.id));
    }

    pub fn is_modified(&self) -> bool {
        match self.save_point {
            SavePoint::At(saved) => saved != self.undo.back().map(|entry| entry.id),
            SavePoint::Lost => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Color;

    fn surface() -> PixelSurface {
        PixelSurface::new(16, 16, Color::WHITE).expect("surface")
    }

    fn paint(surface: &mut PixelSurface, x: i32, color: Color) -> Patch {
        let before = surface.clone();
        surface.put_pixel(x, 0, color);
        Patch::capture(&before, surface, surface.bounds()).expect("pixel changed")
    }

    #[test]
    fn undo_then_redo_restores_pixels_exactly() {
        let mut stack = UndoStack::default();
        let mut canvas = surface();
        let original = canvas.clone();
        let patch = paint(&mut canvas, 3, Color::BLACK);
        let edited = canvas.clone();
        stack.push(ToolKind::Pencil, "Pencil", patch);

        assert_eq!(stack.undo(&mut canvas).expect("undo"), Some("Pencil"));
        assert_eq!(canvas, original);
        assert!(stack.can_redo());

        assert_eq!(stack.redo(&mut canvas).expect("redo"), Some("Pencil"));
        assert_eq!(canvas, edited);
        assert!(!stack.can_redo());
    }

    #[test]
    fn empty_stacks_report_nothing_to_do() {
        let mut stack = UndoStack::default();
        let mut canvas = surface();
        assert_eq!(stack.undo(&mut canvas).expect("undo"), None);
        assert_eq!(stack.redo(&mut canvas).expect("redo"), None);
    }

    #[test]
    fn push_clears_redo_stack() {
        let mut stack = UndoStack::default();
        let mut canvas = surface();
        let first = paint(&mut canvas, 1, Color::BLACK);
        stack.push(ToolKind::Pencil, "first", first);
        stack.undo(&mut canvas).expect("undo");

        let second = paint(&mut canvas, 2, Color::BLACK);
        stack.push(ToolKind::Pencil, "second", second);
        assert!(!stack.can_redo());
        assert_eq!(stack.labels(), vec!["second"]);
        assert_eq!(stack.byte_size(), 8);
    }

    #[test]
    fn entry_limit_evicts_oldest_first() {
        let mut stack = UndoStack::new(HistoryLimits::new(2, usize::MAX));
        let mut canvas = surface();
        for (x, label) in ["a", "b", "c"].into_iter().enumerate() {
            let patch = paint(&mut canvas, x as i32, Color::BLACK);
            stack.push(ToolKind::Pencil, label, patch);
        }
        assert_eq!(stack.labels(), vec!["b", "c"]);
    }

    #[test]
    fn memory_budget_is_respected_but_newest_entry_survives() {
        let mut stack = UndoStack::new(HistoryLimits::new(100, 20));
        let mut canvas = surface();
        for x in 0..4 {
            let patch = paint(&mut canvas, x, Color::BLACK);
            stack.push(ToolKind::Pencil, format!("dot {x}"), patch);
            assert!(stack.byte_size() <= 20);
        }
        assert_eq!(stack.len(), 2);

        let mut tiny = UndoStack::new(HistoryLimits::new(100, 4));
        let patch = paint(&mut canvas, 9, Color::rgb(1, 2, 3));
        tiny.push(ToolKind::Pencil, "oversized", patch);
        assert_eq!(tiny.len(), 1);
        assert!(tiny.byte_size() > 4);
    }

    #[test]
    fn modified_flag_tracks_save_point() {
        let mut stack = UndoStack::default();
        let mut canvas = surface();
        assert!(!stack.is_modified());

        let patch = paint(&mut canvas, 1, Color::BLACK);
        stack.push(ToolKind::Pencil, "one", patch);
        assert!(stack.is_modified());

        stack.mark_saved();
        assert!(!stack.is_modified());

        stack.undo(&mut canvas).expect("undo");
        assert!(stack.is_modified());
        stack.redo(&mut canvas).expect("redo");
        assert!(!stack.is_modified());

        stack.undo(&mut canvas).expect("undo");
        let patch = paint(&mut canvas, 2, Color::BLACK);
        stack.push(ToolKind::Pencil, "two", patch);
        stack.undo(&mut canvas).expect("undo");
        assert!(stack.is_modified(), "saved state was discarded with the redo stack");
    }

    #[test]
    fn evicting_saved_state_marks_history_modified() {
        let mut stack = UndoStack::new(HistoryLimits::new(1, usize::MAX));
        let mut canvas = surface();
        stack.mark_saved();
        let patch = paint(&mut canvas, 1, Color::BLACK);
        stack.push(ToolKind::Pencil, "one", patch);
        let patch = paint(&mut canvas, 2, Color::BLACK);
        stack.push(ToolKind::Pencil, "two", patch);
        stack.undo(&mut canvas).expect("undo");
        assert!(stack.is_empty());
        assert!(stack.is_modified());
    }
}
