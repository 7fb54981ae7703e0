//! The edit session: one stable surface plus everything needed to change it.
//!
//! Pointer strokes draw into a preview copy; only a finished stroke or an
//! explicit operation writes the stable surface, and every such write is
//! recorded in the undo history as a single entry.

use std::borrow::Cow;

use thiserror::Error;

use crate::config::Settings;
use crate::geometry::{Color, Point};
use crate::history::{HistoryLimits, Patch, UndoStack};
use crate::selection::{SelectionMode, SelectionRegion, SelectionShape};
use crate::state::{SessionEvent, SessionState, StateError, StateMachine};
use crate::surface::{PixelSurface, SurfaceError};
use crate::tools::{
    strategy_for, PixelRect, Tool, ToolError, ToolKind, ToolOperation, ToolOptions, ToolOutcome,
    ToolStroke,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error("tool {0:?} is disabled")]
    ToolDisabled(ToolKind),
    #[error("nothing is selected")]
    NoSelection,
    #[error("a stroke is in progress")]
    StrokeInProgress,
    #[error("operation {index} failed")]
    Script {
        index: usize,
        #[source]
        source: Box<SessionError>,
    },
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

#[derive(Debug)]
pub struct EditSession {
    surface: PixelSurface,
    preview: Option<PixelSurface>,
    history: UndoStack,
    selection: SelectionRegion,
    tool: ToolKind,
    strategy: Option<Box<dyn Tool>>,
    options: ToolOptions,
    stroke: Option<ToolStroke>,
    drag_anchor: Option<Point>,
    machine: StateMachine,
    disabled_tools: Vec<ToolKind>,
}

impl EditSession {
    pub fn new(
        width: u32,
        height: u32,
        background: Color,
        limits: HistoryLimits,
    ) -> SessionResult<Self> {
        let surface = PixelSurface::new(width, height, background)?;
        Ok(Self::from_surface(surface, limits))
    }

    pub fn from_surface(surface: PixelSurface, limits: HistoryLimits) -> Self {
        let tool = ToolKind::Pencil;
        Self {
            surface,
            preview: None,
            history: UndoStack::new(limits),
            selection: SelectionRegion::new(),
            tool,
            strategy: strategy_for(tool).ok(),
            options: ToolOptions::default(),
            stroke: None,
            drag_anchor: None,
            machine: StateMachine::new(),
            disabled_tools: Vec::new(),
        }
    }

    /// Blank canvas sized and colored from the settings, with their history
    /// limits and disabled tools.
    pub fn from_settings(settings: &Settings) -> SessionResult<Self> {
        let mut session = Self::new(
            settings.default_width,
            settings.default_height,
            settings.default_rgba,
            settings.history_limits(),
        )?;
        session.set_disabled_tools(settings.disabled_tools.clone())?;
        Ok(session)
    }

    /// Replaces the disabled tool list. When the active tool becomes
    /// disabled, the first enabled pointer tool takes over.
    pub fn set_disabled_tools(&mut self, disabled: Vec<ToolKind>) -> SessionResult<()> {
        self.disabled_tools = disabled;
        if !self.is_tool_disabled(self.tool) {
            return Ok(());
        }
        let fallback = ToolKind::ALL
            .into_iter()
            .find(|kind| kind.is_pointer_driven() && !self.is_tool_disabled(*kind));
        match fallback {
            Some(kind) => self.select_tool(kind),
            None => {
                tracing::warn!(tool = ?self.tool, "every pointer tool is disabled");
                Ok(())
            }
        }
    }

    pub fn is_tool_disabled(&self, kind: ToolKind) -> bool {
        self.disabled_tools.contains(&kind)
    }

    /// Committed pixels.
    pub fn surface(&self) -> &PixelSurface {
        &self.surface
    }

    /// What the user sees: the stroke preview, or the committed pixels with
    /// the floating selection placed on top.
    pub fn rendered(&self) -> Cow<'_, PixelSurface> {
        if let Some(preview) = &self.preview {
            return Cow::Borrowed(preview);
        }
        if self.selection.is_floating() {
            let mut rendered = self.surface.clone();
            self.selection.render_floating(&mut rendered);
            return Cow::Owned(rendered);
        }
        Cow::Borrowed(&self.surface)
    }

    pub fn state(&self) -> SessionState {
        self.machine.state()
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn selection(&self) -> &SelectionRegion {
        &self.selection
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    pub fn options(&self) -> &ToolOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut ToolOptions {
        &mut self.options
    }

    /// Switches the active tool. An ongoing stroke is cancelled, and a
    /// floating selection is applied first when the new tool cannot work on it.
    pub fn select_tool(&mut self, kind: ToolKind) -> SessionResult<()> {
        self.ensure_enabled(kind)?;
        if self.state() == SessionState::Stroking {
            self.cancel()?;
        }
        if self.selection.is_floating() && !kind.accepts_selection() {
            self.apply_selection()?;
        }
        self.tool = kind;
        self.strategy = strategy_for(kind).ok();
        tracing::debug!(tool = ?kind, "selected tool");
        Ok(())
    }

    pub fn pointer_press(&mut self, point: Point) -> SessionResult<()> {
        self.ensure_enabled(self.tool)?;
        if self.tool.is_selection() && self.press_on_selection(point)? {
            self.drag_anchor = Some(point);
            return Ok(());
        }
        if self.strategy.is_none() {
            return Err(ToolError::NotPointerDriven(self.tool).into());
        }
        self.machine.transition(SessionEvent::BeginStroke)?;
        self.stroke = Some(ToolStroke::begin(self.tool, point));
        self.rebuild_preview();
        Ok(())
    }

    /// Decides whether a press with a selection tool grabs the selection.
    /// A press outside a floating selection applies it.
    fn press_on_selection(&mut self, point: Point) -> SessionResult<bool> {
        if let Some(floating) = self.selection.floating() {
            if floating.footprint().contains(point) {
                return Ok(true);
            }
            self.apply_selection()?;
            return Ok(false);
        }
        let grabbed = self.state() == SessionState::Idle
            && self.options.selection_mode == SelectionMode::Replace
            && self
                .selection
                .mask()
                .is_some_and(|mask| mask.coverage(point.x, point.y) > 0);
        if grabbed {
            self.lift_selection()?;
        }
        Ok(grabbed)
    }

    /// Returns whether the pointer moved anything.
    pub fn pointer_motion(&mut self, point: Point) -> SessionResult<bool> {
        if let Some(anchor) = self.drag_anchor {
            self.drag_floating(anchor, point);
            return Ok(anchor != point);
        }
        let Some(stroke) = self.stroke.as_mut() else {
            return Ok(false);
        };
        let grew = stroke.append(point);
        if grew {
            self.rebuild_preview();
        }
        Ok(grew)
    }

    pub fn pointer_release(&mut self, point: Point) -> SessionResult<ToolOutcome> {
        if let Some(anchor) = self.drag_anchor.take() {
            self.drag_floating(anchor, point);
            return Ok(ToolOutcome::Nothing);
        }
        if self.state() != SessionState::Stroking {
            self.machine.transition(SessionEvent::EndStroke)?;
        }
        let (Some(mut stroke), Some(strategy)) = (self.stroke.take(), self.strategy.as_ref()) else {
            return Err(ToolError::EmptyStroke.into());
        };
        stroke.append(point);
        stroke.finish();
        let outcome = strategy.outcome(&stroke, &self.options, &self.surface);
        self.preview = None;
        let outcome = match outcome {
            Ok(outcome) => {
                self.machine.transition(SessionEvent::EndStroke)?;
                outcome
            }
            Err(err) => {
                self.machine.transition(SessionEvent::CancelStroke)?;
                return Err(err.into());
            }
        };
        match &outcome {
            ToolOutcome::Apply(operation) => {
                self.run_operation(operation)?;
            }
            ToolOutcome::PickColor(color) => self.options.set_main_color(*color),
            ToolOutcome::Nothing => {}
        }
        Ok(outcome)
    }

    fn drag_floating(&mut self, anchor: Point, point: Point) {
        if let Some(floating) = self.selection.floating_mut() {
            floating.translate(
                point.x.saturating_sub(anchor.x),
                point.y.saturating_sub(anchor.y),
            );
        }
        if self.drag_anchor.is_some() {
            self.drag_anchor = Some(point);
        }
    }

    fn rebuild_preview(&mut self) {
        let (Some(stroke), Some(strategy)) = (self.stroke.as_ref(), self.strategy.as_ref()) else {
            return;
        };
        self.preview = match strategy.outcome(stroke, &self.options, &self.surface) {
            Ok(ToolOutcome::Apply(operation)) if !operation.is_selection_edit() => {
                let mut preview = self.surface.clone();
                match operation.apply(&mut preview, self.selection.mask()) {
                    Ok(_) => Some(preview),
                    Err(err) => {
                        tracing::trace!(?err, "preview skipped");
                        None
                    }
                }
            }
            _ => None,
        };
    }

    /// Cancels the ongoing stroke or floating selection. The committed pixels
    /// are untouched either way. Returns whether anything was cancelled.
    pub fn cancel(&mut self) -> SessionResult<bool> {
        match self.state() {
            SessionState::Stroking => {
                self.machine.transition(SessionEvent::CancelStroke)?;
                self.stroke = None;
                self.preview = None;
                tracing::debug!(tool = ?self.tool, "stroke cancelled");
                Ok(true)
            }
            SessionState::Floating => {
                self.machine.transition(SessionEvent::CancelSelection)?;
                self.selection.discard_floating();
                self.drag_anchor = None;
                tracing::debug!("floating selection cancelled");
                Ok(true)
            }
            SessionState::Idle => Ok(false),
        }
    }

    /// Applies a fully specified operation outside of pointer input. Returns
    /// whether the pixels or the selection changed.
    pub fn apply_operation(&mut self, operation: &ToolOperation) -> SessionResult<bool> {
        self.ensure_enabled(operation.kind())?;
        if self.state() == SessionState::Stroking {
            return Err(SessionError::StrokeInProgress);
        }
        self.run_operation(operation)
    }

    /// Replays `operations` in order and stops at the first failure. Returns
    /// how many operations changed something.
    pub fn apply_script<'a>(
        &mut self,
        operations: impl IntoIterator<Item = &'a ToolOperation>,
    ) -> SessionResult<usize> {
        let mut changed = 0;
        for (index, operation) in operations.into_iter().enumerate() {
            let applied = self
                .apply_operation(operation)
                .map_err(|source| SessionError::Script {
                    index,
                    source: Box::new(source),
                })?;
            if applied {
                changed += 1;
            }
        }
        tracing::debug!(changed, "script replayed");
        Ok(changed)
    }

    fn run_operation(&mut self, operation: &ToolOperation) -> SessionResult<bool> {
        if let ToolOperation::Select { shape, mode } = operation {
            return self.select(shape, *mode);
        }
        if let ToolOperation::MoveSelection { dx, dy } = operation {
            self.move_selection(*dx, *dy)?;
            return Ok(true);
        }
        if matches!(operation, ToolOperation::DeleteSelection) {
            return self.delete_selection();
        }
        if let Some(floating) = self.selection.floating_mut() {
            match operation {
                ToolOperation::Scale { width, height } => {
                    floating.scale(*width, *height)?;
                    return Ok(true);
                }
                ToolOperation::Flip { axis } => {
                    floating.flip(*axis);
                    return Ok(true);
                }
                ToolOperation::Rotate { quarter_turns } => {
                    floating.rotate(*quarter_turns);
                    return Ok(true);
                }
                ToolOperation::Filter { filter } => {
                    floating.filter(filter)?;
                    return Ok(true);
                }
                _ => return self.commit_over_floating(operation),
            }
        }
        self.commit(operation)
    }

    fn commit(&mut self, operation: &ToolOperation) -> SessionResult<bool> {
        let mut next = self.surface.clone();
        let dirty = operation.apply(&mut next, self.selection.mask())?;
        Ok(self.record_operation(operation, next, dirty))
    }

    /// Places the floating selection and then runs `operation` over it. Both
    /// steps are computed on copies first, so a failing operation leaves the
    /// floating selection where it was.
    fn commit_over_floating(&mut self, operation: &ToolOperation) -> SessionResult<bool> {
        let mut selection = self.selection.clone();
        let mut placed = self.surface.clone();
        let placed_dirty = selection.render_floating(&mut placed);
        selection.settle(&placed);
        let mut next = placed.clone();
        let dirty = operation.apply(&mut next, selection.mask())?;

        self.machine.transition(SessionEvent::ApplySelection)?;
        self.drag_anchor = None;
        self.selection = selection;
        let placed_changed = match placed_dirty {
            Some(area) => self.record(self.tool, "Selection", placed, area),
            None => false,
        };
        let changed = self.record_operation(operation, next, dirty);
        Ok(placed_changed || changed)
    }

    fn record_operation(
        &mut self,
        operation: &ToolOperation,
        next: PixelSurface,
        dirty: Option<PixelRect>,
    ) -> bool {
        let Some(dirty) = dirty else {
            return false;
        };
        let recorded = self.record(operation.kind(), operation.label(), next, dirty);
        if recorded && operation.is_canvas_transform() {
            self.selection.clear();
        }
        recorded
    }

    /// Replaces the committed pixels with `next` and records the difference.
    /// Edits that change no pixel are dropped.
    fn record(
        &mut self,
        tool: ToolKind,
        label: &str,
        next: PixelSurface,
        dirty: PixelRect,
    ) -> bool {
        let Some(patch) = Patch::capture(&self.surface, &next, dirty) else {
            tracing::debug!(?tool, "edit changed nothing; not recorded");
            return false;
        };
        let id = self.history.push(tool, label, patch);
        self.surface = next;
        tracing::debug!(id, ?tool, label, "committed edit");
        true
    }

    pub fn select(&mut self, shape: &SelectionShape, mode: SelectionMode) -> SessionResult<bool> {
        self.settle_for_selection_edit()?;
        let active = self.selection.select(shape, mode, &self.surface);
        tracing::debug!(?mode, active, "selection changed");
        Ok(active)
    }

    pub fn select_all(&mut self) -> SessionResult<()> {
        self.settle_for_selection_edit()?;
        self.selection.select_all(&self.surface);
        Ok(())
    }

    pub fn invert_selection(&mut self) -> SessionResult<bool> {
        self.settle_for_selection_edit()?;
        Ok(self.selection.invert(&self.surface))
    }

    /// Drops the selection, applying floating pixels first.
    pub fn clear_selection(&mut self) -> SessionResult<()> {
        self.settle_for_selection_edit()?;
        self.selection.clear();
        Ok(())
    }

    fn settle_for_selection_edit(&mut self) -> SessionResult<()> {
        if self.state() == SessionState::Stroking {
            return Err(SessionError::StrokeInProgress);
        }
        self.apply_selection()?;
        Ok(())
    }

    /// Lifts the selected pixels so they can be moved or transformed.
    pub fn lift_selection(&mut self) -> SessionResult<()> {
        if self.selection.is_floating() {
            return Ok(());
        }
        if !self.selection.is_active() {
            return Err(SessionError::NoSelection);
        }
        self.machine.transition(SessionEvent::LiftSelection)?;
        if !self.selection.lift(&self.surface) {
            self.machine.transition(SessionEvent::CancelSelection)?;
            return Err(SessionError::NoSelection);
        }
        tracing::debug!(bounds = ?self.selection.bounds(), "selection lifted");
        Ok(())
    }

    pub fn move_selection(&mut self, delta_x: i32, delta_y: i32) -> SessionResult<()> {
        self.lift_selection()?;
        if let Some(floating) = self.selection.floating_mut() {
            floating.translate(delta_x, delta_y);
        }
        Ok(())
    }

    /// Writes the floating selection into the committed pixels as one history
    /// entry. The selection stays active around the placed pixels. Returns
    /// whether pixels changed.
    pub fn apply_selection(&mut self) -> SessionResult<bool> {
        if !self.selection.is_floating() {
            return Ok(false);
        }
        self.machine.transition(SessionEvent::ApplySelection)?;
        self.drag_anchor = None;
        let mut next = self.surface.clone();
        let dirty = self.selection.render_floating(&mut next);
        self.selection.settle(&next);
        let Some(dirty) = dirty else {
            return Ok(false);
        };
        Ok(self.record(self.tool, "Selection", next, dirty))
    }

    /// Clears the selected pixels to transparency and drops the selection.
    pub fn delete_selection(&mut self) -> SessionResult<bool> {
        if self.state() == SessionState::Stroking {
            return Err(SessionError::StrokeInProgress);
        }
        if self.selection.is_floating() {
            self.machine.transition(SessionEvent::CancelSelection)?;
            self.selection.discard_floating();
            self.drag_anchor = None;
        }
        if !self.selection.is_active() {
            return Err(SessionError::NoSelection);
        }
        let deleted = self.commit(&ToolOperation::DeleteSelection)?;
        self.selection.clear();
        Ok(deleted)
    }

    /// Steps back one entry. With a stroke or floating selection in progress
    /// this cancels it instead. The selection does not survive undo.
    pub fn undo(&mut self) -> SessionResult<bool> {
        if self.cancel()? {
            return Ok(true);
        }
        self.selection.clear();
        let undone = self.history.undo(&mut self.surface)?.is_some();
        Ok(undone)
    }

    /// Steps forward one entry. An ongoing stroke or floating selection is
    /// cancelled first and nothing is redone in that call.
    pub fn redo(&mut self) -> SessionResult<bool> {
        if self.cancel()? {
            return Ok(false);
        }
        self.selection.clear();
        let redone = self.history.redo(&mut self.surface)?.is_some();
        Ok(redone)
    }

    pub fn can_undo(&self) -> bool {
        self.state().is_busy() || self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history_labels(&self) -> Vec<&str> {
        self.history.labels()
    }

    pub fn is_modified(&self) -> bool {
        self.history.is_modified()
    }

    pub fn mark_saved(&mut self) {
        self.history.mark_saved();
    }

    fn ensure_enabled(&self, kind: ToolKind) -> SessionResult<()> {
        if self.is_tool_disabled(kind) {
            tracing::debug!(tool = ?kind, "rejected disabled tool");
            return Err(SessionError::ToolDisabled(kind));
        }
        Ok(())
    }
}
