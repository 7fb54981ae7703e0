use super::model::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEvent {
    BeginStroke,
    EndStroke,
    CancelStroke,
    LiftSelection,
    ApplySelection,
    CancelSelection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: Option<SessionState>,
    pub event: SessionEvent,
    pub to: SessionState,
}

impl StateTransition {
    pub const fn new(from: Option<SessionState>, event: SessionEvent, to: SessionState) -> Self {
        Self { from, event, to }
    }
}
