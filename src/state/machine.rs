use super::error::{StateError, StateResult};
use super::{SessionEvent, SessionState, StateTransition};

/// Most recent transitions kept for inspection.
pub const TRANSITION_LOG_LIMIT: usize = 64;

#[derive(Debug)]
pub struct StateMachine {
    state: SessionState,
    transition_history: Vec<StateTransition>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: SessionState::default(),
            transition_history: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn can_transition(&self, event: SessionEvent) -> bool {
        self.next_state(event).is_some()
    }

    pub fn next_state(&self, event: SessionEvent) -> Option<SessionState> {
        use SessionEvent::*;
        match (self.state, event) {
            (SessionState::Idle, BeginStroke) => Some(SessionState::Stroking),
            (SessionState::Stroking, EndStroke) => Some(SessionState::Idle),
            (SessionState::Stroking, CancelStroke) => Some(SessionState::Idle),
            (SessionState::Idle, LiftSelection) => Some(SessionState::Floating),
            (SessionState::Floating, ApplySelection) => Some(SessionState::Idle),
            (SessionState::Floating, CancelSelection) => Some(SessionState::Idle),
            _ => None,
        }
    }

    pub fn transition(&mut self, event: SessionEvent) -> StateResult<SessionState> {
        tracing::debug!(from = ?self.state, event = ?event, "request state transition");
        let next = self.next_state(event).ok_or_else(|| {
            let from = self.state;
            tracing::warn!(from = ?from, event = ?event, "invalid state transition requested");
            StateError::InvalidStateTransition { from, event }
        })?;

        let record = StateTransition::new(Some(self.state), event, next);
        self.state = next;
        if self.transition_history.len() == TRANSITION_LOG_LIMIT {
            self.transition_history.remove(0);
        }
        self.transition_history.push(record);

        Ok(self.state)
    }

    /// Recorded transitions, oldest first, up to [`TRANSITION_LOG_LIMIT`].
    pub fn transitions(&self) -> &[StateTransition] {
        &self.transition_history
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionState::{:?}", self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_transition_tracks_valid_and_invalid_events() {
        let mut machine = StateMachine::new();
        assert!(machine.can_transition(SessionEvent::BeginStroke));
        assert!(machine.can_transition(SessionEvent::LiftSelection));
        assert!(!machine.can_transition(SessionEvent::EndStroke));

        let _ = machine
            .transition(SessionEvent::LiftSelection)
            .expect("idle -> floating should transition");

        assert!(machine.can_transition(SessionEvent::ApplySelection));
        assert!(machine.can_transition(SessionEvent::CancelSelection));
        assert!(!machine.can_transition(SessionEvent::BeginStroke));
    }

    #[test]
    fn transition_records_history_with_ordered_entries() {
        let mut machine = StateMachine::new();
        let _ = machine
            .transition(SessionEvent::BeginStroke)
            .expect("begin stroke should work");
        let _ = machine
            .transition(SessionEvent::EndStroke)
            .expect("end stroke should work");
        let _ = machine
            .transition(SessionEvent::LiftSelection)
            .expect("lift selection should work");
        let _ = machine
            .transition(SessionEvent::ApplySelection)
            .expect("apply selection should work");

        assert_eq!(machine.state(), SessionState::Idle);
        assert_eq!(machine.transitions().len(), 4);
        assert_eq!(
            machine.transitions()[0],
            StateTransition::new(
                Some(SessionState::Idle),
                SessionEvent::BeginStroke,
                SessionState::Stroking
            )
        );
        assert_eq!(
            machine.transitions()[2],
            StateTransition::new(
                Some(SessionState::Idle),
                SessionEvent::LiftSelection,
                SessionState::Floating
            )
        );
        assert_eq!(
            machine.transitions()[3],
            StateTransition::new(
                Some(SessionState::Floating),
                SessionEvent::ApplySelection,
                SessionState::Idle
            )
        );
    }

    #[test]
    fn transition_log_keeps_only_the_latest_entries() {
        let mut machine = StateMachine::new();
        for _ in 0..TRANSITION_LOG_LIMIT {
            machine
                .transition(SessionEvent::BeginStroke)
                .expect("begin stroke should work");
            machine
                .transition(SessionEvent::EndStroke)
                .expect("end stroke should work");
        }
        machine
            .transition(SessionEvent::LiftSelection)
            .expect("lift selection should work");

        assert_eq!(machine.transitions().len(), TRANSITION_LOG_LIMIT);
        assert_eq!(
            machine.transitions().last(),
            Some(&StateTransition::new(
                Some(SessionState::Idle),
                SessionEvent::LiftSelection,
                SessionState::Floating
            ))
        );
        assert_eq!(machine.transitions()[0].event, SessionEvent::EndStroke);
    }

    #[test]
    fn invalid_transition_returns_error_without_mutating_history() {
        let mut machine = StateMachine::new();
        let _ = machine
            .transition(SessionEvent::BeginStroke)
            .expect("begin stroke should work");

        let err = machine
            .transition(SessionEvent::LiftSelection)
            .expect_err("stroking -> lift selection should fail");
        assert_eq!(
            err,
            StateError::InvalidStateTransition {
                from: SessionState::Stroking,
                event: SessionEvent::LiftSelection
            }
        );
        assert_eq!(machine.state(), SessionState::Stroking);
        assert_eq!(machine.transitions().len(), 1);
    }
}
