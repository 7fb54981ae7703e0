/// What the session is doing between pointer and selection events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Idle,
    /// A pointer stroke is in progress; edits go to the preview surface.
    Stroking,
    /// Selected pixels are lifted and can be moved or transformed.
    Floating,
}

impl SessionState {
    pub const fn is_busy(self) -> bool {
        !matches!(self, Self::Idle)
    }
}
