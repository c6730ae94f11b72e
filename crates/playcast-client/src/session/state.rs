use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    ControlConnected,
    Joined,
    AwaitingProviderSelection,
    Starting,
    Negotiating,
    Active,
    /// Terminal.
    Closed,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::ControlConnected => "control_connected",
            SessionState::Joined => "joined",
            SessionState::AwaitingProviderSelection => "awaiting_provider_selection",
            SessionState::Starting => "starting",
            SessionState::Negotiating => "negotiating",
            SessionState::Active => "active",
            SessionState::Closed => "closed",
        }
    }

    /// A peer session exists in these states.
    pub fn has_session(self) -> bool {
        matches!(
            self,
            SessionState::Starting | SessionState::Negotiating | SessionState::Active
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    ControlOpened,
    JoinSent,
    ProvidersBrowsed,
    StartSent,
    OfferReceived,
    /// First track or first open data channel.
    MediaFlowing,
    UserExit,
    /// Negotiation or peer setup failed; the control channel is fine.
    SessionFailed,
    ControlLost,
    Shutdown,
}

/// Next state for `trigger`, or `None` when the trigger does not apply.
pub fn advance(state: SessionState, trigger: Trigger) -> Option<SessionState> {
    use SessionState as S;
    use Trigger as T;

    match (state, trigger) {
        (S::Closed, _) => None,
        (_, T::ControlLost | T::Shutdown) => Some(S::Closed),

        (S::Idle, T::ControlOpened) => Some(S::ControlConnected),
        (S::ControlConnected, T::JoinSent) => Some(S::Joined),
        (S::Joined | S::AwaitingProviderSelection, T::ProvidersBrowsed) => {
            Some(S::AwaitingProviderSelection)
        }
        (S::Joined | S::AwaitingProviderSelection, T::StartSent) => Some(S::Starting),
        (S::Starting | S::Negotiating, T::OfferReceived) => Some(S::Negotiating),
        // Renegotiation keeps a running session running.
        (S::Active, T::OfferReceived) => Some(S::Active),
        (S::Negotiating, T::MediaFlowing) => Some(S::Active),
        (S::Starting | S::Negotiating | S::Active, T::UserExit | T::SessionFailed) => {
            Some(S::Joined)
        }
        _ => None,
    }
}
