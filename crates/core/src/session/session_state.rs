use std::fmt;

/// Lifecycle state of a monitoring session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    Capturing,
}

impl SessionState {
    pub fn is_capturing(self) -> bool {
        self == SessionState::Capturing
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => f.write_str("idle"),
            SessionState::Capturing => f.write_str("capturing"),
        }
    }
}
