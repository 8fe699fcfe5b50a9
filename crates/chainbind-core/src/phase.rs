//! Lifecycle phase shared by log iterators and live subscriptions.

use crate::error::BindError;

/// Where a log consumer is in its lifecycle.
///
/// `Done` and `Failed` are absorbing: once reached, no further events are
/// produced and the phase never changes again.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Phase {
    /// Delivering logs from a finished block range.
    #[default]
    Historical,
    /// Delivering logs pushed by a live feed.
    Live,
    /// Ended cleanly (exhausted, closed, or consumer gone).
    Done,
    /// Ended on the contained error.
    Failed(BindError),
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }

    pub fn error(&self) -> Option<&BindError> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Historical => "historical",
            Self::Live => "live",
            Self::Done => "done",
            Self::Failed(_) => "failed",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed(e) => write!(f, "failed: {e}"),
            other => f.write_str(other.as_str()),
        }
    }
}
