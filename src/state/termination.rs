/// Termination reason definitions for finished crawl sessions
use serde::Serialize;
use std::fmt;

/// Why a crawl session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// A listing page yielded zero extractable candidates
    Exhausted,

    /// Document height stopped changing between scrolls
    HeightStable,

    /// The scroll loop hit its wall-clock ceiling
    TimedOut,

    /// The paginated crawl reached its page bound
    MaxPagesReached,

    /// An external cancellation signal stopped the session
    Cancelled,
}

impl TerminationReason {
    /// Returns true if the catalog was read to its natural end
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Exhausted | Self::HeightStable)
    }

    /// Returns true if a ceiling or signal cut the crawl short
    pub fn is_truncated(&self) -> bool {
        !self.is_complete()
    }

    /// Converts the reason to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Exhausted => "exhausted",
            Self::HeightStable => "height_stable",
            Self::TimedOut => "timed_out",
            Self::MaxPagesReached => "max_pages_reached",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a reason from its database string representation
    ///
    /// Returns None if the string doesn't match any known reason.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "exhausted" => Some(Self::Exhausted),
            "height_stable" => Some(Self::HeightStable),
            "timed_out" => Some(Self::TimedOut),
            "max_pages_reached" => Some(Self::MaxPagesReached),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns all termination reasons
    pub fn all() -> [Self; 5] {
        [
            Self::Exhausted,
            Self::HeightStable,
            Self::TimedOut,
            Self::MaxPagesReached,
            Self::Cancelled,
        ]
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_complete() {
        assert!(TerminationReason::Exhausted.is_complete());
        assert!(TerminationReason::HeightStable.is_complete());

        assert!(TerminationReason::TimedOut.is_truncated());
        assert!(TerminationReason::MaxPagesReached.is_truncated());
        assert!(TerminationReason::Cancelled.is_truncated());
    }

    #[test]
    fn test_db_string_roundtrip() {
        for reason in TerminationReason::all() {
            assert_eq!(
                TerminationReason::from_db_string(reason.to_db_string()),
                Some(reason)
            );
        }
        assert_eq!(TerminationReason::from_db_string("unknown"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(TerminationReason::MaxPagesReached.to_string(), "max_pages_reached");
    }
}
