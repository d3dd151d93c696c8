//! Error taxonomy for the state history store

use super::attribute_tree::Quark;
use thiserror::Error;

/// Errors raised by the attribute tree, interval store and history builder
///
/// Sequencing errors (time order, interval bookkeeping, writes after close)
/// are fatal to the write session: the history built so far stays valid and
/// queryable, but the offending write is rejected. `NoOngoingInterval` and
/// `QuarkNotFound` are recoverable and callers may choose to ignore them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Non-monotonic time: write at {time} precedes latest accepted time {latest}")]
    NonMonotonicTime { time: u64, latest: u64 },

    #[error("Invalid time order for quark {quark}: end {end} is before start {start}")]
    InvalidTimeOrder { quark: Quark, start: u64, end: u64 },

    #[error("No ongoing interval for quark {quark}")]
    NoOngoingInterval { quark: Quark },

    #[error("Quark {quark} already has an ongoing interval started at {start}")]
    OngoingIntervalExists { quark: Quark, start: u64 },

    #[error("State history is closed to further writes")]
    StoreClosed,

    #[error("Attribute not found: {path}")]
    QuarkNotFound { path: String },

    #[error("Quark {quark} does not belong to this attribute tree")]
    InvalidQuark { quark: Quark },
}

impl StateError {
    /// Whether the caller can ignore this error and keep writing
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StateError::NoOngoingInterval { .. } | StateError::QuarkNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, StateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        let quark = Quark::new(3);
        assert!(StateError::NoOngoingInterval { quark }.is_recoverable());
        assert!(StateError::QuarkNotFound {
            path: "a/b".to_string()
        }
        .is_recoverable());
    }

    #[test]
    fn test_fatal_errors() {
        let quark = Quark::new(0);
        assert!(!StateError::StoreClosed.is_recoverable());
        assert!(!StateError::NonMonotonicTime { time: 1, latest: 2 }.is_recoverable());
        assert!(!StateError::OngoingIntervalExists { quark, start: 5 }.is_recoverable());
        assert!(!StateError::InvalidTimeOrder {
            quark,
            start: 5,
            end: 4
        }
        .is_recoverable());
        assert!(!StateError::InvalidQuark { quark }.is_recoverable());
    }

    #[test]
    fn test_error_messages() {
        let err = StateError::NonMonotonicTime { time: 3, latest: 7 };
        assert_eq!(
            err.to_string(),
            "Non-monotonic time: write at 3 precedes latest accepted time 7"
        );

        let err = StateError::QuarkNotFound {
            path: "host/42/status".to_string(),
        };
        assert_eq!(err.to_string(), "Attribute not found: host/42/status");
    }
}
