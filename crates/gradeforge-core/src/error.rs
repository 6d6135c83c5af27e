//! Engine and execution error types.
//!
//! Only misconfiguration crosses the engine boundary as an [`EngineError`].
//! Execution problems are represented by [`ExecutionFault`] and are folded
//! into a zero score by the code handler rather than propagated.

use std::time::Duration;

use thiserror::Error;

use crate::model::AssignmentType;

/// Errors that can escape [`EvaluationService::evaluate`] or registry
/// construction.
///
/// [`EvaluationService::evaluate`]: crate::engine::EvaluationService::evaluate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The assignment references a type with no registered handler.
    #[error("no handler registered for assignment type: {0}")]
    UnknownAssignmentType(String),

    /// A handler was registered twice for the same type tag.
    #[error("a handler is already registered for assignment type: {0}")]
    DuplicateType(AssignmentType),
}

impl EngineError {
    /// Returns `true` if this error can only happen while the registry is
    /// being built, never on the request path.
    pub fn is_startup_fault(&self) -> bool {
        matches!(self, EngineError::DuplicateType(_))
    }
}

/// Faults reported by an execution strategy, or raised while waiting on one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionFault {
    /// The run did not finish inside its time budget.
    #[error("execution timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The submitted program or the sandbox itself crashed.
    #[error("execution crashed: {0}")]
    Crashed(String),

    /// No sandbox could be started (missing interpreter, unconfigured language).
    #[error("sandbox unavailable: {0}")]
    Unavailable(String),

    /// The caller abandoned the evaluation.
    #[error("execution cancelled")]
    Cancelled,

    /// The sandbox returned counts that cannot be true.
    #[error("sandbox reported {passed} passed out of {total} tests")]
    InconsistentReport { passed: u32, total: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_fault_classification() {
        assert!(EngineError::DuplicateType(AssignmentType::Quiz).is_startup_fault());
        assert!(!EngineError::UnknownAssignmentType("ESSAY".into()).is_startup_fault());
    }

    #[test]
    fn fault_messages() {
        assert_eq!(
            ExecutionFault::Timeout(Duration::from_secs(2)).to_string(),
            "execution timed out after 2000ms"
        );
        assert_eq!(
            ExecutionFault::InconsistentReport {
                passed: 5,
                total: 3
            }
            .to_string(),
            "sandbox reported 5 passed out of 3 tests"
        );
    }
}
