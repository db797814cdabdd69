//! Evaluation errors

use crate::error::{ExceptionId, InternalError, UserVisibleException};
use thiserror::Error;

/// Result type for evaluation
pub type EvalResult<T> = Result<T, EvalError>;

/// Anything that stops evaluation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// The rule is wrong; reported in the status
    #[error("{0}")]
    UserVisible(#[from] UserVisibleException),

    /// The configured condition budget was exceeded
    #[error("condition limit of {limit} reached")]
    ConditionLimit { limit: u32 },

    /// Interpreter bug; propagated to the caller
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl EvalError {
    pub fn user(id: ExceptionId, position: usize, params: Vec<String>) -> Self {
        EvalError::UserVisible(UserVisibleException::new(id, position, params))
    }

    pub fn at(id: ExceptionId, position: usize) -> Self {
        EvalError::UserVisible(UserVisibleException::at(id, position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_conversions() {
        let err: EvalError = UserVisibleException::at(ExceptionId::DivideByZero, 3).into();
        assert!(matches!(err, EvalError::UserVisible(ref e) if e.position == 3));

        let err: EvalError = InternalError::UndefinedComparison.into();
        assert_eq!(err.to_string(), "cannot compare undefined values");
    }

    #[test]
    fn test_condition_limit_message() {
        let err = EvalError::ConditionLimit { limit: 5 };
        assert_eq!(err.to_string(), "condition limit of 5 reached");
    }
}
