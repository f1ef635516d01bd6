//! Query compilation and execution errors

use thiserror::Error;

use super::operators::Operator;
use crate::data::DataError;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("recordType is required")]
    MissingRecordType,

    #[error("Unsupported record type: {0}")]
    UnsupportedRecordType(String),

    #[error("Unsafe {kind}: '{name}'")]
    UnsafeIdentifier { kind: &'static str, name: String },

    #[error("Unsupported operator: '{0}'")]
    UnsupportedOperator(String),

    #[error("{operator} requires {requirement}")]
    MissingOperand {
        operator: Operator,
        requirement: &'static str,
    },

    #[error("{operator} requires a date (YYYY-MM-DD, D-M-YYYY or M/D/YYYY), got '{value}'")]
    InvalidDate { operator: Operator, value: String },

    #[error("Too many filters: {count} (max {max})")]
    TooManyFilters { count: usize, max: usize },

    #[error("Query execution failed: {0}")]
    ExecutionFailure(#[from] DataError),
}

impl QueryError {
    pub(crate) fn missing(operator: Operator, requirement: &'static str) -> Self {
        Self::MissingOperand {
            operator,
            requirement,
        }
    }

    /// Stable machine-readable error code
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingRecordType => "MISSING_RECORD_TYPE",
            Self::UnsupportedRecordType(_) => "UNSUPPORTED_RECORD_TYPE",
            Self::UnsafeIdentifier { .. } => "UNSAFE_IDENTIFIER",
            Self::UnsupportedOperator(_) => "UNSUPPORTED_OPERATOR",
            Self::MissingOperand { .. } => "MISSING_OPERAND",
            Self::InvalidDate { .. } => "INVALID_DATE",
            Self::TooManyFilters { .. } => "TOO_MANY_FILTERS",
            Self::ExecutionFailure(_) => "EXECUTION_FAILURE",
        }
    }

    /// True for errors raised before any backend call
    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::ExecutionFailure(_))
    }
}
