use crate::ValType;
use core::fmt::{self, Display};
use std::error::Error as StdError;

/// Errors that may occur upon invoking a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FuncError {
    /// The argument values do not match the function's parameter types.
    MismatchingParameters {
        /// The parameter types of the invoked function.
        expected: Vec<ValType>,
        /// The types of the provided argument values.
        actual: Vec<ValType>,
    },
    /// The values returned by a host function do not match its result types.
    MismatchingResults {
        /// The result types of the host function.
        expected: Vec<ValType>,
        /// The types of the returned values.
        actual: Vec<ValType>,
    },
}

impl StdError for FuncError {}

impl Display for FuncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MismatchingParameters { expected, actual } => {
                write!(
                    f,
                    "mismatching function arguments: expected {expected:?}, got {actual:?}"
                )
            }
            Self::MismatchingResults { expected, actual } => {
                write!(
                    f,
                    "mismatching host function results: expected {expected:?}, got {actual:?}"
                )
            }
        }
    }
}
