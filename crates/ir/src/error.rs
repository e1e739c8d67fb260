use core::fmt::{self, Display};
use std::error::Error as StdError;

/// Errors that may occur while constructing instruction sequences.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    /// A branch offset does not fit into its 32-bit encoding.
    BranchOffsetOutOfBounds,
    /// A register index does not fit into its 16-bit encoding.
    RegisterOutOfBounds,
}

impl StdError for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::BranchOffsetOutOfBounds => "branch offset out of bounds",
            Self::RegisterOutOfBounds => "register index out of bounds",
        };
        write!(f, "{message}")
    }
}
