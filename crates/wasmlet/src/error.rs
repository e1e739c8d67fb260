use crate::{
    func::FuncError,
    global::GlobalError,
    memory::MemoryError,
    module::{InstantiationError, TranslationError},
    table::TableError,
    Trap, TrapCode,
};
use core::fmt::{self, Display};
use std::error::Error as StdError;

/// The generic error type used by wasmlet.
#[derive(Debug)]
pub struct Error {
    /// The boxed error kind.
    ///
    /// Boxing keeps the common `Result<T, Error>` values pointer-sized.
    kind: Box<ErrorKind>,
}

#[test]
fn error_size() {
    assert_eq!(
        core::mem::size_of::<Error>(),
        core::mem::size_of::<*const ()>()
    );
}

impl Error {
    /// Creates a new [`Error`] from the given [`ErrorKind`].
    fn from_kind(kind: ErrorKind) -> Self {
        Self {
            kind: Box::new(kind),
        }
    }

    /// Returns the [`ErrorKind`] of the [`Error`].
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the [`TrapCode`] if the [`Error`] is a coded trap.
    pub fn as_trap_code(&self) -> Option<TrapCode> {
        if let ErrorKind::Trap(trap) = self.kind() {
            return trap.trap_code();
        }
        None
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.kind, f)
    }
}

impl StdError for Error {}

/// The different kinds of errors that wasmlet surfaces to the embedder.
#[derive(Debug)]
pub enum ErrorKind {
    /// A Wasm-level abort of an invocation.
    Trap(Trap),
    /// A pre-execution instantiation failure.
    Instantiation(InstantiationError),
    /// A failure while lowering a function body to the register machine.
    Translation(TranslationError),
    /// An error while operating on a global variable.
    Global(GlobalError),
    /// An error while operating on a linear memory.
    Memory(MemoryError),
    /// An error while operating on a table.
    Table(TableError),
    /// An error while operating on a function.
    Func(FuncError),
    /// An error from the underlying Wasm binary parser, surfaced unchanged.
    Wasm(wasmparser::BinaryReaderError),
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trap(error) => Display::fmt(error, f),
            Self::Instantiation(error) => Display::fmt(error, f),
            Self::Translation(error) => Display::fmt(error, f),
            Self::Global(error) => Display::fmt(error, f),
            Self::Memory(error) => Display::fmt(error, f),
            Self::Table(error) => Display::fmt(error, f),
            Self::Func(error) => Display::fmt(error, f),
            Self::Wasm(error) => Display::fmt(error, f),
        }
    }
}

macro_rules! impl_from_error_kind {
    ( $( $ty:ty => $kind:ident ),* $(,)? ) => {
        $(
            impl From<$ty> for Error {
                #[cold]
                fn from(error: $ty) -> Self {
                    Self::from_kind(ErrorKind::$kind(error))
                }
            }
        )*
    };
}
impl_from_error_kind! {
    Trap => Trap,
    InstantiationError => Instantiation,
    TranslationError => Translation,
    GlobalError => Global,
    MemoryError => Memory,
    TableError => Table,
    FuncError => Func,
    wasmparser::BinaryReaderError => Wasm,
}

impl From<TrapCode> for Error {
    #[cold]
    fn from(trap_code: TrapCode) -> Self {
        Self::from_kind(ErrorKind::Trap(Trap::from(trap_code)))
    }
}

impl From<crate::ir::Error> for Error {
    #[cold]
    fn from(error: crate::ir::Error) -> Self {
        let error = match error {
            crate::ir::Error::RegisterOutOfBounds => TranslationError::TooManyRegisters,
            crate::ir::Error::BranchOffsetOutOfBounds => TranslationError::MalformedExpression,
        };
        Self::from_kind(ErrorKind::Translation(error))
    }
}
