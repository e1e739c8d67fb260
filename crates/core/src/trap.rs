use crate::HostError;
use core::fmt::{self, Display};
use std::error::Error as StdError;

/// Error type which can be returned by Wasm code or by the host environment.
///
/// Under some conditions, Wasm execution may produce a [`Trap`], which
/// immediately aborts the current invocation. Traps cannot be handled by
/// WebAssembly code, but are reported to the host embedder with the stack
/// fully unwound.
#[derive(Debug)]
pub struct Trap {
    /// The boxed reason of the [`Trap`].
    reason: Box<TrapReason>,
}

#[test]
fn trap_size() {
    assert_eq!(
        core::mem::size_of::<Trap>(),
        core::mem::size_of::<*const ()>()
    );
}

/// The reason of a [`Trap`].
#[derive(Debug)]
enum TrapReason {
    /// Traps during Wasm execution.
    InstructionTrap(TrapCode),
    /// An error described by a display message.
    Message(Box<str>),
    /// Traps and errors during host execution.
    Host(Box<dyn HostError>),
}

impl Trap {
    /// Create a new [`Trap`] from the [`TrapReason`].
    fn with_reason(reason: TrapReason) -> Self {
        Self {
            reason: Box::new(reason),
        }
    }

    /// Creates a new [`Trap`] described by a `message`.
    #[cold]
    pub fn new<T>(message: T) -> Self
    where
        T: Into<String>,
    {
        Self::with_reason(TrapReason::Message(message.into().into_boxed_str()))
    }

    /// Returns the [`TrapCode`] of traps originating from Wasm execution.
    #[inline]
    pub fn trap_code(&self) -> Option<TrapCode> {
        if let TrapReason::InstructionTrap(trap_code) = &*self.reason {
            return Some(*trap_code);
        }
        None
    }

    /// Downcasts the [`Trap`] into the `T: HostError` if possible.
    ///
    /// Returns `None` otherwise.
    #[inline]
    pub fn downcast_ref<T>(&self) -> Option<&T>
    where
        T: HostError,
    {
        if let TrapReason::Host(host_error) = &*self.reason {
            return host_error.downcast_ref::<T>();
        }
        None
    }

    /// Consumes `self` to downcast the [`Trap`] into the `T: HostError` if possible.
    ///
    /// Returns `None` otherwise.
    #[inline]
    pub fn downcast<T>(self) -> Option<T>
    where
        T: HostError,
    {
        if let TrapReason::Host(host_error) = *self.reason {
            return host_error.downcast::<T>().ok().map(|boxed| *boxed);
        }
        None
    }
}

impl From<TrapCode> for Trap {
    #[cold]
    fn from(error: TrapCode) -> Self {
        Self::with_reason(TrapReason::InstructionTrap(error))
    }
}

impl<E> From<E> for Trap
where
    E: HostError,
{
    #[inline]
    #[cold]
    fn from(host_error: E) -> Self {
        Self::with_reason(TrapReason::Host(Box::new(host_error)))
    }
}

impl Display for TrapReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InstructionTrap(trap_code) => Display::fmt(trap_code, f),
            Self::Message(message) => write!(f, "{message}"),
            Self::Host(host_error) => Display::fmt(host_error, f),
        }
    }
}

impl Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        <TrapReason as Display>::fmt(&self.reason, f)
    }
}

impl StdError for Trap {}

/// The uniform taxonomy of Wasm-level aborts.
///
/// A [`TrapCode`] propagates through all nested frames of an invocation
/// up to the embedder API boundary.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrapCode {
    /// Wasm code executed the `unreachable` opcode.
    Unreachable,
    /// An integer arithmetic operation caused an overflow.
    ///
    /// This happens for signed division (or remainder) of
    /// -2<sup>N-1</sup> over -1 as well as for out of range
    /// float to integer truncations.
    IntegerOverflow,
    /// Attempt to divide by zero.
    IntegerDivideByZero,
    /// Attempted to truncate a NaN to an integer type.
    InvalidConversionToInteger,
    /// Attempt to load from or store to an address outside
    /// of the bounds of the accessed linear memory.
    OutOfBoundsMemoryAccess,
    /// Attempt to access a table element at an index outside
    /// of the bounds of the accessed table.
    OutOfBoundsTableAccess,
    /// A `call_indirect` found a function whose signature does
    /// not match the signature demanded at the call site.
    IndirectCallTypeMismatch,
    /// A `call_indirect` index lies outside of the table bounds.
    UndefinedElement,
    /// A `call_indirect` hit a `null` table element.
    UninitializedElement,
    /// The register-file stack ran out of space.
    ///
    /// This is likely caused by some infinite or very deep recursion.
    CallStackExhausted,
    /// A function index did not resolve to a function.
    InvalidFunctionIndex,
}

impl TrapCode {
    /// Returns the trap message as specified by the WebAssembly specification.
    ///
    /// # Note
    ///
    /// This API is primarily useful for the Wasm spec testsuite but might
    /// have other uses since it avoids heap memory allocation in certain
    /// cases.
    pub fn trap_message(&self) -> &'static str {
        match self {
            Self::Unreachable => "wasm `unreachable` instruction executed",
            Self::IntegerOverflow => "integer overflow",
            Self::IntegerDivideByZero => "integer divide by zero",
            Self::InvalidConversionToInteger => "invalid conversion to integer",
            Self::OutOfBoundsMemoryAccess => "out of bounds memory access",
            Self::OutOfBoundsTableAccess => "out of bounds table access",
            Self::IndirectCallTypeMismatch => "indirect call type mismatch",
            Self::UndefinedElement => "undefined element",
            Self::UninitializedElement => "uninitialized element",
            Self::CallStackExhausted => "call stack exhausted",
            Self::InvalidFunctionIndex => "invalid function index",
        }
    }
}

impl Display for TrapCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.trap_message())
    }
}
