use crate::{store::EntityHandle, Runtime, Val, ValType};
use core::fmt::{self, Display};
use std::error::Error as StdError;
use wasmlet_core::UntypedVal;

/// The mutability of a [`Global`] variable.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Mutability {
    /// The global variable is constant after initialization.
    Const,
    /// The global variable is mutable.
    Var,
}

impl Mutability {
    /// Returns `true` if the mutability is [`Mutability::Var`].
    pub fn is_mut(&self) -> bool {
        matches!(self, Self::Var)
    }
}

/// The type of a [`Global`] variable.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GlobalType {
    /// The value type of the global variable.
    content: ValType,
    /// The mutability of the global variable.
    mutability: Mutability,
}

impl GlobalType {
    /// Creates a new [`GlobalType`].
    pub fn new(content: ValType, mutability: Mutability) -> Self {
        Self {
            content,
            mutability,
        }
    }

    /// Returns the value type of the global variable.
    pub fn content(&self) -> ValType {
        self.content
    }

    /// Returns the mutability of the global variable.
    pub fn mutability(&self) -> Mutability {
        self.mutability
    }
}

/// Errors that may occur upon operating on global variables.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GlobalError {
    /// Tried to write to an immutable global variable.
    ImmutableWrite,
    /// Tried to write a value of unmatching type to a global variable.
    TypeMismatch {
        /// The value type of the global variable.
        expected: ValType,
        /// The type of the written value.
        actual: ValType,
    },
}

impl StdError for GlobalError {}

impl Display for GlobalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImmutableWrite => write!(f, "tried to write to an immutable global variable"),
            Self::TypeMismatch { expected, actual } => {
                write!(
                    f,
                    "type mismatch upon writing global variable: expected {expected}, got {actual}"
                )
            }
        }
    }
}

/// A global variable entity.
#[derive(Debug)]
pub struct GlobalEntity {
    /// The current untyped value of the global variable.
    value: UntypedVal,
    /// The type of the global variable.
    ty: GlobalType,
}

impl GlobalEntity {
    /// Creates a new [`GlobalEntity`] with the given initial value.
    pub fn new(value: UntypedVal, ty: GlobalType) -> Self {
        Self { value, ty }
    }

    /// Returns the [`GlobalType`] of the global variable.
    pub fn ty(&self) -> GlobalType {
        self.ty
    }

    /// Returns the untyped value of the global variable.
    #[inline]
    pub fn get(&self) -> UntypedVal {
        self.value
    }

    /// Sets the untyped value of the global variable.
    ///
    /// The type discipline has been checked by validation or the public
    /// [`Global::set`] API at this point.
    #[inline]
    pub fn set(&mut self, value: UntypedVal) {
        self.value = value;
    }

    /// Returns a pointer to the value cell of the global variable.
    ///
    /// Used by the executor's global index 0 fast path. The pointer is
    /// stable for the lifetime of the owning store.
    pub(crate) fn value_ptr(&mut self) -> *mut UntypedVal {
        &mut self.value
    }
}

/// A global variable reference.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(transparent)]
pub struct Global(pub(crate) EntityHandle<GlobalEntity>);

impl Global {
    /// Creates a new [`Global`] with the given initial value.
    pub fn new(runtime: &mut Runtime, value: Val, mutability: Mutability) -> Self {
        let ty = GlobalType::new(value.ty(), mutability);
        let entity = GlobalEntity::new(value.to_untyped(), ty);
        Self(runtime.store_mut().alloc_global(entity))
    }

    /// Returns the [`GlobalType`] of the global variable.
    pub fn ty(&self, _runtime: &Runtime) -> GlobalType {
        self.0.get().ty()
    }

    /// Returns the current value of the global variable.
    pub fn get(&self, _runtime: &Runtime) -> Val {
        let entity = self.0.get();
        Val::from_untyped(entity.get(), entity.ty().content())
    }

    /// Sets the value of the global variable.
    ///
    /// # Errors
    ///
    /// - If the global variable is immutable.
    /// - If `value` does not match the type of the global variable.
    pub fn set(&mut self, _runtime: &mut Runtime, value: Val) -> Result<(), GlobalError> {
        let ty = self.0.get().ty();
        if !ty.mutability().is_mut() {
            return Err(GlobalError::ImmutableWrite);
        }
        if value.ty() != ty.content() {
            return Err(GlobalError::TypeMismatch {
                expected: ty.content(),
                actual: value.ty(),
            });
        }
        self.0.get_mut().set(value.to_untyped());
        Ok(())
    }

    pub(crate) fn handle(&self) -> EntityHandle<GlobalEntity> {
        self.0
    }
}
