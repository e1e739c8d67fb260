use crate::{
    func::{Func, InternalFunc},
    store::EntityHandle,
    Runtime, ValType, F32, F64,
};
use core::{any::Any, fmt, fmt::Display};
use wasmlet_core::UntypedVal;

/// Runtime representation of a WebAssembly value.
///
/// Wasm code manipulates values of the four basic numeric types and the two
/// nullable reference types. There is no distinction between signed and
/// unsigned integers; operations interpret the bits as demanded.
#[derive(Debug, Clone)]
pub enum Val {
    /// Value of 32-bit signed or unsigned integer.
    I32(i32),
    /// Value of 64-bit signed or unsigned integer.
    I64(i64),
    /// Value of 32-bit IEEE 754-2008 floating point number.
    F32(F32),
    /// Value of 64-bit IEEE 754-2008 floating point number.
    F64(F64),
    /// A nullable function reference.
    FuncRef(FuncRef),
    /// A nullable external reference.
    ExternRef(ExternRef),
}

impl PartialEq for Val {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::I32(lhs), Self::I32(rhs)) => lhs == rhs,
            (Self::I64(lhs), Self::I64(rhs)) => lhs == rhs,
            (Self::F32(lhs), Self::F32(rhs)) => lhs == rhs,
            (Self::F64(lhs), Self::F64(rhs)) => lhs == rhs,
            (Self::FuncRef(lhs), Self::FuncRef(rhs)) => lhs.inner == rhs.inner,
            (Self::ExternRef(lhs), Self::ExternRef(rhs)) => lhs.inner == rhs.inner,
            _ => false,
        }
    }
}

impl Val {
    /// Creates the default (all zeros) value of the given type.
    pub fn default(ty: ValType) -> Self {
        match ty {
            ValType::I32 => Self::I32(0),
            ValType::I64 => Self::I64(0),
            ValType::F32 => Self::F32(F32::from_bits(0)),
            ValType::F64 => Self::F64(F64::from_bits(0)),
            ValType::FuncRef => Self::FuncRef(FuncRef::null()),
            ValType::ExternRef => Self::ExternRef(ExternRef::null()),
        }
    }

    /// Returns the [`ValType`] of the value.
    pub fn ty(&self) -> ValType {
        match self {
            Self::I32(_) => ValType::I32,
            Self::I64(_) => ValType::I64,
            Self::F32(_) => ValType::F32,
            Self::F64(_) => ValType::F64,
            Self::FuncRef(_) => ValType::FuncRef,
            Self::ExternRef(_) => ValType::ExternRef,
        }
    }

    /// Returns the underlying `i32` if the value is of type `i32`.
    pub fn i32(&self) -> Option<i32> {
        match self {
            Self::I32(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the underlying `i64` if the value is of type `i64`.
    pub fn i64(&self) -> Option<i64> {
        match self {
            Self::I64(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the underlying [`FuncRef`] if the value is a function
    /// reference.
    pub fn funcref(&self) -> Option<&FuncRef> {
        match self {
            Self::FuncRef(value) => Some(value),
            _ => None,
        }
    }

    /// Reinterprets the untyped cell as a value of type `ty`.
    pub(crate) fn from_untyped(untyped: UntypedVal, ty: ValType) -> Self {
        match ty {
            ValType::I32 => Self::I32(untyped.into()),
            ValType::I64 => Self::I64(untyped.into()),
            ValType::F32 => Self::F32(untyped.into()),
            ValType::F64 => Self::F64(untyped.into()),
            ValType::FuncRef => Self::FuncRef(FuncRef::from_untyped(untyped)),
            ValType::ExternRef => Self::ExternRef(ExternRef::from_untyped(untyped)),
        }
    }

    /// Returns the value as its untyped cell representation.
    pub(crate) fn to_untyped(&self) -> UntypedVal {
        match self {
            Self::I32(value) => UntypedVal::from(*value),
            Self::I64(value) => UntypedVal::from(*value),
            Self::F32(value) => UntypedVal::from(*value),
            Self::F64(value) => UntypedVal::from(*value),
            Self::FuncRef(value) => value.to_untyped(),
            Self::ExternRef(value) => value.to_untyped(),
        }
    }
}

impl Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::I32(value) => write!(f, "{value}"),
            Self::I64(value) => write!(f, "{value}"),
            Self::F32(value) => write!(f, "{value}"),
            Self::F64(value) => write!(f, "{value}"),
            Self::FuncRef(value) if value.is_null() => write!(f, "null"),
            Self::FuncRef(_) => write!(f, "funcref"),
            Self::ExternRef(value) if value.is_null() => write!(f, "null"),
            Self::ExternRef(_) => write!(f, "externref"),
        }
    }
}

macro_rules! impl_from_prim {
    ( $( $prim:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$prim> for Val {
                fn from(value: $prim) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}
impl_from_prim! {
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
}

/// A nullable reference to a [`Func`].
///
/// The reference value encodes `null` distinctly from any valid function:
/// its untyped bit pattern is zero while valid references carry the bit
/// pattern of the internal tagged function handle.
#[derive(Debug, Copy, Clone)]
pub struct FuncRef {
    /// The referenced function if any.
    inner: Option<Func>,
}

impl FuncRef {
    /// Creates the `null` [`FuncRef`].
    pub fn null() -> Self {
        Self { inner: None }
    }

    /// Creates a [`FuncRef`] referencing `func`.
    pub fn new(func: Func) -> Self {
        Self { inner: Some(func) }
    }

    /// Returns `true` if the reference is `null`.
    pub fn is_null(&self) -> bool {
        self.inner.is_none()
    }

    /// Returns the referenced [`Func`] if any.
    pub fn func(&self) -> Option<&Func> {
        self.inner.as_ref()
    }

    pub(crate) fn from_untyped(untyped: UntypedVal) -> Self {
        Self {
            inner: InternalFunc::from_bits(untyped.to_bits()).map(Func::from_internal),
        }
    }

    pub(crate) fn to_untyped(&self) -> UntypedVal {
        match &self.inner {
            Some(func) => UntypedVal::from_bits(func.as_internal().to_bits()),
            None => UntypedVal::from_bits(0),
        }
    }
}

impl From<Func> for FuncRef {
    fn from(func: Func) -> Self {
        Self::new(func)
    }
}

/// An entity representing an opaque host object referenced by `externref`
/// values.
#[derive(Debug)]
pub struct ExternObjectEntity {
    /// The opaque host object.
    object: Box<dyn Any>,
}

impl ExternObjectEntity {
    /// Creates a new [`ExternObjectEntity`] wrapping `object`.
    pub fn new<T>(object: T) -> Self
    where
        T: 'static + Any,
    {
        Self {
            object: Box::new(object),
        }
    }

    /// Returns a shared reference to the opaque host object.
    pub fn object(&self) -> &dyn Any {
        &*self.object
    }
}

/// A nullable reference to an opaque host object.
#[derive(Debug, Copy, Clone)]
pub struct ExternRef {
    /// The referenced host object if any.
    inner: Option<EntityHandle<ExternObjectEntity>>,
}

impl ExternRef {
    /// Creates the `null` [`ExternRef`].
    pub fn null() -> Self {
        Self { inner: None }
    }

    /// Creates a new [`ExternRef`] wrapping the given host object.
    pub fn new<T>(runtime: &mut Runtime, object: T) -> Self
    where
        T: 'static + Any,
    {
        let handle = runtime
            .store_mut()
            .alloc_extern_object(ExternObjectEntity::new(object));
        Self {
            inner: Some(handle),
        }
    }

    /// Returns `true` if the reference is `null`.
    pub fn is_null(&self) -> bool {
        self.inner.is_none()
    }

    /// Returns a shared reference to the referenced host object if any.
    pub fn object(&self) -> Option<&dyn Any> {
        self.inner.as_ref().map(|handle| handle.get().object())
    }

    pub(crate) fn from_untyped(untyped: UntypedVal) -> Self {
        let bits = untyped.to_bits();
        if bits == 0 {
            return Self::null();
        }
        Self {
            // Safety: non-null externref bits only ever stem from
            //         `ExternRef::to_untyped` on a live store.
            inner: Some(unsafe { EntityHandle::from_bits(bits as usize) }),
        }
    }

    pub(crate) fn to_untyped(&self) -> UntypedVal {
        match &self.inner {
            Some(handle) => UntypedVal::from_bits(handle.to_bits() as u64),
            None => UntypedVal::from_bits(0),
        }
    }
}
