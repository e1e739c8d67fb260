mod caller;
mod error;

pub use self::{caller::Caller, error::FuncError};
use crate::{
    engine::{self, CodeArena, CompiledFunc},
    ir::index::Sig,
    module::Module,
    store::{EntityHandle, Store},
    Error, FuncType, Instance, Runtime, Trap, Val,
};
use core::num::NonZeroUsize;
use spin::Once;

/// The type of dynamically typed host function callables.
pub(crate) type HostFuncCallable =
    Box<dyn Fn(Caller<'_>, &[Val], &mut [Val]) -> Result<(), Trap>>;

/// A tagged handle uniting Wasm and host functions.
///
/// The low bit selects the variant (0 = wasm, 1 = host); the remaining bits
/// address the entity. Both entity pools guarantee an alignment of at least
/// 2 which keeps the tag bit free. The bit pattern of an [`InternalFunc`]
/// doubles as the non-null `funcref` value encoding.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct InternalFunc(NonZeroUsize);

/// The tag bit selecting the host function variant.
const HOST_TAG: usize = 1;

/// The resolved variant of an [`InternalFunc`].
#[derive(Debug, Copy, Clone)]
pub(crate) enum FuncEntity {
    /// A Wasm function.
    Wasm(EntityHandle<WasmFuncEntity>),
    /// A host function.
    Host(EntityHandle<HostFuncEntity>),
}

impl InternalFunc {
    /// Creates an [`InternalFunc`] from a Wasm function entity handle.
    pub fn from_wasm(handle: EntityHandle<WasmFuncEntity>) -> Self {
        let bits = handle.to_bits();
        debug_assert_eq!(bits & HOST_TAG, 0);
        Self(NonZeroUsize::new(bits).expect("entity handles are never null"))
    }

    /// Creates an [`InternalFunc`] from a host function entity handle.
    pub fn from_host(handle: EntityHandle<HostFuncEntity>) -> Self {
        let bits = handle.to_bits();
        debug_assert_eq!(bits & HOST_TAG, 0);
        Self(NonZeroUsize::new(bits | HOST_TAG).expect("entity handles are never null"))
    }

    /// Resolves the tagged handle to its [`FuncEntity`] variant.
    #[inline]
    pub fn entity(self) -> FuncEntity {
        let bits = self.0.get();
        // Safety: the untagged bits are exactly the entity handle bits this
        //         value was created from; the owning store is alive as long
        //         as any function handle circulates.
        if bits & HOST_TAG == 0 {
            FuncEntity::Wasm(unsafe { EntityHandle::from_bits(bits) })
        } else {
            FuncEntity::Host(unsafe { EntityHandle::from_bits(bits & !HOST_TAG) })
        }
    }

    /// Returns the raw bits of the tagged handle.
    #[inline]
    pub fn to_bits(self) -> u64 {
        self.0.get() as u64
    }

    /// Recreates an [`InternalFunc`] from raw bits.
    ///
    /// Returns `None` for the zero bit pattern which encodes a `null`
    /// function reference.
    #[inline]
    pub fn from_bits(bits: u64) -> Option<Self> {
        NonZeroUsize::new(bits as usize).map(Self)
    }
}

/// A Wasm or host function reference.
///
/// Function equality is identity: two [`Func`]s are equal if and only if
/// they refer to the same function entity.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(transparent)]
pub struct Func(InternalFunc);

impl Func {
    /// Creates a new host function with the given signature and callable.
    pub fn new<F>(runtime: &mut Runtime, ty: FuncType, func: F) -> Self
    where
        F: Fn(Caller<'_>, &[Val], &mut [Val]) -> Result<(), Trap> + 'static,
    {
        let store = runtime.store_mut();
        let sig = store.intern_func_type(ty);
        let handle = store.alloc_host_func(HostFuncEntity {
            ty: sig,
            callable: Box::new(func),
        });
        Self(InternalFunc::from_host(handle))
    }

    pub(crate) fn from_internal(internal: InternalFunc) -> Self {
        Self(internal)
    }

    pub(crate) fn as_internal(&self) -> InternalFunc {
        self.0
    }

    /// Returns the interned signature id of the function.
    pub(crate) fn sig(&self) -> Sig {
        match self.0.entity() {
            FuncEntity::Wasm(handle) => handle.get().ty,
            FuncEntity::Host(handle) => handle.get().ty,
        }
    }

    /// Returns the [`FuncType`] of the function.
    pub fn ty(&self, runtime: &Runtime) -> FuncType {
        runtime.store().resolve_func_type(self.sig()).clone()
    }

    /// Invokes the function with the given arguments.
    ///
    /// # Errors
    ///
    /// - If the argument values do not match the function's parameter types.
    /// - If execution traps.
    pub fn invoke(&self, runtime: &mut Runtime, args: &[Val]) -> Result<Vec<Val>, Error> {
        self.invoke_with_store(runtime.store_mut(), args)
    }

    /// Invokes the function on the given [`Store`].
    ///
    /// Every invocation receives a fresh execution state so that host
    /// functions may re-enter other exports of the same store.
    pub(crate) fn invoke_with_store(
        &self,
        store: &mut Store,
        args: &[Val],
    ) -> Result<Vec<Val>, Error> {
        engine::execute_func(store, *self, args)
    }
}

/// A Wasm function entity.
#[derive(Debug)]
pub struct WasmFuncEntity {
    /// The interned signature of the function.
    pub(crate) ty: Sig,
    /// The instance owning the function.
    pub(crate) instance: Instance,
    /// The one-shot lazily compiled code of the function.
    pub(crate) code: CodeBody,
}

impl WasmFuncEntity {
    /// Creates a new uncompiled [`WasmFuncEntity`].
    pub fn new(ty: Sig, instance: Instance, module: Module, func_idx: u32) -> Self {
        Self {
            ty,
            instance,
            code: CodeBody::uncompiled(module, func_idx),
        }
    }
}

/// The code of a Wasm function.
///
/// Starts out uncompiled and transitions exactly once to compiled on the
/// first call. The transition is guarded per entity: concurrent readers
/// either observe the uncompiled state and race to compile (the first
/// result wins and is published with a happens-before edge) or observe the
/// installed compiled code.
pub struct CodeBody {
    /// The module that declared the function.
    module: Module,
    /// The index of the function within its module's function space.
    func_idx: u32,
    /// The one-shot compiled function.
    compiled: Once<CompiledFunc>,
}

impl core::fmt::Debug for CodeBody {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.compiled.get() {
            Some(compiled) => write!(f, "Compiled({compiled:?})"),
            None => write!(f, "Uncompiled(func_idx = {})", self.func_idx),
        }
    }
}

impl CodeBody {
    /// Creates an uncompiled [`CodeBody`].
    fn uncompiled(module: Module, func_idx: u32) -> Self {
        Self {
            module,
            func_idx,
            compiled: Once::new(),
        }
    }

    /// Returns the compiled function, translating it first if necessary.
    ///
    /// # Errors
    ///
    /// If the function body fails to translate.
    pub fn get_or_compile(&self, code: &CodeArena) -> Result<CompiledFunc, Error> {
        if let Some(compiled) = self.compiled.get() {
            return Ok(*compiled);
        }
        self.compile_cold(code)
    }

    #[cold]
    fn compile_cold(&self, code: &CodeArena) -> Result<CompiledFunc, Error> {
        self.compiled
            .try_call_once(|| engine::translate_func(&self.module, self.func_idx, code))
            .map(|compiled| *compiled)
    }
}

/// A host function entity: an interned signature plus an opaque callable.
pub struct HostFuncEntity {
    /// The interned signature of the host function.
    pub(crate) ty: Sig,
    /// The opaque callable implementing the host function.
    pub(crate) callable: HostFuncCallable,
}

impl core::fmt::Debug for HostFuncEntity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HostFuncEntity")
            .field("ty", &self.ty)
            .finish_non_exhaustive()
    }
}
