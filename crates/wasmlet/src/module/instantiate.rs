use super::{DataSegmentDef, ElementKindDef, EvalContext, ExternIdx, ImportKind, Module, ModuleInner};
use crate::{
    func::{Func, InternalFunc, WasmFuncEntity},
    instance::{Extern, ExternType, Instance, InstanceEntity},
    memory::{DataSegment, DataSegmentEntity, MemoryEntity},
    table::{ElementSegment, ElementSegmentEntity, TableEntity},
    Error, Global, GlobalEntity, Memory, Runtime, Table, TrapCode,
};
use core::fmt::{self, Display};
use std::{collections::BTreeMap, error::Error as StdError};
use wasmlet_core::UntypedVal;

/// Errors that may occur upon instantiating a [`Module`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstantiationError {
    /// The number of resolved imports does not match the number of
    /// declared imports.
    ImportCountMismatch {
        /// The number of imports declared by the module.
        expected: usize,
        /// The number of imports resolved by the embedder.
        actual: usize,
    },
    /// A resolved import is of a different kind than declared.
    ImportKindMismatch {
        /// The position of the import in the module's import order.
        index: usize,
        /// The kind declared by the module.
        expected: ExternType,
        /// The kind of the resolved import.
        actual: ExternType,
    },
    /// A resolved import does not satisfy the declared import type.
    IncompatibleImportType {
        /// The position of the import in the module's import order.
        index: usize,
    },
    /// An export refers to an index outside of its merged index space.
    ExportIndexOutOfBounds {
        /// The kind of the export.
        kind: ExternType,
        /// The out-of-bounds index.
        index: u32,
        /// The number of entities in the indexed space.
        count: u32,
    },
    /// A constant initializer referenced a global absent from its
    /// evaluation context.
    MissingGlobal {
        /// The unresolved global index.
        index: u32,
    },
    /// A constant initializer referenced a function absent from its
    /// evaluation context.
    MissingFunction {
        /// The unresolved function index.
        index: u32,
    },
    /// The resource limiter denied the creation of another instance.
    TooManyInstances,
}

impl StdError for InstantiationError {}

impl Display for InstantiationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImportCountMismatch { expected, actual } => {
                write!(
                    f,
                    "expected {expected} imports but {actual} were resolved"
                )
            }
            Self::ImportKindMismatch {
                index,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "import {index}: expected a {expected} import but found a {actual}"
                )
            }
            Self::IncompatibleImportType { index } => {
                write!(f, "import {index}: incompatible import type")
            }
            Self::ExportIndexOutOfBounds { kind, index, count } => {
                write!(
                    f,
                    "export of {kind} {index} is out of bounds of the {count} available"
                )
            }
            Self::MissingGlobal { index } => {
                write!(f, "constant initializer references missing global {index}")
            }
            Self::MissingFunction { index } => {
                write!(
                    f,
                    "constant initializer references missing function {index}"
                )
            }
            Self::TooManyInstances => write!(f, "too many instances for the store"),
        }
    }
}

/// The evaluation context during instance allocation.
///
/// Exposes the already allocated functions and the globals produced so
/// far; the constant expression discipline guarantees forward references
/// are absent.
struct InstantiationContext<'a> {
    funcs: &'a [Func],
    globals: &'a [Global],
}

impl EvalContext for InstantiationContext<'_> {
    fn get_global(&self, index: u32) -> Option<UntypedVal> {
        self.globals
            .get(index as usize)
            .map(|global| global.handle().get().get())
    }

    fn get_func(&self, index: u32) -> Option<Func> {
        self.funcs.get(index as usize).copied()
    }
}

/// Instantiates `module` with the given resolved imports.
///
/// Implements the module allocation algorithm followed by the active
/// segment copies and the start function invocation.
pub(crate) fn instantiate(
    runtime: &mut Runtime,
    module: &Module,
    imports: &[Extern],
) -> Result<Instance, Error> {
    let store = runtime.store_mut();
    let inner = &*module.inner;
    let len_instances = store.len_instances();
    if let Some(limiter) = store.limiter_mut() {
        if len_instances >= limiter.instances() {
            return Err(InstantiationError::TooManyInstances.into());
        }
    }
    if imports.len() != inner.imports.len() {
        return Err(InstantiationError::ImportCountMismatch {
            expected: inner.imports.len(),
            actual: imports.len(),
        }
        .into());
    }

    // Partition the resolved imports by kind, preserving import order
    // within each kind, and check them against the declared import types.
    let mut funcs = Vec::with_capacity(inner.funcs.len());
    let mut tables = Vec::with_capacity(inner.tables.len());
    let mut memories = Vec::with_capacity(inner.memories.len());
    let mut globals = Vec::with_capacity(inner.globals.len());
    for (index, (declared, resolved)) in inner.imports.iter().zip(imports).enumerate() {
        let mismatch = |actual: ExternType| {
            let expected = match &declared.kind {
                ImportKind::Func(_) => ExternType::Func,
                ImportKind::Table(_) => ExternType::Table,
                ImportKind::Memory(_) => ExternType::Memory,
                ImportKind::Global(_) => ExternType::Global,
            };
            InstantiationError::ImportKindMismatch {
                index,
                expected,
                actual,
            }
        };
        match (&declared.kind, resolved) {
            (ImportKind::Func(type_idx), Extern::Func(func)) => {
                let expected = inner.sigs[*type_idx as usize];
                if func.sig() != expected {
                    return Err(InstantiationError::IncompatibleImportType { index }.into());
                }
                funcs.push(*func);
            }
            (ImportKind::Table(expected), Extern::Table(table)) => {
                if !table.handle().get().ty().is_subtype_of(expected) {
                    return Err(InstantiationError::IncompatibleImportType { index }.into());
                }
                tables.push(*table);
            }
            (ImportKind::Memory(expected), Extern::Memory(memory)) => {
                if !memory.handle().get().ty().is_subtype_of(expected) {
                    return Err(InstantiationError::IncompatibleImportType { index }.into());
                }
                memories.push(*memory);
            }
            (ImportKind::Global(expected), Extern::Global(global)) => {
                if global.handle().get().ty() != *expected {
                    return Err(InstantiationError::IncompatibleImportType { index }.into());
                }
                globals.push(*global);
            }
            (_, resolved) => return Err(mismatch(resolved.ty()).into()),
        }
    }

    // Reserve the instance handle first so that entities allocated below
    // can hold their instance by identity.
    let mut handle = store.alloc_instance();
    let instance = Instance(handle);

    // Allocate the module-local functions with the reserved instance.
    for func_idx in inner.len_imported.funcs..inner.funcs.len() as u32 {
        let sig = module.sig_of_func(func_idx);
        let entity = WasmFuncEntity::new(sig, instance, module.clone(), func_idx);
        let handle = store.alloc_wasm_func(entity);
        funcs.push(Func::from_internal(InternalFunc::from_wasm(handle)));
    }

    // Allocate the module-local tables and memories at their declared
    // minimums, consulting the resource limiter.
    for ty in &inner.tables[inner.len_imported.tables as usize..] {
        let null = UntypedVal::from_bits(0);
        let entity = TableEntity::new(*ty, null, store.limiter_mut())?;
        tables.push(Table(store.alloc_table(entity)));
    }
    for ty in &inner.memories[inner.len_imported.memories as usize..] {
        let entity = MemoryEntity::new(*ty, store.limiter_mut())?;
        memories.push(Memory(store.alloc_memory(entity)));
    }

    // Evaluate the constant initializer of every module-local global in a
    // context exposing the functions and the globals produced so far.
    for (ty, init) in inner.globals[inner.len_imported.globals as usize..]
        .iter()
        .zip(&inner.globals_init[..])
    {
        let value = init.eval(&InstantiationContext {
            funcs: &funcs,
            globals: &globals,
        })?;
        globals.push(Global(store.alloc_global(GlobalEntity::new(value, *ty))));
    }

    // Allocate the element segments: passive segments evaluate their items
    // to references; active and declarative segments store an empty list
    // since the active copy happens below and declarative segments are
    // observationally dropped.
    let ctx = InstantiationContext {
        funcs: &funcs,
        globals: &globals,
    };
    let mut element_segments = Vec::with_capacity(inner.element_segments.len());
    for def in &inner.element_segments[..] {
        let entity = match def.kind {
            ElementKindDef::Passive => {
                let items = def
                    .items
                    .iter()
                    .map(|item| item.eval(&ctx))
                    .collect::<Result<Box<[_]>, _>>()?;
                ElementSegmentEntity::passive(items)
            }
            ElementKindDef::Active { .. } | ElementKindDef::Declared => {
                ElementSegmentEntity::empty()
            }
        };
        element_segments.push(ElementSegment(store.alloc_element_segment(entity)));
    }

    // Allocate the data segments: passive segments retain their bytes;
    // active segments are stored empty after their copy is scheduled.
    let mut data_segments = Vec::with_capacity(inner.data_segments.len());
    for def in &inner.data_segments[..] {
        let entity = match def {
            DataSegmentDef::Passive { bytes } => DataSegmentEntity::passive(bytes.clone()),
            DataSegmentDef::Active { .. } => DataSegmentEntity::active(),
        };
        data_segments.push(DataSegment(store.alloc_data_segment(entity)));
    }

    // Build the export map by resolving each export against its merged
    // index space.
    let mut exports = BTreeMap::new();
    for (name, idx) in &inner.exports {
        let resolve_err = |kind: ExternType, index: u32, count: usize| {
            InstantiationError::ExportIndexOutOfBounds {
                kind,
                index,
                count: count as u32,
            }
        };
        let external = match *idx {
            ExternIdx::Func(index) => Extern::Func(
                funcs
                    .get(index as usize)
                    .copied()
                    .ok_or_else(|| resolve_err(ExternType::Func, index, funcs.len()))?,
            ),
            ExternIdx::Table(index) => Extern::Table(
                tables
                    .get(index as usize)
                    .copied()
                    .ok_or_else(|| resolve_err(ExternType::Table, index, tables.len()))?,
            ),
            ExternIdx::Memory(index) => Extern::Memory(
                memories
                    .get(index as usize)
                    .copied()
                    .ok_or_else(|| resolve_err(ExternType::Memory, index, memories.len()))?,
            ),
            ExternIdx::Global(index) => Extern::Global(
                globals
                    .get(index as usize)
                    .copied()
                    .ok_or_else(|| resolve_err(ExternType::Global, index, globals.len()))?,
            ),
        };
        exports.insert(name.clone(), external);
    }

    // Initialize the reserved instance handle.
    *handle.get_mut() = InstanceEntity::new(
        inner.sigs.clone(),
        funcs.clone().into(),
        tables.clone().into(),
        memories.clone().into(),
        globals.clone().into(),
        data_segments.into(),
        element_segments.clone().into(),
        exports,
    );
    debug_assert!(handle.get().is_initialized());

    // Perform the active segment copies with `table.init` and
    // `memory.init` semantics followed by a segment drop. A trapping copy
    // aborts the remaining initialization, but the instance is
    // nonetheless returned with the trap recorded on it; embedders may
    // choose to discard it.
    let ctx = InstantiationContext {
        funcs: &funcs,
        globals: &globals,
    };
    if let Some(trap_code) = copy_active_segments(inner, &ctx, &tables, &memories)? {
        handle.get_mut().set_init_trap(trap_code);
        return Ok(instance);
    }

    // Invoke the start function if present.
    if let Some(start) = inner.start {
        let func = funcs[start as usize];
        func.invoke_with_store(runtime.store_mut(), &[])?;
    }
    Ok(instance)
}

/// Performs the active element and data segment copies.
///
/// Returns the [`TrapCode`] of the first trapping copy if any. Failures to
/// evaluate an offset or item expression surface as errors.
fn copy_active_segments(
    inner: &ModuleInner,
    ctx: &InstantiationContext<'_>,
    tables: &[Table],
    memories: &[Memory],
) -> Result<Option<TrapCode>, Error> {
    for def in &inner.element_segments[..] {
        let ElementKindDef::Active {
            table_index,
            ref offset,
        } = def.kind
        else {
            continue;
        };
        let offset = u32::from(offset.eval(ctx)?);
        let items = def
            .items
            .iter()
            .map(|item| item.eval(ctx))
            .collect::<Result<Box<[_]>, _>>()?;
        let mut table = tables[table_index as usize];
        if let Err(trap_code) = table.0.get_mut().init(offset, &items, 0, items.len() as u32) {
            return Ok(Some(trap_code));
        }
    }
    for def in &inner.data_segments[..] {
        let DataSegmentDef::Active {
            memory_index,
            ref offset,
            ref bytes,
        } = *def
        else {
            continue;
        };
        let offset = u32::from(offset.eval(ctx)?) as usize;
        let mut memory = memories[memory_index as usize];
        let memory_bytes = memory.0.get_mut().bytes_mut();
        let Some(dst) = offset
            .checked_add(bytes.len())
            .and_then(|end| memory_bytes.get_mut(offset..end))
        else {
            return Ok(Some(TrapCode::OutOfBoundsMemoryAccess));
        };
        dst.copy_from_slice(bytes);
    }
    Ok(None)
}
