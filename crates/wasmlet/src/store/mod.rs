//! The store that owns all runtime entities of a [`Runtime`].
//!
//! [`Runtime`]: crate::Runtime

mod interner;
mod pool;

pub use self::{
    interner::Interner,
    pool::{EntityHandle, EntityPool},
};
use crate::{
    engine::CodeArena,
    ir::index::Sig,
    value::ExternObjectEntity,
    DataSegmentEntity, ElementSegmentEntity, FuncType, GlobalEntity, HostFuncEntity,
    InstanceEntity, MemoryEntity, ResourceLimiter, TableEntity, WasmFuncEntity,
};

/// Owns every entity created on behalf of a [`Runtime`] together with the
/// function type interner and the compiled code arena.
///
/// A store and its entities are not safe for concurrent mutation; all
/// access is funneled through a single thread. Entities live until the
/// store is dropped.
///
/// [`Runtime`]: crate::Runtime
pub struct Store {
    /// All Wasm function entities.
    wasm_funcs: EntityPool<WasmFuncEntity>,
    /// All host function entities.
    host_funcs: EntityPool<HostFuncEntity>,
    /// All linear memory entities.
    memories: EntityPool<MemoryEntity>,
    /// All table entities.
    tables: EntityPool<TableEntity>,
    /// All global variable entities.
    globals: EntityPool<GlobalEntity>,
    /// All module instance entities.
    instances: EntityPool<InstanceEntity>,
    /// All data segment entities.
    datas: EntityPool<DataSegmentEntity>,
    /// All element segment entities.
    elems: EntityPool<ElementSegmentEntity>,
    /// All host objects referenced by `externref` values.
    extern_objects: EntityPool<ExternObjectEntity>,
    /// The deduplicating function type interner.
    func_types: Interner<FuncType>,
    /// The arena owning all compiled instruction sequences.
    code: CodeArena,
    /// The optional resource limiter consulted for memory and table growth.
    limiter: Option<Box<dyn ResourceLimiter>>,
    /// The size of the register-file stack in cells for new invocations.
    stack_limit: usize,
}

impl core::fmt::Debug for Store {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Store")
            .field("wasm_funcs", &self.wasm_funcs.len())
            .field("host_funcs", &self.host_funcs.len())
            .field("memories", &self.memories.len())
            .field("tables", &self.tables.len())
            .field("globals", &self.globals.len())
            .field("instances", &self.instances.len())
            .field("func_types", &self.func_types.len())
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Creates a new empty [`Store`].
    pub fn new(stack_limit: usize) -> Self {
        Self {
            wasm_funcs: EntityPool::new(),
            host_funcs: EntityPool::new(),
            memories: EntityPool::new(),
            tables: EntityPool::new(),
            globals: EntityPool::new(),
            instances: EntityPool::new(),
            datas: EntityPool::new(),
            elems: EntityPool::new(),
            extern_objects: EntityPool::new(),
            func_types: Interner::default(),
            code: CodeArena::default(),
            limiter: None,
            stack_limit,
        }
    }

    /// Installs the [`ResourceLimiter`] consulted by this [`Store`].
    pub fn set_limiter(&mut self, limiter: Box<dyn ResourceLimiter>) {
        self.limiter = Some(limiter);
    }

    /// Returns the installed [`ResourceLimiter`] if any.
    pub fn limiter_mut(&mut self) -> Option<&mut (dyn ResourceLimiter + '_)> {
        match &mut self.limiter {
            Some(limiter) => Some(&mut **limiter),
            None => None,
        }
    }

    /// Returns the size of the register-file stack in cells.
    pub fn stack_limit(&self) -> usize {
        self.stack_limit
    }

    /// Returns the compiled code arena of the [`Store`].
    pub fn code(&self) -> &CodeArena {
        &self.code
    }

    /// Interns the function type and returns its dense signature id.
    ///
    /// Interned ids are stable for the lifetime of the [`Store`].
    pub fn intern_func_type(&mut self, func_type: FuncType) -> Sig {
        Sig::from(self.func_types.intern(func_type))
    }

    /// Resolves the signature id to its interned [`FuncType`].
    ///
    /// # Panics
    ///
    /// If `sig` does not stem from this [`Store`].
    pub fn resolve_func_type(&self, sig: Sig) -> &FuncType {
        self.func_types
            .resolve(u32::from(sig))
            .unwrap_or_else(|| panic!("failed to resolve interned function type: {sig:?}"))
    }

    /// Allocates a new Wasm function entity.
    pub fn alloc_wasm_func(&mut self, entity: WasmFuncEntity) -> EntityHandle<WasmFuncEntity> {
        self.wasm_funcs.alloc(entity)
    }

    /// Allocates a new host function entity.
    pub fn alloc_host_func(&mut self, entity: HostFuncEntity) -> EntityHandle<HostFuncEntity> {
        self.host_funcs.alloc(entity)
    }

    /// Allocates a new linear memory entity.
    pub fn alloc_memory(&mut self, entity: MemoryEntity) -> EntityHandle<MemoryEntity> {
        self.memories.alloc(entity)
    }

    /// Allocates a new table entity.
    pub fn alloc_table(&mut self, entity: TableEntity) -> EntityHandle<TableEntity> {
        self.tables.alloc(entity)
    }

    /// Allocates a new global variable entity.
    pub fn alloc_global(&mut self, entity: GlobalEntity) -> EntityHandle<GlobalEntity> {
        self.globals.alloc(entity)
    }

    /// Reserves an uninitialized instance entity.
    ///
    /// Reserving the handle first allows entities created during instance
    /// allocation to refer to their instance by identity before it is
    /// initialized.
    pub fn alloc_instance(&mut self) -> EntityHandle<InstanceEntity> {
        self.instances.alloc(InstanceEntity::uninitialized())
    }

    /// Allocates a new data segment entity.
    pub fn alloc_data_segment(
        &mut self,
        entity: DataSegmentEntity,
    ) -> EntityHandle<DataSegmentEntity> {
        self.datas.alloc(entity)
    }

    /// Allocates a new element segment entity.
    pub fn alloc_element_segment(
        &mut self,
        entity: ElementSegmentEntity,
    ) -> EntityHandle<ElementSegmentEntity> {
        self.elems.alloc(entity)
    }

    /// Allocates a new host object for an `externref` value.
    pub fn alloc_extern_object(
        &mut self,
        entity: ExternObjectEntity,
    ) -> EntityHandle<ExternObjectEntity> {
        self.extern_objects.alloc(entity)
    }

    /// Returns the number of instances allocated in the [`Store`].
    pub fn len_instances(&self) -> usize {
        self.instances.len()
    }

    /// Returns the number of memories allocated in the [`Store`].
    pub fn len_memories(&self) -> usize {
        self.memories.len()
    }

    /// Returns the number of tables allocated in the [`Store`].
    pub fn len_tables(&self) -> usize {
        self.tables.len()
    }
}
