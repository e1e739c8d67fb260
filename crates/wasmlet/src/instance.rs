use crate::{
    ir::index::Sig,
    store::EntityHandle,
    DataSegment, ElementSegment, Func, Global, Memory, Table, TrapCode,
};
use std::collections::{btree_map, BTreeMap};

/// An external value: the runtime representation of an entity that can be
/// imported or exported.
#[derive(Debug, Copy, Clone)]
pub enum Extern {
    /// A Wasm or host function.
    Func(Func),
    /// A global variable.
    Global(Global),
    /// A linear memory.
    Memory(Memory),
    /// A table.
    Table(Table),
}

impl Extern {
    /// Returns the underlying [`Func`] if `self` is a function.
    pub fn into_func(self) -> Option<Func> {
        match self {
            Self::Func(func) => Some(func),
            _ => None,
        }
    }

    /// Returns the underlying [`Global`] if `self` is a global variable.
    pub fn into_global(self) -> Option<Global> {
        match self {
            Self::Global(global) => Some(global),
            _ => None,
        }
    }

    /// Returns the underlying [`Memory`] if `self` is a linear memory.
    pub fn into_memory(self) -> Option<Memory> {
        match self {
            Self::Memory(memory) => Some(memory),
            _ => None,
        }
    }

    /// Returns the underlying [`Table`] if `self` is a table.
    pub fn into_table(self) -> Option<Table> {
        match self {
            Self::Table(table) => Some(table),
            _ => None,
        }
    }

    /// Returns the [`ExternType`] of the external value.
    pub fn ty(&self) -> ExternType {
        match self {
            Self::Func(_) => ExternType::Func,
            Self::Global(_) => ExternType::Global,
            Self::Memory(_) => ExternType::Memory,
            Self::Table(_) => ExternType::Table,
        }
    }
}

/// The kind of an external value.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExternType {
    /// A function kind.
    Func,
    /// A global variable kind.
    Global,
    /// A linear memory kind.
    Memory,
    /// A table kind.
    Table,
}

impl core::fmt::Display for ExternType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Func => "func",
            Self::Global => "global",
            Self::Memory => "memory",
            Self::Table => "table",
        };
        write!(f, "{name}")
    }
}

/// A module instance entity.
///
/// All index spaces are immutable fixed-length arrays over the merged
/// `imports ++ locals` ordering; indexing in all runtime operations uses
/// this merged space.
#[derive(Debug)]
pub struct InstanceEntity {
    /// Set once the instance allocation initialized the reserved entity.
    initialized: bool,
    /// The interned signature of every type of the module's type section.
    func_types: Box<[Sig]>,
    /// The functions of the instance.
    funcs: Box<[Func]>,
    /// The tables of the instance.
    tables: Box<[Table]>,
    /// The linear memories of the instance.
    memories: Box<[Memory]>,
    /// The global variables of the instance.
    globals: Box<[Global]>,
    /// The data segments of the instance.
    data_segments: Box<[DataSegment]>,
    /// The element segments of the instance.
    element_segments: Box<[ElementSegment]>,
    /// The exports of the instance by name.
    exports: BTreeMap<Box<str>, Extern>,
    /// The trap that aborted the instantiation-time segment copies if any.
    ///
    /// A trapping active segment copy does not discard the instance; the
    /// trap is recorded here instead.
    init_trap: Option<TrapCode>,
}

impl InstanceEntity {
    /// Creates an uninitialized [`InstanceEntity`] reservation.
    pub(crate) fn uninitialized() -> Self {
        Self {
            initialized: false,
            func_types: Box::from([]),
            funcs: Box::from([]),
            tables: Box::from([]),
            memories: Box::from([]),
            globals: Box::from([]),
            data_segments: Box::from([]),
            element_segments: Box::from([]),
            exports: BTreeMap::new(),
            init_trap: None,
        }
    }

    /// Creates an initialized [`InstanceEntity`] from its parts.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        func_types: Box<[Sig]>,
        funcs: Box<[Func]>,
        tables: Box<[Table]>,
        memories: Box<[Memory]>,
        globals: Box<[Global]>,
        data_segments: Box<[DataSegment]>,
        element_segments: Box<[ElementSegment]>,
        exports: BTreeMap<Box<str>, Extern>,
    ) -> Self {
        Self {
            initialized: true,
            func_types,
            funcs,
            tables,
            memories,
            globals,
            data_segments,
            element_segments,
            exports,
            init_trap: None,
        }
    }

    /// Returns `true` if the instance has been fully initialized.
    pub(crate) fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Records the trap that aborted the instantiation-time segment
    /// copies.
    pub(crate) fn set_init_trap(&mut self, trap_code: TrapCode) {
        self.init_trap = Some(trap_code);
    }

    /// Returns the interned signature of the module type at `index` if any.
    #[inline]
    pub(crate) fn get_sig(&self, index: u32) -> Option<Sig> {
        self.func_types.get(index as usize).copied()
    }

    /// Returns the function at `index` of the merged function space if any.
    #[inline]
    pub(crate) fn get_func(&self, index: u32) -> Option<Func> {
        self.funcs.get(index as usize).copied()
    }

    /// Returns the table at `index` of the merged table space if any.
    #[inline]
    pub(crate) fn get_table(&self, index: u32) -> Option<Table> {
        self.tables.get(index as usize).copied()
    }

    /// Returns the memory at `index` of the merged memory space if any.
    #[inline]
    pub(crate) fn get_memory(&self, index: u32) -> Option<Memory> {
        self.memories.get(index as usize).copied()
    }

    /// Returns the global at `index` of the merged global space if any.
    #[inline]
    pub(crate) fn get_global(&self, index: u32) -> Option<Global> {
        self.globals.get(index as usize).copied()
    }

    /// Returns the data segment at `index` if any.
    #[inline]
    pub(crate) fn get_data_segment(&self, index: u32) -> Option<DataSegment> {
        self.data_segments.get(index as usize).copied()
    }

    /// Returns the element segment at `index` if any.
    #[inline]
    pub(crate) fn get_element_segment(&self, index: u32) -> Option<ElementSegment> {
        self.element_segments.get(index as usize).copied()
    }

    /// Returns the export with the given `name` if any.
    pub(crate) fn get_export(&self, name: &str) -> Option<Extern> {
        self.exports.get(name).copied()
    }

    /// Returns an iterator over the exports of the instance.
    pub(crate) fn exports(&self) -> btree_map::Iter<'_, Box<str>, Extern> {
        self.exports.iter()
    }
}

/// A module instance reference.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(transparent)]
pub struct Instance(pub(crate) EntityHandle<InstanceEntity>);

impl Instance {
    /// Returns the export with the given `name` if any.
    pub fn export(&self, name: &str) -> Option<Extern> {
        self.0.get().get_export(name)
    }

    /// Returns the trap that aborted the instantiation-time active
    /// segment copies if any.
    ///
    /// A trapping copy does not discard the instance: instantiation
    /// returns it with the trap recorded so that embedders may decide to
    /// keep or discard it. The start function is not invoked for such an
    /// instance.
    pub fn init_trap(&self) -> Option<TrapCode> {
        self.0.get().init_trap
    }

    /// Returns an iterator over the exports of the instance.
    ///
    /// The order of the yielded exports is sorted by export name.
    pub fn exports(&self) -> impl Iterator<Item = (&str, Extern)> + '_ {
        self.0.get().exports().map(|(name, ext)| (&**name, *ext))
    }

    pub(crate) fn handle(&self) -> EntityHandle<InstanceEntity> {
        self.0
    }

    pub(crate) fn entity(&self) -> &InstanceEntity {
        self.0.get()
    }
}
