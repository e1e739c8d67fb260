mod init_expr;
mod instantiate;
mod parser;

pub(crate) use self::init_expr::{ConstExpr, EvalContext};
pub(crate) use self::instantiate::instantiate;
pub use self::instantiate::InstantiationError;
use crate::{
    ir::index::Sig, FuncType, GlobalType, MemoryType, Runtime, TableType, ValType,
};
use core::fmt::{self, Display};
use core::ops::Range;
use std::{collections::BTreeMap, error::Error as StdError, sync::Arc};
use wasmparser::WasmFeatures;

/// Errors that may occur while lowering a function body to the register
/// machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    /// The function body is structurally malformed.
    ///
    /// Encountering this after successful validation indicates a bug.
    MalformedExpression,
    /// The operand stack does not match the operator's expectation.
    TypeMismatch {
        /// The number of expected operands.
        expected: usize,
        /// The number of found operands.
        got: usize,
    },
    /// A branch label does not resolve to a control frame.
    UnknownLabel {
        /// The relative depth of the unresolved label.
        depth: u32,
    },
    /// A local index does not resolve to a parameter or local variable.
    UnknownLocal {
        /// The unresolved local index.
        index: u32,
    },
    /// The alignment of a memory operand exceeds the access size.
    InvalidAlignment {
        /// The alignment exponent of the memory operand.
        align: u8,
    },
    /// The function requires more registers than are encodable.
    TooManyRegisters,
}

impl StdError for TranslationError {}

impl Display for TranslationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedExpression => write!(f, "malformed expression"),
            Self::TypeMismatch { expected, got } => {
                write!(f, "operand stack mismatch: expected {expected}, got {got}")
            }
            Self::UnknownLabel { depth } => write!(f, "unknown label at depth {depth}"),
            Self::UnknownLocal { index } => write!(f, "unknown local {index}"),
            Self::InvalidAlignment { align } => write!(f, "invalid alignment 2^{align}"),
            Self::TooManyRegisters => write!(f, "function requires too many registers"),
        }
    }
}

/// A parsed and validated WebAssembly module.
///
/// Cheap to clone: the parsed representation is shared. Function bodies are
/// retained as byte ranges into the original binary and lowered lazily on
/// their first call.
#[derive(Debug, Clone)]
pub struct Module {
    /// The shared parsed module data.
    pub(crate) inner: Arc<ModuleInner>,
}

/// The parsed representation of a [`Module`].
#[derive(Debug)]
pub(crate) struct ModuleInner {
    /// The original Wasm binary.
    pub bytes: Arc<[u8]>,
    /// The Wasm features the module was validated against.
    pub features: WasmFeatures,
    /// The types of the module's type section.
    pub func_types: Box<[FuncType]>,
    /// The interned signature of every type of the type section.
    pub sigs: Box<[Sig]>,
    /// The imports of the module in import order.
    pub imports: Box<[Import]>,
    /// The type indices of all functions over the merged
    /// `imports ++ locals` index space.
    pub funcs: Box<[u32]>,
    /// The types of all tables over the merged index space.
    pub tables: Box<[TableType]>,
    /// The types of all memories over the merged index space.
    pub memories: Box<[MemoryType]>,
    /// The types of all globals over the merged index space.
    pub globals: Box<[GlobalType]>,
    /// The initializer expressions of the module-local globals.
    pub globals_init: Box<[ConstExpr]>,
    /// The exports of the module by name.
    pub exports: BTreeMap<Box<str>, ExternIdx>,
    /// The start function if any.
    pub start: Option<u32>,
    /// The element segments of the module.
    pub element_segments: Box<[ElementSegmentDef]>,
    /// The data segments of the module.
    pub data_segments: Box<[DataSegmentDef]>,
    /// The byte ranges of the bodies of the module-local functions.
    pub bodies: Box<[Range<usize>]>,
    /// The numbers of imported entities per kind.
    pub len_imported: ImportCounts,
}

/// The numbers of imported entities per kind.
#[derive(Debug, Default, Copy, Clone)]
pub(crate) struct ImportCounts {
    pub funcs: u32,
    pub tables: u32,
    pub memories: u32,
    pub globals: u32,
}

/// A single import declaration of a [`Module`].
#[derive(Debug)]
pub(crate) struct Import {
    /// The module name of the import.
    pub module: Box<str>,
    /// The field name of the import.
    pub name: Box<str>,
    /// The expected kind and type of the import.
    pub kind: ImportKind,
}

/// The expected kind and type of an [`Import`].
#[derive(Debug)]
pub(crate) enum ImportKind {
    /// A function import with its type section index.
    Func(u32),
    /// A table import.
    Table(TableType),
    /// A linear memory import.
    Memory(MemoryType),
    /// A global variable import.
    Global(GlobalType),
}

/// The kind and merged-space index of an export.
#[derive(Debug, Copy, Clone)]
pub(crate) enum ExternIdx {
    /// An exported function.
    Func(u32),
    /// An exported table.
    Table(u32),
    /// An exported linear memory.
    Memory(u32),
    /// An exported global variable.
    Global(u32),
}

/// A parsed element segment of a [`Module`].
#[derive(Debug)]
pub(crate) struct ElementSegmentDef {
    /// The kind of the element segment.
    pub kind: ElementKindDef,
    /// The element type of the segment.
    pub ty: ValType,
    /// The constant expressions evaluating to the segment's items.
    pub items: Box<[ConstExpr]>,
}

/// The kind of a parsed element segment.
#[derive(Debug)]
pub(crate) enum ElementKindDef {
    /// A passive element segment.
    Passive,
    /// An active element segment.
    Active {
        /// The index of the table to be initialized.
        table_index: u32,
        /// The offset at which the table is initialized.
        offset: ConstExpr,
    },
    /// A declarative element segment.
    Declared,
}

/// A parsed data segment of a [`Module`].
#[derive(Debug)]
pub(crate) enum DataSegmentDef {
    /// An active data segment copied at instantiation time.
    Active {
        /// The index of the memory to be initialized.
        memory_index: u32,
        /// The offset at which the memory is initialized.
        offset: ConstExpr,
        /// The bytes of the data segment.
        bytes: Arc<[u8]>,
    },
    /// A passive data segment retaining its bytes.
    Passive {
        /// The bytes of the data segment.
        bytes: Arc<[u8]>,
    },
}

impl Module {
    /// Parses and validates the given Wasm binary.
    ///
    /// Function bodies are validated up front but lowered lazily upon
    /// their first call.
    ///
    /// # Errors
    ///
    /// If the Wasm binary fails to parse or validate.
    pub fn parse(runtime: &mut Runtime, bytes: &[u8]) -> Result<Self, crate::Error> {
        parser::parse(runtime, bytes)
    }

    /// Returns the [`FuncType`] of the function at `func_idx` of the
    /// merged function space.
    pub(crate) fn type_of_func(&self, func_idx: u32) -> &FuncType {
        let type_idx = self.inner.funcs[func_idx as usize];
        &self.inner.func_types[type_idx as usize]
    }

    /// Returns the interned signature of the function at `func_idx` of the
    /// merged function space.
    pub(crate) fn sig_of_func(&self, func_idx: u32) -> Sig {
        let type_idx = self.inner.funcs[func_idx as usize];
        self.inner.sigs[type_idx as usize]
    }

    /// Returns the parameter and result arity of the given block type.
    pub(crate) fn block_type_arity(&self, block_type: wasmparser::BlockType) -> (usize, usize) {
        match block_type {
            wasmparser::BlockType::Empty => (0, 0),
            wasmparser::BlockType::Type(_) => (0, 1),
            wasmparser::BlockType::FuncType(type_idx) => {
                let func_type = &self.inner.func_types[type_idx as usize];
                (func_type.len_params(), func_type.len_results())
            }
        }
    }

    /// Returns the number of imported functions.
    pub(crate) fn len_imported_funcs(&self) -> u32 {
        self.inner.len_imported.funcs
    }

    /// Returns the body byte range of the module-local function at
    /// `func_idx` of the merged function space.
    pub(crate) fn body_of_func(&self, func_idx: u32) -> Range<usize> {
        let local_idx = func_idx - self.len_imported_funcs();
        self.inner.bodies[local_idx as usize].clone()
    }
}
