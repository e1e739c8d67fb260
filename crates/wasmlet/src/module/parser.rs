use super::{
    ConstExpr, DataSegmentDef, ElementKindDef, ElementSegmentDef, ExternIdx, Import,
    ImportCounts, ImportKind, Module, ModuleInner,
};
use crate::{
    global::{GlobalType, Mutability},
    ir::index::Sig,
    memory::MemoryError,
    table::TableError,
    Error, FuncType, MemoryType, Runtime, TableType, ValType,
};
use core::ops::Range;
use std::{collections::BTreeMap, sync::Arc};
use wasmparser::{
    ExternalKind, FuncValidatorAllocations, Parser, Payload, TypeRef, ValidPayload, Validator,
};

/// Converts a [`wasmparser::ValType`] into a wasmlet [`ValType`].
///
/// # Panics
///
/// For value types of Wasm proposals that validation has been configured
/// to reject.
pub(crate) fn value_type(ty: wasmparser::ValType) -> ValType {
    match ty {
        wasmparser::ValType::I32 => ValType::I32,
        wasmparser::ValType::I64 => ValType::I64,
        wasmparser::ValType::F32 => ValType::F32,
        wasmparser::ValType::F64 => ValType::F64,
        wasmparser::ValType::Ref(ty) => ref_type(ty),
        wasmparser::ValType::V128 => panic!("simd value types are not supported"),
    }
}

/// Converts a [`wasmparser::RefType`] into a wasmlet [`ValType`].
fn ref_type(ty: wasmparser::RefType) -> ValType {
    if ty.is_func_ref() {
        return ValType::FuncRef;
    }
    if ty.is_extern_ref() {
        return ValType::ExternRef;
    }
    panic!("typed function references are not supported")
}

/// Converts a [`wasmparser::FuncType`] into a wasmlet [`FuncType`].
fn func_type(ty: &wasmparser::FuncType) -> FuncType {
    let params = ty.params().iter().copied().map(value_type);
    let results = ty.results().iter().copied().map(value_type);
    FuncType::new(params, results)
}

/// Converts a [`wasmparser::TableType`] into a wasmlet [`TableType`].
fn table_type(ty: wasmparser::TableType) -> Result<TableType, TableError> {
    let element = ref_type(ty.element_type);
    let minimum = ty.initial as u32;
    let maximum = ty.maximum.map(|max| max as u32);
    TableType::new(element, minimum, maximum)
}

/// Converts a [`wasmparser::MemoryType`] into a wasmlet [`MemoryType`].
fn memory_type(ty: wasmparser::MemoryType) -> Result<MemoryType, MemoryError> {
    debug_assert!(!ty.memory64 && !ty.shared);
    let minimum = ty.initial as u32;
    let maximum = ty.maximum.map(|max| max as u32);
    MemoryType::new(minimum, maximum)
}

/// Converts a [`wasmparser::GlobalType`] into a wasmlet [`GlobalType`].
fn global_type(ty: wasmparser::GlobalType) -> GlobalType {
    let mutability = match ty.mutable {
        true => Mutability::Var,
        false => Mutability::Const,
    };
    GlobalType::new(value_type(ty.content_type), mutability)
}

/// Parses and validates `bytes` into a [`Module`].
pub(crate) fn parse(runtime: &mut Runtime, bytes: &[u8]) -> Result<Module, Error> {
    ModuleParser::new(runtime).parse(bytes)
}

/// Context used to construct a [`Module`] from a stream of Wasm payloads.
struct ModuleParser<'rt> {
    /// The runtime whose store interns the module's function types.
    runtime: &'rt mut Runtime,
    /// The Wasm validator driven over all payloads.
    validator: Validator,
    /// Reusable allocations for function body validation.
    allocations: FuncValidatorAllocations,
    /// The types of the module's type section.
    func_types: Vec<FuncType>,
    /// The interned signatures of the type section.
    sigs: Vec<Sig>,
    /// The imports in import order.
    imports: Vec<Import>,
    /// The type indices over the merged function space.
    funcs: Vec<u32>,
    /// The table types over the merged table space.
    tables: Vec<TableType>,
    /// The memory types over the merged memory space.
    memories: Vec<MemoryType>,
    /// The global types over the merged global space.
    globals: Vec<GlobalType>,
    /// The initializers of the module-local globals.
    globals_init: Vec<ConstExpr>,
    /// The exports by name.
    exports: BTreeMap<Box<str>, ExternIdx>,
    /// The start function if any.
    start: Option<u32>,
    /// The parsed element segments.
    element_segments: Vec<ElementSegmentDef>,
    /// The parsed data segments.
    data_segments: Vec<DataSegmentDef>,
    /// The body byte ranges of the module-local functions.
    bodies: Vec<Range<usize>>,
    /// The numbers of imported entities per kind.
    len_imported: ImportCounts,
}

impl<'rt> ModuleParser<'rt> {
    /// Creates a new [`ModuleParser`] for the given [`Runtime`].
    fn new(runtime: &'rt mut Runtime) -> Self {
        let validator = Validator::new_with_features(runtime.config().wasm_features());
        Self {
            runtime,
            validator,
            allocations: FuncValidatorAllocations::default(),
            func_types: Vec::new(),
            sigs: Vec::new(),
            imports: Vec::new(),
            funcs: Vec::new(),
            tables: Vec::new(),
            memories: Vec::new(),
            globals: Vec::new(),
            globals_init: Vec::new(),
            exports: BTreeMap::new(),
            start: None,
            element_segments: Vec::new(),
            data_segments: Vec::new(),
            bodies: Vec::new(),
            len_imported: ImportCounts::default(),
        }
    }

    /// Drives parsing and validation over all payloads of `bytes`.
    fn parse(mut self, bytes: &[u8]) -> Result<Module, Error> {
        for payload in Parser::new(0).parse_all(bytes) {
            let payload = payload?;
            match self.validator.payload(&payload)? {
                ValidPayload::Func(to_validate, body) => {
                    // Bodies are validated eagerly; the lazy translator
                    // later consumes them trusting their validity.
                    let allocations = core::mem::take(&mut self.allocations);
                    let mut validator = to_validate.into_validator(allocations);
                    validator.validate(&body)?;
                    self.allocations = validator.into_allocations();
                    self.bodies.push(body.range());
                }
                ValidPayload::Ok | ValidPayload::Parser(_) | ValidPayload::End(_) => {}
            }
            self.process_payload(payload)?;
        }
        Ok(self.finish(bytes))
    }

    /// Processes a single parsed payload.
    fn process_payload(&mut self, payload: Payload<'_>) -> Result<(), Error> {
        match payload {
            Payload::TypeSection(section) => {
                for func_type in section.into_iter_err_on_gc_types() {
                    let ty = self::func_type(&func_type?);
                    let sig = self.runtime.store_mut().intern_func_type(ty.clone());
                    self.func_types.push(ty);
                    self.sigs.push(sig);
                }
            }
            Payload::ImportSection(section) => {
                for import in section {
                    self.process_import(import?)?;
                }
            }
            Payload::FunctionSection(section) => {
                for type_idx in section {
                    self.funcs.push(type_idx?);
                }
            }
            Payload::TableSection(section) => {
                for table in section {
                    self.tables.push(table_type(table?.ty)?);
                }
            }
            Payload::MemorySection(section) => {
                for memory in section {
                    self.memories.push(memory_type(memory?)?);
                }
            }
            Payload::GlobalSection(section) => {
                for global in section {
                    let global = global?;
                    self.globals.push(global_type(global.ty));
                    self.globals_init.push(ConstExpr::new(&global.init_expr)?);
                }
            }
            Payload::ExportSection(section) => {
                for export in section {
                    let export = export?;
                    let idx = match export.kind {
                        ExternalKind::Func => ExternIdx::Func(export.index),
                        ExternalKind::Table => ExternIdx::Table(export.index),
                        ExternalKind::Memory => ExternIdx::Memory(export.index),
                        ExternalKind::Global => ExternIdx::Global(export.index),
                        ExternalKind::Tag => panic!("exception tags are not supported"),
                    };
                    self.exports.insert(Box::from(export.name), idx);
                }
            }
            Payload::StartSection { func, .. } => {
                self.start = Some(func);
            }
            Payload::ElementSection(section) => {
                for element in section {
                    self.process_element(element?)?;
                }
            }
            Payload::DataSection(section) => {
                for data in section {
                    self.process_data(data?)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Processes a single import declaration.
    fn process_import(&mut self, import: wasmparser::Import<'_>) -> Result<(), Error> {
        let kind = match import.ty {
            TypeRef::Func(type_idx) => {
                self.funcs.push(type_idx);
                self.len_imported.funcs += 1;
                ImportKind::Func(type_idx)
            }
            TypeRef::Table(ty) => {
                let ty = table_type(ty)?;
                self.tables.push(ty);
                self.len_imported.tables += 1;
                ImportKind::Table(ty)
            }
            TypeRef::Memory(ty) => {
                let ty = memory_type(ty)?;
                self.memories.push(ty);
                self.len_imported.memories += 1;
                ImportKind::Memory(ty)
            }
            TypeRef::Global(ty) => {
                let ty = global_type(ty);
                self.globals.push(ty);
                self.len_imported.globals += 1;
                ImportKind::Global(ty)
            }
            TypeRef::Tag(_) => panic!("exception tags are not supported"),
        };
        self.imports.push(Import {
            module: Box::from(import.module),
            name: Box::from(import.name),
            kind,
        });
        Ok(())
    }

    /// Processes a single element segment.
    fn process_element(&mut self, element: wasmparser::Element<'_>) -> Result<(), Error> {
        let kind = match element.kind {
            wasmparser::ElementKind::Passive => ElementKindDef::Passive,
            wasmparser::ElementKind::Declared => ElementKindDef::Declared,
            wasmparser::ElementKind::Active {
                table_index,
                offset_expr,
            } => ElementKindDef::Active {
                table_index: table_index.unwrap_or(0),
                offset: ConstExpr::new(&offset_expr)?,
            },
        };
        let (ty, items) = match element.items {
            wasmparser::ElementItems::Functions(items) => {
                let items = items
                    .into_iter()
                    .map(|item| item.map(ConstExpr::new_funcref))
                    .collect::<Result<Box<[_]>, _>>()?;
                (ValType::FuncRef, items)
            }
            wasmparser::ElementItems::Expressions(ref_ty, items) => {
                let ty = self::ref_type(ref_ty);
                let items = items
                    .into_iter()
                    .map(|item| ConstExpr::new(&item?))
                    .collect::<Result<Box<[_]>, _>>()?;
                (ty, items)
            }
        };
        self.element_segments
            .push(ElementSegmentDef { kind, ty, items });
        Ok(())
    }

    /// Processes a single data segment.
    fn process_data(&mut self, data: wasmparser::Data<'_>) -> Result<(), Error> {
        let def = match data.kind {
            wasmparser::DataKind::Passive => DataSegmentDef::Passive {
                bytes: Arc::from(data.data),
            },
            wasmparser::DataKind::Active {
                memory_index,
                offset_expr,
            } => DataSegmentDef::Active {
                memory_index,
                offset: ConstExpr::new(&offset_expr)?,
                bytes: Arc::from(data.data),
            },
        };
        self.data_segments.push(def);
        Ok(())
    }

    /// Finishes construction of the [`Module`].
    fn finish(self, bytes: &[u8]) -> Module {
        Module {
            inner: Arc::new(ModuleInner {
                bytes: Arc::from(bytes),
                features: self.runtime.config().wasm_features(),
                func_types: self.func_types.into(),
                sigs: self.sigs.into(),
                imports: self.imports.into(),
                funcs: self.funcs.into(),
                tables: self.tables.into(),
                memories: self.memories.into(),
                globals: self.globals.into(),
                globals_init: self.globals_init.into(),
                exports: self.exports,
                start: self.start,
                element_segments: self.element_segments.into(),
                data_segments: self.data_segments.into(),
                bodies: self.bodies.into(),
                len_imported: self.len_imported,
            }),
        }
    }
}
