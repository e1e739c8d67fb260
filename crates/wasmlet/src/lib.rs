#![recursion_limit = "1024"]
//! The wasmlet virtual machine definitions.
//!
//! wasmlet executes validated WebAssembly modules with a register-machine
//! interpreter. Function bodies are lowered lazily on their first call from
//! the stack-based Wasm representation into an internal register
//! instruction sequence which a tight dispatch loop then executes.
//!
//! # Example
//!
//! ```
//! use wasmlet::{Module, Runtime, Val};
//!
//! fn main() -> Result<(), wasmlet::Error> {
//!     let wasm = wat::parse_str(
//!         r#"
//!         (module
//!             (func (export "add") (param i32 i32) (result i32)
//!                 local.get 0
//!                 local.get 1
//!                 i32.add
//!             )
//!         )
//!     "#,
//!     )
//!     .unwrap();
//!     let mut runtime = Runtime::new();
//!     let module = Module::parse(&mut runtime, &wasm)?;
//!     let instance = runtime.instantiate(&module, &[])?;
//!     let add = instance
//!         .export("add")
//!         .and_then(|ext| ext.into_func())
//!         .expect("missing `add` export");
//!     let results = add.invoke(&mut runtime, &[Val::I32(3), Val::I32(4)])?;
//!     assert_eq!(results, [Val::I32(7)]);
//!     Ok(())
//! }
//! ```

#![warn(
    clippy::cast_lossless,
    clippy::missing_errors_doc,
    clippy::used_underscore_binding,
    clippy::redundant_closure_for_method_calls,
    clippy::type_repetition_in_bounds,
    clippy::inconsistent_struct_constructor,
    clippy::default_trait_access,
    clippy::items_after_statements
)]

mod engine;
mod error;
mod func;
mod global;
mod instance;
mod limits;
mod memory;
mod module;
mod runtime;
mod store;
mod table;
mod value;

/// Definitions from the `wasmlet_core` crate.
pub mod core {
    pub use wasmlet_core::{
        FuncType, HostError, ResourceLimiter, Trap, TrapCode, ValType, F32, F64,
    };
}

/// Definitions from the `wasmlet_ir` crate.
use wasmlet_ir as ir;

/// Defines the errors that may occur upon interaction with wasmlet.
pub mod errors {
    pub use super::{
        error::ErrorKind,
        func::FuncError,
        global::GlobalError,
        memory::MemoryError,
        module::{InstantiationError, TranslationError},
        table::TableError,
    };
}

pub use self::{
    engine::Config,
    error::Error,
    func::{Caller, Func},
    global::{Global, GlobalType, Mutability},
    instance::{Extern, ExternType, Instance},
    limits::{StoreLimits, StoreLimitsBuilder},
    memory::{Memory, MemoryType},
    module::Module,
    runtime::Runtime,
    table::{Table, TableType},
    value::{ExternRef, FuncRef, Val},
};
pub use wasmlet_core::{FuncType, HostError, ResourceLimiter, Trap, TrapCode, ValType, F32, F64};
use self::{
    func::{HostFuncEntity, WasmFuncEntity},
    global::GlobalEntity,
    instance::InstanceEntity,
    memory::{DataSegment, DataSegmentEntity, MemoryEntity},
    table::{ElementSegment, ElementSegmentEntity, TableEntity},
};
