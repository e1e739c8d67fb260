//! Core primitives shared by the wasmlet interpreter crates.
//!
//! This crate defines the untyped 64-bit value cell, the trap taxonomy,
//! NaN-preserving float wrappers, value and function types and the
//! execution helpers that implement the exact numeric and linear memory
//! semantics of the WebAssembly specification.

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

mod func_type;
pub mod hint;
mod host_error;
mod limiter;
pub mod memory;
mod nan_preserving_float;
mod trap;
mod untyped;
mod value;
pub mod wasm;

pub use self::{
    func_type::FuncType,
    host_error::HostError,
    limiter::ResourceLimiter,
    memory::LittleEndianConvert,
    nan_preserving_float::{F32, F64},
    trap::{Trap, TrapCode},
    untyped::UntypedVal,
    value::ValType,
};
