//! The register-based instruction representation of the wasmlet interpreter.
//!
//! Wasm expressions operate on an implicit operand stack. The translator
//! lowers them into the flat [`Instruction`] sequence defined here whose
//! operands are indices into the register file of the executing frame.

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

mod error;
pub mod index;
mod instruction;
mod op;
mod primitive;
mod sequence;

pub use self::{
    error::Error,
    instruction::Instruction,
    op::{BinaryOp, LoadOp, StoreOp, UnaryOp},
    primitive::{BranchOffset, Instr, Reg},
    sequence::InstrSequence,
};
