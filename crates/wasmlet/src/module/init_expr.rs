//! Representation and evaluation of Wasm constant expressions.
//!
//! Constant expressions determine the offsets of active data and element
//! segments, the items of element segments and the initial values of global
//! variables. They are evaluated at instantiation time without running user
//! code against a context exposing the already allocated functions and
//! globals.

use super::InstantiationError;
use crate::{Error, Func};
use wasmlet_core::UntypedVal;

/// A [`ConstExpr`] evaluation context.
///
/// Exposes the functions and global values that constant expressions may
/// refer to. The Wasm constant expression discipline guarantees that
/// forward references are absent.
pub trait EvalContext {
    /// Returns the value of the global variable at `index` if any.
    fn get_global(&self, index: u32) -> Option<UntypedVal>;
    /// Returns the function at `index` if any.
    fn get_func(&self, index: u32) -> Option<Func>;
}

/// An empty evaluation context for expressions without references.
pub struct EmptyEvalContext;

impl EvalContext for EmptyEvalContext {
    fn get_global(&self, _index: u32) -> Option<UntypedVal> {
        None
    }

    fn get_func(&self, _index: u32) -> Option<Func> {
        None
    }
}

/// The single operator of a [`ConstExpr`].
///
/// With the `extended-const` proposal disabled a constant expression is
/// exactly one of the operators below followed by `end`.
#[derive(Debug, Clone)]
enum Op {
    /// A precomputed constant value.
    ///
    /// Covers `i32.const`, `i64.const`, `f32.const`, `f64.const` and
    /// `ref.null` whose value is the zero bit pattern.
    Const(UntypedVal),
    /// A `global.get index` operator.
    GlobalGet(u32),
    /// A `ref.func index` operator.
    FuncRef(u32),
}

/// A Wasm constant expression.
#[derive(Debug, Clone)]
pub struct ConstExpr {
    /// The root operator of the constant expression.
    op: Op,
}

impl ConstExpr {
    /// Creates a [`ConstExpr`] from the given parsed constant expression.
    ///
    /// # Errors
    ///
    /// If the expression fails to parse or uses operators outside of the
    /// constant expression discipline.
    pub fn new(expr: &wasmparser::ConstExpr<'_>) -> Result<Self, Error> {
        use wasmparser::Operator;
        let mut reader = expr.get_operators_reader();
        let op = match reader.read()? {
            Operator::I32Const { value } => Op::Const(UntypedVal::from(value)),
            Operator::I64Const { value } => Op::Const(UntypedVal::from(value)),
            Operator::F32Const { value } => {
                Op::Const(UntypedVal::from(f32::from_bits(value.bits())))
            }
            Operator::F64Const { value } => {
                Op::Const(UntypedVal::from(f64::from_bits(value.bits())))
            }
            Operator::RefNull { .. } => Op::Const(UntypedVal::from_bits(0)),
            Operator::RefFunc { function_index } => Op::FuncRef(function_index),
            Operator::GlobalGet { global_index } => Op::GlobalGet(global_index),
            unexpected => {
                // Validation with `extended-const` disabled rejects any
                // other operator before translation can observe it.
                panic!("unexpected operator in constant expression: {unexpected:?}")
            }
        };
        // Consume the terminating `end` operator before checking that the
        // reader is fully drained.
        reader.read()?;
        reader.ensure_end()?;
        Ok(Self { op })
    }

    /// Creates a [`ConstExpr`] that evaluates to the function at `index`.
    pub fn new_funcref(function_index: u32) -> Self {
        Self {
            op: Op::FuncRef(function_index),
        }
    }

    /// Evaluates the constant expression against `ctx`.
    ///
    /// # Errors
    ///
    /// - [`InstantiationError::MissingGlobal`] if a referenced global is
    ///   absent from the context.
    /// - [`InstantiationError::MissingFunction`] if a referenced function
    ///   is absent from the context.
    pub fn eval(&self, ctx: &dyn EvalContext) -> Result<UntypedVal, InstantiationError> {
        match &self.op {
            Op::Const(value) => Ok(*value),
            Op::GlobalGet(index) => ctx
                .get_global(*index)
                .ok_or(InstantiationError::MissingGlobal { index: *index }),
            Op::FuncRef(index) => ctx
                .get_func(*index)
                .map(|func| UntypedVal::from_bits(func.as_internal().to_bits()))
                .ok_or(InstantiationError::MissingFunction { index: *index }),
        }
    }

    /// Returns the referenced function index if the expression is a
    /// `ref.func` operator.
    pub fn funcref(&self) -> Option<u32> {
        match &self.op {
            Op::FuncRef(index) => Some(*index),
            _ => None,
        }
    }
}
