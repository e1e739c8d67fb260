//! Evaluation of the grouped operator selectors.

use crate::ir::{BinaryOp, LoadOp, StoreOp, UnaryOp};
use wasmlet_core::{memory, wasm, TrapCode, UntypedVal};

/// Evaluates the binary operator `op` on `lhs` and `rhs`.
///
/// # Errors
///
/// If the operator traps, e.g. on division by zero.
#[inline]
pub fn eval_binary(op: BinaryOp, lhs: UntypedVal, rhs: UntypedVal) -> Result<UntypedVal, TrapCode> {
    use BinaryOp as Op;
    let value = match op {
        Op::I32Add => wasm::i32_add(lhs.into(), rhs.into()).into(),
        Op::I32Sub => wasm::i32_sub(lhs.into(), rhs.into()).into(),
        Op::I32Mul => wasm::i32_mul(lhs.into(), rhs.into()).into(),
        Op::I32DivS => wasm::i32_div_s(lhs.into(), rhs.into())?.into(),
        Op::I32DivU => wasm::i32_div_u(lhs.into(), rhs.into())?.into(),
        Op::I32RemS => wasm::i32_rem_s(lhs.into(), rhs.into())?.into(),
        Op::I32RemU => wasm::i32_rem_u(lhs.into(), rhs.into())?.into(),
        Op::I32And => wasm::i32_bitand(lhs.into(), rhs.into()).into(),
        Op::I32Or => wasm::i32_bitor(lhs.into(), rhs.into()).into(),
        Op::I32Xor => wasm::i32_bitxor(lhs.into(), rhs.into()).into(),
        Op::I32Shl => wasm::i32_shl(lhs.into(), rhs.into()).into(),
        Op::I32ShrS => wasm::i32_shr_s(lhs.into(), rhs.into()).into(),
        Op::I32ShrU => wasm::i32_shr_u(lhs.into(), rhs.into()).into(),
        Op::I32Rotl => wasm::i32_rotl(lhs.into(), rhs.into()).into(),
        Op::I32Rotr => wasm::i32_rotr(lhs.into(), rhs.into()).into(),
        Op::I64Add => wasm::i64_add(lhs.into(), rhs.into()).into(),
        Op::I64Sub => wasm::i64_sub(lhs.into(), rhs.into()).into(),
        Op::I64Mul => wasm::i64_mul(lhs.into(), rhs.into()).into(),
        Op::I64DivS => wasm::i64_div_s(lhs.into(), rhs.into())?.into(),
        Op::I64DivU => wasm::i64_div_u(lhs.into(), rhs.into())?.into(),
        Op::I64RemS => wasm::i64_rem_s(lhs.into(), rhs.into())?.into(),
        Op::I64RemU => wasm::i64_rem_u(lhs.into(), rhs.into())?.into(),
        Op::I64And => wasm::i64_bitand(lhs.into(), rhs.into()).into(),
        Op::I64Or => wasm::i64_bitor(lhs.into(), rhs.into()).into(),
        Op::I64Xor => wasm::i64_bitxor(lhs.into(), rhs.into()).into(),
        Op::I64Shl => wasm::i64_shl(lhs.into(), rhs.into()).into(),
        Op::I64ShrS => wasm::i64_shr_s(lhs.into(), rhs.into()).into(),
        Op::I64ShrU => wasm::i64_shr_u(lhs.into(), rhs.into()).into(),
        Op::I64Rotl => wasm::i64_rotl(lhs.into(), rhs.into()).into(),
        Op::I64Rotr => wasm::i64_rotr(lhs.into(), rhs.into()).into(),
        Op::I32Eq => wasm::i32_eq(lhs.into(), rhs.into()).into(),
        Op::I32Ne => wasm::i32_ne(lhs.into(), rhs.into()).into(),
        Op::I32LtS => wasm::i32_lt_s(lhs.into(), rhs.into()).into(),
        Op::I32LtU => wasm::i32_lt_u(lhs.into(), rhs.into()).into(),
        Op::I32GtS => wasm::i32_gt_s(lhs.into(), rhs.into()).into(),
        Op::I32GtU => wasm::i32_gt_u(lhs.into(), rhs.into()).into(),
        Op::I32LeS => wasm::i32_le_s(lhs.into(), rhs.into()).into(),
        Op::I32LeU => wasm::i32_le_u(lhs.into(), rhs.into()).into(),
        Op::I32GeS => wasm::i32_ge_s(lhs.into(), rhs.into()).into(),
        Op::I32GeU => wasm::i32_ge_u(lhs.into(), rhs.into()).into(),
        Op::I64Eq => wasm::i64_eq(lhs.into(), rhs.into()).into(),
        Op::I64Ne => wasm::i64_ne(lhs.into(), rhs.into()).into(),
        Op::I64LtS => wasm::i64_lt_s(lhs.into(), rhs.into()).into(),
        Op::I64LtU => wasm::i64_lt_u(lhs.into(), rhs.into()).into(),
        Op::I64GtS => wasm::i64_gt_s(lhs.into(), rhs.into()).into(),
        Op::I64GtU => wasm::i64_gt_u(lhs.into(), rhs.into()).into(),
        Op::I64LeS => wasm::i64_le_s(lhs.into(), rhs.into()).into(),
        Op::I64LeU => wasm::i64_le_u(lhs.into(), rhs.into()).into(),
        Op::I64GeS => wasm::i64_ge_s(lhs.into(), rhs.into()).into(),
        Op::I64GeU => wasm::i64_ge_u(lhs.into(), rhs.into()).into(),
        Op::F32Eq => wasm::f32_eq(lhs.into(), rhs.into()).into(),
        Op::F32Ne => wasm::f32_ne(lhs.into(), rhs.into()).into(),
        Op::F32Lt => wasm::f32_lt(lhs.into(), rhs.into()).into(),
        Op::F32Gt => wasm::f32_gt(lhs.into(), rhs.into()).into(),
        Op::F32Le => wasm::f32_le(lhs.into(), rhs.into()).into(),
        Op::F32Ge => wasm::f32_ge(lhs.into(), rhs.into()).into(),
        Op::F64Eq => wasm::f64_eq(lhs.into(), rhs.into()).into(),
        Op::F64Ne => wasm::f64_ne(lhs.into(), rhs.into()).into(),
        Op::F64Lt => wasm::f64_lt(lhs.into(), rhs.into()).into(),
        Op::F64Gt => wasm::f64_gt(lhs.into(), rhs.into()).into(),
        Op::F64Le => wasm::f64_le(lhs.into(), rhs.into()).into(),
        Op::F64Ge => wasm::f64_ge(lhs.into(), rhs.into()).into(),
        Op::F32Add => wasm::f32_add(lhs.into(), rhs.into()).into(),
        Op::F32Sub => wasm::f32_sub(lhs.into(), rhs.into()).into(),
        Op::F32Mul => wasm::f32_mul(lhs.into(), rhs.into()).into(),
        Op::F32Div => wasm::f32_div(lhs.into(), rhs.into()).into(),
        Op::F32Min => wasm::f32_min(lhs.into(), rhs.into()).into(),
        Op::F32Max => wasm::f32_max(lhs.into(), rhs.into()).into(),
        Op::F32Copysign => wasm::f32_copysign(lhs.into(), rhs.into()).into(),
        Op::F64Add => wasm::f64_add(lhs.into(), rhs.into()).into(),
        Op::F64Sub => wasm::f64_sub(lhs.into(), rhs.into()).into(),
        Op::F64Mul => wasm::f64_mul(lhs.into(), rhs.into()).into(),
        Op::F64Div => wasm::f64_div(lhs.into(), rhs.into()).into(),
        Op::F64Min => wasm::f64_min(lhs.into(), rhs.into()).into(),
        Op::F64Max => wasm::f64_max(lhs.into(), rhs.into()).into(),
        Op::F64Copysign => wasm::f64_copysign(lhs.into(), rhs.into()).into(),
    };
    Ok(value)
}

/// Evaluates the unary or conversion operator `op` on `value`.
///
/// # Errors
///
/// If the operator traps, e.g. on a NaN truncation.
#[inline]
pub fn eval_unary(op: UnaryOp, value: UntypedVal) -> Result<UntypedVal, TrapCode> {
    use UnaryOp as Op;
    let value = match op {
        Op::I32Clz => wasm::i32_clz(value.into()).into(),
        Op::I32Ctz => wasm::i32_ctz(value.into()).into(),
        Op::I32Popcnt => wasm::i32_popcnt(value.into()).into(),
        Op::I32Eqz => wasm::i32_eqz(value.into()).into(),
        Op::I64Clz => wasm::i64_clz(value.into()).into(),
        Op::I64Ctz => wasm::i64_ctz(value.into()).into(),
        Op::I64Popcnt => wasm::i64_popcnt(value.into()).into(),
        Op::I64Eqz => wasm::i64_eqz(value.into()).into(),
        Op::F32Abs => wasm::f32_abs(value.into()).into(),
        Op::F32Neg => wasm::f32_neg(value.into()).into(),
        Op::F32Ceil => wasm::f32_ceil(value.into()).into(),
        Op::F32Floor => wasm::f32_floor(value.into()).into(),
        Op::F32Trunc => wasm::f32_trunc(value.into()).into(),
        Op::F32Nearest => wasm::f32_nearest(value.into()).into(),
        Op::F32Sqrt => wasm::f32_sqrt(value.into()).into(),
        Op::F64Abs => wasm::f64_abs(value.into()).into(),
        Op::F64Neg => wasm::f64_neg(value.into()).into(),
        Op::F64Ceil => wasm::f64_ceil(value.into()).into(),
        Op::F64Floor => wasm::f64_floor(value.into()).into(),
        Op::F64Trunc => wasm::f64_trunc(value.into()).into(),
        Op::F64Nearest => wasm::f64_nearest(value.into()).into(),
        Op::F64Sqrt => wasm::f64_sqrt(value.into()).into(),
        Op::I32WrapI64 => wasm::i32_wrap_i64(value.into()).into(),
        Op::I64ExtendI32S => wasm::i64_extend_i32_s(value.into()).into(),
        Op::I64ExtendI32U => wasm::i64_extend_i32_u(value.into()).into(),
        Op::F32DemoteF64 => wasm::f32_demote_f64(value.into()).into(),
        Op::F64PromoteF32 => wasm::f64_promote_f32(value.into()).into(),
        Op::I32TruncF32S => wasm::i32_trunc_f32_s(value.into())?.into(),
        Op::I32TruncF32U => wasm::i32_trunc_f32_u(value.into())?.into(),
        Op::I32TruncF64S => wasm::i32_trunc_f64_s(value.into())?.into(),
        Op::I32TruncF64U => wasm::i32_trunc_f64_u(value.into())?.into(),
        Op::I64TruncF32S => wasm::i64_trunc_f32_s(value.into())?.into(),
        Op::I64TruncF32U => wasm::i64_trunc_f32_u(value.into())?.into(),
        Op::I64TruncF64S => wasm::i64_trunc_f64_s(value.into())?.into(),
        Op::I64TruncF64U => wasm::i64_trunc_f64_u(value.into())?.into(),
        Op::I32TruncSatF32S => wasm::i32_trunc_sat_f32_s(value.into()).into(),
        Op::I32TruncSatF32U => wasm::i32_trunc_sat_f32_u(value.into()).into(),
        Op::I32TruncSatF64S => wasm::i32_trunc_sat_f64_s(value.into()).into(),
        Op::I32TruncSatF64U => wasm::i32_trunc_sat_f64_u(value.into()).into(),
        Op::I64TruncSatF32S => wasm::i64_trunc_sat_f32_s(value.into()).into(),
        Op::I64TruncSatF32U => wasm::i64_trunc_sat_f32_u(value.into()).into(),
        Op::I64TruncSatF64S => wasm::i64_trunc_sat_f64_s(value.into()).into(),
        Op::I64TruncSatF64U => wasm::i64_trunc_sat_f64_u(value.into()).into(),
        Op::F32ConvertI32S => wasm::f32_convert_i32_s(value.into()).into(),
        Op::F32ConvertI32U => wasm::f32_convert_i32_u(value.into()).into(),
        Op::F32ConvertI64S => wasm::f32_convert_i64_s(value.into()).into(),
        Op::F32ConvertI64U => wasm::f32_convert_i64_u(value.into()).into(),
        Op::F64ConvertI32S => wasm::f64_convert_i32_s(value.into()).into(),
        Op::F64ConvertI32U => wasm::f64_convert_i32_u(value.into()).into(),
        Op::F64ConvertI64S => wasm::f64_convert_i64_s(value.into()).into(),
        Op::F64ConvertI64U => wasm::f64_convert_i64_u(value.into()).into(),
        Op::I32ReinterpretF32 => wasm::i32_reinterpret_f32(value.into()).into(),
        Op::I64ReinterpretF64 => wasm::i64_reinterpret_f64(value.into()).into(),
        Op::F32ReinterpretI32 => wasm::f32_reinterpret_i32(value.into()).into(),
        Op::F64ReinterpretI64 => wasm::f64_reinterpret_i64(value.into()).into(),
        Op::I32Extend8S => wasm::i32_extend8_s(value.into()).into(),
        Op::I32Extend16S => wasm::i32_extend16_s(value.into()).into(),
        Op::I64Extend8S => wasm::i64_extend8_s(value.into()).into(),
        Op::I64Extend16S => wasm::i64_extend16_s(value.into()).into(),
        Op::I64Extend32S => wasm::i64_extend32_s(value.into()).into(),
    };
    Ok(value)
}

/// Evaluates the load operator `op` against the default memory bytes.
///
/// # Errors
///
/// [`TrapCode::OutOfBoundsMemoryAccess`] if the access is out of bounds.
#[inline]
pub fn eval_load(op: LoadOp, mem: &[u8], ptr: u64, offset: u64) -> Result<UntypedVal, TrapCode> {
    use LoadOp as Op;
    let value = match op {
        Op::Load32 => memory::load::<u32>(mem, ptr, offset)?.into(),
        Op::Load64 => memory::load::<u64>(mem, ptr, offset)?.into(),
        Op::I32Load8S => memory::load_extend::<i8, i32>(mem, ptr, offset)?.into(),
        Op::I32Load8U => memory::load_extend::<u8, i32>(mem, ptr, offset)?.into(),
        Op::I32Load16S => memory::load_extend::<i16, i32>(mem, ptr, offset)?.into(),
        Op::I32Load16U => memory::load_extend::<u16, i32>(mem, ptr, offset)?.into(),
        Op::I64Load8S => memory::load_extend::<i8, i64>(mem, ptr, offset)?.into(),
        Op::I64Load8U => memory::load_extend::<u8, i64>(mem, ptr, offset)?.into(),
        Op::I64Load16S => memory::load_extend::<i16, i64>(mem, ptr, offset)?.into(),
        Op::I64Load16U => memory::load_extend::<u16, i64>(mem, ptr, offset)?.into(),
        Op::I64Load32S => memory::load_extend::<i32, i64>(mem, ptr, offset)?.into(),
        Op::I64Load32U => memory::load_extend::<u32, i64>(mem, ptr, offset)?.into(),
    };
    Ok(value)
}

/// Evaluates the store operator `op` against the default memory bytes.
///
/// # Errors
///
/// [`TrapCode::OutOfBoundsMemoryAccess`] if the access is out of bounds.
#[inline]
pub fn eval_store(
    op: StoreOp,
    mem: &mut [u8],
    ptr: u64,
    offset: u64,
    value: UntypedVal,
) -> Result<(), TrapCode> {
    use StoreOp as Op;
    match op {
        Op::Store32 => memory::store::<u32>(mem, ptr, offset, value.into()),
        Op::Store64 => memory::store::<u64>(mem, ptr, offset, value.into()),
        Op::I32Store8 => memory::store_wrap::<i32, i8>(mem, ptr, offset, value.into()),
        Op::I32Store16 => memory::store_wrap::<i32, i16>(mem, ptr, offset, value.into()),
        Op::I64Store8 => memory::store_wrap::<i64, i8>(mem, ptr, offset, value.into()),
        Op::I64Store16 => memory::store_wrap::<i64, i16>(mem, ptr, offset, value.into()),
        Op::I64Store32 => memory::store_wrap::<i64, i32>(mem, ptr, offset, value.into()),
    }
}
