//! Execution helpers implementing the exact numeric semantics of Wasm
//! instructions.
//!
//! Fallible helpers return the [`TrapCode`] demanded by the WebAssembly
//! specification: integer division traps on a zero divisor and on the
//! overflowing `MIN / -1` case, float to integer truncation traps on NaN
//! and out of range inputs while the saturating variants clamp instead.

use crate::TrapCode;

macro_rules! impl_binary {
    (
        $( fn $name:ident($lhs_ty:ty, $rhs_ty:ty) -> $ret_ty:ty = $f:expr; )*
    ) => {
        $(
            #[doc = concat!("Execute the `", stringify!($name), "` Wasm instruction.")]
            #[inline]
            pub fn $name(lhs: $lhs_ty, rhs: $rhs_ty) -> $ret_ty {
                ($f)(lhs, rhs)
            }
        )*
    };
}

macro_rules! impl_unary {
    (
        $( fn $name:ident($ty:ty) -> $ret_ty:ty = $f:expr; )*
    ) => {
        $(
            #[doc = concat!("Execute the `", stringify!($name), "` Wasm instruction.")]
            #[inline]
            pub fn $name(value: $ty) -> $ret_ty {
                ($f)(value)
            }
        )*
    };
}

macro_rules! op {
    ( $operator:tt ) => {{
        |lhs, rhs| lhs $operator rhs
    }};
}

impl_binary! {
    // Wasm integer instructions

    fn i32_add(i32, i32) -> i32 = i32::wrapping_add;
    fn i64_add(i64, i64) -> i64 = i64::wrapping_add;
    fn i32_sub(i32, i32) -> i32 = i32::wrapping_sub;
    fn i64_sub(i64, i64) -> i64 = i64::wrapping_sub;
    fn i32_mul(i32, i32) -> i32 = i32::wrapping_mul;
    fn i64_mul(i64, i64) -> i64 = i64::wrapping_mul;

    fn i32_bitand(i32, i32) -> i32 = op!(&);
    fn i64_bitand(i64, i64) -> i64 = op!(&);
    fn i32_bitor(i32, i32) -> i32 = op!(|);
    fn i64_bitor(i64, i64) -> i64 = op!(|);
    fn i32_bitxor(i32, i32) -> i32 = op!(^);
    fn i64_bitxor(i64, i64) -> i64 = op!(^);

    // Note: the shift amount is taken modulo the bit width as demanded
    //       by the Wasm specification which is exactly what the
    //       `wrapping_{shl,shr}` and `rotate_{left,right}` methods do.

    fn i32_shl(i32, i32) -> i32 = |l: i32, r: i32| l.wrapping_shl(r as u32);
    fn i64_shl(i64, i64) -> i64 = |l: i64, r: i64| l.wrapping_shl(r as u32);
    fn i32_shr_s(i32, i32) -> i32 = |l: i32, r: i32| l.wrapping_shr(r as u32);
    fn i64_shr_s(i64, i64) -> i64 = |l: i64, r: i64| l.wrapping_shr(r as u32);
    fn i32_shr_u(u32, u32) -> u32 = |l: u32, r: u32| l.wrapping_shr(r);
    fn i64_shr_u(u64, u64) -> u64 = |l: u64, r: u64| l.wrapping_shr(r as u32);
    fn i32_rotl(i32, i32) -> i32 = |l: i32, r: i32| l.rotate_left(r as u32 % 32);
    fn i64_rotl(i64, i64) -> i64 = |l: i64, r: i64| l.rotate_left(r as u32 % 64);
    fn i32_rotr(i32, i32) -> i32 = |l: i32, r: i32| l.rotate_right(r as u32 % 32);
    fn i64_rotr(i64, i64) -> i64 = |l: i64, r: i64| l.rotate_right(r as u32 % 64);
}

macro_rules! impl_div_rem {
    (
        $(
            fn $div_s:ident, $div_u:ident, $rem_s:ident, $rem_u:ident
                for $sint:ty, $uint:ty;
        )*
    ) => {
        $(
            #[doc = concat!("Execute the `", stringify!($div_s), "` Wasm instruction.")]
            ///
            /// # Errors
            ///
            /// - [`TrapCode::IntegerDivideByZero`]: if `rhs` is zero.
            /// - [`TrapCode::IntegerOverflow`]: for `MIN / -1`.
            #[inline]
            pub fn $div_s(lhs: $sint, rhs: $sint) -> Result<$sint, TrapCode> {
                if rhs == 0 {
                    return Err(TrapCode::IntegerDivideByZero);
                }
                lhs.checked_div(rhs).ok_or(TrapCode::IntegerOverflow)
            }

            #[doc = concat!("Execute the `", stringify!($div_u), "` Wasm instruction.")]
            ///
            /// # Errors
            ///
            /// - [`TrapCode::IntegerDivideByZero`]: if `rhs` is zero.
            #[inline]
            pub fn $div_u(lhs: $uint, rhs: $uint) -> Result<$uint, TrapCode> {
                lhs.checked_div(rhs).ok_or(TrapCode::IntegerDivideByZero)
            }

            #[doc = concat!("Execute the `", stringify!($rem_s), "` Wasm instruction.")]
            ///
            /// # Errors
            ///
            /// - [`TrapCode::IntegerDivideByZero`]: if `rhs` is zero.
            #[inline]
            pub fn $rem_s(lhs: $sint, rhs: $sint) -> Result<$sint, TrapCode> {
                if rhs == 0 {
                    return Err(TrapCode::IntegerDivideByZero);
                }
                // `MIN % -1` overflows `checked_rem` but is defined as 0 in Wasm.
                Ok(lhs.wrapping_rem(rhs))
            }

            #[doc = concat!("Execute the `", stringify!($rem_u), "` Wasm instruction.")]
            ///
            /// # Errors
            ///
            /// - [`TrapCode::IntegerDivideByZero`]: if `rhs` is zero.
            #[inline]
            pub fn $rem_u(lhs: $uint, rhs: $uint) -> Result<$uint, TrapCode> {
                lhs.checked_rem(rhs).ok_or(TrapCode::IntegerDivideByZero)
            }
        )*
    };
}
impl_div_rem! {
    fn i32_div_s, i32_div_u, i32_rem_s, i32_rem_u for i32, u32;
    fn i64_div_s, i64_div_u, i64_rem_s, i64_rem_u for i64, u64;
}

impl_unary! {
    // Wasm integer unary instructions

    fn i32_clz(i32) -> i32 = |v: i32| v.leading_zeros() as i32;
    fn i64_clz(i64) -> i64 = |v: i64| i64::from(v.leading_zeros());
    fn i32_ctz(i32) -> i32 = |v: i32| v.trailing_zeros() as i32;
    fn i64_ctz(i64) -> i64 = |v: i64| i64::from(v.trailing_zeros());
    fn i32_popcnt(i32) -> i32 = |v: i32| v.count_ones() as i32;
    fn i64_popcnt(i64) -> i64 = |v: i64| i64::from(v.count_ones());
    fn i32_eqz(i32) -> bool = |v| v == 0;
    fn i64_eqz(i64) -> bool = |v| v == 0;
}

impl_binary! {
    // Wasm comparison instructions

    fn i32_eq(i32, i32) -> bool = op!(==);
    fn i64_eq(i64, i64) -> bool = op!(==);
    fn f32_eq(f32, f32) -> bool = op!(==);
    fn f64_eq(f64, f64) -> bool = op!(==);
    fn i32_ne(i32, i32) -> bool = op!(!=);
    fn i64_ne(i64, i64) -> bool = op!(!=);
    fn f32_ne(f32, f32) -> bool = op!(!=);
    fn f64_ne(f64, f64) -> bool = op!(!=);

    fn i32_lt_s(i32, i32) -> bool = op!(<);
    fn i64_lt_s(i64, i64) -> bool = op!(<);
    fn i32_lt_u(u32, u32) -> bool = op!(<);
    fn i64_lt_u(u64, u64) -> bool = op!(<);
    fn f32_lt(f32, f32) -> bool = op!(<);
    fn f64_lt(f64, f64) -> bool = op!(<);

    fn i32_le_s(i32, i32) -> bool = op!(<=);
    fn i64_le_s(i64, i64) -> bool = op!(<=);
    fn i32_le_u(u32, u32) -> bool = op!(<=);
    fn i64_le_u(u64, u64) -> bool = op!(<=);
    fn f32_le(f32, f32) -> bool = op!(<=);
    fn f64_le(f64, f64) -> bool = op!(<=);

    fn i32_gt_s(i32, i32) -> bool = op!(>);
    fn i64_gt_s(i64, i64) -> bool = op!(>);
    fn i32_gt_u(u32, u32) -> bool = op!(>);
    fn i64_gt_u(u64, u64) -> bool = op!(>);
    fn f32_gt(f32, f32) -> bool = op!(>);
    fn f64_gt(f64, f64) -> bool = op!(>);

    fn i32_ge_s(i32, i32) -> bool = op!(>=);
    fn i64_ge_s(i64, i64) -> bool = op!(>=);
    fn i32_ge_u(u32, u32) -> bool = op!(>=);
    fn i64_ge_u(u64, u64) -> bool = op!(>=);
    fn f32_ge(f32, f32) -> bool = op!(>=);
    fn f64_ge(f64, f64) -> bool = op!(>=);
}

macro_rules! impl_float_min_max {
    ( $( fn $min:ident, $max:ident for $float:ty; )* ) => {
        $(
            #[doc = concat!("Execute the `", stringify!($min), "` Wasm instruction.")]
            ///
            /// NaN inputs produce NaN and `-0.0` is smaller than `+0.0`.
            #[inline]
            pub fn $min(lhs: $float, rhs: $float) -> $float {
                if lhs.is_nan() || rhs.is_nan() {
                    return <$float>::NAN;
                }
                if lhs == 0.0 && rhs == 0.0 {
                    return if lhs.is_sign_negative() { lhs } else { rhs };
                }
                if lhs < rhs { lhs } else { rhs }
            }

            #[doc = concat!("Execute the `", stringify!($max), "` Wasm instruction.")]
            ///
            /// NaN inputs produce NaN and `+0.0` is greater than `-0.0`.
            #[inline]
            pub fn $max(lhs: $float, rhs: $float) -> $float {
                if lhs.is_nan() || rhs.is_nan() {
                    return <$float>::NAN;
                }
                if lhs == 0.0 && rhs == 0.0 {
                    return if lhs.is_sign_positive() { lhs } else { rhs };
                }
                if lhs > rhs { lhs } else { rhs }
            }
        )*
    };
}
impl_float_min_max! {
    fn f32_min, f32_max for f32;
    fn f64_min, f64_max for f64;
}

impl_unary! {
    // Wasm float unary instructions

    fn f32_abs(f32) -> f32 = f32::abs;
    fn f64_abs(f64) -> f64 = f64::abs;
    fn f32_neg(f32) -> f32 = |v: f32| -v;
    fn f64_neg(f64) -> f64 = |v: f64| -v;
    fn f32_ceil(f32) -> f32 = f32::ceil;
    fn f64_ceil(f64) -> f64 = f64::ceil;
    fn f32_floor(f32) -> f32 = f32::floor;
    fn f64_floor(f64) -> f64 = f64::floor;
    fn f32_trunc(f32) -> f32 = f32::trunc;
    fn f64_trunc(f64) -> f64 = f64::trunc;
    fn f32_nearest(f32) -> f32 = f32::round_ties_even;
    fn f64_nearest(f64) -> f64 = f64::round_ties_even;
    fn f32_sqrt(f32) -> f32 = f32::sqrt;
    fn f64_sqrt(f64) -> f64 = f64::sqrt;
}

impl_binary! {
    // Wasm float binary instructions

    fn f32_add(f32, f32) -> f32 = op!(+);
    fn f64_add(f64, f64) -> f64 = op!(+);
    fn f32_sub(f32, f32) -> f32 = op!(-);
    fn f64_sub(f64, f64) -> f64 = op!(-);
    fn f32_mul(f32, f32) -> f32 = op!(*);
    fn f64_mul(f64, f64) -> f64 = op!(*);
    fn f32_div(f32, f32) -> f32 = op!(/);
    fn f64_div(f64, f64) -> f64 = op!(/);
    fn f32_copysign(f32, f32) -> f32 = f32::copysign;
    fn f64_copysign(f64, f64) -> f64 = f64::copysign;
}

impl_unary! {
    // Wasm conversion routines

    fn i32_wrap_i64(i64) -> i32 = |v| v as i32;
    fn i64_extend_i32_s(i32) -> i64 = i64::from;
    fn i64_extend_i32_u(u32) -> u64 = u64::from;
    fn f32_demote_f64(f64) -> f32 = |v| v as f32;
    fn f64_promote_f32(f32) -> f64 = f64::from;

    fn f32_convert_i32_s(i32) -> f32 = |v| v as f32;
    fn f32_convert_i32_u(u32) -> f32 = |v| v as f32;
    fn f32_convert_i64_s(i64) -> f32 = |v| v as f32;
    fn f32_convert_i64_u(u64) -> f32 = |v| v as f32;
    fn f64_convert_i32_s(i32) -> f64 = f64::from;
    fn f64_convert_i32_u(u32) -> f64 = f64::from;
    fn f64_convert_i64_s(i64) -> f64 = |v| v as f64;
    fn f64_convert_i64_u(u64) -> f64 = |v| v as f64;
}

impl_unary! {
    // Wasm `sign-extension` proposal

    fn i32_extend8_s(i32) -> i32 = |v| v as i8 as i32;
    fn i32_extend16_s(i32) -> i32 = |v| v as i16 as i32;
    fn i64_extend8_s(i64) -> i64 = |v| v as i8 as i64;
    fn i64_extend16_s(i64) -> i64 = |v| v as i16 as i64;
    fn i64_extend32_s(i64) -> i64 = |v| v as i32 as i64;
}

macro_rules! impl_trunc {
    (
        $( fn $name:ident($float:ty) -> $int:ty, min: $min:expr, max_excl: $max:expr; )*
    ) => {
        $(
            #[doc = concat!("Execute the `", stringify!($name), "` Wasm instruction.")]
            ///
            /// # Errors
            ///
            /// - [`TrapCode::InvalidConversionToInteger`]: if `value` is NaN.
            /// - [`TrapCode::IntegerOverflow`]: if the truncated `value` is
            ///   out of range of the target integer type.
            #[inline]
            pub fn $name(value: $float) -> Result<$int, TrapCode> {
                if value.is_nan() {
                    return Err(TrapCode::InvalidConversionToInteger);
                }
                let truncated = value.trunc();
                // The bounds are exact powers of two and therefore exactly
                // representable in both float widths.
                if truncated >= $max || truncated < $min {
                    return Err(TrapCode::IntegerOverflow);
                }
                Ok(truncated as $int)
            }
        )*
    };
}
impl_trunc! {
    fn i32_trunc_f32_s(f32) -> i32, min: -2147483648.0_f32, max_excl: 2147483648.0_f32;
    fn i32_trunc_f32_u(f32) -> u32, min: 0.0_f32, max_excl: 4294967296.0_f32;
    fn i32_trunc_f64_s(f64) -> i32, min: -2147483648.0_f64, max_excl: 2147483648.0_f64;
    fn i32_trunc_f64_u(f64) -> u32, min: 0.0_f64, max_excl: 4294967296.0_f64;
    fn i64_trunc_f32_s(f32) -> i64, min: -9223372036854775808.0_f32, max_excl: 9223372036854775808.0_f32;
    fn i64_trunc_f32_u(f32) -> u64, min: 0.0_f32, max_excl: 18446744073709551616.0_f32;
    fn i64_trunc_f64_s(f64) -> i64, min: -9223372036854775808.0_f64, max_excl: 9223372036854775808.0_f64;
    fn i64_trunc_f64_u(f64) -> u64, min: 0.0_f64, max_excl: 18446744073709551616.0_f64;
}

impl_unary! {
    // Wasm `saturating-float-to-int` proposal
    //
    // Rust `as` casts from float to integer saturate at the integer bounds
    // and map NaN to zero which matches the proposal exactly.

    fn i32_trunc_sat_f32_s(f32) -> i32 = |v| v as i32;
    fn i32_trunc_sat_f32_u(f32) -> u32 = |v| v as u32;
    fn i32_trunc_sat_f64_s(f64) -> i32 = |v| v as i32;
    fn i32_trunc_sat_f64_u(f64) -> u32 = |v| v as u32;
    fn i64_trunc_sat_f32_s(f32) -> i64 = |v| v as i64;
    fn i64_trunc_sat_f32_u(f32) -> u64 = |v| v as u64;
    fn i64_trunc_sat_f64_s(f64) -> i64 = |v| v as i64;
    fn i64_trunc_sat_f64_u(f64) -> u64 = |v| v as u64;
}

macro_rules! impl_reinterpret_cast {
    ( $( fn $name:ident($from:ty) -> $to:ty );* $(;)? ) => {
        $(
            #[doc = concat!("Execute the `", stringify!($name), "` Wasm instruction.")]
            #[inline]
            pub fn $name(value: $from) -> $to {
                <$to>::from_ne_bytes(<$from>::to_ne_bytes(value))
            }
        )*
    };
}
impl_reinterpret_cast! {
    fn i32_reinterpret_f32(f32) -> i32;
    fn i64_reinterpret_f64(f64) -> i64;
    fn f32_reinterpret_i32(i32) -> f32;
    fn f64_reinterpret_i64(i64) -> f64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn div_s_overflow_traps() {
        assert_eq!(i32_div_s(i32::MIN, -1), Err(TrapCode::IntegerOverflow));
        assert_eq!(i64_div_s(i64::MIN, -1), Err(TrapCode::IntegerOverflow));
        assert_eq!(i32_div_s(7, 0), Err(TrapCode::IntegerDivideByZero));
        assert_eq!(i32_div_s(7, -2), Ok(-3));
    }

    #[test]
    fn rem_s_overflow_is_zero() {
        assert_eq!(i32_rem_s(i32::MIN, -1), Ok(0));
        assert_eq!(i64_rem_s(i64::MIN, -1), Ok(0));
        assert_eq!(i32_rem_s(7, 0), Err(TrapCode::IntegerDivideByZero));
    }

    #[test]
    fn trunc_traps_on_nan_and_overflow() {
        assert_eq!(
            i32_trunc_f32_s(f32::NAN),
            Err(TrapCode::InvalidConversionToInteger)
        );
        assert_eq!(
            i32_trunc_f32_s(2147483648.0),
            Err(TrapCode::IntegerOverflow)
        );
        assert_eq!(i32_trunc_f32_s(-2147483648.0), Ok(i32::MIN));
        assert_eq!(i32_trunc_f64_s(2147483647.0), Ok(i32::MAX));
        assert_eq!(i32_trunc_f32_u(-0.5), Ok(0));
    }

    #[test]
    fn trunc_sat_clamps() {
        assert_eq!(i32_trunc_sat_f32_s(f32::NAN), 0);
        assert_eq!(i32_trunc_sat_f32_s(f32::INFINITY), i32::MAX);
        assert_eq!(i32_trunc_sat_f32_s(f32::NEG_INFINITY), i32::MIN);
        assert_eq!(i64_trunc_sat_f64_u(-1.0), 0);
    }

    #[test]
    fn min_max_zero_signs() {
        assert!(f32_min(-0.0, 0.0).is_sign_negative());
        assert!(f32_max(-0.0, 0.0).is_sign_positive());
        assert!(f64_min(f64::NAN, 1.0).is_nan());
    }

    #[test]
    fn shifts_are_masked() {
        assert_eq!(i32_shl(1, 33), 2);
        assert_eq!(i64_shl(1, 65), 2);
        assert_eq!(i32_shr_u(u32::MAX, 33), u32::MAX >> 1);
    }
}
