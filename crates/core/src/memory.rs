//! Bounds-checked little-endian access helpers for linear memory.
//!
//! All helpers take the raw byte buffer of the accessed linear memory and
//! perform the Wasm bounds check `ptr + offset + size <= len` with
//! wrapping-aware arithmetic before touching the buffer.

use crate::TrapCode;

/// Types that can be converted from and to little-endian bytes.
pub trait LittleEndianConvert: Sized + Copy {
    /// The little-endian byte representation.
    type Bytes: AsRef<[u8]> + AsMut<[u8]> + Default;

    /// Converts `self` into little-endian bytes.
    fn into_le_bytes(self) -> Self::Bytes;

    /// Converts little-endian bytes into `Self`.
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_little_endian_convert {
    ( $( $ty:ty ),* $(,)? ) => {
        $(
            impl LittleEndianConvert for $ty {
                type Bytes = [u8; core::mem::size_of::<$ty>()];

                #[inline]
                fn into_le_bytes(self) -> Self::Bytes {
                    self.to_le_bytes()
                }

                #[inline]
                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    Self::from_le_bytes(bytes)
                }
            }
        )*
    };
}
impl_little_endian_convert!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

/// Returns the accessed sub-slice if the access is in bounds.
#[inline]
fn checked_slice(memory: &[u8], ptr: u64, offset: u64, len: usize) -> Result<&[u8], TrapCode> {
    let address = ptr
        .checked_add(offset)
        .ok_or(TrapCode::OutOfBoundsMemoryAccess)?;
    let address = usize::try_from(address).map_err(|_| TrapCode::OutOfBoundsMemoryAccess)?;
    let end = address
        .checked_add(len)
        .ok_or(TrapCode::OutOfBoundsMemoryAccess)?;
    memory
        .get(address..end)
        .ok_or(TrapCode::OutOfBoundsMemoryAccess)
}

/// Returns the accessed mutable sub-slice if the access is in bounds.
#[inline]
fn checked_slice_mut(
    memory: &mut [u8],
    ptr: u64,
    offset: u64,
    len: usize,
) -> Result<&mut [u8], TrapCode> {
    let address = ptr
        .checked_add(offset)
        .ok_or(TrapCode::OutOfBoundsMemoryAccess)?;
    let address = usize::try_from(address).map_err(|_| TrapCode::OutOfBoundsMemoryAccess)?;
    let end = address
        .checked_add(len)
        .ok_or(TrapCode::OutOfBoundsMemoryAccess)?;
    memory
        .get_mut(address..end)
        .ok_or(TrapCode::OutOfBoundsMemoryAccess)
}

/// Loads a value of type `T` from `memory` at `ptr + offset`.
///
/// # Errors
///
/// [`TrapCode::OutOfBoundsMemoryAccess`] if the access is out of bounds.
#[inline]
pub fn load<T>(memory: &[u8], ptr: u64, offset: u64) -> Result<T, TrapCode>
where
    T: LittleEndianConvert,
{
    let slice = checked_slice(memory, ptr, offset, core::mem::size_of::<T>())?;
    let mut bytes = <T as LittleEndianConvert>::Bytes::default();
    bytes.as_mut().copy_from_slice(slice);
    Ok(<T as LittleEndianConvert>::from_le_bytes(bytes))
}

/// Loads a value of the narrow type `W` from `memory` and extends it to `T`.
///
/// # Errors
///
/// [`TrapCode::OutOfBoundsMemoryAccess`] if the access is out of bounds.
#[inline]
pub fn load_extend<W, T>(memory: &[u8], ptr: u64, offset: u64) -> Result<T, TrapCode>
where
    W: LittleEndianConvert,
    T: From<W>,
{
    load::<W>(memory, ptr, offset).map(T::from)
}

/// Stores a value of type `T` into `memory` at `ptr + offset`.
///
/// # Errors
///
/// [`TrapCode::OutOfBoundsMemoryAccess`] if the access is out of bounds.
#[inline]
pub fn store<T>(memory: &mut [u8], ptr: u64, offset: u64, value: T) -> Result<(), TrapCode>
where
    T: LittleEndianConvert,
{
    let slice = checked_slice_mut(memory, ptr, offset, core::mem::size_of::<T>())?;
    slice.copy_from_slice(value.into_le_bytes().as_ref());
    Ok(())
}

/// Wraps a value of type `T` to the narrow type `W` and stores it.
///
/// # Errors
///
/// [`TrapCode::OutOfBoundsMemoryAccess`] if the access is out of bounds.
#[inline]
pub fn store_wrap<T, W>(memory: &mut [u8], ptr: u64, offset: u64, value: T) -> Result<(), TrapCode>
where
    W: LittleEndianConvert + TruncateFrom<T>,
{
    store::<W>(memory, ptr, offset, W::truncate_from(value))
}

/// Integer types that can be created by truncating a wider integer type.
pub trait TruncateFrom<T> {
    /// Truncates `value` to `Self`, discarding the high bits.
    fn truncate_from(value: T) -> Self;
}

macro_rules! impl_truncate_from {
    ( $( $from:ty => $to:ty ),* $(,)? ) => {
        $(
            impl TruncateFrom<$from> for $to {
                #[inline]
                fn truncate_from(value: $from) -> Self {
                    value as _
                }
            }
        )*
    };
}
impl_truncate_from! {
    i32 => i8,
    i32 => i16,
    i64 => i8,
    i64 => i16,
    i64 => i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_at_exact_end_succeeds() {
        let memory = [1_u8, 2, 3, 4, 5, 6, 7, 8];
        assert_eq!(load::<u32>(&memory, 4, 0), Ok(0x0807_0605));
        assert_eq!(
            load::<u32>(&memory, 5, 0),
            Err(TrapCode::OutOfBoundsMemoryAccess)
        );
    }

    #[test]
    fn offset_overflow_is_out_of_bounds() {
        let memory = [0_u8; 8];
        assert_eq!(
            load::<u32>(&memory, u64::MAX, 16),
            Err(TrapCode::OutOfBoundsMemoryAccess)
        );
    }

    #[test]
    fn store_wrap_discards_high_bits() {
        let mut memory = [0_u8; 4];
        store_wrap::<i32, i16>(&mut memory, 0, 0, 0x7654_3210).unwrap();
        assert_eq!(memory, [0x10, 0x32, 0, 0]);
    }

    #[test]
    fn load_extend_sign_extends() {
        let memory = [0xFF_u8, 0x00];
        assert_eq!(load_extend::<i8, i32>(&memory, 0, 0), Ok(-1));
        assert_eq!(load_extend::<u8, i32>(&memory, 0, 0), Ok(255));
    }
}
