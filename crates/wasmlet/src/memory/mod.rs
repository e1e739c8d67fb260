mod data;

pub use self::data::{DataSegment, DataSegmentEntity};
use crate::{store::EntityHandle, ResourceLimiter, Runtime};
use core::fmt::{self, Display};
use std::error::Error as StdError;

/// The size of a Wasm linear memory page: 64 KiB.
const PAGE_SIZE: usize = 65536;

/// The maximum number of pages of a 32-bit linear memory.
const MAX_PAGES: u32 = 65536;

/// Errors that may occur upon operating on linear memories.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// The declared memory type is invalid.
    InvalidMemoryType,
    /// Tried to grow the memory beyond its bounds or the resource limiter
    /// denied the growth.
    OutOfBoundsGrowth,
    /// An access through the embedder API was out of bounds.
    OutOfBoundsAccess,
    /// The resource limiter denied the allocation of the memory at its
    /// declared minimum size.
    ResourceLimiterDeniedAllocation,
    /// Too many memories were allocated for the store.
    TooManyMemories,
}

impl StdError for MemoryError {}

impl Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::InvalidMemoryType => "invalid memory type",
            Self::OutOfBoundsGrowth => "out of bounds memory growth",
            Self::OutOfBoundsAccess => "out of bounds memory access",
            Self::ResourceLimiterDeniedAllocation => {
                "resource limiter denied the memory allocation"
            }
            Self::TooManyMemories => "too many memories for the store",
        };
        write!(f, "{message}")
    }
}

/// The type of a linear [`Memory`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MemoryType {
    /// The minimum size of the memory in pages.
    minimum: u32,
    /// The optional maximum size of the memory in pages.
    maximum: Option<u32>,
}

impl MemoryType {
    /// Creates a new [`MemoryType`].
    ///
    /// # Errors
    ///
    /// If the minimum or maximum size exceeds the limit of 2^16 pages.
    pub fn new(minimum: u32, maximum: Option<u32>) -> Result<Self, MemoryError> {
        if minimum > MAX_PAGES {
            return Err(MemoryError::InvalidMemoryType);
        }
        if let Some(maximum) = maximum {
            if maximum > MAX_PAGES || maximum < minimum {
                return Err(MemoryError::InvalidMemoryType);
            }
        }
        Ok(Self { minimum, maximum })
    }

    /// Returns the minimum size of the memory in pages.
    pub fn minimum(&self) -> u32 {
        self.minimum
    }

    /// Returns the maximum size of the memory in pages if any.
    pub fn maximum(&self) -> Option<u32> {
        self.maximum
    }

    /// Returns `true` if `self` is a subtype of `other` per the Wasm
    /// import subtyping rules.
    pub(crate) fn is_subtype_of(&self, other: &MemoryType) -> bool {
        if self.minimum() < other.minimum() {
            return false;
        }
        match (self.maximum(), other.maximum()) {
            (_, None) => true,
            (Some(max), Some(other_max)) => max <= other_max,
            (None, Some(_)) => false,
        }
    }
}

/// A linear memory entity.
///
/// Holds a contiguous byte buffer together with the current and maximum
/// page counts. Growth may relocate the buffer: readers caching the base
/// pointer and size must refresh their cache after any operation that can
/// grow the memory.
#[derive(Debug)]
pub struct MemoryEntity {
    /// The byte buffer of the linear memory.
    bytes: Vec<u8>,
    /// The type of the linear memory carrying the growth limits.
    ty: MemoryType,
    /// The current size of the linear memory in pages.
    current: u32,
}

impl MemoryEntity {
    /// Creates a new [`MemoryEntity`] at its declared minimum size.
    ///
    /// # Errors
    ///
    /// If the resource limiter denies the allocation.
    pub fn new(
        ty: MemoryType,
        limiter: Option<&mut dyn ResourceLimiter>,
    ) -> Result<Self, MemoryError> {
        let minimum_bytes = ty.minimum() as usize * PAGE_SIZE;
        let maximum_bytes = ty.maximum().map(|max| max as usize * PAGE_SIZE);
        if let Some(limiter) = limiter {
            if !limiter.memory_growing(0, minimum_bytes, maximum_bytes) {
                return Err(MemoryError::ResourceLimiterDeniedAllocation);
            }
        }
        Ok(Self {
            bytes: vec![0x00; minimum_bytes],
            ty,
            current: ty.minimum(),
        })
    }

    /// Returns the [`MemoryType`] of the linear memory.
    pub fn ty(&self) -> MemoryType {
        self.ty
    }

    /// Returns the current size of the linear memory in pages.
    #[inline]
    pub fn size(&self) -> u32 {
        self.current
    }

    /// Returns a shared reference to the byte buffer.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..]
    }

    /// Returns an exclusive reference to the byte buffer.
    #[inline]
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[..]
    }

    /// Returns the base pointer and byte size of the linear memory.
    ///
    /// The pair is only valid until the next operation that can grow the
    /// memory.
    #[inline]
    pub(crate) fn base_and_size(&mut self) -> (*mut u8, usize) {
        (self.bytes.as_mut_ptr(), self.bytes.len())
    }

    /// Grows the linear memory by `delta` pages.
    ///
    /// Returns the previous size of the memory in pages on success and
    /// `None` if the growth exceeds the memory's limits or is denied by
    /// the resource limiter. A denied growth does not trap: the `memory.grow`
    /// instruction returns -1 instead.
    pub fn grow(
        &mut self,
        delta: u32,
        limiter: Option<&mut dyn ResourceLimiter>,
    ) -> Option<u32> {
        let current = self.current;
        if delta == 0 {
            return Some(current);
        }
        let desired = current.checked_add(delta)?;
        let maximum = self.ty.maximum().unwrap_or(MAX_PAGES);
        if desired > maximum {
            return None;
        }
        let desired_bytes = desired as usize * PAGE_SIZE;
        if let Some(limiter) = limiter {
            let maximum_bytes = self.ty.maximum().map(|max| max as usize * PAGE_SIZE);
            if !limiter.memory_growing(self.bytes.len(), desired_bytes, maximum_bytes) {
                return None;
            }
        }
        self.bytes.resize(desired_bytes, 0x00);
        self.current = desired;
        Some(current)
    }
}

/// A linear memory reference.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(transparent)]
pub struct Memory(pub(crate) EntityHandle<MemoryEntity>);

impl Memory {
    /// Creates a new linear [`Memory`] with the given type.
    ///
    /// # Errors
    ///
    /// If the resource limiter denies the allocation.
    pub fn new(runtime: &mut Runtime, ty: MemoryType) -> Result<Self, MemoryError> {
        let store = runtime.store_mut();
        if store.len_memories() >= store.limiter_mut().map_or(usize::MAX, |l| l.memories()) {
            return Err(MemoryError::TooManyMemories);
        }
        let entity = MemoryEntity::new(ty, store.limiter_mut())?;
        Ok(Self(store.alloc_memory(entity)))
    }

    /// Returns the [`MemoryType`] of the linear memory.
    pub fn ty(&self, _runtime: &Runtime) -> MemoryType {
        self.0.get().ty()
    }

    /// Returns the current size of the linear memory in pages.
    pub fn size(&self, _runtime: &Runtime) -> u32 {
        self.0.get().size()
    }

    /// Grows the linear memory by `delta` pages.
    ///
    /// Returns the previous size in pages.
    ///
    /// # Errors
    ///
    /// If the growth exceeds the memory's limits or is denied by the
    /// resource limiter.
    pub fn grow(&mut self, runtime: &mut Runtime, delta: u32) -> Result<u32, MemoryError> {
        let limiter = runtime.store_mut().limiter_mut();
        self.0
            .get_mut()
            .grow(delta, limiter)
            .ok_or(MemoryError::OutOfBoundsGrowth)
    }

    /// Reads bytes from the linear memory at `offset` into `buffer`.
    ///
    /// # Errors
    ///
    /// If the read is out of bounds.
    pub fn read(
        &self,
        _runtime: &Runtime,
        offset: usize,
        buffer: &mut [u8],
    ) -> Result<(), MemoryError> {
        let bytes = self.0.get().bytes();
        let slice = offset
            .checked_add(buffer.len())
            .and_then(|end| bytes.get(offset..end))
            .ok_or(MemoryError::OutOfBoundsAccess)?;
        buffer.copy_from_slice(slice);
        Ok(())
    }

    /// Writes `buffer` into the linear memory at `offset`.
    ///
    /// # Errors
    ///
    /// If the write is out of bounds.
    pub fn write(
        &mut self,
        _runtime: &mut Runtime,
        offset: usize,
        buffer: &[u8],
    ) -> Result<(), MemoryError> {
        let bytes = self.0.get_mut().bytes_mut();
        let slice = offset
            .checked_add(buffer.len())
            .and_then(|end| bytes.get_mut(offset..end))
            .ok_or(MemoryError::OutOfBoundsAccess)?;
        slice.copy_from_slice(buffer);
        Ok(())
    }

    pub(crate) fn handle(&self) -> EntityHandle<MemoryEntity> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grow_respects_maximum() {
        let ty = MemoryType::new(1, Some(2)).unwrap();
        let mut memory = MemoryEntity::new(ty, None).unwrap();
        assert_eq!(memory.grow(1, None), Some(1));
        assert_eq!(memory.size(), 2);
        assert_eq!(memory.grow(1, None), None);
        assert_eq!(memory.size(), 2);
    }

    #[test]
    fn grow_by_zero_always_succeeds() {
        let ty = MemoryType::new(1, Some(1)).unwrap();
        let mut memory = MemoryEntity::new(ty, None).unwrap();
        assert_eq!(memory.grow(0, None), Some(1));
    }

    #[test]
    fn new_memory_is_zeroed() {
        let ty = MemoryType::new(1, None).unwrap();
        let memory = MemoryEntity::new(ty, None).unwrap();
        assert_eq!(memory.bytes().len(), PAGE_SIZE);
        assert!(memory.bytes().iter().all(|byte| *byte == 0));
    }
}
