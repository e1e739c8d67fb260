//! Paged bump allocation pools with pointer-stable entity handles.
//!
//! Entity references must survive arbitrary later allocations in the same
//! pool, so the pool never relocates: it allocates fixed-capacity pages and
//! appends a fresh page once the current one is full. Pages stay mapped for
//! the lifetime of the pool and individual entities are never deallocated.
//!
//! # Safety
//!
//! [`EntityHandle`] dereferences its raw pointer without borrowing the pool.
//! This is sound under the store's mutation discipline:
//!
//! - handles never outlive the [`Store`] owning their pool,
//! - all entity access is funneled through the single-threaded [`Store`]
//!   API which never holds two references to the same entity at once,
//! - pages are never dropped or moved before the pool itself is dropped.
//!
//! [`Store`]: super::Store

use core::{fmt, fmt::Debug, marker::PhantomData, ptr::NonNull};

/// The number of entities stored per pool page.
const PAGE_CAPACITY: usize = 64;

/// A stable, pointer-sized identity of an entity inside an [`EntityPool`].
///
/// Handle equality is pointer equality. The handle stays valid until the
/// owning pool is dropped; entities are never relocated.
pub struct EntityHandle<T> {
    /// Pointer to the entity inside one of the pool's pages.
    ptr: NonNull<T>,
}

impl<T> Copy for EntityHandle<T> {}

impl<T> Clone for EntityHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for EntityHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl<T> Eq for EntityHandle<T> {}

impl<T> Debug for EntityHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityHandle({:p})", self.ptr)
    }
}

impl<T> EntityHandle<T> {
    /// Returns a shared reference to the entity.
    #[inline]
    pub fn get(&self) -> &T {
        // Safety: per the module level invariants the entity outlives the
        //         handle and no exclusive reference is active.
        unsafe { self.ptr.as_ref() }
    }

    /// Returns an exclusive reference to the entity.
    ///
    /// Callers must not let the returned reference overlap with any other
    /// reference to the same entity.
    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        // Safety: see `get`; exclusivity is the caller's obligation under
        //         the store's mutation discipline.
        unsafe { self.ptr.as_mut() }
    }

    /// Returns the handle's address as raw bits.
    ///
    /// Used for the tagged function handle and reference value encodings.
    #[inline]
    pub fn to_bits(self) -> usize {
        self.ptr.as_ptr() as usize
    }

    /// Recreates a handle from raw bits previously produced by
    /// [`EntityHandle::to_bits`].
    ///
    /// # Safety
    ///
    /// The bits must stem from a handle of the same entity type whose pool
    /// is still alive.
    #[inline]
    pub unsafe fn from_bits(bits: usize) -> Self {
        debug_assert_ne!(bits, 0);
        Self {
            ptr: unsafe { NonNull::new_unchecked(bits as *mut T) },
        }
    }
}

/// A bump allocator over fixed-capacity pages.
///
/// For pointer stability the pool cannot deallocate single entities and
/// grows by appending pages, never by relocating them. A growable vector is
/// not a substitute: entity pointers must outlive subsequent allocations.
#[derive(Debug)]
pub struct EntityPool<T> {
    /// The pages of the pool.
    ///
    /// Every page is created with `PAGE_CAPACITY` capacity and never grown
    /// beyond it, so its heap buffer never moves. Growing the outer vector
    /// moves the page *headers* only.
    pages: Vec<Vec<T>>,
    /// Total number of allocated entities.
    len: usize,
    marker: PhantomData<fn() -> T>,
}

impl<T> Default for EntityPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EntityPool<T> {
    /// Creates a new empty [`EntityPool`].
    pub fn new() -> Self {
        // The low bit of entity addresses doubles as the wasm/host tag of
        // function references which requires an alignment of at least 2.
        const { assert!(core::mem::align_of::<T>() >= 2) };
        Self {
            pages: Vec::new(),
            len: 0,
            marker: PhantomData,
        }
    }

    /// Returns the number of allocated entities.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Allocates a new entity and returns its stable handle.
    pub fn alloc(&mut self, entity: T) -> EntityHandle<T> {
        let page = match self.pages.last_mut() {
            Some(page) if page.len() < PAGE_CAPACITY => page,
            _ => {
                self.pages.push(Vec::with_capacity(PAGE_CAPACITY));
                self.pages.last_mut().expect("just pushed a page")
            }
        };
        debug_assert!(page.len() < page.capacity());
        page.push(entity);
        self.len += 1;
        let entity = page.last_mut().expect("just pushed an entity");
        EntityHandle {
            // Safety: references are never null.
            ptr: unsafe { NonNull::new_unchecked(entity as *mut T) },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_survive_pool_growth() {
        let mut pool = EntityPool::<u64>::new();
        let handles = (0..10 * PAGE_CAPACITY as u64)
            .map(|value| pool.alloc(value))
            .collect::<Vec<_>>();
        assert_eq!(pool.len(), 10 * PAGE_CAPACITY);
        for (value, handle) in handles.iter().enumerate() {
            assert_eq!(*handle.get(), value as u64);
        }
    }

    #[test]
    fn handle_equality_is_pointer_equality() {
        let mut pool = EntityPool::<u64>::new();
        let fst = pool.alloc(1);
        let snd = pool.alloc(1);
        assert_ne!(fst, snd);
        assert_eq!(fst, fst.clone());
    }

    #[test]
    fn mutation_through_handle() {
        let mut pool = EntityPool::<u64>::new();
        let mut handle = pool.alloc(1);
        *handle.get_mut() = 42;
        assert_eq!(*handle.get(), 42);
    }

    #[test]
    fn bits_round_trip() {
        let mut pool = EntityPool::<u64>::new();
        let handle = pool.alloc(7);
        let bits = handle.to_bits();
        assert_ne!(bits, 0);
        let restored = unsafe { EntityHandle::<u64>::from_bits(bits) };
        assert_eq!(restored, handle);
        assert_eq!(*restored.get(), 7);
    }
}
