use crate::{store::EntityHandle, Instance, MemoryEntity};
use core::ptr;
use wasmlet_core::UntypedVal;

/// The cached hot state of the executing frame's instance.
///
/// Caches the default memory base pointer and byte size and a pointer to
/// the value cell of the global variable at index 0. The memory cache must
/// be refreshed after every operation that can grow the default memory;
/// the whole cache is replaced when execution switches instances.
#[derive(Debug)]
pub struct CachedInstance {
    /// The instance this cache was built from.
    pub instance: Instance,
    /// The default memory of the instance if any.
    memory: Option<EntityHandle<MemoryEntity>>,
    /// The base pointer of the default memory.
    md: *mut u8,
    /// The byte size of the default memory.
    ms: usize,
    /// Pointer to the value cell of the global variable at index 0.
    ///
    /// The cell lives inside the global's pool entity and is therefore
    /// stable for the lifetime of the store.
    global0: Option<*mut UntypedVal>,
}

impl CachedInstance {
    /// Creates a new [`CachedInstance`] for `instance`.
    pub fn new(instance: Instance) -> Self {
        let entity = instance.entity();
        let memory = entity.get_memory(0).map(|memory| memory.handle());
        let global0 = entity.get_global(0).map(|global| {
            let mut handle = global.handle();
            handle.get_mut().value_ptr()
        });
        let mut cache = Self {
            instance,
            memory,
            md: ptr::null_mut(),
            ms: 0,
            global0,
        };
        cache.refresh_memory();
        cache
    }

    /// Refreshes the cached default memory base and size.
    ///
    /// Must be called after every operation that can grow the default
    /// memory since growth may relocate the underlying buffer.
    #[inline]
    pub fn refresh_memory(&mut self) {
        if let Some(memory) = &mut self.memory {
            let (md, ms) = memory.get_mut().base_and_size();
            self.md = md;
            self.ms = ms;
        }
    }

    /// Returns the handle of the default memory if any.
    #[inline]
    pub fn memory_handle(&self) -> Option<EntityHandle<MemoryEntity>> {
        self.memory
    }

    /// Returns the bytes of the default memory.
    #[inline]
    pub fn memory_slice(&self) -> &[u8] {
        if self.ms == 0 {
            return &[];
        }
        // Safety: `(md, ms)` are consistent with the default memory at
        //         every instruction boundary that can observe them.
        unsafe { core::slice::from_raw_parts(self.md, self.ms) }
    }

    /// Returns the bytes of the default memory mutably.
    #[inline]
    pub fn memory_slice_mut(&mut self) -> &mut [u8] {
        if self.ms == 0 {
            return &mut [];
        }
        // Safety: see `memory_slice`.
        unsafe { core::slice::from_raw_parts_mut(self.md, self.ms) }
    }

    /// Reads the global variable at index 0 through the cache.
    ///
    /// # Panics
    ///
    /// If the instance has no global variable; the translator only emits
    /// the fast path instructions for modules that declare one.
    #[inline]
    pub fn global0(&self) -> UntypedVal {
        let ptr = self.global0.expect("missing global 0 for fast path");
        // Safety: the cell is stable inside the store's global pool.
        unsafe { *ptr }
    }

    /// Writes the global variable at index 0 through the cache.
    ///
    /// # Panics
    ///
    /// See [`CachedInstance::global0`].
    #[inline]
    pub fn set_global0(&mut self, value: UntypedVal) {
        let ptr = self.global0.expect("missing global 0 for fast path");
        // Safety: the cell is stable inside the store's global pool.
        unsafe { *ptr = value }
    }
}
