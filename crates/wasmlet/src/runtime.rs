use crate::{
    engine::Config, module, store::Store, Error, Extern, Instance, Module, ResourceLimiter,
};

/// The wasmlet runtime: owns the store of all runtime entities and the
/// engine configuration.
///
/// All mutable state lives on the runtime's store; wasmlet keeps no global
/// state. A runtime and its entities are not safe for concurrent mutation
/// and require external synchronization for cross-thread use.
#[derive(Debug)]
pub struct Runtime {
    /// The store owning all runtime entities.
    store: Store,
    /// The engine configuration.
    config: Config,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// Creates a new [`Runtime`] with the default [`Config`].
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a new [`Runtime`] with the given [`Config`].
    pub fn with_config(config: Config) -> Self {
        Self {
            store: Store::new(config.stack_limit()),
            config,
        }
    }

    /// Returns the [`Config`] of the [`Runtime`].
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Installs a [`ResourceLimiter`] consulted for memory and table
    /// allocation and growth.
    pub fn set_limiter(&mut self, limiter: impl ResourceLimiter + 'static) {
        self.store.set_limiter(Box::new(limiter));
    }

    /// Instantiates `module` with the given resolved imports.
    ///
    /// The imports must be given in the module's import order and are
    /// type-checked against the module's declared import types. The
    /// returned instance is fully initialized: active data and element
    /// segments have been copied and the start function, if present, has
    /// been invoked.
    ///
    /// If an active segment copy traps, the instance is nonetheless
    /// returned with the trap recorded as [`Instance::init_trap`] and the
    /// start function skipped; embedders may choose to discard it.
    ///
    /// # Errors
    ///
    /// - If an import does not satisfy the module's declared import type.
    /// - If the resource limiter denies an allocation.
    /// - If the start function traps.
    pub fn instantiate(&mut self, module: &Module, imports: &[Extern]) -> Result<Instance, Error> {
        module::instantiate(self, module, imports)
    }

    pub(crate) fn store(&self) -> &Store {
        &self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }
}
