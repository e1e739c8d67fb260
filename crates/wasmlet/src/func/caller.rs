use crate::{store::Store, Error, Extern, Func, Instance, Val};

/// Represents the caller's context when calling a host function.
///
/// Host functions receive a [`Caller`] exposing the calling instance and
/// the runtime state so that they may inspect exports or re-enter other
/// exported functions. Re-entrant invocations receive a fresh, independent
/// execution state.
pub struct Caller<'a> {
    /// The store of the calling runtime.
    store: &'a mut Store,
    /// The instance of the calling Wasm function if any.
    ///
    /// `None` when the host function is invoked directly by the embedder.
    instance: Option<Instance>,
}

impl<'a> Caller<'a> {
    /// Creates a new [`Caller`].
    pub(crate) fn new(store: &'a mut Store, instance: Option<Instance>) -> Self {
        Self { store, instance }
    }

    /// Returns the calling [`Instance`] if any.
    pub fn instance(&self) -> Option<&Instance> {
        self.instance.as_ref()
    }

    /// Returns the export of the calling instance with the given name if any.
    pub fn get_export(&self, name: &str) -> Option<Extern> {
        self.instance
            .as_ref()
            .and_then(|instance| instance.export(name))
    }

    /// Invokes another function from within the host function.
    ///
    /// # Errors
    ///
    /// - If the argument values do not match the function's parameter types.
    /// - If execution traps.
    pub fn invoke(&mut self, func: &Func, args: &[Val]) -> Result<Vec<Val>, Error> {
        func.invoke_with_store(self.store, args)
    }
}
