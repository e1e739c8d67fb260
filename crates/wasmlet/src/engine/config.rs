use wasmparser::WasmFeatures;

/// The default size of the register-file stack in 64-bit cells.
///
/// Exhausting it traps the invocation with `CallStackExhausted`.
const DEFAULT_STACK_LIMIT: usize = 128 * 1024;

/// Configuration of a [`Runtime`].
///
/// [`Runtime`]: crate::Runtime
#[derive(Debug, Clone)]
pub struct Config {
    /// The Wasm feature set accepted by validation.
    features: WasmFeatures,
    /// The size of the register-file stack in 64-bit cells.
    stack_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            features: Self::default_features(),
            stack_limit: DEFAULT_STACK_LIMIT,
        }
    }
}

impl Config {
    /// Returns the default [`WasmFeatures`].
    fn default_features() -> WasmFeatures {
        let mut features = WasmFeatures::empty();
        features.set(WasmFeatures::MUTABLE_GLOBAL, true);
        features.set(WasmFeatures::MULTI_VALUE, true);
        features.set(WasmFeatures::SATURATING_FLOAT_TO_INT, true);
        features.set(WasmFeatures::SIGN_EXTENSION, true);
        features.set(WasmFeatures::BULK_MEMORY, true);
        features.set(WasmFeatures::REFERENCE_TYPES, true);
        // Required by the `reference-types` validation plumbing.
        features.set(WasmFeatures::GC_TYPES, true);
        features.set(WasmFeatures::FLOATS, true);
        features
    }

    /// Returns the [`WasmFeatures`] accepted by validation.
    pub(crate) fn wasm_features(&self) -> WasmFeatures {
        self.features
    }

    /// Sets the size of the register-file stack in 64-bit cells.
    ///
    /// Invocations that exhaust the stack trap with `CallStackExhausted`.
    pub fn set_stack_limit(&mut self, limit: usize) -> &mut Self {
        self.stack_limit = limit;
        self
    }

    /// Returns the size of the register-file stack in 64-bit cells.
    pub fn stack_limit(&self) -> usize {
        self.stack_limit
    }
}
