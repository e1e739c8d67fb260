use crate::ResourceLimiter;

/// A simple [`ResourceLimiter`] with fixed caps.
///
/// Build with a [`StoreLimitsBuilder`] and install it via
/// [`Runtime::set_limiter`].
///
/// [`Runtime::set_limiter`]: crate::Runtime::set_limiter
#[derive(Debug, Clone)]
pub struct StoreLimits {
    /// The maximum size of any linear memory in bytes.
    memory_size: Option<usize>,
    /// The maximum number of elements of any table.
    table_elements: Option<usize>,
    /// The maximum number of instances of the store.
    instances: usize,
    /// The maximum number of tables of the store.
    tables: usize,
    /// The maximum number of memories of the store.
    memories: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            memory_size: None,
            table_elements: None,
            instances: usize::MAX,
            tables: usize::MAX,
            memories: usize::MAX,
        }
    }
}

impl StoreLimits {
    /// Creates a new [`StoreLimitsBuilder`].
    pub fn builder() -> StoreLimitsBuilder {
        StoreLimitsBuilder::default()
    }
}

/// A builder for [`StoreLimits`].
#[derive(Debug, Default)]
pub struct StoreLimitsBuilder {
    limits: StoreLimits,
}

impl StoreLimitsBuilder {
    /// Caps the size of any linear memory at `limit` bytes.
    pub fn memory_size(mut self, limit: usize) -> Self {
        self.limits.memory_size = Some(limit);
        self
    }

    /// Caps the number of elements of any table at `limit`.
    pub fn table_elements(mut self, limit: usize) -> Self {
        self.limits.table_elements = Some(limit);
        self
    }

    /// Caps the number of instances of the store at `limit`.
    pub fn instances(mut self, limit: usize) -> Self {
        self.limits.instances = limit;
        self
    }

    /// Caps the number of tables of the store at `limit`.
    pub fn tables(mut self, limit: usize) -> Self {
        self.limits.tables = limit;
        self
    }

    /// Caps the number of memories of the store at `limit`.
    pub fn memories(mut self, limit: usize) -> Self {
        self.limits.memories = limit;
        self
    }

    /// Finishes construction of the [`StoreLimits`].
    pub fn build(self) -> StoreLimits {
        self.limits
    }
}

impl ResourceLimiter for StoreLimits {
    fn memory_growing(&mut self, _current: usize, desired: usize, maximum: Option<usize>) -> bool {
        let cap = match (self.memory_size, maximum) {
            (Some(limit), Some(maximum)) => limit.min(maximum),
            (Some(limit), None) => limit,
            (None, Some(maximum)) => maximum,
            (None, None) => return true,
        };
        desired <= cap
    }

    fn table_growing(&mut self, _current: usize, desired: usize, maximum: Option<usize>) -> bool {
        let cap = match (self.table_elements, maximum) {
            (Some(limit), Some(maximum)) => limit.min(maximum),
            (Some(limit), None) => limit,
            (None, Some(maximum)) => maximum,
            (None, None) => return true,
        };
        desired <= cap
    }

    fn instances(&self) -> usize {
        self.instances
    }

    fn tables(&self) -> usize {
        self.tables
    }

    fn memories(&self) -> usize {
        self.memories
    }
}
