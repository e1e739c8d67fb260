/// Used by hosts to limit resource consumption of instances.
///
/// The limiter is consulted synchronously before linear memories and tables
/// are allocated at their declared minimums and before any growth operation.
/// A denied growth makes the respective `grow` instruction return `-1`; it
/// never traps.
pub trait ResourceLimiter {
    /// Notifies the resource limiter that an instance's linear memory has
    /// been requested to grow.
    ///
    /// * `current` is the current size of the linear memory in bytes.
    /// * `desired` is the desired size of the linear memory in bytes.
    /// * `maximum` is the linear memory's maximum size in bytes if any.
    ///
    /// Returning `false` denies the allocation or growth.
    fn memory_growing(&mut self, current: usize, desired: usize, maximum: Option<usize>) -> bool;

    /// Notifies the resource limiter that an instance's table has been
    /// requested to grow.
    ///
    /// * `current` is the current number of elements in the table.
    /// * `desired` is the desired number of elements in the table.
    /// * `maximum` is the table's maximum number of elements if any.
    ///
    /// Returning `false` denies the allocation or growth.
    fn table_growing(&mut self, current: usize, desired: usize, maximum: Option<usize>) -> bool;

    /// The maximum number of instances that can be created for a store.
    fn instances(&self) -> usize {
        usize::MAX
    }

    /// The maximum number of tables that can be created for a store.
    fn tables(&self) -> usize {
        usize::MAX
    }

    /// The maximum number of linear memories that can be created for a store.
    fn memories(&self) -> usize {
        usize::MAX
    }
}
