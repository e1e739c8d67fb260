use crate::store::EntityHandle;
use wasmlet_core::UntypedVal;

/// An element segment entity.
///
/// Passive element segments retain their evaluated reference items until
/// they are dropped by an `elem.drop` instruction. Active and declarative
/// element segments are stored empty: the active copy happens during
/// instantiation and declarative segments are observationally dropped.
#[derive(Debug)]
pub struct ElementSegmentEntity {
    /// The evaluated reference items of the element segment.
    items: Box<[UntypedVal]>,
}

impl ElementSegmentEntity {
    /// Creates a passive [`ElementSegmentEntity`] from its evaluated items.
    pub fn passive(items: Box<[UntypedVal]>) -> Self {
        Self { items }
    }

    /// Creates an empty [`ElementSegmentEntity`] for active and
    /// declarative element segments.
    pub fn empty() -> Self {
        Self { items: Box::from([]) }
    }

    /// Returns the reference items of the element segment.
    ///
    /// Dropped, active and declarative segments yield the empty slice.
    #[inline]
    pub fn items(&self) -> &[UntypedVal] {
        &self.items[..]
    }

    /// Drops the items of the element segment.
    pub fn drop_items(&mut self) {
        self.items = Box::from([]);
    }
}

/// An element segment reference.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(transparent)]
pub struct ElementSegment(pub(crate) EntityHandle<ElementSegmentEntity>);

impl ElementSegment {
    pub(crate) fn handle(&self) -> EntityHandle<ElementSegmentEntity> {
        self.0
    }
}
