use crate::store::EntityHandle;
use std::sync::Arc;

/// A data segment entity.
///
/// Passive data segments retain their bytes until they are dropped by a
/// `data.drop` instruction. Active data segments are stored empty: their
/// one-shot copy into the linear memory happens during instantiation after
/// which they are observationally dropped.
#[derive(Debug)]
pub struct DataSegmentEntity {
    /// The bytes of the data segment.
    ///
    /// `None` for active or dropped segments.
    bytes: Option<Arc<[u8]>>,
}

impl DataSegmentEntity {
    /// Creates a passive [`DataSegmentEntity`] retaining `bytes`.
    pub fn passive(bytes: Arc<[u8]>) -> Self {
        Self { bytes: Some(bytes) }
    }

    /// Creates an empty [`DataSegmentEntity`] for an active data segment.
    pub fn active() -> Self {
        Self { bytes: None }
    }

    /// Returns the bytes of the data segment.
    ///
    /// Dropped and active segments yield the empty slice.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        self.bytes.as_deref().unwrap_or(&[])
    }

    /// Drops the bytes of the data segment.
    pub fn drop_bytes(&mut self) {
        self.bytes = None;
    }
}

/// A data segment reference.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(transparent)]
pub struct DataSegment(pub(crate) EntityHandle<DataSegmentEntity>);

impl DataSegment {
    pub(crate) fn handle(&self) -> EntityHandle<DataSegmentEntity> {
        self.0
    }
}
