mod element;

pub use self::element::{ElementSegment, ElementSegmentEntity};
use crate::{store::EntityHandle, ResourceLimiter, Runtime, TrapCode, Val, ValType};
use core::fmt::{self, Display};
use std::error::Error as StdError;
use wasmlet_core::UntypedVal;

/// Errors that may occur upon operating on tables.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TableError {
    /// The declared table type is invalid.
    InvalidTableType,
    /// Tried to grow the table beyond its bounds or the resource limiter
    /// denied the growth.
    OutOfBoundsGrowth,
    /// An access through the embedder API was out of bounds.
    OutOfBoundsAccess,
    /// Tried to write a value of unmatching type into a table.
    TypeMismatch {
        /// The element type of the table.
        expected: ValType,
        /// The type of the written value.
        actual: ValType,
    },
    /// The resource limiter denied the allocation of the table at its
    /// declared minimum size.
    ResourceLimiterDeniedAllocation,
    /// Too many tables were allocated for the store.
    TooManyTables,
}

impl StdError for TableError {}

impl Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTableType => write!(f, "invalid table type"),
            Self::OutOfBoundsGrowth => write!(f, "out of bounds table growth"),
            Self::OutOfBoundsAccess => write!(f, "out of bounds table access"),
            Self::TypeMismatch { expected, actual } => {
                write!(
                    f,
                    "type mismatch upon writing table element: expected {expected}, got {actual}"
                )
            }
            Self::ResourceLimiterDeniedAllocation => {
                write!(f, "resource limiter denied the table allocation")
            }
            Self::TooManyTables => write!(f, "too many tables for the store"),
        }
    }
}

/// The type of a [`Table`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TableType {
    /// The type of the table elements.
    element: ValType,
    /// The minimum number of table elements.
    minimum: u32,
    /// The optional maximum number of table elements.
    maximum: Option<u32>,
}

impl TableType {
    /// Creates a new [`TableType`].
    ///
    /// # Errors
    ///
    /// If `element` is not a reference type or the limits are inverted.
    pub fn new(element: ValType, minimum: u32, maximum: Option<u32>) -> Result<Self, TableError> {
        if !element.is_ref() {
            return Err(TableError::InvalidTableType);
        }
        if let Some(maximum) = maximum {
            if maximum < minimum {
                return Err(TableError::InvalidTableType);
            }
        }
        Ok(Self {
            element,
            minimum,
            maximum,
        })
    }

    /// Returns the type of the table elements.
    pub fn element(&self) -> ValType {
        self.element
    }

    /// Returns the minimum number of table elements.
    pub fn minimum(&self) -> u32 {
        self.minimum
    }

    /// Returns the maximum number of table elements if any.
    pub fn maximum(&self) -> Option<u32> {
        self.maximum
    }

    /// Returns `true` if `self` is a subtype of `other` per the Wasm
    /// import subtyping rules.
    pub(crate) fn is_subtype_of(&self, other: &TableType) -> bool {
        if self.element() != other.element() {
            return false;
        }
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

/// A table entity.
///
/// Elements are stored as untyped reference cells; `null` is the zero bit
/// pattern.
#[derive(Debug)]
pub struct TableEntity {
    /// The elements of the table.
    elements: Vec<UntypedVal>,
    /// The type of the table carrying the growth limits.
    ty: TableType,
}

impl TableEntity {
    /// Creates a new [`TableEntity`] at its declared minimum size with all
    /// elements initialized to `init`.
    ///
    /// # Errors
    ///
    /// If the resource limiter denies the allocation.
    pub fn new(
        ty: TableType,
        init: UntypedVal,
        limiter: Option<&mut dyn ResourceLimiter>,
    ) -> Result<Self, TableError> {
        let minimum = ty.minimum() as usize;
        if let Some(limiter) = limiter {
            let maximum = ty.maximum().map(|max| max as usize);
            if !limiter.table_growing(0, minimum, maximum) {
                return Err(TableError::ResourceLimiterDeniedAllocation);
            }
        }
        Ok(Self {
            elements: vec![init; minimum],
            ty,
        })
    }

    /// Returns the [`TableType`] of the table.
    pub fn ty(&self) -> TableType {
        self.ty
    }

    /// Returns the current size of the table in elements.
    #[inline]
    pub fn size(&self) -> u32 {
        self.elements.len() as u32
    }

    /// Returns the elements of the table as a shared slice.
    #[inline]
    pub fn elements(&self) -> &[UntypedVal] {
        &self.elements[..]
    }

    /// Returns the element at `index`.
    ///
    /// # Errors
    ///
    /// [`TrapCode::OutOfBoundsTableAccess`] if `index` is out of bounds.
    #[inline]
    pub fn get(&self, index: u32) -> Result<UntypedVal, TrapCode> {
        self.elements
            .get(index as usize)
            .copied()
            .ok_or(TrapCode::OutOfBoundsTableAccess)
    }

    /// Sets the element at `index` to `value`.
    ///
    /// # Errors
    ///
    /// [`TrapCode::OutOfBoundsTableAccess`] if `index` is out of bounds.
    #[inline]
    pub fn set(&mut self, index: u32, value: UntypedVal) -> Result<(), TrapCode> {
        let cell = self
            .elements
            .get_mut(index as usize)
            .ok_or(TrapCode::OutOfBoundsTableAccess)?;
        *cell = value;
        Ok(())
    }

    /// Grows the table by `delta` elements initialized to `init`.
    ///
    /// Returns the previous size of the table on success and `None` if the
    /// growth exceeds the table's limits or is denied by the resource
    /// limiter. A denied growth does not trap: the `table.grow` instruction
    /// returns -1 instead.
    pub fn grow(
        &mut self,
        delta: u32,
        init: UntypedVal,
        limiter: Option<&mut dyn ResourceLimiter>,
    ) -> Option<u32> {
        let current = self.size();
        if delta == 0 {
            return Some(current);
        }
        let desired = current.checked_add(delta)?;
        if let Some(maximum) = self.ty.maximum() {
            if desired > maximum {
                return None;
            }
        }
        if let Some(limiter) = limiter {
            let maximum = self.ty.maximum().map(|max| max as usize);
            if !limiter.table_growing(current as usize, desired as usize, maximum) {
                return None;
            }
        }
        self.elements.resize(desired as usize, init);
        Some(current)
    }

    /// Fills `len` elements starting at `dst` with `value`.
    ///
    /// # Errors
    ///
    /// [`TrapCode::OutOfBoundsTableAccess`] if the filled range is out of
    /// bounds.
    pub fn fill(&mut self, dst: u32, value: UntypedVal, len: u32) -> Result<(), TrapCode> {
        let range = (dst as usize)
            .checked_add(len as usize)
            .and_then(|end| self.elements.get_mut(dst as usize..end))
            .ok_or(TrapCode::OutOfBoundsTableAccess)?;
        range.fill(value);
        Ok(())
    }

    /// Copies `len` elements within the table from `src` to `dst`.
    ///
    /// # Errors
    ///
    /// [`TrapCode::OutOfBoundsTableAccess`] if either range is out of
    /// bounds.
    pub fn copy_within(&mut self, dst: u32, src: u32, len: u32) -> Result<(), TrapCode> {
        let len_elements = self.elements.len();
        let (dst, src, len) = (dst as usize, src as usize, len as usize);
        let dst_end = dst
            .checked_add(len)
            .ok_or(TrapCode::OutOfBoundsTableAccess)?;
        let src_end = src
            .checked_add(len)
            .ok_or(TrapCode::OutOfBoundsTableAccess)?;
        if dst_end > len_elements || src_end > len_elements {
            return Err(TrapCode::OutOfBoundsTableAccess);
        }
        self.elements.copy_within(src..src_end, dst);
        Ok(())
    }

    /// Copies `len` elements of `items` starting at `src` into the table
    /// starting at `dst`.
    ///
    /// # Errors
    ///
    /// [`TrapCode::OutOfBoundsTableAccess`] if either range is out of
    /// bounds.
    pub fn init(&mut self, dst: u32, items: &[UntypedVal], src: u32, len: u32) -> Result<(), TrapCode> {
        let src_slice = (src as usize)
            .checked_add(len as usize)
            .and_then(|end| items.get(src as usize..end))
            .ok_or(TrapCode::OutOfBoundsTableAccess)?;
        let dst_slice = (dst as usize)
            .checked_add(len as usize)
            .and_then(|end| self.elements.get_mut(dst as usize..end))
            .ok_or(TrapCode::OutOfBoundsTableAccess)?;
        dst_slice.copy_from_slice(src_slice);
        Ok(())
    }
}

/// A table reference.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(transparent)]
pub struct Table(pub(crate) EntityHandle<TableEntity>);

impl Table {
    /// Creates a new [`Table`] with the given type and initial value.
    ///
    /// # Errors
    ///
    /// - If `init` does not match the table's element type.
    /// - If the resource limiter denies the allocation.
    pub fn new(runtime: &mut Runtime, ty: TableType, init: Val) -> Result<Self, TableError> {
        if init.ty() != ty.element() {
            return Err(TableError::TypeMismatch {
                expected: ty.element(),
                actual: init.ty(),
            });
        }
        let store = runtime.store_mut();
        if store.len_tables() >= store.limiter_mut().map_or(usize::MAX, |l| l.tables()) {
            return Err(TableError::TooManyTables);
        }
        let entity = TableEntity::new(ty, init.to_untyped(), store.limiter_mut())?;
        Ok(Self(store.alloc_table(entity)))
    }

    /// Returns the [`TableType`] of the table.
    pub fn ty(&self, _runtime: &Runtime) -> TableType {
        self.0.get().ty()
    }

    /// Returns the current size of the table in elements.
    pub fn size(&self, _runtime: &Runtime) -> u32 {
        self.0.get().size()
    }

    /// Returns the element at `index`.
    ///
    /// # Errors
    ///
    /// If `index` is out of bounds.
    pub fn get(&self, _runtime: &Runtime, index: u32) -> Result<Val, TableError> {
        let entity = self.0.get();
        let untyped = entity
            .get(index)
            .map_err(|_| TableError::OutOfBoundsAccess)?;
        Ok(Val::from_untyped(untyped, entity.ty().element()))
    }

    /// Sets the element at `index` to `value`.
    ///
    /// # Errors
    ///
    /// - If `index` is out of bounds.
    /// - If `value` does not match the table's element type.
    pub fn set(&mut self, _runtime: &mut Runtime, index: u32, value: Val) -> Result<(), TableError> {
        let ty = self.0.get().ty();
        if value.ty() != ty.element() {
            return Err(TableError::TypeMismatch {
                expected: ty.element(),
                actual: value.ty(),
            });
        }
        self.0
            .get_mut()
            .set(index, value.to_untyped())
            .map_err(|_| TableError::OutOfBoundsAccess)
    }

    pub(crate) fn handle(&self) -> EntityHandle<TableEntity> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_ty(minimum: u32, maximum: Option<u32>) -> TableType {
        TableType::new(ValType::FuncRef, minimum, maximum).unwrap()
    }

    #[test]
    fn grow_respects_maximum() {
        let null = UntypedVal::from_bits(0);
        let mut table = TableEntity::new(table_ty(1, Some(2)), null, None).unwrap();
        assert_eq!(table.grow(1, null, None), Some(1));
        assert_eq!(table.grow(1, null, None), None);
        assert_eq!(table.size(), 2);
    }

    #[test]
    fn fill_and_copy_bounds() {
        let null = UntypedVal::from_bits(0);
        let one = UntypedVal::from_bits(1);
        let mut table = TableEntity::new(table_ty(4, None), null, None).unwrap();
        table.fill(1, one, 2).unwrap();
        assert_eq!(table.get(0), Ok(null));
        assert_eq!(table.get(1), Ok(one));
        assert_eq!(table.get(2), Ok(one));
        assert_eq!(
            table.fill(3, one, 2),
            Err(TrapCode::OutOfBoundsTableAccess)
        );
        table.copy_within(0, 2, 2).unwrap();
        assert_eq!(table.get(0), Ok(one));
    }
}
