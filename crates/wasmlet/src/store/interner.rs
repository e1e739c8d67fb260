use std::collections::BTreeMap;

/// A deduplicating interner assigning dense `u32` symbols.
///
/// Two interned symbols are equal if and only if the interned entities are
/// equal by structural equality. Symbols are stable for the lifetime of the
/// interner.
#[derive(Debug)]
pub struct Interner<T> {
    /// Maps from entities to their dense symbols.
    entity2sym: BTreeMap<T, u32>,
    /// Maps from dense symbols back to their entities.
    entities: Vec<T>,
}

impl<T> Default for Interner<T> {
    fn default() -> Self {
        Self {
            entity2sym: BTreeMap::new(),
            entities: Vec::new(),
        }
    }
}

impl<T> Interner<T> {
    /// Returns the number of interned entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Resolves the symbol to its interned entity if any.
    #[inline]
    pub fn resolve(&self, sym: u32) -> Option<&T> {
        self.entities.get(sym as usize)
    }
}

impl<T> Interner<T>
where
    T: Ord + Clone,
{
    /// Interns the entity and returns its dense symbol.
    ///
    /// Only allocates a new symbol if the entity has not been interned
    /// before.
    pub fn intern(&mut self, entity: T) -> u32 {
        match self.entity2sym.get(&entity) {
            Some(sym) => *sym,
            None => {
                let sym = u32::try_from(self.entities.len())
                    .unwrap_or_else(|_| panic!("out of interner symbols"));
                self.entity2sym.insert(entity.clone(), sym);
                self.entities.push(entity);
                sym
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_intern_round_trips() {
        let mut interner = Interner::<String>::default();
        let hello = interner.intern("hello".to_string());
        let world = interner.intern("world".to_string());
        assert_eq!(interner.resolve(hello), Some(&"hello".to_string()));
        assert_eq!(interner.resolve(world), Some(&"world".to_string()));
    }

    #[test]
    fn interning_deduplicates() {
        let mut interner = Interner::<String>::default();
        let fst = interner.intern("hello".to_string());
        let snd = interner.intern("hello".to_string());
        let other = interner.intern("world".to_string());
        assert_eq!(fst, snd);
        assert_ne!(fst, other);
        assert_eq!(interner.len(), 2);
    }
}
