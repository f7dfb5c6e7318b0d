use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use panopticon_types::Uuid;
use tracing::{debug, trace};

use crate::{Archive, BlobId, Error, Loc, Marshal, Storage, Term, Triple, Unmarshal};

type Remarshal = Box<dyn Fn() -> (Vec<Triple>, Vec<(BlobId, Vec<u8>)>) + Send + Sync>;
type Rollback = Box<dyn FnOnce() + Send + Sync>;

/// One entity's pending write: how to flush its current value at a save
/// point, and, if it was a mutation of a pre-existing value rather than a
/// fresh insert, how to revert `loc`'s cell to the pre-mutation value.
struct DirtyEntry {
    remarshal: Remarshal,
    rollback: Option<Rollback>,
}

/// Threads a storage backend together with the set of entities modified
/// since the last save point.
///
/// The original keeps a single process-wide `dirty_locations` map guarded
/// by a mutex (`loc.hh`); this keeps the same "uuid maps to a closure that
/// re-marshals the live value" shape but owns the map itself instead of
/// reaching into a global, so multiple independent contexts (e.g. one per
/// test) never interfere with each other.
pub struct StoreContext<S> {
    storage: S,
    dirty: HashMap<Uuid, DirtyEntry>,
}

/// Marshals `value` into a self-contained [`Archive`]: its triples plus
/// the bytes of every blob they reference, so it can later be unmarshaled
/// back without touching storage.
fn archive_of<T: Marshal>(subject: Uuid, value: &T) -> Archive {
    let mut archive = Archive::new();
    for (_, bytes) in value.blobs() {
        archive.insert_blob(bytes);
    }
    for triple in value.marshal(subject) {
        archive.insert(triple);
    }
    archive
}

impl<S: Storage> StoreContext<S> {
    /// Wraps `storage` with an empty dirty set.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            dirty: HashMap::new(),
        }
    }

    /// Loads the entity stored under `subject` into an owning handle.
    pub fn load<T: Unmarshal>(&self, subject: Uuid) -> Result<Loc<T>, Error>
    where
        S::Error: std::error::Error + Send + Sync + 'static,
    {
        let triples = self
            .storage
            .get(subject)
            .map_err(|e| Error::Backend(Box::new(e)))?
            .ok_or(Error::NotFound(subject))?;
        let mut archive = Archive::new();
        for triple in &triples {
            if let Term::Blob(id) = triple.object() {
                if let Some(bytes) = self.storage.get_blob(*id).map_err(|e| Error::Backend(Box::new(e)))? {
                    archive.insert_blob(bytes);
                }
            }
        }
        for triple in triples {
            archive.insert(triple);
        }
        let value = T::unmarshal(subject, &archive)?;
        Ok(Loc::new(subject, value))
    }

    /// Registers a fresh entity, handing back an owning handle to it and
    /// marking it dirty. There is no pre-existing value to roll back to,
    /// so a subsequent `discard_changes` just drops the pending write.
    pub fn insert<T: Marshal + Send + Sync + 'static>(&mut self, subject: Uuid, value: T) -> Loc<T> {
        let loc = Loc::new(subject, value);
        self.mark_dirty(&loc, None);
        loc
    }

    /// Applies `f` to the value behind `loc` and marks it dirty, capturing
    /// the pre-mutation archive so `discard_changes` can restore it.
    pub fn mutate<T: Marshal + Unmarshal + Send + Sync + 'static>(&mut self, loc: &Loc<T>, f: impl FnOnce(&mut T)) {
        let cell = loc.cell();
        let before_archive = {
            let guard = cell.read().expect("loc lock poisoned");
            archive_of(loc.id(), &*guard)
        };
        {
            let mut guard = cell.write().expect("loc lock poisoned");
            f(&mut guard);
        }
        self.mark_dirty(loc, Some(before_archive));
    }

    /// Records `loc` as modified since the last save point, capturing a
    /// closure that re-marshals its *current* value when flushed.
    /// `before_archive`, if given, is the pre-mutation archive: the entity
    /// `discard_changes` restores `loc`'s cell to by unmarshaling it back.
    pub fn mark_dirty<T: Marshal + Unmarshal + Send + Sync + 'static>(&mut self, loc: &Loc<T>, before_archive: Option<Archive>) {
        let cell: Arc<RwLock<T>> = loc.cell();
        let id = loc.id();
        trace!(subject = %id, "marking entity dirty");
        let remarshal_cell = Arc::clone(&cell);
        let remarshal: Remarshal = Box::new(move || {
            let guard = remarshal_cell.read().expect("loc lock poisoned");
            (guard.marshal(id), guard.blobs())
        });
        let rollback: Option<Rollback> = before_archive.map(|archive| {
            let rollback_cell = Arc::clone(&cell);
            Box::new(move || {
                if let Ok(value) = T::unmarshal(id, &archive) {
                    *rollback_cell.write().expect("loc lock poisoned") = value;
                }
            }) as Rollback
        });
        self.dirty.insert(id, DirtyEntry { remarshal, rollback });
    }

    /// Flushes every dirty entity to the backend and clears the dirty set.
    pub fn save_point(&mut self) -> Result<(), Error>
    where
        S::Error: std::error::Error + Send + Sync + 'static,
    {
        let pending: Vec<_> = self.dirty.drain().collect();
        debug!(count = pending.len(), "flushing dirty entities at save point");
        for (subject, entry) in pending {
            let (triples, blobs) = (entry.remarshal)();
            for (_, bytes) in blobs {
                self.storage.put_blob(bytes).map_err(|e| Error::Backend(Box::new(e)))?;
            }
            self.storage
                .put(subject, triples)
                .map_err(|e| Error::Backend(Box::new(e)))?;
        }
        Ok(())
    }

    /// Drops every pending (unsaved) write without persisting it. Entities
    /// already flushed by an earlier `save_point` are unaffected. A `Loc`
    /// that was `mutate`d since the last save point is rolled back to its
    /// pre-mutation value; one that was freshly `insert`ed has no prior
    /// value to roll back to and simply stops being tracked as dirty.
    pub fn discard_changes(&mut self) {
        let pending: Vec<_> = self.dirty.drain().collect();
        debug!(count = pending.len(), "discarding pending changes");
        for (_, entry) in pending {
            if let Some(rollback) = entry.rollback {
                rollback();
            }
        }
    }

    /// Number of entities modified since the last save point.
    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Borrows the underlying backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryStorage, Term};

    #[derive(Debug, PartialEq, Eq)]
    struct Counter(u64);

    impl Marshal for Counter {
        fn marshal(&self, subject: Uuid) -> Vec<Triple> {
            vec![Triple::new(subject, "count", Term::Literal(crate::Literal::U64(self.0)))]
        }
    }

    impl Unmarshal for Counter {
        fn unmarshal(subject: Uuid, archive: &Archive) -> Result<Self, Error> {
            archive
                .triples_for(subject)
                .find(|t| t.predicate() == "count")
                .and_then(|t| match t.object() {
                    Term::Literal(crate::Literal::U64(n)) => Some(Counter(*n)),
                    _ => None,
                })
                .ok_or(Error::NotFound(subject))
        }
    }

    #[test]
    fn insert_then_save_point_persists() {
        let mut ctx = StoreContext::new(MemoryStorage::new());
        let id = Uuid::new_v4();
        let loc = ctx.insert(id, Counter(1));
        assert_eq!(ctx.dirty_count(), 1);
        ctx.save_point().unwrap();
        assert_eq!(ctx.dirty_count(), 0);

        let reloaded: Loc<Counter> = ctx.load(id).unwrap();
        assert_eq!(*reloaded.read(), Counter(1));
        drop(loc);
    }

    #[test]
    fn discard_changes_drops_pending_writes() {
        let mut ctx = StoreContext::new(MemoryStorage::new());
        let id = Uuid::new_v4();
        let _loc = ctx.insert(id, Counter(1));
        ctx.discard_changes();
        assert_eq!(ctx.dirty_count(), 0);
        assert!(ctx.load::<Counter>(id).is_err());
    }

    #[test]
    fn discard_after_mutate_restores_the_pre_mutation_value() {
        let mut ctx = StoreContext::new(MemoryStorage::new());
        let id = Uuid::new_v4();
        let loc = ctx.insert(id, Counter(1));
        ctx.save_point().unwrap();

        ctx.mutate(&loc, |c| c.0 = 99);
        assert_eq!(*loc.read(), Counter(99));

        ctx.discard_changes();
        assert_eq!(ctx.dirty_count(), 0);
        assert_eq!(*loc.read(), Counter(1));
    }

    #[test]
    fn mutate_updates_value_and_redirties() {
        let mut ctx = StoreContext::new(MemoryStorage::new());
        let id = Uuid::new_v4();
        let loc = ctx.insert(id, Counter(1));
        ctx.save_point().unwrap();

        ctx.mutate(&loc, |c| c.0 += 1);
        assert_eq!(ctx.dirty_count(), 1);
        ctx.save_point().unwrap();

        let reloaded: Loc<Counter> = ctx.load(id).unwrap();
        assert_eq!(*reloaded.read(), Counter(2));
    }
}
