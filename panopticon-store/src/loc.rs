use std::sync::{Arc, RwLock, RwLockReadGuard, Weak};

use panopticon_types::Uuid;

use crate::Error;

/// An owning, content-addressed handle to a loaded entity. The value is
/// loaded eagerly at construction (by [`crate::StoreContext::load`]) rather
/// than lazily on first `read()`/`write()`, since lazy loading would need a
/// store reference the handle itself doesn't carry.
#[derive(Debug, Clone)]
pub struct Loc<T> {
    id: Uuid,
    value: Arc<RwLock<T>>,
}

impl<T> Loc<T> {
    /// Wraps `value` under `id`.
    pub fn new(id: Uuid, value: T) -> Self {
        Self {
            id,
            value: Arc::new(RwLock::new(value)),
        }
    }

    /// The subject uuid this handle addresses.
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Read-locks the underlying value.
    ///
    /// Panics if the lock is poisoned, matching the rest of the workspace's
    /// `std::sync` usage.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.value.read().expect("loc lock poisoned")
    }

    /// Creates a non-owning observer of this handle.
    pub fn downgrade(&self) -> WLoc<T> {
        WLoc {
            id: self.id,
            value: Arc::downgrade(&self.value),
        }
    }

    pub(crate) fn cell(&self) -> Arc<RwLock<T>> {
        Arc::clone(&self.value)
    }
}

/// A non-owning, content-addressed observer of a [`Loc`]. Once every `Loc`
/// referencing the same entity is dropped, [`WLoc::upgrade`] returns `None`
/// rather than throwing.
#[derive(Debug, Clone)]
pub struct WLoc<T> {
    id: Uuid,
    value: Weak<RwLock<T>>,
}

impl<T> WLoc<T> {
    /// The subject uuid this handle addresses.
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Recovers an owning handle, if the entity is still alive.
    pub fn upgrade(&self) -> Option<Loc<T>> {
        self.value.upgrade().map(|value| Loc { id: self.id, value })
    }

    /// Like [`WLoc::upgrade`], but turns expiry into [`Error::ExpiredWeakHandle`]
    /// for callers that need to propagate the failure rather than branch on it.
    pub fn upgrade_or_err(&self) -> Result<Loc<T>, Error> {
        self.upgrade().ok_or(Error::ExpiredWeakHandle(self.id))
    }
}
