use std::collections::HashMap;
use std::convert::Infallible;

use panopticon_types::Uuid;

use crate::{BlobId, Triple};

/// A content-addressed storage backend, generic over how triples and blobs
/// are actually kept (in memory, on disk, ...). Mirrors a familiar
/// `StorageInspect`/`StorageMutate` split for key-value backends,
/// specialised to the one `(Uuid|BlobId) -> bytes` shape the store needs.
pub trait Storage {
    /// Error type for this backend's operations.
    type Error;

    /// Fetches all triples previously stored for `subject`, if any.
    fn get(&self, subject: Uuid) -> Result<Option<Vec<Triple>>, Self::Error>;

    /// Overwrites the triples stored for `subject`.
    fn put(&mut self, subject: Uuid, triples: Vec<Triple>) -> Result<(), Self::Error>;

    /// Removes everything stored for `subject`.
    fn remove(&mut self, subject: Uuid) -> Result<(), Self::Error>;

    /// Fetches a blob by its content hash.
    fn get_blob(&self, id: BlobId) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Stores `bytes`, returning its content-addressed id.
    fn put_blob(&mut self, bytes: Vec<u8>) -> Result<BlobId, Self::Error>;
}

/// A [`Storage`] backed by plain `HashMap`s, for tests and embedders that
/// don't need persistence across process runs.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    triples: HashMap<Uuid, Vec<Triple>>,
    blobs: HashMap<BlobId, Vec<u8>>,
}

impl MemoryStorage {
    /// An empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    type Error = Infallible;

    fn get(&self, subject: Uuid) -> Result<Option<Vec<Triple>>, Self::Error> {
        Ok(self.triples.get(&subject).cloned())
    }

    fn put(&mut self, subject: Uuid, triples: Vec<Triple>) -> Result<(), Self::Error> {
        self.triples.insert(subject, triples);
        Ok(())
    }

    fn remove(&mut self, subject: Uuid) -> Result<(), Self::Error> {
        self.triples.remove(&subject);
        Ok(())
    }

    fn get_blob(&self, id: BlobId) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.blobs.get(&id).cloned())
    }

    fn put_blob(&mut self, bytes: Vec<u8>) -> Result<BlobId, Self::Error> {
        let id = BlobId::of(&bytes);
        self.blobs.entry(id).or_insert(bytes);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_triples() {
        let mut store = MemoryStorage::new();
        let id = Uuid::new_v4();
        assert_eq!(store.get(id).unwrap(), None);
        store.put(id, vec![]).unwrap();
        assert_eq!(store.get(id).unwrap(), Some(vec![]));
        store.remove(id).unwrap();
        assert_eq!(store.get(id).unwrap(), None);
    }
}
