use std::collections::HashMap;

use panopticon_types::Uuid;

use crate::{BlobId, Triple};

/// An in-memory bundle of triples and the blobs they reference, held as
/// plain vectors rather than behind any particular triple-store backend.
#[derive(Debug, Clone, Default)]
pub struct Archive {
    triples: Vec<Triple>,
    blobs: HashMap<BlobId, Vec<u8>>,
}

impl Archive {
    /// An empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a triple.
    pub fn insert(&mut self, triple: Triple) {
        self.triples.push(triple);
    }

    /// Adds a blob, returning its content-addressed id.
    pub fn insert_blob(&mut self, bytes: Vec<u8>) -> BlobId {
        let id = BlobId::of(&bytes);
        self.blobs.entry(id).or_insert(bytes);
        id
    }

    /// All triples whose subject is `subject`.
    pub fn triples_for(&self, subject: Uuid) -> impl Iterator<Item = &Triple> {
        self.triples.iter().filter(move |t| t.subject() == subject)
    }

    /// Looks up a blob by its content hash.
    pub fn blob(&self, id: BlobId) -> Option<&[u8]> {
        self.blobs.get(&id).map(Vec::as_slice)
    }

    /// All triples in the archive.
    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }
}
