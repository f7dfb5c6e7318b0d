use panopticon_types::Uuid;

use crate::{Archive, BlobId, Error, Triple};

/// Types that can be flattened into triples about a given subject.
pub trait Marshal {
    /// Produces the triples describing `self`, all sharing `subject`.
    fn marshal(&self, subject: Uuid) -> Vec<Triple>;

    /// Content-addressed blobs any of `marshal`'s triples reference,
    /// paired with their bytes. Empty for entities with no `Term::Blob`
    /// triples.
    fn blobs(&self) -> Vec<(BlobId, Vec<u8>)> {
        Vec::new()
    }
}

/// Types that can be rebuilt from the triples an [`Archive`] holds about a
/// subject.
pub trait Unmarshal: Sized {
    /// Rebuilds `Self` from `archive`'s triples about `subject`.
    fn unmarshal(subject: Uuid, archive: &Archive) -> Result<Self, Error>;
}
