use panopticon_types::Uuid;

/// Errors raised while marshalling, unmarshalling or persisting entities.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// No triples were found for the requested subject.
    #[error("no entity found for subject {0}")]
    NotFound(Uuid),
    /// A triple set could not be reassembled into the target type.
    #[error("malformed entity {subject}: {reason}")]
    Malformed {
        /// Subject the triples belonged to.
        subject: Uuid,
        /// What made unmarshalling fail.
        reason: String,
    },
    /// No blob exists for the requested content hash.
    #[error("no blob found for hash {0:x?}")]
    MissingBlob([u8; 32]),
    /// The underlying storage backend failed.
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// A [`crate::WLoc`] was upgraded after its owning [`crate::Loc`] (and
    /// every other owner) had already been dropped.
    #[error("weak handle to {0} expired")]
    ExpiredWeakHandle(Uuid),
}
