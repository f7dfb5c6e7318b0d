//! Content-addressed object store and marshalling traits.
//!
//! Provides the triple/blob data model ([`Term`], [`Triple`], [`BlobId`],
//! [`Archive`]), the [`Marshal`]/[`Unmarshal`] conversion traits, a
//! backend-agnostic [`Storage`] trait with an in-memory reference
//! implementation, and the transactional [`StoreContext`] that tracks
//! which entities need flushing.
//!
//! No concrete triple-store (RDF/Turtle) backend is shipped; embedders
//! supply their own [`Storage`] implementation.

mod archive;
mod context;
mod error;
mod loc;
mod marshal;
mod storage;
mod term;

pub use archive::Archive;
pub use context::StoreContext;
pub use error::Error;
pub use loc::{Loc, WLoc};
pub use marshal::{Marshal, Unmarshal};
pub use storage::{MemoryStorage, Storage};
pub use term::{BlobId, Literal, Term, Triple};
