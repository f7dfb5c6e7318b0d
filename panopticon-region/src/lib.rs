//! Layered, byte-addressable memory image.
//!
//! A [`Region`] composes [`Layer`]s added over sub-ranges into a single
//! flattened [`Slab`]; a [`RegionGraph`] relates independently named
//! regions to one another.

mod error;
mod graph;
mod layer;
mod region;
mod slab;

pub use error::Error;
pub use graph::{RegionGraph, RegionIndex};
pub use layer::{BlobSource, FileBlob, InMemoryBlob, Layer};
pub use region::Region;
pub use slab::Slab;
