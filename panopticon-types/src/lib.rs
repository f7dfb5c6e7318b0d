//! Primitive types shared across the Panopticon core crates.
//!
//! This crate is the dependency-free bottom of the workspace: every other
//! `panopticon-*` crate builds on top of the types defined here, the same
//! way `fuel-vm`'s whole workspace builds on `fuel-types`.

mod bound;
mod error;
mod span;

pub use bound::Bound;
pub use error::Error;
pub use span::Span2D;

/// A byte offset into a region, slab or procedure.
pub type Offset = u64;

/// A single byte as read from an image.
pub type Byte = u8;

/// A byte that may be unknown. `None` means "undefined at this offset".
pub type Tryte = Option<Byte>;

/// Endianness of a memory reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endianness {
    /// Most significant byte first.
    Big,
    /// Least significant byte first.
    Little,
}

/// A 128-bit identity used both in memory and in persisted archives.
pub type Uuid = uuid::Uuid;
