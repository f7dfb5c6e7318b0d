use std::fmt;

use panopticon_types::Uuid;
use sha3::{Digest, Sha3_256};

/// Content hash of a blob, keyed by its SHA3-256 digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobId([u8; 32]);

impl BlobId {
    /// Hashes `bytes` into a content-addressed id.
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Sha3_256::new();
        hasher.update(bytes);
        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Self(out)
    }

    /// The raw digest bytes.
    pub const fn digest(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// The object position of a [`Triple`]: either a reference to another
/// subject, a content-addressed blob, or a plain literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// A reference to another entity's subject uuid.
    Ref(Uuid),
    /// A reference to a content-addressed byte blob.
    Blob(BlobId),
    /// An inline scalar value.
    Literal(Literal),
}

/// Scalar literal values a [`Term`] can carry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    /// A UTF-8 string.
    Str(String),
    /// An unsigned 64-bit integer.
    U64(u64),
    /// A signed 64-bit integer.
    I64(i64),
    /// A boolean.
    Bool(bool),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) => write!(f, "{s:?}"),
            Literal::U64(n) => write!(f, "{n}"),
            Literal::I64(n) => write!(f, "{n}"),
            Literal::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// One `subject predicate object` fact about an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Triple {
    subject: Uuid,
    predicate: String,
    object: Term,
}

impl Triple {
    /// Builds a triple.
    pub fn new(subject: Uuid, predicate: impl Into<String>, object: Term) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
            object,
        }
    }

    /// The entity this fact is about.
    pub const fn subject(&self) -> Uuid {
        self.subject
    }

    /// The fact's relation name.
    pub fn predicate(&self) -> &str {
        &self.predicate
    }

    /// The fact's value.
    pub fn object(&self) -> &Term {
        &self.object
    }
}
