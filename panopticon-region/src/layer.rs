use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use panopticon_types::{Offset, Tryte};

use crate::Error;

/// A source of bytes a [`crate::Region`] can map a file-backed blob layer
/// onto. Kept as a trait so tests can substitute an in-memory source for a
/// path-addressed blob.
pub trait BlobSource: fmt::Debug + Send + Sync {
    /// Reads the full contents of this blob.
    fn read(&self) -> Result<Vec<u8>, Error>;
}

/// A blob backed by a file on disk, read in full on layer construction.
#[derive(Debug, Clone)]
pub struct FileBlob {
    path: PathBuf,
}

impl FileBlob {
    /// References the file at `path` as a blob source.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl BlobSource for FileBlob {
    fn read(&self) -> Result<Vec<u8>, Error> {
        std::fs::read(&self.path).map_err(|source| Error::Blob {
            path: self.path.display().to_string(),
            source,
        })
    }
}

/// A blob already held in memory.
#[derive(Debug, Clone)]
pub struct InMemoryBlob {
    bytes: Vec<u8>,
}

impl InMemoryBlob {
    /// Wraps `bytes` as a blob source.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl BlobSource for InMemoryBlob {
    fn read(&self) -> Result<Vec<u8>, Error> {
        Ok(self.bytes.clone())
    }
}

/// One named overlay of bytes a [`crate::Region`] can be built from: a fixed
/// byte run, a sparse mutable overlay, a one-shot byte-to-byte mapping, a
/// run of unknown bytes, or a file-backed blob.
#[derive(Debug, Clone)]
pub enum Layer {
    /// A fully known, fixed byte sequence.
    Anonymous { name: String, data: Arc<Vec<u8>> },
    /// A sparse overlay: only explicitly written offsets are known: unset
    /// offsets pass through to whatever lies beneath in the same region.
    Mutable {
        name: String,
        data: Arc<std::collections::BTreeMap<Offset, u8>>,
        len: Offset,
    },
    /// A byte-to-byte mapping applied once, eagerly, over a captured input.
    Mapping { name: String, data: Arc<Vec<u8>> },
    /// A fixed-length run of entirely unknown bytes.
    Null { name: String, len: Offset },
    /// Bytes read in full from a [`BlobSource`] at construction time.
    Blob { name: String, data: Arc<Vec<u8>> },
}

impl Layer {
    /// A layer of known bytes.
    pub fn anonymous(name: impl Into<String>, data: Vec<u8>) -> Self {
        Layer::Anonymous {
            name: name.into(),
            data: Arc::new(data),
        }
    }

    /// A sparse layer; `len` is the extent it covers, `data` the known
    /// offsets within it.
    pub fn mutable(name: impl Into<String>, len: Offset, data: std::collections::BTreeMap<Offset, u8>) -> Self {
        Layer::Mutable {
            name: name.into(),
            data: Arc::new(data),
            len,
        }
    }

    /// Applies `f` byte-wise over `input`, capturing the result eagerly
    /// rather than lazily re-running it against whatever the region beneath
    /// happens to hold.
    pub fn mapping(name: impl Into<String>, input: &[u8], f: impl Fn(u8) -> u8) -> Self {
        Layer::Mapping {
            name: name.into(),
            data: Arc::new(input.iter().copied().map(f).collect()),
        }
    }

    /// `len` bytes of entirely unknown content.
    pub fn null(name: impl Into<String>, len: Offset) -> Self {
        Layer::Null { name: name.into(), len }
    }

    /// Reads `source` in full as a blob layer.
    pub fn blob(name: impl Into<String>, source: &dyn BlobSource) -> Result<Self, Error> {
        Ok(Layer::Blob {
            name: name.into(),
            data: Arc::new(source.read()?),
        })
    }

    /// This layer's display name.
    pub fn name(&self) -> &str {
        match self {
            Layer::Anonymous { name, .. }
            | Layer::Mutable { name, .. }
            | Layer::Mapping { name, .. }
            | Layer::Null { name, .. }
            | Layer::Blob { name, .. } => name,
        }
    }

    /// Number of bytes this layer supplies.
    pub fn len(&self) -> Offset {
        match self {
            Layer::Anonymous { data, .. } | Layer::Mapping { data, .. } | Layer::Blob { data, .. } => data.len() as Offset,
            Layer::Mutable { len, .. } => *len,
            Layer::Null { len, .. } => *len,
        }
    }

    /// True if this layer supplies zero bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The tryte at `offset` local to this layer (`0` is this layer's own
    /// first byte, not the region's).
    ///
    /// A [`Layer::Mutable`]'s unset offsets and any out-of-range offset
    /// yield `None`; the caller (the region's projection) is responsible
    /// for falling through to whatever lies beneath.
    pub fn byte_at(&self, offset: Offset) -> Tryte {
        match self {
            Layer::Anonymous { data, .. } | Layer::Mapping { data, .. } | Layer::Blob { data, .. } => {
                data.get(offset as usize).copied()
            }
            Layer::Mutable { data, len, .. } => {
                if offset < *len {
                    data.get(&offset).copied()
                } else {
                    None
                }
            }
            Layer::Null { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_layer_reads_its_own_bytes() {
        let layer = Layer::anonymous("anon", vec![1, 2, 3]);
        assert_eq!(layer.byte_at(0), Some(1));
        assert_eq!(layer.byte_at(2), Some(3));
        assert_eq!(layer.byte_at(3), None);
    }

    #[test]
    fn mutable_layer_leaves_unset_offsets_undefined() {
        let mut data = std::collections::BTreeMap::new();
        data.insert(1, 0xffu8);
        let layer = Layer::mutable("mut", 4, data);
        assert_eq!(layer.byte_at(0), None);
        assert_eq!(layer.byte_at(1), Some(0xff));
        assert_eq!(layer.byte_at(4), None);
    }

    #[test]
    fn mapping_layer_applies_function_eagerly() {
        let layer = Layer::mapping("xor", &[1, 2, 3], |b| b ^ 0xff);
        assert_eq!(layer.byte_at(0), Some(0xfe));
        assert_eq!(layer.byte_at(1), Some(0xfd));
    }

    #[test]
    fn null_layer_is_always_undefined() {
        let layer = Layer::null("null", 10);
        assert_eq!(layer.len(), 10);
        assert_eq!(layer.byte_at(0), None);
    }
}
