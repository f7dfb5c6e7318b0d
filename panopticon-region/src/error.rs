use panopticon_types::Offset;

/// Errors raised while composing or reading a [`crate::Region`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A layer was added outside `[0, region length)`.
    #[error("range [{start}, {end}) lies outside the region's [0, {length}) bound")]
    OutOfBounds { start: Offset, end: Offset, length: Offset },
    /// A layer's own byte count didn't match the range it was added under.
    #[error("layer `{name}` supplies {supplied} bytes but was added over a {expected}-byte range")]
    LengthMismatch {
        name: String,
        supplied: Offset,
        expected: Offset,
    },
    /// A file-backed blob could not be read.
    #[error("failed to read blob from {path}: {source}")]
    Blob {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
