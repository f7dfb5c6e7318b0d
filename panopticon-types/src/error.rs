/// Errors raised by primitive type constructors.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A `Bound` was constructed with `start > end`.
    #[error("bound start {start} is greater than end {end}")]
    InvertedBound {
        /// Requested start offset.
        start: u64,
        /// Requested end offset.
        end: u64,
    },
}
