use std::sync::Arc;

use panopticon_types::{Bound, Offset, Tryte};

/// One non-overlapping, contiguous run of known-source bytes within a
/// [`Slab`].
#[derive(Debug, Clone)]
struct Segment {
    bound: Bound,
    data: Arc<Vec<Tryte>>,
}

/// A flattened, lazily-read view of a region's bytes.
///
/// Segments are sorted and non-overlapping; offsets not covered by any
/// segment read as [`None`] ("tryte" semantics) — out-of-range and
/// undefined-but-in-range reads never fail.
#[derive(Debug, Clone, Default)]
pub struct Slab {
    size: Offset,
    segments: Vec<Segment>,
}

impl Slab {
    /// An entirely undefined slab of `size` trytes.
    pub fn undefined(size: Offset) -> Self {
        Self { size, segments: Vec::new() }
    }

    pub(crate) fn from_segments(size: Offset, segments: Vec<(Bound, Arc<Vec<Tryte>>)>) -> Self {
        let segments = segments.into_iter().map(|(bound, data)| Segment { bound, data }).collect();
        Self { size, segments }
    }

    /// Total number of addressable trytes.
    pub const fn len(&self) -> Offset {
        self.size
    }

    /// True if this slab covers zero bytes.
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Reads the tryte at `offset`, in `O(log segments)`.
    ///
    /// Returns `None` both for genuinely undefined bytes and for
    /// `offset >= len()` — out-of-range reads never fail.
    pub fn get(&self, offset: Offset) -> Tryte {
        if offset >= self.size {
            return None;
        }
        let idx = self.segments.partition_point(|s| s.bound.end() <= offset);
        match self.segments.get(idx) {
            Some(seg) if seg.bound.contains(offset) => seg.data[(offset - seg.bound.start()) as usize],
            _ => None,
        }
    }

    /// Materializes every tryte in order. Prefer [`Slab::get`] for random
    /// access; this is for callers (tests, small regions) that want the
    /// whole sequence.
    pub fn to_vec(&self) -> Vec<Tryte> {
        (0..self.size).map(|o| self.get(o)).collect()
    }

    /// Concatenates `self` followed by `other`, in `O(segments(a) +
    /// segments(b))`.
    pub fn combine(&self, other: &Slab) -> Slab {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().map(|seg| Segment {
            bound: seg.bound.translate(self.size),
            data: Arc::clone(&seg.data),
        }));
        Slab {
            size: self.size + other.size,
            segments,
        }
    }
}
