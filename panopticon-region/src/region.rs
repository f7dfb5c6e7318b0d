use std::sync::{Arc, Mutex};

use panopticon_types::{Bound, Offset, Tryte};
use tracing::trace;

use crate::{Error, Layer, Slab};

/// A named, length-bounded addressable byte-source composed from
/// overlapping layers.
///
/// `add` overlays a layer over a sub-range; later adds win over earlier
/// ones where ranges overlap. `flatten`/`read` compute and cache the
/// resulting non-overlapping partition, invalidated on the next `add`.
#[derive(Debug)]
pub struct Region {
    name: String,
    length: Offset,
    layers: Vec<(Bound, Layer)>,
    projection: Mutex<Option<Arc<Vec<(Bound, usize)>>>>,
}

impl Region {
    /// An empty region of `length` bytes, entirely undefined until layers
    /// are added.
    pub fn undefined(name: impl Into<String>, length: Offset) -> Self {
        Self {
            name: name.into(),
            length,
            layers: Vec::new(),
            projection: Mutex::new(None),
        }
    }

    /// This region's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total addressable length.
    pub const fn length(&self) -> Offset {
        self.length
    }

    /// Overlays `layer` over `range`.
    ///
    /// Fails with [`Error::OutOfBounds`] if `range` extends past this
    /// region's length, or [`Error::LengthMismatch`] if `layer`'s own byte
    /// count doesn't match `range`'s length. Invalidates the cached
    /// projection.
    pub fn add(&mut self, range: Bound, layer: Layer) -> Result<(), Error> {
        if range.end() > self.length {
            return Err(Error::OutOfBounds {
                start: range.start(),
                end: range.end(),
                length: self.length,
            });
        }
        if layer.len() != range.len() {
            return Err(Error::LengthMismatch {
                name: layer.name().to_string(),
                supplied: layer.len(),
                expected: range.len(),
            });
        }
        trace!(region = %self.name, layer = %layer.name(), %range, "adding layer");
        self.layers.push((range, layer));
        *self.projection.lock().expect("projection lock poisoned") = None;
        Ok(())
    }

    /// The non-overlapping partition of `[0, length)` induced by insertion
    /// order: maintain a split-interval map seeded with nothing, and for
    /// each `(range, layer)` in insertion order, subtract `range` from
    /// every existing entry before inserting `range` whole — so a later
    /// add always wins the sub-ranges it overlaps.
    pub fn flatten(&self) -> Vec<(Bound, &str)> {
        self.projection()
            .iter()
            .map(|(bound, idx)| (*bound, self.layers[*idx].1.name()))
            .collect()
    }

    fn projection(&self) -> Arc<Vec<(Bound, usize)>> {
        let mut cached = self.projection.lock().expect("projection lock poisoned");
        if let Some(p) = cached.as_ref() {
            return Arc::clone(p);
        }
        let mut segments: Vec<(Bound, usize)> = Vec::new();
        for (idx, (range, _)) in self.layers.iter().enumerate() {
            let mut next = Vec::with_capacity(segments.len() + 1);
            for (existing, owner) in segments.drain(..) {
                for remainder in subtract(existing, *range) {
                    next.push((remainder, owner));
                }
            }
            next.push((*range, idx));
            next.sort_by_key(|(bound, _)| bound.start());
            segments = next;
        }
        let projection = Arc::new(segments);
        *cached = Some(Arc::clone(&projection));
        projection
    }

    /// Flattens this region into a lazily-readable [`Slab`].
    pub fn read(&self) -> Slab {
        let projection = self.projection();
        let segments = projection
            .iter()
            .map(|(bound, idx)| {
                let data: Vec<Tryte> = (bound.start()..bound.end()).map(|offset| self.byte_at(offset, *idx)).collect();
                (*bound, Arc::new(data))
            })
            .collect();
        Slab::from_segments(self.length, segments)
    }

    /// The byte at `global_offset`, read from layer `idx` and, if that
    /// layer leaves the offset unset, from whichever earlier-added layer
    /// covering the same offset lies immediately beneath it, and so on.
    fn byte_at(&self, global_offset: Offset, idx: usize) -> Tryte {
        let (range, layer) = &self.layers[idx];
        let local = global_offset - range.start();
        if let Some(byte) = layer.byte_at(local) {
            return Some(byte);
        }
        self.layers[..idx]
            .iter()
            .enumerate()
            .rev()
            .find(|(_, (range, _))| range.contains(global_offset))
            .and_then(|(beneath_idx, _)| self.byte_at(global_offset, beneath_idx))
    }
}

/// Returns the pieces of `existing` not covered by `punch`, preserving
/// `existing`'s relative order (at most one piece on each side of `punch`).
fn subtract(existing: Bound, punch: Bound) -> Vec<Bound> {
    if !existing.overlaps(&punch) {
        return vec![existing];
    }
    let mut out = Vec::with_capacity(2);
    if existing.start() < punch.start() {
        out.push(Bound::new(existing.start(), punch.start()));
    }
    if existing.end() > punch.end() {
        out.push(Bound::new(punch.end(), existing.end()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_region_reads_all_none() {
        let r = Region::undefined("test", 128);
        let slab = r.read();
        assert_eq!(slab.len(), 128);
        assert!(slab.to_vec().iter().all(Option::is_none));
    }

    #[test]
    fn add_out_of_bounds_is_rejected() {
        let mut r = Region::undefined("test", 10);
        let layer = Layer::anonymous("anon", vec![0; 5]);
        assert!(r.add(Bound::new(8, 13), layer).is_err());
    }

    #[test]
    fn add_length_mismatch_is_rejected() {
        let mut r = Region::undefined("test", 10);
        let layer = Layer::anonymous("anon", vec![0; 3]);
        assert!(r.add(Bound::new(0, 5), layer).is_err());
    }

    #[test]
    fn layer_projection_scenario() {
        let mut r = Region::undefined("test", 134);
        r.add(Bound::new(0, 128), Layer::anonymous("base", vec![0; 128])).unwrap();
        r.add(Bound::new(0, 64), Layer::anonymous("xor", vec![0; 64])).unwrap();
        r.add(Bound::new(45, 72), Layer::anonymous("add", vec![0; 27])).unwrap();
        r.add(Bound::new(80, 128), Layer::anonymous("zlib", vec![0; 48])).unwrap();
        r.add(Bound::new(102, 134), Layer::anonymous("aes", vec![0; 32])).unwrap();

        let projection = r.flatten();
        let expected = vec![
            (Bound::new(0, 45), "xor"),
            (Bound::new(45, 72), "add"),
            (Bound::new(72, 80), "base"),
            (Bound::new(80, 102), "zlib"),
            (Bound::new(102, 134), "aes"),
        ];
        assert_eq!(projection, expected);
    }

    #[test]
    fn read_one_layer_fills_in_gaps_as_undefined() {
        let mut r = Region::undefined("test", 16);
        r.add(Bound::new(1, 8), Layer::anonymous("anon", vec![1, 2, 3, 4, 5, 6, 7])).unwrap();
        let slab = r.read();
        let bytes = slab.to_vec();
        assert_eq!(bytes[0], None);
        assert_eq!(bytes[1], Some(1));
        assert_eq!(bytes[7], Some(7));
        assert_eq!(bytes[8], None);
    }

    #[test]
    fn mutable_layer_unset_offsets_fall_through_to_layer_beneath() {
        let mut r = Region::undefined("test", 4);
        r.add(Bound::new(0, 4), Layer::anonymous("base", vec![10, 20, 30, 40])).unwrap();
        let mut sparse = std::collections::BTreeMap::new();
        sparse.insert(1, 0xff);
        r.add(Bound::new(0, 4), Layer::mutable("patch", 4, sparse)).unwrap();

        let bytes = r.read().to_vec();
        assert_eq!(bytes, vec![Some(10), Some(0xff), Some(30), Some(40)]);
    }

    #[test]
    fn mutable_layer_falls_through_multiple_layers_deep() {
        let mut r = Region::undefined("test", 2);
        r.add(Bound::new(0, 2), Layer::anonymous("base", vec![1, 2])).unwrap();
        let mut first_patch = std::collections::BTreeMap::new();
        first_patch.insert(0, 0xaa);
        r.add(Bound::new(0, 2), Layer::mutable("patch1", 2, first_patch)).unwrap();
        r.add(Bound::new(0, 2), Layer::mutable("patch2", 2, std::collections::BTreeMap::new())).unwrap();

        let bytes = r.read().to_vec();
        assert_eq!(bytes, vec![Some(0xaa), Some(2)]);
    }

    #[test]
    fn later_overlapping_add_wins_and_invalidates_cache() {
        let mut r = Region::undefined("test", 4);
        r.add(Bound::new(0, 4), Layer::anonymous("first", vec![1, 1, 1, 1])).unwrap();
        let before = r.read().to_vec();
        assert_eq!(before, vec![Some(1), Some(1), Some(1), Some(1)]);

        r.add(Bound::new(0, 4), Layer::anonymous("second", vec![2, 2, 2, 2])).unwrap();
        let after = r.read().to_vec();
        assert_eq!(after, vec![Some(2), Some(2), Some(2), Some(2)]);
    }
}
