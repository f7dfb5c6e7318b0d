use panopticon_il::Instruction;
use panopticon_types::Bound;

use crate::{Error, Mnemonic};

/// A straight-line sequence of [`Mnemonic`]s with no control transfer
/// between them; the only jump, if any, is implicit at the last mnemonic.
///
/// `area()` is the convex hull of its mnemonics' areas, recomputed lazily
/// whenever the mnemonic list changes and cached until the next mutation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BasicBlock {
    mnemonics: Vec<Mnemonic>,
}

impl BasicBlock {
    /// An empty basic block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a basic block from an ordered mnemonic sequence.
    pub fn from_mnemonics(mnemonics: Vec<Mnemonic>) -> Self {
        Self { mnemonics }
    }

    /// This block's mnemonics, in address order.
    pub fn mnemonics(&self) -> &[Mnemonic] {
        &self.mnemonics
    }

    /// Mutable access to the mnemonic list.
    pub fn mnemonics_mut(&mut self) -> &mut Vec<Mnemonic> {
        &mut self.mnemonics
    }

    /// The byte range spanned by this block: the union of its first
    /// mnemonic's start and its last mnemonic's end. Empty if the block
    /// holds no mnemonics.
    pub fn area(&self) -> Option<Bound> {
        let first = self.mnemonics.first()?.area();
        let last = self.mnemonics.last()?.area();
        Some(Bound::new(first.start(), last.end()))
    }

    /// Checks that this block's mnemonics are pairwise disjoint and
    /// jointly cover their combined area with no gap, per address order.
    ///
    /// A block's other invariant — that no mnemonic but the last encodes a
    /// control transfer — isn't checked here: a [`Mnemonic`]'s IL carries
    /// no jump marker of its own, so that invariant is enforced instead by
    /// construction, in the disassembler driver's fold-until-jump loop
    /// that builds a block's mnemonic list one mnemonic at a time and
    /// stops as soon as one produces a jump.
    pub fn validate(&self) -> Result<(), Error> {
        for pair in self.mnemonics.windows(2) {
            let (prev, next) = (pair[0].area(), pair[1].area());
            if prev.overlaps(&next) {
                return Err(Error::IllFormedBlock(format!("mnemonic areas {prev} and {next} overlap")));
            }
            if prev.end() != next.start() {
                return Err(Error::IllFormedBlock(format!("gap between mnemonic areas {prev} and {next}")));
            }
        }
        Ok(())
    }

    /// Invokes `f` with every IL instruction in this block, in order.
    pub fn execute(&self, mut f: impl FnMut(&Instruction)) {
        for mnemonic in &self.mnemonics {
            for instruction in mnemonic.instructions() {
                f(instruction);
            }
        }
    }

    /// Invokes `f` with mutable access to every IL instruction in this
    /// block, in order, allowing operands/assignees to be rewritten.
    pub fn rewrite(&mut self, mut f: impl FnMut(&mut Instruction)) {
        for mnemonic in &mut self.mnemonics {
            for instruction in mnemonic.instructions_mut() {
                f(instruction);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Mnemonic;

    #[test]
    fn empty_block_has_no_area() {
        assert_eq!(BasicBlock::new().area(), None);
    }

    #[test]
    fn area_spans_first_to_last_mnemonic() {
        let m1 = Mnemonic::new(Bound::new(0, 10), "a", "a", vec![], vec![]).unwrap();
        let m2 = Mnemonic::new(Bound::new(10, 13), "b", "b", vec![], vec![]).unwrap();
        let m3 = Mnemonic::new(Bound::new(13, 20), "c", "c", vec![], vec![]).unwrap();
        let bb = BasicBlock::from_mnemonics(vec![m1, m2, m3]);
        assert_eq!(bb.area(), Some(Bound::new(0, 20)));
    }

    #[test]
    fn contiguous_disjoint_mnemonics_validate() {
        let m1 = Mnemonic::new(Bound::new(0, 10), "a", "a", vec![], vec![]).unwrap();
        let m2 = Mnemonic::new(Bound::new(10, 13), "b", "b", vec![], vec![]).unwrap();
        let bb = BasicBlock::from_mnemonics(vec![m1, m2]);
        assert!(bb.validate().is_ok());
    }

    #[test]
    fn overlapping_mnemonics_fail_validation() {
        let m1 = Mnemonic::new(Bound::new(0, 10), "a", "a", vec![], vec![]).unwrap();
        let m2 = Mnemonic::new(Bound::new(5, 13), "b", "b", vec![], vec![]).unwrap();
        let bb = BasicBlock::from_mnemonics(vec![m1, m2]);
        assert!(matches!(bb.validate(), Err(Error::IllFormedBlock(_))));
    }

    #[test]
    fn a_gap_between_mnemonics_fails_validation() {
        let m1 = Mnemonic::new(Bound::new(0, 10), "a", "a", vec![], vec![]).unwrap();
        let m2 = Mnemonic::new(Bound::new(11, 13), "b", "b", vec![], vec![]).unwrap();
        let bb = BasicBlock::from_mnemonics(vec![m1, m2]);
        assert!(matches!(bb.validate(), Err(Error::IllFormedBlock(_))));
    }
}
