use std::collections::{HashMap, HashSet};

use crate::{BlockIndex, Error, Procedure};

/// A procedure's dominance tree: immediate dominators plus the dominance
/// frontier of each block.
#[derive(Debug, Clone, Default)]
pub struct DominanceTree {
    /// `idom[b]` is `b`'s immediate dominator; absent for the entry.
    idom: HashMap<BlockIndex, BlockIndex>,
    /// `frontier[b]` is the set of join points `b` dominates a predecessor
    /// of but does not itself dominate.
    frontier: HashMap<BlockIndex, HashSet<BlockIndex>>,
    entry: BlockIndex,
}

impl DominanceTree {
    /// `b`'s immediate dominator, or `None` for the entry block.
    pub fn immediate_dominator(&self, b: BlockIndex) -> Option<BlockIndex> {
        self.idom.get(&b).copied()
    }

    /// The dominance frontier of `b`.
    pub fn frontier(&self, b: BlockIndex) -> &HashSet<BlockIndex> {
        static EMPTY: std::sync::OnceLock<HashSet<BlockIndex>> = std::sync::OnceLock::new();
        self.frontier.get(&b).unwrap_or_else(|| EMPTY.get_or_init(HashSet::new))
    }

    /// True if `a` dominates `b` (every path from the entry to `b` passes
    /// through `a`), including `a == b`.
    pub fn dominates(&self, a: BlockIndex, b: BlockIndex) -> bool {
        let mut cursor = b;
        loop {
            if cursor == a {
                return true;
            }
            match self.idom.get(&cursor) {
                Some(&parent) if parent != cursor => cursor = parent,
                _ => return cursor == a,
            }
        }
    }

    /// The procedure's entry block.
    pub const fn entry(&self) -> BlockIndex {
        self.entry
    }
}

/// Reverse post-order over the blocks reachable from `entry`, via
/// successors.
fn reverse_postorder(proc: &Procedure, entry: BlockIndex) -> Vec<BlockIndex> {
    let mut visited = HashSet::new();
    let mut postorder = Vec::new();
    let mut stack = vec![(entry, proc.successors(entry).collect::<Vec<_>>().into_iter())];
    visited.insert(entry);

    while let Some((node, iter)) = stack.last_mut() {
        if let Some(succ) = iter.next() {
            if visited.insert(succ) {
                let succs = proc.successors(succ).collect::<Vec<_>>().into_iter();
                stack.push((succ, succs));
            }
        } else {
            postorder.push(*node);
            stack.pop();
        }
    }
    postorder.reverse();
    postorder
}

/// Computes the dominance tree of `proc`, rooted at its entry block.
///
/// Fails with [`Error::UnreachableBlock`] naming a block that is not
/// reachable from the entry when the CFG is not fully connected.
pub fn dominance_tree(proc: &Procedure) -> Result<DominanceTree, Error> {
    let entry = proc.entry().ok_or_else(|| Error::UnreachableBlock(0))?;
    let rpo = reverse_postorder(proc, entry);
    let reachable: HashSet<BlockIndex> = rpo.iter().copied().collect();
    for idx in 0..proc.blocks().len() {
        if !reachable.contains(&idx) {
            return Err(Error::UnreachableBlock(idx));
        }
    }

    let order_index: HashMap<BlockIndex, usize> = rpo.iter().enumerate().map(|(i, &b)| (b, i)).collect();
    let mut idom: HashMap<BlockIndex, BlockIndex> = HashMap::new();
    idom.insert(entry, entry);

    let mut changed = true;
    while changed {
        changed = false;
        for &b in rpo.iter().filter(|&&b| b != entry) {
            let mut preds: Vec<BlockIndex> = proc.predecessors(b).filter(|p| idom.contains_key(p)).collect();
            preds.sort_by_key(|p| order_index[p]);
            let Some(&first) = preds.first() else { continue };
            let mut new_idom = first;
            for &p in &preds[1..] {
                new_idom = intersect(&idom, &order_index, new_idom, p);
            }
            if idom.get(&b) != Some(&new_idom) {
                idom.insert(b, new_idom);
                changed = true;
            }
        }
    }
    idom.remove(&entry);

    let mut frontier: HashMap<BlockIndex, HashSet<BlockIndex>> = HashMap::new();
    for &b in &rpo {
        let preds: Vec<BlockIndex> = proc.predecessors(b).collect();
        if preds.len() < 2 {
            continue;
        }
        for p in preds {
            let mut runner = p;
            let b_idom = idom.get(&b).copied();
            while Some(runner) != b_idom && runner != b {
                frontier.entry(runner).or_default().insert(b);
                match idom.get(&runner) {
                    Some(&next) if next != runner => runner = next,
                    _ => break,
                }
            }
        }
    }

    Ok(DominanceTree { idom, frontier, entry })
}

fn intersect(idom: &HashMap<BlockIndex, BlockIndex>, order_index: &HashMap<BlockIndex, usize>, mut a: BlockIndex, mut b: BlockIndex) -> BlockIndex {
    while a != b {
        while order_index[&a] > order_index[&b] {
            a = idom[&a];
        }
        while order_index[&b] > order_index[&a] {
            b = idom[&b];
        }
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BasicBlock, Guard};

    fn diamond() -> Procedure {
        let mut proc = Procedure::new("p");
        let entry = proc.add_block(BasicBlock::new());
        let left = proc.add_block(BasicBlock::new());
        let right = proc.add_block(BasicBlock::new());
        let join = proc.add_block(BasicBlock::new());
        proc.set_entry(entry);
        proc.add_edge(entry, left, Guard::always());
        proc.add_edge(entry, right, Guard::always());
        proc.add_edge(left, join, Guard::always());
        proc.add_edge(right, join, Guard::always());
        proc
    }

    #[test]
    fn diamond_join_is_dominated_by_entry_not_either_branch() {
        let proc = diamond();
        let tree = dominance_tree(&proc).unwrap();
        let entry = proc.entry().unwrap();
        let join = 3;
        assert_eq!(tree.immediate_dominator(join), Some(entry));
        assert!(tree.dominates(entry, join));
    }

    #[test]
    fn branch_blocks_are_in_each_others_dominance_frontier() {
        let proc = diamond();
        let tree = dominance_tree(&proc).unwrap();
        let join = 3;
        assert!(tree.frontier(1).contains(&join));
        assert!(tree.frontier(2).contains(&join));
    }

    #[test]
    fn disconnected_block_is_reported() {
        let mut proc = diamond();
        proc.add_block(BasicBlock::new());
        let err = dominance_tree(&proc).unwrap_err();
        assert!(matches!(err, Error::UnreachableBlock(4)));
    }

    #[quickcheck_macros::quickcheck]
    fn every_reachable_block_has_exactly_one_idom_on_the_path_from_entry(seed: Vec<u8>) -> quickcheck::TestResult {
        if seed.is_empty() {
            return quickcheck::TestResult::discard();
        }
        let n = (seed.len() % 8) + 1;
        let mut proc = Procedure::new("p");
        let blocks: Vec<BlockIndex> = (0..n).map(|_| proc.add_block(BasicBlock::new())).collect();
        proc.set_entry(blocks[0]);
        for i in 1..n {
            proc.add_edge(blocks[i - 1], blocks[i], Guard::always());
        }
        for (i, byte) in seed.iter().enumerate() {
            let from = i % n;
            let to = (*byte as usize) % n;
            if to > from {
                proc.add_edge(blocks[from], blocks[to], Guard::always());
            }
        }

        let Ok(tree) = dominance_tree(&proc) else {
            return quickcheck::TestResult::failed();
        };
        for &b in &blocks[1..] {
            if tree.immediate_dominator(b).is_none() || !tree.dominates(tree.entry(), b) {
                return quickcheck::TestResult::failed();
            }
        }
        quickcheck::TestResult::passed()
    }
}
