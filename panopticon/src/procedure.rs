use panopticon_il::Rvalue;
use panopticon_types::Offset;

use crate::{BasicBlock, Guard};

/// Index of a basic block within a [`Procedure`]'s arena.
pub type BlockIndex = usize;

/// A control-flow graph of basic blocks sharing one entry point.
///
/// Blocks and edges live in a plain arena (`blocks`, `edges`); a back-edge
/// or a call-graph cycle is therefore just two entries in `edges`, not a
/// pointer cycle, per the "graph ownership" revision. An edge whose target
/// could not be resolved to a constant address points at an
/// [`Procedure::unresolved`] placeholder instead of a block.
#[derive(Debug, Clone, Default)]
pub struct Procedure {
    name: String,
    entry: Option<BlockIndex>,
    blocks: Vec<BasicBlock>,
    /// `(from, to, guard)` edges between blocks.
    edges: Vec<(BlockIndex, BlockIndex, Guard)>,
    /// Placeholder vertices for jump targets that never resolved to a
    /// constant address (e.g. a computed jump through a register), paired
    /// with the guard under which that jump is taken.
    unresolved: Vec<(Rvalue, Guard)>,
    /// Offsets where the disassembler's failsafe action declined to match;
    /// recorded as an observation rather than aborting the whole procedure.
    failures: Vec<Offset>,
}

impl Procedure {
    /// An empty, unnamed procedure.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// This procedure's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames this procedure.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Appends `block`, returning its index.
    pub fn add_block(&mut self, block: BasicBlock) -> BlockIndex {
        self.blocks.push(block);
        self.blocks.len() - 1
    }

    /// All basic blocks, in insertion order.
    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    /// Mutable access to the block at `index`.
    pub fn block_mut(&mut self, index: BlockIndex) -> &mut BasicBlock {
        &mut self.blocks[index]
    }

    /// The entry block's index, if the procedure has been seeded.
    pub const fn entry(&self) -> Option<BlockIndex> {
        self.entry
    }

    /// Marks `index` as this procedure's entry block.
    pub fn set_entry(&mut self, index: BlockIndex) {
        self.entry = Some(index);
    }

    /// Records a control transfer from `from` to `to`, taken when `guard`
    /// holds.
    pub fn add_edge(&mut self, from: BlockIndex, to: BlockIndex, guard: Guard) {
        self.edges.push((from, to, guard));
    }

    /// Records a jump to a target that never resolved to a constant
    /// address, taken when `guard` holds.
    pub fn add_unresolved_jump(&mut self, target: Rvalue, guard: Guard) {
        self.unresolved.push((target, guard));
    }

    /// Every recorded unresolved jump target, paired with its guard.
    pub fn unresolved(&self) -> &[(Rvalue, Guard)] {
        &self.unresolved
    }

    /// Records that disassembly at `offset` produced no mnemonic.
    pub fn record_failure(&mut self, offset: Offset) {
        self.failures.push(offset);
    }

    /// Offsets at which disassembly failed to match any pattern.
    pub fn failures(&self) -> &[Offset] {
        &self.failures
    }

    /// Every recorded edge, as `(from, to, guard)`.
    pub fn edges(&self) -> &[(BlockIndex, BlockIndex, Guard)] {
        &self.edges
    }

    /// Indices of blocks with an edge from `index`.
    pub fn successors(&self, index: BlockIndex) -> impl Iterator<Item = BlockIndex> + '_ {
        self.edges.iter().filter(move |(from, ..)| *from == index).map(|(_, to, _)| *to)
    }

    /// Indices of blocks with an edge into `index`.
    pub fn predecessors(&self, index: BlockIndex) -> impl Iterator<Item = BlockIndex> + '_ {
        self.edges.iter().filter(move |(_, to, _)| *to == index).map(|(from, _, _)| *from)
    }

    /// The index of the block whose area contains `offset`, if any.
    pub fn block_containing(&self, offset: Offset) -> Option<BlockIndex> {
        self.blocks
            .iter()
            .position(|b| b.area().is_some_and(|area| area.contains(offset)))
    }

    /// Every resolved target address a `Call` instruction inside this
    /// procedure references — the Rust equivalent of `collect_calls`.
    pub fn collect_calls(&self) -> Vec<Offset> {
        let mut calls = Vec::new();
        for block in &self.blocks {
            block.execute(|instr| {
                if let panopticon_il::Operation::Call(target) = instr.operation() {
                    if let panopticon_il::Value::Constant(c) = target {
                        calls.push(c.content());
                    }
                }
            });
        }
        calls
    }
}
