use std::collections::HashMap;

use panopticon_il::Rvalue;
use panopticon_types::Offset;

use crate::{Architecture, Guard, Mnemonic};

/// The mutable context an action receives: where the match started, what
/// it matched, and the output accumulated so far.
pub struct SemanticState<A: Architecture> {
    /// Offset at which the current match started.
    pub address: Offset,
    /// The token slice the pattern matched.
    pub tokens: Vec<u64>,
    /// Named capture-group bits accumulated by the pattern.
    pub captures: HashMap<String, u64>,
    /// Architecture-specific persistent decode state (REX prefix, operand
    /// size, ...), threaded explicitly rather than through a thread-local.
    pub decoder_state: A::State,
    /// Mnemonics emitted by this and prior actions in the same procedure.
    pub mnemonics: Vec<Mnemonic>,
    /// Control transfers discovered so far: `(target, guard)`.
    pub jumps: Vec<(Rvalue, Guard)>,
}

impl<A: Architecture> SemanticState<A> {
    /// A fresh state for a match starting at `address`.
    pub fn new(address: Offset, tokens: Vec<u64>, captures: HashMap<String, u64>, decoder_state: A::State) -> Self {
        Self {
            address,
            tokens,
            captures,
            decoder_state,
            mnemonics: Vec::new(),
            jumps: Vec::new(),
        }
    }

    /// Looks up a named capture-group's accumulated value.
    pub fn capture(&self, name: &str) -> Option<u64> {
        self.captures.get(name).copied()
    }

    /// Appends a mnemonic to this match's output.
    pub fn mnemonic(&mut self, mnemonic: Mnemonic) {
        self.mnemonics.push(mnemonic);
    }

    /// Registers a control transfer to `target`, taken when `guard` holds.
    pub fn jump(&mut self, target: Rvalue, guard: Guard) {
        self.jumps.push((target, guard));
    }
}
