use std::sync::atomic::AtomicU64;

use panopticon_types::Offset;

use crate::disassembler::Pattern;
use crate::Architecture;

use super::SemanticState;

/// What a matched rule does with the decoded tokens: emit mnemonics into
/// `state`, register jumps, and/or build IL through a
/// [`super::CodeGenerator`] constructed from `architecture`/`counter`.
pub type Action<A> = Box<dyn Fn(&mut SemanticState<A>, &A, &AtomicU64) + Send + Sync>;

/// One `(pattern, action)` binding.
pub struct Rule<A: Architecture> {
    pattern: Pattern,
    action: Action<A>,
}

impl<A: Architecture> Rule<A> {
    /// Builds a rule firing `action` whenever `pattern` matches.
    pub fn new(pattern: Pattern, action: Action<A>) -> Self {
        Self { pattern, action }
    }
}

/// An ordered set of `(pattern, action)` bindings plus an optional default
/// action tried when nothing else matches.
pub struct Disassembler<A: Architecture> {
    rules: Vec<Rule<A>>,
    failsafe: Option<Action<A>>,
}

impl<A: Architecture> Default for Disassembler<A> {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            failsafe: None,
        }
    }
}

impl<A: Architecture> Disassembler<A> {
    /// An empty disassembler with no failsafe.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule, tried after every rule already registered.
    pub fn rule(mut self, pattern: Pattern, action: Action<A>) -> Self {
        self.rules.push(Rule::new(pattern, action));
        self
    }

    /// Sets the action tried when no rule matches.
    pub fn failsafe(mut self, action: Action<A>) -> Self {
        self.failsafe = Some(action);
        self
    }

    /// Tries each rule in declaration order against `tokens`, running the
    /// first match's action. Falls back to the failsafe action (consuming
    /// one token) if nothing matches. Returns the populated semantic state
    /// and the number of tokens consumed, or `None` if neither a rule nor
    /// a failsafe matched.
    pub fn run(
        &self,
        architecture: &A,
        counter: &AtomicU64,
        tokens: &[u64],
        address: Offset,
        decoder_state: A::State,
    ) -> Option<(SemanticState<A>, usize)> {
        for rule in &self.rules {
            if let Some((consumed, captures)) = rule.pattern.matches(tokens) {
                let mut state = SemanticState::new(address, tokens[..consumed].to_vec(), captures, decoder_state.clone());
                (rule.action)(&mut state, architecture, counter);
                return Some((state, consumed.max(1)));
            }
        }
        if !tokens.is_empty() {
            if let Some(failsafe) = &self.failsafe {
                let mut state = SemanticState::new(address, tokens[..1].to_vec(), Default::default(), decoder_state);
                failsafe(&mut state, architecture, counter);
                return Some((state, 1));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Mnemonic;
    use panopticon_types::Bound;

    #[derive(Clone, Default)]
    struct NoState;

    struct Toy;
    impl Architecture for Toy {
        type State = NoState;
        fn token_width(&self) -> panopticon_il::Width {
            8
        }
        fn registers(&self) -> &[&'static str] {
            &[]
        }
        fn register_width(&self, _name: &str) -> panopticon_il::Width {
            8
        }
    }

    #[test]
    fn first_matching_rule_wins() {
        let dis: Disassembler<Toy> = Disassembler::new()
            .rule(
                Pattern::literal(8, 0x90),
                Box::new(|state, _arch, _counter| {
                    state.mnemonic(Mnemonic::new(Bound::new(state.address, state.address + 1), "nop", "nop", vec![], vec![]).unwrap());
                }),
            )
            .failsafe(Box::new(|state, _arch, _counter| {
                state.mnemonic(Mnemonic::new(Bound::new(state.address, state.address + 1), "unknown", "unknown", vec![], vec![]).unwrap());
            }));

        let (state, consumed) = dis.run(&Toy, &AtomicU64::new(0), &[0x90], 0, NoState).unwrap();
        assert_eq!(consumed, 1);
        assert_eq!(state.mnemonics[0].opcode(), "nop");
    }

    #[test]
    fn unmatched_token_falls_back_to_failsafe() {
        let dis: Disassembler<Toy> = Disassembler::new().failsafe(Box::new(|state, _arch, _counter| {
            state.mnemonic(Mnemonic::new(Bound::new(state.address, state.address + 1), "unknown", "unknown", vec![], vec![]).unwrap());
        }));

        let (state, consumed) = dis.run(&Toy, &AtomicU64::new(0), &[0xff], 5, NoState).unwrap();
        assert_eq!(consumed, 1);
        assert_eq!(state.mnemonics[0].opcode(), "unknown");
    }

    #[test]
    fn no_match_and_no_failsafe_yields_none() {
        let dis: Disassembler<Toy> = Disassembler::new();
        assert!(dis.run(&Toy, &AtomicU64::new(0), &[0xff], 0, NoState).is_none());
    }
}
