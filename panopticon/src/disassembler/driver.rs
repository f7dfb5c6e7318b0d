use std::collections::{HashSet, VecDeque};
use std::sync::atomic::AtomicU64;

use panopticon_il::Value;
use panopticon_types::Offset;

use crate::{BasicBlock, Guard, Procedure};

use super::{Disassembler, SemanticState};
use crate::Architecture;

/// Disassembles one procedure starting at `entry`, reading tokens through
/// `read_token` (offset -> token, `None` past the end of the region).
///
/// Implements the worklist: seed with the entry offset; if an offset lands
/// on an existing block's start there is nothing to do, if it lands in a
/// block's interior the block is split there; otherwise the disassembler
/// runs token-by-token, folding mnemonics into one basic block until a
/// mnemonic with jumps ends it; every constant jump target is enqueued and
/// gets a guarded edge once its block exists.
pub fn disassemble_procedure<A: Architecture>(
    dis: &Disassembler<A>,
    architecture: &A,
    entry: Offset,
    region_length: Offset,
    mut read_token: impl FnMut(Offset) -> Option<u64>,
) -> Procedure {
    let counter = AtomicU64::new(0);
    let mut proc = Procedure::new("unnamed");
    let mut worklist: VecDeque<Offset> = VecDeque::from([entry]);
    let mut visited: HashSet<Offset> = HashSet::new();
    // Deferred `(source block, target offset, guard)` edges, wired once
    // the target's block exists.
    let mut pending_edges: Vec<(usize, Offset, Guard)> = Vec::new();

    while let Some(offset) = worklist.pop_front() {
        if offset >= region_length || !visited.insert(offset) {
            continue;
        }

        if let Some(existing_idx) = proc.block_containing(offset) {
            let area = proc.blocks()[existing_idx].area().expect("block_containing only returns blocks with an area");
            if area.start() != offset {
                split_block_at(&mut proc, existing_idx, offset);
            }
            continue;
        }

        let mut cursor = offset;
        let mut mnemonics = Vec::new();
        let mut pending_jumps = Vec::new();
        let mut decoder_state = A::State::default();

        loop {
            if cursor >= region_length || proc.block_containing(cursor).is_some() {
                break;
            }
            let mut tokens = Vec::new();
            let mut probe = cursor;
            while tokens.len() < 16 {
                match read_token(probe) {
                    Some(tok) => {
                        tokens.push(tok);
                        probe += 1;
                    }
                    None => break,
                }
            }
            if tokens.is_empty() {
                break;
            }

            let matched: Option<(SemanticState<A>, usize)> = dis.run(architecture, &counter, &tokens, cursor, decoder_state.clone());
            let Some((state, consumed)) = matched else {
                proc.record_failure(cursor);
                break;
            };

            decoder_state = state.decoder_state;
            let has_jumps = !state.jumps.is_empty();
            pending_jumps.extend(state.jumps);
            mnemonics.extend(state.mnemonics);
            cursor += consumed as Offset;

            if has_jumps {
                break;
            }
        }

        if mnemonics.is_empty() {
            continue;
        }

        let block = BasicBlock::from_mnemonics(mnemonics);
        if let Err(_e) = block.validate() {
            proc.record_failure(offset);
            continue;
        }
        let block_idx = proc.add_block(block);
        if offset == entry {
            proc.set_entry(block_idx);
        }

        for (target, guard) in pending_jumps {
            if let Value::Constant(c) = &target {
                let addr = c.content();
                worklist.push_back(addr);
                pending_edges.push((block_idx, addr, guard));
            } else {
                proc.add_unresolved_jump(target, guard);
            }
        }
    }

    for (from, addr, guard) in pending_edges {
        if let Some(to) = proc.block_containing(addr) {
            proc.add_edge(from, to, guard);
        }
    }

    proc
}

/// Splits the block at `index` at byte offset `at`, replacing it with two
/// blocks joined by an unconditional edge (step 5 of the procedure
/// disassembler: a later-discovered offset lands inside an already-built
/// block).
fn split_block_at(proc: &mut Procedure, index: usize, at: Offset) {
    let Some(area) = proc.blocks()[index].area() else { return };
    if at <= area.start() || at >= area.end() {
        return;
    }
    let mnemonics = proc.blocks()[index].mnemonics().to_vec();
    let Some(split_point) = mnemonics.iter().position(|m| m.area().start() >= at) else {
        return;
    };
    let (head, tail) = mnemonics.split_at(split_point);
    *proc.block_mut(index) = BasicBlock::from_mnemonics(head.to_vec());
    let tail_idx = proc.add_block(BasicBlock::from_mnemonics(tail.to_vec()));
    proc.add_edge(index, tail_idx, Guard::always());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disassembler::{CodeGenerator, Pattern};
    use crate::{Guard, Mnemonic};
    use panopticon_il::{Lvalue, Width};
    use panopticon_types::Bound;

    #[derive(Clone, Default)]
    struct NoState;

    struct Toy;
    impl Architecture for Toy {
        type State = NoState;
        fn token_width(&self) -> Width {
            8
        }
        fn registers(&self) -> &[&'static str] {
            &[]
        }
        fn register_width(&self, _name: &str) -> Width {
            8
        }
    }

    fn toy_disassembler() -> Disassembler<Toy> {
        // 0x90 = nop, falls through.
        // 0xc3 = ret, no successor.
        // 0xe8 XX = call rel8, unconditional jump to a constant target.
        Disassembler::new()
            .rule(
                Pattern::literal(8, 0x90),
                Box::new(|state, arch, counter| {
                    let mut gen = CodeGenerator::new(arch, counter);
                    let _ = gen.assign_anon(Value::constant(8, 0).unwrap());
                    let instrs = gen.into_instructions();
                    state.mnemonic(Mnemonic::new(Bound::new(state.address, state.address + 1), "nop", "nop", vec![], instrs).unwrap());
                }),
            )
            .rule(
                Pattern::literal(8, 0xc3),
                Box::new(|state, _arch, _counter| {
                    state.mnemonic(Mnemonic::new(Bound::new(state.address, state.address + 1), "ret", "ret", vec![], vec![]).unwrap());
                    state.jump(Value::Undefined, Guard::always());
                }),
            )
            .rule(
                Pattern::literal(8, 0xe8).then(Pattern::bits("........").unwrap()),
                Box::new(|state, arch, counter| {
                    let target_addr = state.tokens[1];
                    let target = Value::constant(64, target_addr).unwrap();
                    let mut gen = CodeGenerator::new(arch, counter);
                    let assignee = Lvalue::new(Value::variable("t_call", 1, -1).unwrap()).unwrap();
                    gen.call(assignee, target.clone());
                    let instrs = gen.into_instructions();
                    state.mnemonic(Mnemonic::new(Bound::new(state.address, state.address + 2), "call", "call {64::}", vec![target.clone()], instrs).unwrap());
                    state.jump(target, Guard::always());
                }),
            )
    }

    #[test]
    fn straight_line_code_becomes_one_block_ending_in_a_jump() {
        // nop; nop; ret
        let bytes = [0x90u8, 0x90, 0xc3];
        let dis = toy_disassembler();
        let proc = disassemble_procedure(&dis, &Toy, 0, bytes.len() as Offset, |off| bytes.get(off as usize).map(|b| *b as u64));

        assert_eq!(proc.blocks().len(), 1);
        assert_eq!(proc.blocks()[0].mnemonics().len(), 3);
        assert_eq!(proc.entry(), Some(0));
    }

    #[test]
    fn a_call_target_enqueues_a_new_block_with_an_edge() {
        // call 0x05 (2 bytes); ret (1 byte); ...; at 0x05: ret
        let bytes = [0xe8u8, 0x05, 0xc3, 0x00, 0x00, 0xc3];
        let dis = toy_disassembler();
        let proc = disassemble_procedure(&dis, &Toy, 0, bytes.len() as Offset, |off| bytes.get(off as usize).map(|b| *b as u64));

        assert_eq!(proc.blocks().len(), 2);
        let entry_idx = proc.entry().unwrap();
        let target_idx = proc.block_containing(5).unwrap();
        assert!(proc.edges().iter().any(|(from, to, _)| *from == entry_idx && *to == target_idx));
    }
}
