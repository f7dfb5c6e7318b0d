//! Integration tests exercising the disassembler, program/call-graph driver,
//! and the SSA/abstract-interpretation pipeline together, rather than each
//! module in isolation.

use panopticon::analyses::{interpret, transform_to_ssa, Sscp};
use panopticon::disassembler::{disassemble_procedure, CodeGenerator, Disassembler, Pattern};
use panopticon::{Architecture, BasicBlock, Guard, Mnemonic, Procedure, Program};
use panopticon_il::{Instruction, Lvalue, Operation, Value, Width};
use panopticon_types::{Bound, Offset};

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

// A single opcode (0x48 0x11 0x1c 0x25 ...) that always consumes the whole
// token stream handed to it, built to exercise "one mnemonic spans the
// entire region" rather than any particular instruction set's semantics
// (decoder tables are supplied by an embedder, not by this crate).
fn single_span_disassembler(width: usize) -> Disassembler<Toy> {
    let mut pattern = Pattern::literal(8, 0x48);
    for _ in 1..width {
        pattern = pattern.then(Pattern::bits("........").unwrap());
    }
    Disassembler::new().rule(
        pattern,
        Box::new(move |state, arch, counter| {
            let mut gen = CodeGenerator::new(arch, counter);
            let _ = gen.assign_anon(Value::constant(8, 0).unwrap());
            let instrs = gen.into_instructions();
            state.mnemonic(Mnemonic::new(Bound::new(state.address, state.address + width as Offset), "insn", "insn", vec![], instrs).unwrap());
        }),
    )
}

#[test]
fn a_single_wide_opcode_becomes_one_mnemonic_spanning_the_whole_region() {
    let bytes = [0x48u8, 0x11, 0x1c, 0x25, 0xa1, 0x1a, 0x00, 0x00];
    let dis = single_span_disassembler(bytes.len());

    let proc = disassemble_procedure(&dis, &Toy, 0, bytes.len() as Offset, |off| bytes.get(off as usize).map(|b| *b as u64));

    assert_eq!(proc.blocks().len(), 1);
    assert_eq!(proc.blocks()[0].mnemonics().len(), 1);
    let area = proc.blocks()[0].area().unwrap();
    assert_eq!(area.start(), 0);
    assert_eq!(area.end(), bytes.len() as Offset);
}

// `call <const>` is a 2-byte opcode (0xC0 <offset>) that falls through
// (calls return, they don't transfer control permanently); `ret` (0xC3)
// ends a block with no statically known successor; `nop` (0x90) is filler.
fn call_graph_disassembler() -> Disassembler<Toy> {
    Disassembler::new()
        .rule(
            Pattern::literal(8, 0x90),
            Box::new(|state, arch, counter| {
                let mut gen = CodeGenerator::new(arch, counter);
                let _ = gen.assign_anon(Value::constant(8, 0).unwrap());
                state.mnemonic(Mnemonic::new(Bound::new(state.address, state.address + 1), "nop", "nop", vec![], gen.into_instructions()).unwrap());
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
            Pattern::literal(8, 0xc0).then(Pattern::bits("........").unwrap()),
            Box::new(|state, arch, counter| {
                let target = Value::constant(64, state.tokens[1]).unwrap();
                let mut gen = CodeGenerator::new(arch, counter);
                let assignee = Lvalue::new(Value::variable("t_call", 1, -1).unwrap()).unwrap();
                gen.call(assignee, target.clone());
                let instrs = gen.into_instructions();
                state.mnemonic(Mnemonic::new(Bound::new(state.address, state.address + 2), "call", "call {64::}", vec![target], instrs).unwrap());
            }),
        )
}

#[test]
fn two_calls_fan_out_to_distinct_callees_that_each_call_back() {
    // caller: call 5; call 9; ret
    // callee at 5: nop; call 0; ret
    // callee at 9: nop; call 0; ret
    let bytes = [0xc0u8, 0x05, 0xc0, 0x09, 0xc3, 0x90, 0xc0, 0x00, 0xc3, 0x90, 0xc0, 0x00, 0xc3];
    let dis = call_graph_disassembler();

    let program = Program::disassemble(0, |offset| disassemble_procedure(&dis, &Toy, offset, bytes.len() as Offset, |off| bytes.get(off as usize).map(|b| *b as u64)));

    assert_eq!(program.procedures().len(), 3);
    assert!(program.has_procedure(0));
    assert!(program.has_procedure(5));
    assert!(program.has_procedure(9));

    let caller = program.find_procedure_by_entry(0).unwrap();
    let callee_a = program.find_procedure_by_entry(5).unwrap();
    let callee_b = program.find_procedure_by_entry(9).unwrap();

    use panopticon::CallTarget;
    let caller_target = CallTarget::Procedure(caller);
    assert!(program.calls().contains(&(caller_target.clone(), CallTarget::Procedure(callee_a))));
    assert!(program.calls().contains(&(caller_target, CallTarget::Procedure(callee_b))));

    let calls_back_to_caller = |callee: usize| {
        program
            .calls()
            .iter()
            .any(|(from, to)| *from == CallTarget::Procedure(callee) && *to == CallTarget::Procedure(caller))
    };
    assert!(calls_back_to_caller(callee_a));
    assert!(calls_back_to_caller(callee_b));
}

fn pre_ssa(name: &str) -> Value {
    Value::variable(name, 8, -1).unwrap()
}

fn def(name: &str, value: Value) -> Instruction {
    Instruction::new(Operation::Nop(value), Lvalue::new(pre_ssa(name)).unwrap()).unwrap()
}

#[test]
fn sscp_resolves_straight_line_definitions_but_not_a_diamond_join() {
    // b0: i := 1; j := undef
    // b1 (if j):    a := 1
    // b2 (if !j):   a := 2
    // b3 (join):    a := a + i   -- phi over a is inserted automatically
    let mut proc = Procedure::new("diamond");

    let b0 = proc.add_block(BasicBlock::from_mnemonics(vec![Mnemonic::new(
        Bound::new(0, 1),
        "entry",
        "entry",
        vec![],
        vec![def("i", Value::constant(8, 1).unwrap()), def("j", Value::Undefined)],
    )
    .unwrap()]));
    let b1 = proc.add_block(BasicBlock::from_mnemonics(vec![Mnemonic::new(Bound::new(1, 2), "b1", "b1", vec![], vec![def("a", Value::constant(8, 1).unwrap())]).unwrap()]));
    let b2 = proc.add_block(BasicBlock::from_mnemonics(vec![Mnemonic::new(Bound::new(2, 3), "b2", "b2", vec![], vec![def("a", Value::constant(8, 2).unwrap())]).unwrap()]));

    let add = Instruction::new(Operation::IntAdd(pre_ssa("a"), pre_ssa("i")), Lvalue::new(pre_ssa("a")).unwrap()).unwrap();
    let b3 = proc.add_block(BasicBlock::from_mnemonics(vec![Mnemonic::new(Bound::new(3, 4), "b3", "b3", vec![], vec![add]).unwrap()]));

    proc.set_entry(b0);
    proc.add_edge(b0, b1, Guard::always());
    proc.add_edge(b0, b2, Guard::always());
    proc.add_edge(b1, b3, Guard::always());
    proc.add_edge(b2, b3, Guard::always());

    transform_to_ssa(&mut proc).unwrap();

    let env = interpret::<Sscp>(&proc);

    let i0 = ssa_key_of(&proc, b0, "i", 0);
    let a_b1 = ssa_key_of(&proc, b1, "a", 0);
    let a_b2 = ssa_key_of(&proc, b2, "a", 0);

    assert_eq!(env.get(&i0), Some(&Sscp::Const(1)));
    assert_eq!(env.get(&a_b1), Some(&Sscp::Const(1)));
    assert_eq!(env.get(&a_b2), Some(&Sscp::Const(2)));

    // The phi at b3 joins 1 and 2: necessarily non-constant, and so is the
    // subsequent `a + i` that consumes it.
    let phi_instr = &proc.blocks()[b3].mnemonics()[0].instructions()[0];
    let Value::Variable(phi_var) = phi_instr.assignee().as_value() else { panic!("expected a variable assignee") };
    assert!(matches!(phi_instr.operation(), Operation::Phi(_)));
    assert_eq!(env.get(&format!("a_{}", phi_var.subscript())), Some(&Sscp::NonConst));

    let add_instr = &proc.blocks()[b3].mnemonics()[0].instructions()[1];
    let Value::Variable(add_var) = add_instr.assignee().as_value() else { panic!("expected a variable assignee") };
    assert_eq!(env.get(&format!("a_{}", add_var.subscript())), Some(&Sscp::NonConst));
}

fn ssa_key_of(proc: &Procedure, block: panopticon::BlockIndex, name: &str, occurrence: usize) -> String {
    let mut found = Vec::new();
    proc.blocks()[block].execute(|instr| {
        if let Value::Variable(v) = instr.assignee().as_value() {
            if v.name() == name {
                found.push(format!("{}_{}", v.name(), v.subscript()));
            }
        }
    });
    found.into_iter().nth(occurrence).expect("expected occurrence to exist")
}
