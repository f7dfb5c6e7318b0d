use std::collections::{HashMap, HashSet};

use panopticon_il::{Instruction, Lvalue, Operation, Value, Variable};

use crate::analyses::{dominance_tree, liveness, DominanceTree};
use crate::{BlockIndex, Error, Procedure};

/// Rewrites `proc` into static single assignment form in place: every
/// variable occurrence gets a non-negative SSA subscript and phi nodes are
/// inserted at the iterated dominance frontier of each name's definitions.
pub fn transform_to_ssa(proc: &mut Procedure) -> Result<(), Error> {
    let tree = dominance_tree(proc)?;
    let live = liveness(proc);

    let defs = definition_sites(proc);
    let phi_sites = insert_phis(proc, &tree, &defs, |name| live.is_global(name));
    rename(proc, &tree, &phi_sites);
    Ok(())
}

fn definition_sites(proc: &Procedure) -> HashMap<String, HashSet<BlockIndex>> {
    let mut defs: HashMap<String, HashSet<BlockIndex>> = HashMap::new();
    for (idx, block) in proc.blocks().iter().enumerate() {
        block.execute(|instr| {
            if let Value::Variable(v) = instr.assignee().as_value() {
                defs.entry(v.name().to_string()).or_default().insert(idx);
            }
        });
    }
    defs
}

/// Inserts an empty `Phi` at every block in the iterated dominance
/// frontier of each name's definitions that is itself live (per
/// `is_global`), returning the set of `(block, name)` pairs that now carry
/// a phi.
fn insert_phis(
    proc: &mut Procedure,
    tree: &DominanceTree,
    defs: &HashMap<String, HashSet<BlockIndex>>,
    is_global: impl Fn(&str) -> bool,
) -> HashSet<(BlockIndex, String)> {
    let mut has_phi: HashSet<(BlockIndex, String)> = HashSet::new();

    for (name, def_blocks) in defs {
        if !is_global(name) {
            continue;
        }
        let mut worklist: Vec<BlockIndex> = def_blocks.iter().copied().collect();
        let mut in_worklist: HashSet<BlockIndex> = def_blocks.iter().copied().collect();
        let mut placed: HashSet<BlockIndex> = HashSet::new();

        while let Some(b) = worklist.pop() {
            in_worklist.remove(&b);
            for &d in tree.frontier(b) {
                if placed.insert(d) {
                    let width = Variable::new(name.clone(), 1, -1).ok().map(|v| v.width()).unwrap_or(1);
                    // A single `Undefined` placeholder operand satisfies
                    // `Operation::Phi`'s non-empty arity check; renaming
                    // overwrites each slot with the predecessor's live
                    // value once that predecessor is visited.
                    let phi = Instruction::new(
                        Operation::Phi(vec![Value::Undefined]),
                        Lvalue::new(Value::variable(name.clone(), width, -1).unwrap()).unwrap(),
                    )
                    .expect("a one-operand phi is well-formed");
                    // Join points always carry at least one decoded mnemonic in a
                    // disassembled procedure; a join block with none (only reachable by
                    // hand-building a `Procedure` directly) has nowhere to host the phi
                    // and silently does not receive one.
                    if let Some(m) = proc.block_mut(d).mnemonics_mut().first_mut() {
                        m.instructions_mut().insert(0, phi);
                        has_phi.insert((d, name.clone()));
                    }
                    if !in_worklist.contains(&d) {
                        worklist.push(d);
                        in_worklist.insert(d);
                    }
                }
            }
        }
    }
    has_phi
}

/// Depth-first renaming over the dominator tree: each definition pushes a
/// fresh SSA version, each use reads the current top of its name's stack.
fn rename(proc: &mut Procedure, tree: &DominanceTree, _phi_sites: &HashSet<(BlockIndex, String)>) {
    let mut counters: HashMap<String, i32> = HashMap::new();
    let mut stacks: HashMap<String, Vec<i32>> = HashMap::new();
    let children = children_of(tree, proc.blocks().len());

    rename_block(proc, tree.entry(), &children, &mut counters, &mut stacks);
}

fn children_of(tree: &DominanceTree, block_count: usize) -> HashMap<BlockIndex, Vec<BlockIndex>> {
    let mut children: HashMap<BlockIndex, Vec<BlockIndex>> = HashMap::new();
    for b in 0..block_count {
        if let Some(parent) = tree.immediate_dominator(b) {
            children.entry(parent).or_default().push(b);
        }
    }
    children
}

fn fresh(name: &str, counters: &mut HashMap<String, i32>, stacks: &mut HashMap<String, Vec<i32>>) -> i32 {
    let counter = counters.entry(name.to_string()).or_insert(0);
    let version = *counter;
    *counter += 1;
    stacks.entry(name.to_string()).or_default().push(version);
    version
}

fn current(name: &str, stacks: &HashMap<String, Vec<i32>>) -> Option<i32> {
    stacks.get(name).and_then(|s| s.last().copied())
}

fn rewrite_use(v: &Value, stacks: &HashMap<String, Vec<i32>>) -> Value {
    match v {
        Value::Variable(var) if !var.is_ssa() => match current(var.name(), stacks) {
            Some(version) => Value::Variable(var.with_subscript(version)),
            None => v.clone(),
        },
        _ => v.clone(),
    }
}

fn rename_block(
    proc: &mut Procedure,
    block: BlockIndex,
    children: &HashMap<BlockIndex, Vec<BlockIndex>>,
    counters: &mut HashMap<String, i32>,
    stacks: &mut HashMap<String, Vec<i32>>,
) {
    let mut pushed: Vec<String> = Vec::new();

    proc.block_mut(block).rewrite(|instr| {
        let operation = match instr.operation() {
            Operation::Phi(args) => Operation::Phi(args.clone()),
            other => rewrite_operation(other, stacks),
        };
        let assignee = instr.assignee().as_value().clone();
        let new_assignee = if let Value::Variable(var) = &assignee {
            if var.is_ssa() {
                assignee.clone()
            } else {
                let version = fresh(var.name(), counters, stacks);
                pushed.push(var.name().to_string());
                Value::Variable(var.with_subscript(version))
            }
        } else {
            assignee
        };
        *instr = Instruction::new(operation, Lvalue::new(new_assignee).expect("rewritten assignee keeps its original lvalue shape")).expect("rewriting preserves operation arity");
    });

    for &succ in proc.successors(block).collect::<Vec<_>>().iter() {
        let pred_index = proc.predecessors(succ).collect::<Vec<_>>().iter().position(|p| *p == block);
        proc.block_mut(succ).rewrite(|instr| {
            if let Operation::Phi(args) = instr.operation() {
                if let Value::Variable(v) = instr.assignee().as_value() {
                    if let Some(version) = current(v.name(), stacks) {
                        let mut args = args.clone();
                        if let Some(slot) = pred_index {
                            while args.len() <= slot {
                                args.push(Value::Undefined);
                            }
                            args[slot] = Value::Variable(v.with_subscript(version));
                        }
                        *instr = Instruction::new(Operation::Phi(args), instr.assignee().clone()).expect("phi stays variable-arity well-formed");
                    }
                }
            }
        });
    }

    if let Some(kids) = children.get(&block).cloned() {
        for child in kids {
            rename_block(proc, child, children, counters, stacks);
        }
    }

    for name in pushed {
        stacks.get_mut(&name).expect("a name pushed in this frame has a stack entry").pop();
    }
}

fn rewrite_operation(op: &Operation, stacks: &HashMap<String, Vec<i32>>) -> Operation {
    use Operation::*;
    match op {
        LogicAnd(a, b) => LogicAnd(rewrite_use(a, stacks), rewrite_use(b, stacks)),
        LogicOr(a, b) => LogicOr(rewrite_use(a, stacks), rewrite_use(b, stacks)),
        LogicNot(a) => LogicNot(rewrite_use(a, stacks)),
        LogicImplication(a, b) => LogicImplication(rewrite_use(a, stacks), rewrite_use(b, stacks)),
        LogicEquivalence(a, b) => LogicEquivalence(rewrite_use(a, stacks), rewrite_use(b, stacks)),
        IntAnd(a, b) => IntAnd(rewrite_use(a, stacks), rewrite_use(b, stacks)),
        IntOr(a, b) => IntOr(rewrite_use(a, stacks), rewrite_use(b, stacks)),
        IntNot(a) => IntNot(rewrite_use(a, stacks)),
        IntAdd(a, b) => IntAdd(rewrite_use(a, stacks), rewrite_use(b, stacks)),
        IntSub(a, b) => IntSub(rewrite_use(a, stacks), rewrite_use(b, stacks)),
        IntMul(a, b) => IntMul(rewrite_use(a, stacks), rewrite_use(b, stacks)),
        IntUDiv(a, b) => IntUDiv(rewrite_use(a, stacks), rewrite_use(b, stacks)),
        IntUMod(a, b) => IntUMod(rewrite_use(a, stacks), rewrite_use(b, stacks)),
        IntSDiv(a, b) => IntSDiv(rewrite_use(a, stacks), rewrite_use(b, stacks)),
        IntSMod(a, b) => IntSMod(rewrite_use(a, stacks), rewrite_use(b, stacks)),
        IntLess(a, b) => IntLess(rewrite_use(a, stacks), rewrite_use(b, stacks)),
        IntEqual(a, b) => IntEqual(rewrite_use(a, stacks), rewrite_use(b, stacks)),
        IntUShr(a, b) => IntUShr(rewrite_use(a, stacks), rewrite_use(b, stacks)),
        IntUShl(a, b) => IntUShl(rewrite_use(a, stacks), rewrite_use(b, stacks)),
        IntSShr(a, b) => IntSShr(rewrite_use(a, stacks), rewrite_use(b, stacks)),
        IntSShl(a, b) => IntSShl(rewrite_use(a, stacks), rewrite_use(b, stacks)),
        IntSlice(a, lo, hi) => IntSlice(rewrite_use(a, stacks), *lo, *hi),
        IntExt { value, width, signed } => IntExt {
            value: rewrite_use(value, stacks),
            width: *width,
            signed: *signed,
        },
        IntConcat(a, b) => IntConcat(rewrite_use(a, stacks), rewrite_use(b, stacks)),
        Lift(a) => Lift(rewrite_use(a, stacks)),
        Call(a) => Call(rewrite_use(a, stacks)),
        Nop(a) => Nop(rewrite_use(a, stacks)),
        Phi(args) => Phi(args.iter().map(|a| rewrite_use(a, stacks)).collect()),
    }
}
