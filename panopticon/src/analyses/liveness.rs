use std::collections::{HashMap, HashSet};

use panopticon_il::{Operation, Value};

use crate::{BlockIndex, Procedure};

/// Per-block liveness sets plus the globally-live name -> reading-block
/// index.
#[derive(Debug, Clone, Default)]
pub struct Liveness {
    var_kill: HashMap<BlockIndex, HashSet<String>>,
    ue_var: HashMap<BlockIndex, HashSet<String>>,
    live_out: HashMap<BlockIndex, HashSet<String>>,
    usage: HashMap<String, HashSet<BlockIndex>>,
}

impl Liveness {
    /// Names written by `block`.
    pub fn var_kill(&self, block: BlockIndex) -> &HashSet<String> {
        static EMPTY: std::sync::OnceLock<HashSet<String>> = std::sync::OnceLock::new();
        self.var_kill.get(&block).unwrap_or_else(|| EMPTY.get_or_init(HashSet::new))
    }

    /// Names read before being written within `block` (upward-exposed).
    pub fn ue_var(&self, block: BlockIndex) -> &HashSet<String> {
        static EMPTY: std::sync::OnceLock<HashSet<String>> = std::sync::OnceLock::new();
        self.ue_var.get(&block).unwrap_or_else(|| EMPTY.get_or_init(HashSet::new))
    }

    /// Names live on exit from `block`.
    pub fn live_out(&self, block: BlockIndex) -> &HashSet<String> {
        static EMPTY: std::sync::OnceLock<HashSet<String>> = std::sync::OnceLock::new();
        self.live_out.get(&block).unwrap_or_else(|| EMPTY.get_or_init(HashSet::new))
    }

    /// True if `name` is global: upward-exposed in at least one block.
    pub fn is_global(&self, name: &str) -> bool {
        self.ue_var.values().any(|set| set.contains(name))
    }

    /// Blocks that read `name`.
    pub fn usage(&self, name: &str) -> &HashSet<BlockIndex> {
        static EMPTY: std::sync::OnceLock<HashSet<BlockIndex>> = std::sync::OnceLock::new();
        self.usage.get(name).unwrap_or_else(|| EMPTY.get_or_init(HashSet::new))
    }
}

fn base_name(v: &Value) -> Option<String> {
    match v {
        Value::Variable(var) => Some(var.name().to_string()),
        _ => None,
    }
}

/// Computes `VarKill`/`UEVar` per block, then iterates `LiveOut` to a fixed
/// point over reverse post-order.
pub fn liveness(proc: &Procedure) -> Liveness {
    let mut var_kill: HashMap<BlockIndex, HashSet<String>> = HashMap::new();
    let mut ue_var: HashMap<BlockIndex, HashSet<String>> = HashMap::new();
    let mut usage: HashMap<String, HashSet<BlockIndex>> = HashMap::new();

    for (idx, block) in proc.blocks().iter().enumerate() {
        let mut killed = HashSet::new();
        let mut exposed = HashSet::new();
        block.execute(|instr| {
            for operand in instr.operation().operands() {
                if let Some(name) = base_name(operand) {
                    if !killed.contains(&name) {
                        exposed.insert(name.clone());
                    }
                    usage.entry(name).or_default().insert(idx);
                }
            }
            if let Some(name) = base_name(instr.assignee().as_value()) {
                killed.insert(name);
            }
        });
        var_kill.insert(idx, killed);
        ue_var.insert(idx, exposed);
    }

    let mut live_out: HashMap<BlockIndex, HashSet<String>> = (0..proc.blocks().len()).map(|i| (i, HashSet::new())).collect();
    let mut changed = true;
    while changed {
        changed = false;
        for idx in 0..proc.blocks().len() {
            let mut next: HashSet<String> = HashSet::new();
            for succ in proc.successors(idx) {
                next.extend(ue_var[&succ].iter().cloned());
                let kill = &var_kill[&succ];
                next.extend(live_out[&succ].iter().filter(|n| !kill.contains(*n)).cloned());
            }
            if next != live_out[&idx] {
                live_out.insert(idx, next);
                changed = true;
            }
        }
    }

    Liveness {
        var_kill,
        ue_var,
        live_out,
        usage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BasicBlock, Guard, Mnemonic};
    use panopticon_il::{Instruction, Lvalue};
    use panopticon_types::Bound;

    fn var(name: &str) -> Value {
        Value::variable(name, 8, -1).unwrap()
    }

    #[test]
    fn ue_var_excludes_names_already_killed_in_block() {
        let mut proc = Procedure::new("p");
        let assign_a = Instruction::new(Operation::Nop(Value::constant(8, 1).unwrap()), Lvalue::new(var("a")).unwrap()).unwrap();
        let use_a = Instruction::new(Operation::Nop(var("a")), Lvalue::new(var("b")).unwrap()).unwrap();
        let m = Mnemonic::new(Bound::new(0, 1), "x", "x", vec![], vec![assign_a, use_a]).unwrap();
        let idx = proc.add_block(BasicBlock::from_mnemonics(vec![m]));
        proc.set_entry(idx);

        let live = liveness(&proc);
        assert!(!live.ue_var(idx).contains("a"));
        assert!(live.var_kill(idx).contains("a"));
        assert!(live.var_kill(idx).contains("b"));
    }

    #[test]
    fn live_out_propagates_across_an_edge() {
        let mut proc = Procedure::new("p");
        let use_x = Instruction::new(Operation::Nop(var("x")), Lvalue::new(var("y")).unwrap()).unwrap();
        let m2 = Mnemonic::new(Bound::new(1, 2), "x", "x", vec![], vec![use_x]).unwrap();
        let b2 = proc.add_block(BasicBlock::from_mnemonics(vec![m2]));
        let b1 = proc.add_block(BasicBlock::new());
        proc.set_entry(b1);
        proc.add_edge(b1, b2, Guard::always());

        let live = liveness(&proc);
        assert!(live.live_out(b1).contains("x"));
        assert!(live.is_global("x"));
    }
}
