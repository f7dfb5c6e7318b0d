use std::collections::{HashMap, VecDeque};

use panopticon_il::{Operation, Value, Variable};

use crate::{BlockIndex, Error, Procedure};

/// Iterations allowed per block before the worklist is declared
/// non-converging. Every lattice shipped here has finite height, so a
/// well-formed procedure converges in at most a few passes per block; this
/// only guards against a caller's own buggy [`Lattice`] impl looping
/// forever.
const ITERATIONS_PER_BLOCK: usize = 64;

/// A lattice element: a join (supremum) operator and a bottom element.
/// Concrete domains shipped: [`ConcreteInteger`] and [`Sscp`].
pub trait Lattice: Clone + PartialEq {
    /// The least element; `bottom() ⊔ x = x` for all `x`.
    fn bottom() -> Self;

    /// The least upper bound of `self` and `other`.
    fn supremum(&self, other: &Self) -> Self;

    /// Lifts a decoded constant into this lattice.
    fn from_constant(value: u64) -> Self;

    /// The element denoting "not a compile-time constant".
    fn non_const() -> Self;

    /// Applies `op`'s transfer function given its operands' current
    /// lattice values. `call` and memory-valued operands always yield
    /// [`Lattice::non_const`]; other operations delegate to the concrete
    /// domain only when every operand is a known constant.
    fn transfer(op: &Operation, operands: &[Self]) -> Self;
}

/// Non-terminating bit-vector arithmetic, kept for testing the interpreter
/// worklist against ordinary concrete execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConcreteInteger {
    /// No value has reached this point yet.
    Bottom,
    /// A known 64-bit value (masking is the caller's responsibility).
    Value(u64),
}

impl Lattice for ConcreteInteger {
    fn bottom() -> Self {
        ConcreteInteger::Bottom
    }

    fn supremum(&self, other: &Self) -> Self {
        match (self, other) {
            (ConcreteInteger::Bottom, x) | (x, ConcreteInteger::Bottom) => x.clone(),
            (ConcreteInteger::Value(a), ConcreteInteger::Value(b)) if a == b => ConcreteInteger::Value(*a),
            _ => ConcreteInteger::Value(0),
        }
    }

    fn from_constant(value: u64) -> Self {
        ConcreteInteger::Value(value)
    }

    fn non_const() -> Self {
        ConcreteInteger::Value(0)
    }

    fn transfer(op: &Operation, operands: &[Self]) -> Self {
        let as_values: Option<Vec<u64>> = operands
            .iter()
            .map(|o| match o {
                ConcreteInteger::Value(v) => Some(*v),
                ConcreteInteger::Bottom => None,
            })
            .collect();
        let Some(values) = as_values else { return ConcreteInteger::Bottom };
        ConcreteInteger::Value(eval_concrete(op, &values))
    }
}

fn eval_concrete(op: &Operation, values: &[u64]) -> u64 {
    use Operation::*;
    match (op, values) {
        (IntAdd(..), [a, b]) => a.wrapping_add(*b),
        (IntSub(..), [a, b]) => a.wrapping_sub(*b),
        (IntMul(..), [a, b]) => a.wrapping_mul(*b),
        (IntAnd(..), [a, b]) => a & b,
        (IntOr(..), [a, b]) => a | b,
        (IntNot(..), [a]) => !a,
        (IntUDiv(..), [a, b]) if *b != 0 => a / b,
        (IntUMod(..), [a, b]) if *b != 0 => a % b,
        (IntEqual(..), [a, b]) => (a == b) as u64,
        (IntLess(..), [a, b]) => (a < b) as u64,
        (Nop(..), [a]) => *a,
        _ => 0,
    }
}

/// Simple Sparse Constant Propagation: `Bottom | Const(v) | NonConst`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sscp {
    /// No information reached this point yet.
    Bottom,
    /// Provably a single constant value.
    Const(u64),
    /// Provably not a single constant.
    NonConst,
}

impl Lattice for Sscp {
    fn bottom() -> Self {
        Sscp::Bottom
    }

    fn supremum(&self, other: &Self) -> Self {
        match (self, other) {
            (Sscp::Bottom, x) | (x, Sscp::Bottom) => *x,
            (Sscp::NonConst, _) | (_, Sscp::NonConst) => Sscp::NonConst,
            (Sscp::Const(a), Sscp::Const(b)) if a == b => Sscp::Const(*a),
            _ => Sscp::NonConst,
        }
    }

    fn from_constant(value: u64) -> Self {
        Sscp::Const(value)
    }

    fn non_const() -> Self {
        Sscp::NonConst
    }

    fn transfer(op: &Operation, operands: &[Self]) -> Self {
        if matches!(op, Operation::Call(_)) {
            return Sscp::NonConst;
        }
        let as_values: Option<Vec<u64>> = operands
            .iter()
            .map(|o| match o {
                Sscp::Const(v) => Some(*v),
                _ => None,
            })
            .collect();
        match as_values {
            Some(values) if operands.iter().all(|o| matches!(o, Sscp::Const(_))) => Sscp::Const(eval_concrete(op, &values)),
            _ if operands.iter().any(|o| matches!(o, Sscp::Bottom)) => Sscp::Bottom,
            _ => Sscp::NonConst,
        }
    }
}

/// Runs the worklist abstract interpreter over an SSA-form procedure,
/// returning each SSA variable's stable lattice binding.
///
/// `Value::Memory` operands always evaluate to [`Lattice::non_const`]; the
/// procedure is assumed already in SSA form (each assignment's variable
/// has a distinct subscript), per [`crate::analyses::transform_to_ssa`].
///
/// Fails with [`Error::NoFixedPoint`] if the worklist hasn't drained within
/// `proc.blocks().len() * ITERATIONS_PER_BLOCK` pops.
pub fn interpret<L: Lattice>(proc: &Procedure) -> Result<HashMap<String, L>, Error> {
    let budget = proc.blocks().len().saturating_mul(ITERATIONS_PER_BLOCK).max(ITERATIONS_PER_BLOCK);
    let mut env: HashMap<String, L> = HashMap::new();
    let mut worklist: VecDeque<BlockIndex> = (0..proc.blocks().len()).collect();
    let mut in_worklist: std::collections::HashSet<BlockIndex> = worklist.iter().copied().collect();
    let mut iterations = 0usize;

    while let Some(b) = worklist.pop_front() {
        iterations += 1;
        if iterations > budget {
            return Err(Error::NoFixedPoint(iterations));
        }
        in_worklist.remove(&b);
        let mut changed_any = false;
        proc.blocks()[b].execute(|instr| {
            let operand_vals: Vec<L> = instr
                .operation()
                .operands()
                .iter()
                .map(|v| lookup(v, &env))
                .collect();
            let res = match instr.operation() {
                Operation::Phi(_) => operand_vals.iter().fold(L::bottom(), |acc, v| acc.supremum(v)),
                op => L::transfer(op, &operand_vals),
            };
            if let Value::Variable(var) = instr.assignee().as_value() {
                let key = ssa_key(var);
                let prior = env.get(&key).cloned().unwrap_or_else(L::bottom);
                let joined = prior.supremum(&res);
                if joined != prior {
                    env.insert(key, joined);
                    changed_any = true;
                }
            }
        });
        if changed_any {
            for succ in proc.successors(b).collect::<Vec<_>>() {
                if in_worklist.insert(succ) {
                    worklist.push_back(succ);
                }
            }
        }
    }

    Ok(env)
}

fn ssa_key(v: &Variable) -> String {
    format!("{}_{}", v.name(), v.subscript())
}

fn lookup<L: Lattice>(v: &Value, env: &HashMap<String, L>) -> L {
    match v {
        Value::Constant(c) => L::from_constant(c.content()),
        Value::Variable(var) => env.get(&ssa_key(var)).cloned().unwrap_or_else(L::bottom),
        Value::Memory(_) => L::non_const(),
        Value::Undefined => L::bottom(),
    }
}
