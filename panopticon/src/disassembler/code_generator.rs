use std::sync::atomic::AtomicU64;

use panopticon_il::{Instruction, Lvalue, Operation, Rvalue, Width};

use crate::Architecture;

/// Appends IL instructions for one action's worth of decoded semantics.
///
/// Every building-block method comes in a *named* form, which writes its
/// result into a caller-supplied [`Lvalue`], and an *anonymous* form, which
/// mints a fresh pre-SSA temporary instead and returns it so calls can be
/// chained.
pub struct CodeGenerator<'a, A: Architecture> {
    architecture: &'a A,
    counter: &'a AtomicU64,
    instructions: Vec<Instruction>,
}

impl<'a, A: Architecture> CodeGenerator<'a, A> {
    /// Builds a code generator that mints temporaries through `architecture`
    /// and `counter`.
    pub fn new(architecture: &'a A, counter: &'a AtomicU64) -> Self {
        Self {
            architecture,
            counter,
            instructions: Vec::new(),
        }
    }

    /// Every instruction emitted so far, in emission order.
    pub fn into_instructions(self) -> Vec<Instruction> {
        self.instructions
    }

    fn named(&mut self, operation: Operation, assignee: Lvalue) -> Lvalue {
        let instr = Instruction::new(operation, assignee.clone()).expect("code generator builds only well-formed operations");
        self.instructions.push(instr);
        assignee
    }

    fn anonymous(&mut self, operation: Operation, width: Width) -> Lvalue {
        let temp = self.architecture.fresh_temporary(self.counter, width);
        let assignee = Lvalue::new(temp).expect("a freshly minted temporary is never a constant");
        self.named(operation, assignee)
    }

    fn width_of(op: &Rvalue) -> Width {
        op.width().unwrap_or(1)
    }

    /// `assignee = op1 & op2`.
    pub fn and_b(&mut self, assignee: Lvalue, op1: Rvalue, op2: Rvalue) -> Lvalue {
        self.named(Operation::IntAnd(op1, op2), assignee)
    }

    /// `op1 & op2`, result in a fresh temporary.
    pub fn and_b_anon(&mut self, op1: Rvalue, op2: Rvalue) -> Lvalue {
        let width = Self::width_of(&op1);
        self.anonymous(Operation::IntAnd(op1, op2), width)
    }

    /// `assignee = op1 | op2`.
    pub fn or_b(&mut self, assignee: Lvalue, op1: Rvalue, op2: Rvalue) -> Lvalue {
        self.named(Operation::IntOr(op1, op2), assignee)
    }

    /// `op1 | op2`, result in a fresh temporary.
    pub fn or_b_anon(&mut self, op1: Rvalue, op2: Rvalue) -> Lvalue {
        let width = Self::width_of(&op1);
        self.anonymous(Operation::IntOr(op1, op2), width)
    }

    /// `assignee = !op`.
    pub fn not_b(&mut self, assignee: Lvalue, op: Rvalue) -> Lvalue {
        self.named(Operation::IntNot(op), assignee)
    }

    /// `!op`, result in a fresh temporary.
    pub fn not_b_anon(&mut self, op: Rvalue) -> Lvalue {
        let width = Self::width_of(&op);
        self.anonymous(Operation::IntNot(op), width)
    }

    /// `assignee = op` (a passthrough write).
    pub fn assign(&mut self, assignee: Lvalue, op: Rvalue) -> Lvalue {
        self.named(Operation::Nop(op), assignee)
    }

    /// `op`, copied into a fresh temporary.
    pub fn assign_anon(&mut self, op: Rvalue) -> Lvalue {
        let width = Self::width_of(&op);
        self.anonymous(Operation::Nop(op), width)
    }

    /// `assignee = op u>> count`.
    pub fn shiftr_u(&mut self, assignee: Lvalue, count: Rvalue, op: Rvalue) -> Lvalue {
        self.named(Operation::IntUShr(op, count), assignee)
    }

    /// `op u>> count`, result in a fresh temporary.
    pub fn shiftr_u_anon(&mut self, count: Rvalue, op: Rvalue) -> Lvalue {
        let width = Self::width_of(&op);
        self.anonymous(Operation::IntUShr(op, count), width)
    }

    /// `assignee = op u<< count`.
    pub fn shiftl_u(&mut self, assignee: Lvalue, count: Rvalue, op: Rvalue) -> Lvalue {
        self.named(Operation::IntUShl(op, count), assignee)
    }

    /// `op u<< count`, result in a fresh temporary.
    pub fn shiftl_u_anon(&mut self, count: Rvalue, op: Rvalue) -> Lvalue {
        let width = Self::width_of(&op);
        self.anonymous(Operation::IntUShl(op, count), width)
    }

    /// `assignee = op s>> count`.
    pub fn shiftr_s(&mut self, assignee: Lvalue, count: Rvalue, op: Rvalue) -> Lvalue {
        self.named(Operation::IntSShr(op, count), assignee)
    }

    /// `op s>> count`, result in a fresh temporary.
    pub fn shiftr_s_anon(&mut self, count: Rvalue, op: Rvalue) -> Lvalue {
        let width = Self::width_of(&op);
        self.anonymous(Operation::IntSShr(op, count), width)
    }

    /// `assignee = op s<< count`.
    pub fn shiftl_s(&mut self, assignee: Lvalue, count: Rvalue, op: Rvalue) -> Lvalue {
        self.named(Operation::IntSShl(op, count), assignee)
    }

    /// `op s<< count`, result in a fresh temporary.
    pub fn shiftl_s_anon(&mut self, count: Rvalue, op: Rvalue) -> Lvalue {
        let width = Self::width_of(&op);
        self.anonymous(Operation::IntSShl(op, count), width)
    }

    /// `assignee = zero_extend(op, width)`.
    pub fn ext_u(&mut self, assignee: Lvalue, op: Rvalue, width: Width) -> Lvalue {
        self.named(Operation::IntExt { value: op, width, signed: false }, assignee)
    }

    /// `zero_extend(op, width)`, result in a fresh temporary.
    pub fn ext_u_anon(&mut self, op: Rvalue, width: Width) -> Lvalue {
        self.anonymous(Operation::IntExt { value: op, width, signed: false }, width)
    }

    /// `assignee = sign_extend(op, width)`.
    pub fn ext_s(&mut self, assignee: Lvalue, op: Rvalue, width: Width) -> Lvalue {
        self.named(Operation::IntExt { value: op, width, signed: true }, assignee)
    }

    /// `sign_extend(op, width)`, result in a fresh temporary.
    pub fn ext_s_anon(&mut self, op: Rvalue, width: Width) -> Lvalue {
        self.anonymous(Operation::IntExt { value: op, width, signed: true }, width)
    }

    /// `assignee = op[lo..=hi]`.
    ///
    /// The bit range must be known at decode time, matching
    /// [`Operation::IntSlice`]'s static arity.
    pub fn slice(&mut self, assignee: Lvalue, op: Rvalue, lo: u8, hi: u8) -> Lvalue {
        self.named(Operation::IntSlice(op, lo, hi), assignee)
    }

    /// `op[lo..=hi]`, result in a fresh temporary.
    pub fn slice_anon(&mut self, op: Rvalue, lo: u8, hi: u8) -> Lvalue {
        let width = (hi - lo + 1) as Width;
        self.anonymous(Operation::IntSlice(op, lo, hi), width)
    }

    /// `assignee = op1 + op2`.
    pub fn add_i(&mut self, assignee: Lvalue, op1: Rvalue, op2: Rvalue) -> Lvalue {
        self.named(Operation::IntAdd(op1, op2), assignee)
    }

    /// `op1 + op2`, result in a fresh temporary.
    pub fn add_i_anon(&mut self, op1: Rvalue, op2: Rvalue) -> Lvalue {
        let width = Self::width_of(&op1);
        self.anonymous(Operation::IntAdd(op1, op2), width)
    }

    /// `assignee = op1 - op2`.
    pub fn sub_i(&mut self, assignee: Lvalue, op1: Rvalue, op2: Rvalue) -> Lvalue {
        self.named(Operation::IntSub(op1, op2), assignee)
    }

    /// `op1 - op2`, result in a fresh temporary.
    pub fn sub_i_anon(&mut self, op1: Rvalue, op2: Rvalue) -> Lvalue {
        let width = Self::width_of(&op1);
        self.anonymous(Operation::IntSub(op1, op2), width)
    }

    /// `assignee = op1 * op2`.
    pub fn mul_i(&mut self, assignee: Lvalue, op1: Rvalue, op2: Rvalue) -> Lvalue {
        self.named(Operation::IntMul(op1, op2), assignee)
    }

    /// `op1 * op2`, result in a fresh temporary.
    pub fn mul_i_anon(&mut self, op1: Rvalue, op2: Rvalue) -> Lvalue {
        let width = Self::width_of(&op1);
        self.anonymous(Operation::IntMul(op1, op2), width)
    }

    /// `assignee = op1 s/ op2`.
    pub fn div_is(&mut self, assignee: Lvalue, op1: Rvalue, op2: Rvalue) -> Lvalue {
        self.named(Operation::IntSDiv(op1, op2), assignee)
    }

    /// `assignee = op1 u/ op2`.
    pub fn div_iu(&mut self, assignee: Lvalue, op1: Rvalue, op2: Rvalue) -> Lvalue {
        self.named(Operation::IntUDiv(op1, op2), assignee)
    }

    /// `assignee = op1 s% op2`.
    pub fn mod_is(&mut self, assignee: Lvalue, op1: Rvalue, op2: Rvalue) -> Lvalue {
        self.named(Operation::IntSMod(op1, op2), assignee)
    }

    /// `assignee = op1 u% op2`.
    pub fn mod_iu(&mut self, assignee: Lvalue, op1: Rvalue, op2: Rvalue) -> Lvalue {
        self.named(Operation::IntUMod(op1, op2), assignee)
    }

    /// `assignee = call(target)`.
    pub fn call(&mut self, assignee: Lvalue, target: Rvalue) -> Lvalue {
        self.named(Operation::Call(target), assignee)
    }

    /// `call(target)`, result in a fresh temporary.
    pub fn call_anon(&mut self, target: Rvalue) -> Lvalue {
        self.anonymous(Operation::Call(target), 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panopticon_il::Value;

    struct Toy;
    impl Architecture for Toy {
        type State = ();
        fn token_width(&self) -> Width {
            8
        }
        fn registers(&self) -> &[&'static str] {
            &["a"]
        }
        fn register_width(&self, _name: &str) -> Width {
            8
        }
    }

    #[test]
    fn named_add_writes_into_the_supplied_lvalue() {
        let toy = Toy;
        let counter = AtomicU64::new(0);
        let mut gen = CodeGenerator::new(&toy, &counter);
        let a = Lvalue::new(Value::variable("r0", 8, -1).unwrap()).unwrap();
        let op1 = Value::constant(8, 1).unwrap();
        let op2 = Value::constant(8, 2).unwrap();
        let out = gen.add_i(a.clone(), op1, op2);
        assert_eq!(out, a);
        assert_eq!(gen.into_instructions().len(), 1);
    }

    #[test]
    fn anonymous_helpers_mint_distinct_temporaries() {
        let toy = Toy;
        let counter = AtomicU64::new(0);
        let mut gen = CodeGenerator::new(&toy, &counter);
        let op1 = Value::constant(8, 1).unwrap();
        let op2 = Value::constant(8, 2).unwrap();
        let a = gen.add_i_anon(op1.clone(), op2.clone());
        let b = gen.add_i_anon(op1, op2);
        assert_ne!(a, b);
        assert_eq!(gen.into_instructions().len(), 2);
    }
}
