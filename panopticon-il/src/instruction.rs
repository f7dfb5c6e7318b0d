use std::fmt;

use crate::{Error, Lvalue, Operation};

/// A single IL instruction: an [`Operation`] applied to its operands,
/// assigned into `assignee`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instruction {
    operation: Operation,
    assignee: Lvalue,
}

impl Instruction {
    /// Builds an instruction, validating `operation`'s arity/shape.
    pub fn new(operation: Operation, assignee: Lvalue) -> Result<Self, Error> {
        operation.validate()?;
        Ok(Self { operation, assignee })
    }

    /// The operation this instruction performs.
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// The lvalue this instruction's result is written to.
    pub fn assignee(&self) -> &Lvalue {
        &self.assignee
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.assignee, self.operation.pretty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    #[test]
    fn rejects_malformed_operation() {
        let v = Value::constant(8, 0).unwrap();
        let op = Operation::IntSlice(v, 5, 1);
        let assignee = Lvalue::undefined();
        assert!(Instruction::new(op, assignee).is_err());
    }

    #[test]
    fn accepts_well_formed_operation() {
        let a = Value::constant(8, 1).unwrap();
        let b = Value::constant(8, 2).unwrap();
        let op = Operation::IntAdd(a, b);
        let assignee = Lvalue::new(Value::variable("r0", 8, -1).unwrap()).unwrap();
        let instr = Instruction::new(op, assignee).unwrap();
        assert!(instr.to_string().starts_with("r0:8 = add("));
    }
}
