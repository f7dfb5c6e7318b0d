use crate::{Error, Rvalue};

/// A single IL operation, tagged by `(symbol, domain)`: a closed sum type
/// over a symbol and a domain in place of a tagged union of `unop`/`binop`
/// variants. Each variant carries its own fixed arity except [`Operation::Phi`],
/// whose arity equals the number of CFG predecessors at the join it
/// annotates and is therefore checked against the CFG, not at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    // --- logic domain ---
    /// Logical conjunction.
    LogicAnd(Rvalue, Rvalue),
    /// Logical disjunction.
    LogicOr(Rvalue, Rvalue),
    /// Logical negation.
    LogicNot(Rvalue),
    /// Material implication.
    LogicImplication(Rvalue, Rvalue),
    /// Logical equivalence.
    LogicEquivalence(Rvalue, Rvalue),

    // --- integer domain ---
    /// Bitwise AND.
    IntAnd(Rvalue, Rvalue),
    /// Bitwise OR.
    IntOr(Rvalue, Rvalue),
    /// Bitwise NOT.
    IntNot(Rvalue),
    /// Addition.
    IntAdd(Rvalue, Rvalue),
    /// Subtraction.
    IntSub(Rvalue, Rvalue),
    /// Multiplication.
    IntMul(Rvalue, Rvalue),
    /// Unsigned division.
    IntUDiv(Rvalue, Rvalue),
    /// Unsigned modulo.
    IntUMod(Rvalue, Rvalue),
    /// Signed division.
    IntSDiv(Rvalue, Rvalue),
    /// Signed modulo.
    IntSMod(Rvalue, Rvalue),
    /// Unsigned less-than, result in the logic domain.
    IntLess(Rvalue, Rvalue),
    /// Equality, result in the logic domain.
    IntEqual(Rvalue, Rvalue),
    /// Unsigned logical right shift.
    IntUShr(Rvalue, Rvalue),
    /// Unsigned logical left shift.
    IntUShl(Rvalue, Rvalue),
    /// Signed (arithmetic) right shift.
    IntSShr(Rvalue, Rvalue),
    /// Signed (arithmetic) left shift.
    IntSShl(Rvalue, Rvalue),
    /// Extracts bits `[lo, hi]` (inclusive) of the argument.
    IntSlice(Rvalue, u8, u8),
    /// Extends the argument to `width` bits, sign-extending if `signed`.
    IntExt {
        /// Value being extended.
        value: Rvalue,
        /// Target width.
        width: u8,
        /// Whether the extension preserves sign.
        signed: bool,
    },
    /// Concatenates two values, most-significant first.
    IntConcat(Rvalue, Rvalue),

    // --- cross-domain and control ---
    /// Lifts a logic-domain value into the integer domain.
    Lift(Rvalue),
    /// A procedure call to the (usually constant) target.
    Call(Rvalue),
    /// No-op; carries its argument through unchanged.
    Nop(Rvalue),
    /// A static-single-assignment merge; one operand per CFG predecessor,
    /// in predecessor-iteration order.
    Phi(Vec<Rvalue>),
}

/// A closed tag for [`Operation`]'s `(domain, symbol)` pair, independent of
/// its operands. Disambiguated by domain (`logic/and` vs. `int/and`) so the
/// textual name round-trips through [`Operation::from_symbolic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
enum OperationKind {
    #[strum(serialize = "logic/and")]
    LogicAnd,
    #[strum(serialize = "logic/or")]
    LogicOr,
    #[strum(serialize = "logic/not")]
    LogicNot,
    #[strum(serialize = "logic/impl")]
    LogicImplication,
    #[strum(serialize = "logic/equiv")]
    LogicEquivalence,
    #[strum(serialize = "int/and")]
    IntAnd,
    #[strum(serialize = "int/or")]
    IntOr,
    #[strum(serialize = "int/not")]
    IntNot,
    #[strum(serialize = "int/add")]
    IntAdd,
    #[strum(serialize = "int/sub")]
    IntSub,
    #[strum(serialize = "int/mul")]
    IntMul,
    #[strum(serialize = "int/udiv")]
    IntUDiv,
    #[strum(serialize = "int/umod")]
    IntUMod,
    #[strum(serialize = "int/sdiv")]
    IntSDiv,
    #[strum(serialize = "int/smod")]
    IntSMod,
    #[strum(serialize = "int/less")]
    IntLess,
    #[strum(serialize = "int/equal")]
    IntEqual,
    #[strum(serialize = "int/ushr")]
    IntUShr,
    #[strum(serialize = "int/ushl")]
    IntUShl,
    #[strum(serialize = "int/sshr")]
    IntSShr,
    #[strum(serialize = "int/sshl")]
    IntSShl,
    #[strum(serialize = "int/slice")]
    IntSlice,
    #[strum(serialize = "int/ext")]
    IntExt,
    #[strum(serialize = "int/concat")]
    IntConcat,
    #[strum(serialize = "cross/lift")]
    Lift,
    #[strum(serialize = "cross/call")]
    Call,
    #[strum(serialize = "cross/nop")]
    Nop,
    #[strum(serialize = "cross/phi")]
    Phi,
}

fn binary(operands: Vec<Rvalue>) -> Result<(Rvalue, Rvalue), Vec<Rvalue>> {
    let [a, b]: [Rvalue; 2] = operands.try_into()?;
    Ok((a, b))
}

fn unary(operands: Vec<Rvalue>) -> Result<Rvalue, Vec<Rvalue>> {
    let [a]: [Rvalue; 1] = operands.try_into()?;
    Ok(a)
}

impl Operation {
    /// The operands of this operation, left to right.
    pub fn operands(&self) -> Vec<&Rvalue> {
        use Operation::*;
        match self {
            LogicNot(a) | IntNot(a) | Lift(a) | Call(a) | Nop(a) => vec![a],
            LogicAnd(a, b)
            | LogicOr(a, b)
            | LogicImplication(a, b)
            | LogicEquivalence(a, b)
            | IntAnd(a, b)
            | IntOr(a, b)
            | IntAdd(a, b)
            | IntSub(a, b)
            | IntMul(a, b)
            | IntUDiv(a, b)
            | IntUMod(a, b)
            | IntSDiv(a, b)
            | IntSMod(a, b)
            | IntLess(a, b)
            | IntEqual(a, b)
            | IntUShr(a, b)
            | IntUShl(a, b)
            | IntSShr(a, b)
            | IntSShl(a, b)
            | IntConcat(a, b) => vec![a, b],
            IntSlice(a, _, _) => vec![a],
            IntExt { value, .. } => vec![value],
            Phi(args) => args.iter().collect(),
        }
    }

    /// Validates this operation's arity and operand shape.
    ///
    /// All non-`Phi` operations are fixed-arity (enforced structurally by
    /// the enum variant itself); `Phi` requires at least one operand and
    /// `IntSlice`'s bit range must be ordered.
    pub fn validate(&self) -> Result<(), Error> {
        match self {
            Operation::Phi(args) if args.is_empty() => Err(Error::IllFormedInstruction(
                "phi requires at least one operand".into(),
            )),
            Operation::IntSlice(_, lo, hi) if lo > hi => Err(Error::IllFormedInstruction(format!(
                "slice range [{lo}, {hi}] is inverted"
            ))),
            _ => Ok(()),
        }
    }

    /// This operation's `(domain, symbol)` tag, disambiguated across domains
    /// so it round-trips through [`Operation::from_symbolic`] (plain
    /// [`Operation::symbol`] collides, e.g. `LogicAnd` and `IntAnd` both say
    /// `"and"`).
    pub fn symbolic(&self) -> String {
        self.kind().to_string()
    }

    /// Rebuilds a fixed-arity operation from an [`Operation::symbolic`] name
    /// and its operands. Fails if `name` doesn't parse, if `operands`'
    /// length doesn't match that operation's arity, or for
    /// [`Operation::IntSlice`]/[`Operation::IntExt`], whose extra
    /// non-operand fields (the bit range, the target width) the symbolic
    /// name alone can't carry.
    pub fn from_symbolic(name: &str, operands: Vec<Rvalue>) -> Result<Operation, Error> {
        let kind: OperationKind = name
            .parse()
            .map_err(|_| Error::IllFormedInstruction(format!("unknown operation symbol: {name}")))?;
        let arity_error = || Error::IllFormedInstruction(format!("wrong operand count for operation symbol: {name}"));

        use OperationKind as K;
        match kind {
            K::LogicAnd => binary(operands).map(|(a, b)| Operation::LogicAnd(a, b)).map_err(|_| arity_error()),
            K::LogicOr => binary(operands).map(|(a, b)| Operation::LogicOr(a, b)).map_err(|_| arity_error()),
            K::LogicNot => unary(operands).map(Operation::LogicNot).map_err(|_| arity_error()),
            K::LogicImplication => binary(operands).map(|(a, b)| Operation::LogicImplication(a, b)).map_err(|_| arity_error()),
            K::LogicEquivalence => binary(operands).map(|(a, b)| Operation::LogicEquivalence(a, b)).map_err(|_| arity_error()),
            K::IntAnd => binary(operands).map(|(a, b)| Operation::IntAnd(a, b)).map_err(|_| arity_error()),
            K::IntOr => binary(operands).map(|(a, b)| Operation::IntOr(a, b)).map_err(|_| arity_error()),
            K::IntNot => unary(operands).map(Operation::IntNot).map_err(|_| arity_error()),
            K::IntAdd => binary(operands).map(|(a, b)| Operation::IntAdd(a, b)).map_err(|_| arity_error()),
            K::IntSub => binary(operands).map(|(a, b)| Operation::IntSub(a, b)).map_err(|_| arity_error()),
            K::IntMul => binary(operands).map(|(a, b)| Operation::IntMul(a, b)).map_err(|_| arity_error()),
            K::IntUDiv => binary(operands).map(|(a, b)| Operation::IntUDiv(a, b)).map_err(|_| arity_error()),
            K::IntUMod => binary(operands).map(|(a, b)| Operation::IntUMod(a, b)).map_err(|_| arity_error()),
            K::IntSDiv => binary(operands).map(|(a, b)| Operation::IntSDiv(a, b)).map_err(|_| arity_error()),
            K::IntSMod => binary(operands).map(|(a, b)| Operation::IntSMod(a, b)).map_err(|_| arity_error()),
            K::IntLess => binary(operands).map(|(a, b)| Operation::IntLess(a, b)).map_err(|_| arity_error()),
            K::IntEqual => binary(operands).map(|(a, b)| Operation::IntEqual(a, b)).map_err(|_| arity_error()),
            K::IntUShr => binary(operands).map(|(a, b)| Operation::IntUShr(a, b)).map_err(|_| arity_error()),
            K::IntUShl => binary(operands).map(|(a, b)| Operation::IntUShl(a, b)).map_err(|_| arity_error()),
            K::IntSShr => binary(operands).map(|(a, b)| Operation::IntSShr(a, b)).map_err(|_| arity_error()),
            K::IntSShl => binary(operands).map(|(a, b)| Operation::IntSShl(a, b)).map_err(|_| arity_error()),
            K::IntConcat => binary(operands).map(|(a, b)| Operation::IntConcat(a, b)).map_err(|_| arity_error()),
            K::Lift => unary(operands).map(Operation::Lift).map_err(|_| arity_error()),
            K::Call => unary(operands).map(Operation::Call).map_err(|_| arity_error()),
            K::Nop => unary(operands).map(Operation::Nop).map_err(|_| arity_error()),
            K::Phi => {
                if operands.is_empty() {
                    Err(arity_error())
                } else {
                    Ok(Operation::Phi(operands))
                }
            }
            K::IntSlice | K::IntExt => Err(Error::IllFormedInstruction(format!(
                "{name} needs extra fields (bit range or target width) a symbolic name alone cannot carry"
            ))),
        }
    }

    fn kind(&self) -> OperationKind {
        use Operation::*;
        match self {
            LogicAnd(..) => OperationKind::LogicAnd,
            LogicOr(..) => OperationKind::LogicOr,
            LogicNot(..) => OperationKind::LogicNot,
            LogicImplication(..) => OperationKind::LogicImplication,
            LogicEquivalence(..) => OperationKind::LogicEquivalence,
            IntAnd(..) => OperationKind::IntAnd,
            IntOr(..) => OperationKind::IntOr,
            IntNot(..) => OperationKind::IntNot,
            IntAdd(..) => OperationKind::IntAdd,
            IntSub(..) => OperationKind::IntSub,
            IntMul(..) => OperationKind::IntMul,
            IntUDiv(..) => OperationKind::IntUDiv,
            IntUMod(..) => OperationKind::IntUMod,
            IntSDiv(..) => OperationKind::IntSDiv,
            IntSMod(..) => OperationKind::IntSMod,
            IntLess(..) => OperationKind::IntLess,
            IntEqual(..) => OperationKind::IntEqual,
            IntUShr(..) => OperationKind::IntUShr,
            IntUShl(..) => OperationKind::IntUShl,
            IntSShr(..) => OperationKind::IntSShr,
            IntSShl(..) => OperationKind::IntSShl,
            IntSlice(..) => OperationKind::IntSlice,
            IntExt { .. } => OperationKind::IntExt,
            IntConcat(..) => OperationKind::IntConcat,
            Lift(..) => OperationKind::Lift,
            Call(..) => OperationKind::Call,
            Nop(..) => OperationKind::Nop,
            Phi(..) => OperationKind::Phi,
        }
    }

    /// A short symbolic name for this operation's function, independent of
    /// its operands.
    pub fn symbol(&self) -> &'static str {
        use Operation::*;
        match self {
            LogicAnd(..) => "and",
            LogicOr(..) => "or",
            LogicNot(..) => "not",
            LogicImplication(..) => "impl",
            LogicEquivalence(..) => "equiv",
            IntAnd(..) => "and",
            IntOr(..) => "or",
            IntNot(..) => "not",
            IntAdd(..) => "add",
            IntSub(..) => "sub",
            IntMul(..) => "mul",
            IntUDiv(..) => "udiv",
            IntUMod(..) => "umod",
            IntSDiv(..) => "sdiv",
            IntSMod(..) => "smod",
            IntLess(..) => "less",
            IntEqual(..) => "equal",
            IntUShr(..) => "ushr",
            IntUShl(..) => "ushl",
            IntSShr(..) => "sshr",
            IntSShl(..) => "sshl",
            IntSlice(..) => "slice",
            IntExt { .. } => "ext",
            IntConcat(..) => "concat",
            Lift(..) => "lift",
            Call(..) => "call",
            Nop(..) => "nop",
            Phi(..) => "phi",
        }
    }

    /// Renders this operation as `symbol(op1, op2, ...)`.
    pub fn pretty(&self) -> String {
        let operands = self
            .operands()
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}({})", self.symbol(), operands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    #[test]
    fn phi_requires_operands() {
        assert!(Operation::Phi(vec![]).validate().is_err());
        let v = Value::constant(1, 1).unwrap();
        assert!(Operation::Phi(vec![v]).validate().is_ok());
    }

    #[test]
    fn inverted_slice_is_rejected() {
        let v = Value::constant(32, 0).unwrap();
        assert!(Operation::IntSlice(v, 8, 2).validate().is_err());
    }

    #[test]
    fn pretty_prints_symbol_and_operands() {
        let a = Value::constant(8, 1).unwrap();
        let b = Value::constant(8, 2).unwrap();
        let op = Operation::IntAdd(a, b);
        assert_eq!(op.symbol(), "add");
        assert!(op.pretty().starts_with("add("));
    }

    #[test]
    fn symbolic_disambiguates_same_named_operations_across_domains() {
        let a = Value::constant(8, 1).unwrap();
        let b = Value::constant(8, 2).unwrap();
        assert_eq!(Operation::LogicAnd(a.clone(), b.clone()).symbolic(), "logic/and");
        assert_eq!(Operation::IntAnd(a, b).symbolic(), "int/and");
    }

    #[test]
    fn from_symbolic_round_trips_through_symbolic() {
        let a = Value::constant(8, 1).unwrap();
        let b = Value::constant(8, 2).unwrap();
        let op = Operation::IntAdd(a, b);
        let rebuilt = Operation::from_symbolic(&op.symbolic(), op.operands().into_iter().cloned().collect()).unwrap();
        assert_eq!(rebuilt, op);
    }

    #[test]
    fn from_symbolic_rejects_wrong_arity() {
        let a = Value::constant(8, 1).unwrap();
        assert!(Operation::from_symbolic("int/add", vec![a]).is_err());
    }

    #[test]
    fn from_symbolic_rejects_unknown_name() {
        assert!(Operation::from_symbolic("bogus", vec![]).is_err());
    }
}
