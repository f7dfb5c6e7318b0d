use std::fmt;

use itertools::Itertools;
use panopticon_il::Rvalue;

/// A binary comparison code, as used by [`Relation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display, strum::EnumIter)]
pub enum Relcode {
    #[display(fmt = "u<=")]
    ULeq,
    #[display(fmt = "s<=")]
    SLeq,
    #[display(fmt = "u>=")]
    UGeq,
    #[display(fmt = "s>=")]
    SGeq,
    #[display(fmt = "u<")]
    ULess,
    #[display(fmt = "s<")]
    SLess,
    #[display(fmt = "u>")]
    UGrtr,
    #[display(fmt = "s>")]
    SGrtr,
    #[display(fmt = "==")]
    Eq,
    #[display(fmt = "!=")]
    Neq,
}

impl Relcode {
    /// The logical complement of this code (`a R b` iff not `a R.negate() b`).
    pub const fn negate(self) -> Self {
        match self {
            Relcode::ULeq => Relcode::UGrtr,
            Relcode::UGrtr => Relcode::ULeq,
            Relcode::SLeq => Relcode::SGrtr,
            Relcode::SGrtr => Relcode::SLeq,
            Relcode::UGeq => Relcode::ULess,
            Relcode::ULess => Relcode::UGeq,
            Relcode::SGeq => Relcode::SLess,
            Relcode::SLess => Relcode::SGeq,
            Relcode::Eq => Relcode::Neq,
            Relcode::Neq => Relcode::Eq,
        }
    }
}

/// A single logical relation between two operands, e.g. `a u< b`.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    operand1: Rvalue,
    relcode: Relcode,
    operand2: Rvalue,
}

impl Relation {
    /// Builds a relation `a relcode b`.
    pub fn new(operand1: Rvalue, relcode: Relcode, operand2: Rvalue) -> Self {
        Self {
            operand1,
            relcode,
            operand2,
        }
    }

    /// The relation's comparison code.
    pub const fn relcode(&self) -> Relcode {
        self.relcode
    }

    /// Left-hand operand.
    pub fn operand1(&self) -> &Rvalue {
        &self.operand1
    }

    /// Right-hand operand.
    pub fn operand2(&self) -> &Rvalue {
        &self.operand2
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.operand1, self.relcode, self.operand2)
    }
}

/// The condition under which a control transfer is taken: a conjunction
/// of [`Relation`]s. An empty guard is always true.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Guard {
    relations: Vec<Relation>,
}

impl Guard {
    /// A guard that is always true.
    pub fn always() -> Self {
        Self::default()
    }

    /// A guard with a single relation.
    pub fn single(operand1: Rvalue, relcode: Relcode, operand2: Rvalue) -> Self {
        Self {
            relations: vec![Relation::new(operand1, relcode, operand2)],
        }
    }

    /// Builds a conjunction of `relations`.
    pub fn new(relations: Vec<Relation>) -> Self {
        Self { relations }
    }

    /// The conjoined relations.
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Negates this guard by negating each relation's code in place.
    ///
    /// This is only a true logical negation of the conjunction when there
    /// is at most one relation (negating a conjunction of N relations
    /// would need a disjunction, which `Guard` cannot express). The empty
    /// guard negates to itself.
    pub fn negation(&self) -> Self {
        Self {
            relations: self.relations.iter().map(|r| Relation::new(r.operand1.clone(), r.relcode.negate(), r.operand2.clone())).collect(),
        }
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.relations.is_empty() {
            return write!(f, "true");
        }
        write!(f, "{}", self.relations.iter().join(" && "))
    }
}
