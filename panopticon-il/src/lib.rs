//! Value algebra and intermediate-language instructions.
//!
//! Builds the IL operand types ([`Value`], [`Lvalue`]) and the
//! [`Operation`]/[`Instruction`] pair that basic blocks are made of.

mod error;
mod instruction;
mod lvalue;
mod operation;
mod value;

pub use error::Error;
pub use instruction::Instruction;
pub use lvalue::Lvalue;
pub use operation::Operation;
pub use value::{Constant, Memory, Rvalue, Value, Variable, Width};
