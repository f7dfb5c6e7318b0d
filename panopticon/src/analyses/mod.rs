//! Classical procedure-level analyses: dominance, liveness, SSA construction
//! and abstract interpretation over the resulting lattice.

mod dominance;
mod interpreter;
mod liveness;
mod ssa;

pub use dominance::{dominance_tree, DominanceTree};
pub use interpreter::{interpret, ConcreteInteger, Lattice, Sscp};
pub use liveness::{liveness, Liveness};
pub use ssa::transform_to_ssa;
