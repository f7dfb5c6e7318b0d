use panopticon_types::Offset;

/// Errors raised while disassembling, analysing or persisting a program.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A mnemonic's format string or operand list was malformed.
    #[error("ill-formed mnemonic: {0}")]
    IllFormedMnemonic(String),

    /// No [`crate::disassembler::Pattern`] matched at this offset and the
    /// disassembler had no failsafe action to fall back on.
    #[error("disassembly failed at offset {0:#x}")]
    DisassemblyFailure(Offset),

    /// A procedure contains a basic block unreachable from its entry,
    /// encountered where the caller required a fully connected graph (e.g.
    /// dominance tree construction).
    #[error("basic block {0} is unreachable from the procedure entry")]
    UnreachableBlock(usize),

    /// A basic block's mnemonics overlap or leave a gap between them.
    #[error("ill-formed basic block: {0}")]
    IllFormedBlock(String),

    /// A value read back from storage didn't match the shape its type
    /// expects.
    #[error("schema mismatch for {subject}: {reason}")]
    SchemaMismatch {
        /// The entity that failed to unmarshal.
        subject: panopticon_types::Uuid,
        /// What was expected instead.
        reason: String,
    },

    /// A lattice computation failed to reach a fixed point within the
    /// configured iteration budget.
    #[error("abstract interpretation did not converge after {0} iterations")]
    NoFixedPoint(usize),

    /// Propagated from the persistence layer.
    #[error(transparent)]
    Store(#[from] panopticon_store::Error),

    /// Propagated from the region/memory layer.
    #[error(transparent)]
    Region(#[from] panopticon_region::Error),

    /// Propagated from the IL value/instruction layer.
    #[error(transparent)]
    Il(#[from] panopticon_il::Error),
}
