/// Errors raised while constructing IL values and instructions.
///
/// Both are fatal for the constructor's caller — neither is silently
/// recovered.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// `Value` construction violated the width/name/self-reference rules.
    #[error("ill-formed value: {0}")]
    IllFormedValue(String),
    /// An IL opcode's arity or operand kind was invalid.
    #[error("ill-formed instruction: {0}")]
    IllFormedInstruction(String),
}
