use panopticon_il::{Instruction, Rvalue};
use panopticon_types::Bound;

use crate::Error;

/// One token of a parsed format string: either literal text or a
/// placeholder filled in from an operand.
///
/// Syntax: `'{' width (':' '-'? (':' alias)?)? '}'`. `width` is the
/// operand's bit width, the optional `-` marks it signed, `alias` is a
/// purely cosmetic symbolic name (e.g. `"eax"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Text rendered verbatim.
    Literal(String),
    /// A placeholder bound to the operand at the given index.
    Operand {
        /// Index into the mnemonic's operand list.
        index: usize,
        /// Declared bit width.
        width: u8,
        /// Whether the operand is rendered as signed.
        signed: bool,
        /// Optional display alias, purely cosmetic.
        alias: Option<String>,
    },
}

/// Parses `fmt`, assigning operand placeholders indices in left-to-right
/// occurrence order.
fn parse_format(fmt: &str) -> Result<Vec<Token>, Error> {
    let mut tokens = Vec::new();
    let mut chars = fmt.chars().peekable();
    let mut literal = String::new();
    let mut next_operand = 0usize;

    while let Some(c) = chars.next() {
        if c == '{' {
            if !literal.is_empty() {
                tokens.push(Token::Literal(std::mem::take(&mut literal)));
            }
            let mut spec = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                spec.push(c);
            }
            tokens.push(parse_operand_spec(&spec, next_operand)?);
            next_operand += 1;
        } else {
            literal.push(c);
        }
    }
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    Ok(tokens)
}

fn parse_operand_spec(spec: &str, index: usize) -> Result<Token, Error> {
    let mut parts = spec.split(':');
    let width = parts
        .next()
        .ok_or_else(|| Error::IllFormedMnemonic("empty operand placeholder".into()))?
        .parse::<u8>()
        .map_err(|_| Error::IllFormedMnemonic(format!("non-numeric operand width in `{{{spec}}}`")))?;
    let signed = parts.next().is_some_and(|m| m == "-");
    let alias = parts.next().filter(|a| !a.is_empty()).map(str::to_string);
    Ok(Token::Operand {
        index,
        width,
        signed,
        alias,
    })
}

/// Renders a constant per its token's width and signedness.
pub fn format_constant(token: &Token, value: u64) -> i64 {
    match token {
        Token::Operand { width, signed, .. } if *signed && *width < 64 => {
            let shift = 64 - *width as u32;
            ((value << shift) as i64) >> shift
        }
        _ => value as i64,
    }
}

/// One instance of a machine instruction: its byte extent, opcode name,
/// operand list, parsed display format and the IL instructions encoding
/// its semantics.
#[derive(Debug, Clone, PartialEq)]
pub struct Mnemonic {
    area: Bound,
    opcode: String,
    operands: Vec<Rvalue>,
    instructions: Vec<Instruction>,
    format_string: String,
    format_seq: Vec<Token>,
}

impl Mnemonic {
    /// Builds a mnemonic.
    ///
    /// Fails with [`Error::IllFormedMnemonic`] if `format` doesn't parse or
    /// its operand-placeholder count doesn't match `operands.len()`.
    pub fn new(
        area: Bound,
        opcode: impl Into<String>,
        format: impl Into<String>,
        operands: Vec<Rvalue>,
        instructions: Vec<Instruction>,
    ) -> Result<Self, Error> {
        let format_string = format.into();
        let format_seq = parse_format(&format_string)?;
        let placeholder_count = format_seq.iter().filter(|t| matches!(t, Token::Operand { .. })).count();
        if placeholder_count != operands.len() {
            return Err(Error::IllFormedMnemonic(format!(
                "format string `{format_string}` has {placeholder_count} operand placeholders but {} operands were given",
                operands.len()
            )));
        }
        Ok(Self {
            area,
            opcode: opcode.into(),
            operands,
            instructions,
            format_string,
            format_seq,
        })
    }

    /// The byte range this mnemonic spans.
    pub const fn area(&self) -> Bound {
        self.area
    }

    /// The opcode's display name.
    pub fn opcode(&self) -> &str {
        &self.opcode
    }

    /// This mnemonic's operands, left to right.
    pub fn operands(&self) -> &[Rvalue] {
        &self.operands
    }

    /// IL instructions encoding this mnemonic's semantics.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Mutable access to this mnemonic's IL instructions.
    pub fn instructions_mut(&mut self) -> &mut Vec<Instruction> {
        &mut self.instructions
    }

    /// The original, unparsed format string.
    pub fn format_string(&self) -> &str {
        &self.format_string
    }

    /// Renders the operands through the parsed format string. A
    /// [`Rvalue::Constant`] operand is rendered by [`format_constant`],
    /// sign-extending per the token's `width`/`signed` fields; any other
    /// operand falls back to its `Display` form. An alias is purely
    /// cosmetic and never overrides the rendered value.
    pub fn format_operands(&self) -> String {
        let mut out = String::new();
        for token in &self.format_seq {
            match token {
                Token::Literal(s) => out.push_str(s),
                Token::Operand { index, .. } => match &self.operands[*index] {
                    Rvalue::Constant(c) => out.push_str(&format_constant(token, c.content()).to_string()),
                    operand => out.push_str(&operand.to_string()),
                },
            }
        }
        out
    }
}
