use std::fmt;

use panopticon_types::Endianness;

use crate::Error;

/// Width of a value, in bits.
pub type Width = u8;

/// A constant bit-vector value, masked to its declared width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Constant {
    width: Width,
    content: u64,
}

impl Constant {
    /// Builds a constant, masking `content` down to `width` bits.
    ///
    /// Fails with [`Error::IllFormedValue`] if `width` is zero.
    pub fn new(width: Width, content: u64) -> Result<Self, Error> {
        if width == 0 {
            return Err(Error::IllFormedValue("constant width must be non-zero".into()));
        }
        Ok(Self {
            width,
            content: mask(content, width),
        })
    }

    /// Bit width of this constant.
    pub const fn width(&self) -> Width {
        self.width
    }

    /// The masked content.
    pub const fn content(&self) -> u64 {
        self.content
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}:{}", self.content(), self.width())
    }
}

fn mask(v: u64, width: Width) -> u64 {
    if width >= 64 {
        v
    } else {
        v & ((1u64 << width) - 1)
    }
}

/// A named, SSA-versionable register or temporary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    name: String,
    width: Width,
    subscript: i32,
}

impl Variable {
    /// `-1` marks a pre-SSA occurrence; `>= 0` is an SSA version.
    pub const PRE_SSA: i32 = -1;

    /// Builds a variable reference.
    ///
    /// Fails with [`Error::IllFormedValue`] if `name` is empty or `width`
    /// is outside `1..=255`.
    pub fn new(name: impl Into<String>, width: Width, subscript: i32) -> Result<Self, Error> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::IllFormedValue("variable name must not be empty".into()));
        }
        if width == 0 {
            return Err(Error::IllFormedValue("variable width must be non-zero".into()));
        }
        Ok(Self {
            name,
            width,
            subscript,
        })
    }

    /// The variable's base name, without SSA subscript.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bit width of this variable.
    pub const fn width(&self) -> Width {
        self.width
    }

    /// `-1` for pre-SSA, `>= 0` for an SSA version.
    pub const fn subscript(&self) -> i32 {
        self.subscript
    }

    /// True if this occurrence has been assigned an SSA version.
    pub const fn is_ssa(&self) -> bool {
        self.subscript >= 0
    }

    /// Returns a copy of this variable re-versioned to `subscript`.
    pub fn with_subscript(&self, subscript: i32) -> Self {
        Self {
            name: self.name.clone(),
            width: self.width,
            subscript,
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ssa() {
            write!(f, "{}_{}:{}", self.name(), self.subscript(), self.width())
        } else {
            write!(f, "{}:{}", self.name(), self.width())
        }
    }
}

/// A reference to a range of bytes in some named bank, addressed by `offset`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Memory {
    offset: Box<Value>,
    bytes: u8,
    endianness: Endianness,
    bank: String,
}

impl Memory {
    /// Builds a memory reference.
    ///
    /// Fails with [`Error::IllFormedValue`] if `bank` is empty, `bytes` is
    /// zero, or `offset` recursively references the memory value being
    /// constructed.
    pub fn new(offset: Value, bytes: u8, endianness: Endianness, bank: impl Into<String>) -> Result<Self, Error> {
        let bank = bank.into();
        if bank.is_empty() {
            return Err(Error::IllFormedValue("memory bank must not be empty".into()));
        }
        if bytes == 0 {
            return Err(Error::IllFormedValue("memory width must cover at least one byte".into()));
        }
        if references_self(&offset, &offset) {
            return Err(Error::IllFormedValue(
                "memory offset must not recursively reference itself".into(),
            ));
        }
        Ok(Self {
            offset: Box::new(offset),
            bytes,
            endianness,
            bank,
        })
    }

    /// The value computing this reference's address.
    pub fn offset(&self) -> &Value {
        &self.offset
    }

    /// Number of bytes covered, `1..=255`.
    pub const fn bytes(&self) -> u8 {
        self.bytes
    }

    /// Byte order used to interpret the covered bytes.
    pub const fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Named address space this reference projects into.
    pub fn bank(&self) -> &str {
        &self.bank
    }
}

impl fmt::Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]:{}:{}", self.offset(), self.bytes(), self.bank())
    }
}

/// True if `offset`'s subtree contains a memory reference whose own address
/// computation is `outer` again — i.e. evaluating the address would recurse
/// forever. Because `Value` trees are owned (no shared/cyclic structure),
/// this can only trigger if a caller deliberately clones a value back into
/// its own offset chain; it exists as a construction-time guard rather than
/// a condition that arises naturally.
fn references_self(offset: &Value, outer: &Value) -> bool {
    match offset {
        Value::Memory(m) => m.offset() == outer || references_self(m.offset(), outer),
        _ => false,
    }
}

/// A single IL operand: undefined, a constant, a variable or a memory
/// reference. Any `Value` is a valid rvalue; [`crate::Lvalue`] restricts
/// this to the assignable subset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum Value {
    /// No semantic content.
    #[display(fmt = "⊥")]
    Undefined,
    /// A bit-vector constant.
    #[display(fmt = "{}", _0)]
    Constant(Constant),
    /// A (possibly SSA-versioned) named variable.
    #[display(fmt = "{}", _0)]
    Variable(Variable),
    /// A reference into a byte-addressed bank.
    #[display(fmt = "{}", _0)]
    Memory(Memory),
}

/// Any [`Value`] may appear on the right-hand side of an IL instruction.
pub type Rvalue = Value;

impl Value {
    /// Shorthand for [`Constant::new`] wrapped in [`Value::Constant`].
    pub fn constant(width: Width, content: u64) -> Result<Self, Error> {
        Ok(Value::Constant(Constant::new(width, content)?))
    }

    /// Shorthand for [`Variable::new`] wrapped in [`Value::Variable`].
    pub fn variable(name: impl Into<String>, width: Width, subscript: i32) -> Result<Self, Error> {
        Ok(Value::Variable(Variable::new(name, width, subscript)?))
    }

    /// True if this value may be used as an lvalue (anything but a constant).
    pub const fn is_lvalue_shaped(&self) -> bool {
        !matches!(self, Value::Constant(_))
    }

    /// Declared bit width, if this value carries one.
    pub fn width(&self) -> Option<Width> {
        match self {
            Value::Undefined => None,
            Value::Constant(c) => Some(c.width()),
            Value::Variable(v) => Some(v.width()),
            Value::Memory(m) => Some(m.bytes() as u32 as Width),
        }
    }
}

