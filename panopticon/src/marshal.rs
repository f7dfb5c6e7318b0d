//! [`Marshal`]/[`Unmarshal`] for the in-memory CFG types, so a [`BasicBlock`]
//! can round-trip through a [`panopticon_store::StoreContext`] the same way
//! region layers and store primitives do.
//!
//! Each block is flattened into one content-addressed blob holding a
//! compact line-oriented encoding of its mnemonics; nested IL structure
//! lives inside the blob rather than as further triples, since none of it
//! needs to be queried on its own.

use panopticon_il::{Instruction, Lvalue, Operation, Value, Variable};
use panopticon_store::{Archive, BlobId, Error as StoreError, Marshal, Term, Triple, Unmarshal};
use panopticon_types::{Bound, Uuid};

use crate::{BasicBlock, Mnemonic};

fn encode_value(v: &Value, out: &mut String) {
    match v {
        Value::Undefined => out.push_str("u;"),
        Value::Constant(c) => out.push_str(&format!("c{}:{};", c.width(), c.content())),
        Value::Variable(var) => out.push_str(&format!("v{}:{}:{};", var.width(), var.subscript(), var.name())),
        Value::Memory(m) => {
            out.push_str("m(");
            encode_value(m.offset(), out);
            out.push_str(&format!("):{}:{:?}:{};", m.bytes(), m.endianness(), m.bank()));
        }
    }
}

fn decode_value<'a>(s: &'a str) -> Result<(Value, &'a str), StoreError> {
    let bad = || StoreError::NotFound(Uuid::nil());
    let tag = s.chars().next().ok_or_else(bad)?;
    match tag {
        'u' => Ok((Value::Undefined, &s[2..])),
        'c' => {
            let end = s.find(';').ok_or_else(bad)?;
            let body = &s[1..end];
            let (w, v) = body.split_once(':').ok_or_else(bad)?;
            let value = Value::constant(w.parse().map_err(|_| bad())?, v.parse().map_err(|_| bad())?).map_err(|_| bad())?;
            Ok((value, &s[end + 1..]))
        }
        'v' => {
            let end = s.find(';').ok_or_else(bad)?;
            let body = &s[1..end];
            let mut parts = body.splitn(3, ':');
            let width: panopticon_il::Width = parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
            let subscript: i32 = parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
            let name = parts.next().ok_or_else(bad)?;
            let value = Value::Variable(Variable::new(name, width, subscript).map_err(|_| bad())?);
            Ok((value, &s[end + 1..]))
        }
        _ => Err(bad()),
    }
}

fn encode_operation(op: &Operation, out: &mut String) {
    use Operation::*;
    macro_rules! binop {
        ($tag:expr, $a:expr, $b:expr) => {{
            out.push_str($tag);
            out.push('(');
            encode_value($a, out);
            encode_value($b, out);
            out.push(')');
        }};
    }
    macro_rules! unop {
        ($tag:expr, $a:expr) => {{
            out.push_str($tag);
            out.push('(');
            encode_value($a, out);
            out.push(')');
        }};
    }
    match op {
        LogicAnd(a, b) => binop!("LogicAnd", a, b),
        LogicOr(a, b) => binop!("LogicOr", a, b),
        LogicNot(a) => unop!("LogicNot", a),
        LogicImplication(a, b) => binop!("LogicImplication", a, b),
        LogicEquivalence(a, b) => binop!("LogicEquivalence", a, b),
        IntAnd(a, b) => binop!("IntAnd", a, b),
        IntOr(a, b) => binop!("IntOr", a, b),
        IntNot(a) => unop!("IntNot", a),
        IntAdd(a, b) => binop!("IntAdd", a, b),
        IntSub(a, b) => binop!("IntSub", a, b),
        IntMul(a, b) => binop!("IntMul", a, b),
        IntUDiv(a, b) => binop!("IntUDiv", a, b),
        IntUMod(a, b) => binop!("IntUMod", a, b),
        IntSDiv(a, b) => binop!("IntSDiv", a, b),
        IntSMod(a, b) => binop!("IntSMod", a, b),
        IntLess(a, b) => binop!("IntLess", a, b),
        IntEqual(a, b) => binop!("IntEqual", a, b),
        IntUShr(a, b) => binop!("IntUShr", a, b),
        IntUShl(a, b) => binop!("IntUShl", a, b),
        IntSShr(a, b) => binop!("IntSShr", a, b),
        IntSShl(a, b) => binop!("IntSShl", a, b),
        IntConcat(a, b) => binop!("IntConcat", a, b),
        IntSlice(a, lo, hi) => {
            out.push_str("IntSlice(");
            encode_value(a, out);
            out.push_str(&format!("{lo}:{hi})"));
        }
        IntExt { value, width, signed } => {
            out.push_str("IntExt(");
            encode_value(value, out);
            out.push_str(&format!("{width}:{signed})"));
        }
        Lift(a) => unop!("Lift", a),
        Call(a) => unop!("Call", a),
        Nop(a) => unop!("Nop", a),
        Phi(args) => {
            out.push_str("Phi(");
            for a in args {
                encode_value(a, out);
            }
            out.push(')');
        }
    }
}

fn decode_operation(s: &str) -> Result<Operation, StoreError> {
    let bad = || StoreError::NotFound(Uuid::nil());
    let open = s.find('(').ok_or_else(bad)?;
    let tag = &s[..open];
    let body = s[open + 1..].strip_suffix(')').ok_or_else(bad)?;

    let decode_two = |body: &str| -> Result<(Value, Value), StoreError> {
        let (a, rest) = decode_value(body)?;
        let (b, _) = decode_value(rest)?;
        Ok((a, b))
    };

    Ok(match tag {
        "LogicAnd" => { let (a, b) = decode_two(body)?; Operation::LogicAnd(a, b) }
        "LogicOr" => { let (a, b) = decode_two(body)?; Operation::LogicOr(a, b) }
        "LogicNot" => Operation::LogicNot(decode_value(body)?.0),
        "LogicImplication" => { let (a, b) = decode_two(body)?; Operation::LogicImplication(a, b) }
        "LogicEquivalence" => { let (a, b) = decode_two(body)?; Operation::LogicEquivalence(a, b) }
        "IntAnd" => { let (a, b) = decode_two(body)?; Operation::IntAnd(a, b) }
        "IntOr" => { let (a, b) = decode_two(body)?; Operation::IntOr(a, b) }
        "IntNot" => Operation::IntNot(decode_value(body)?.0),
        "IntAdd" => { let (a, b) = decode_two(body)?; Operation::IntAdd(a, b) }
        "IntSub" => { let (a, b) = decode_two(body)?; Operation::IntSub(a, b) }
        "IntMul" => { let (a, b) = decode_two(body)?; Operation::IntMul(a, b) }
        "IntUDiv" => { let (a, b) = decode_two(body)?; Operation::IntUDiv(a, b) }
        "IntUMod" => { let (a, b) = decode_two(body)?; Operation::IntUMod(a, b) }
        "IntSDiv" => { let (a, b) = decode_two(body)?; Operation::IntSDiv(a, b) }
        "IntSMod" => { let (a, b) = decode_two(body)?; Operation::IntSMod(a, b) }
        "IntLess" => { let (a, b) = decode_two(body)?; Operation::IntLess(a, b) }
        "IntEqual" => { let (a, b) = decode_two(body)?; Operation::IntEqual(a, b) }
        "IntUShr" => { let (a, b) = decode_two(body)?; Operation::IntUShr(a, b) }
        "IntUShl" => { let (a, b) = decode_two(body)?; Operation::IntUShl(a, b) }
        "IntSShr" => { let (a, b) = decode_two(body)?; Operation::IntSShr(a, b) }
        "IntSShl" => { let (a, b) = decode_two(body)?; Operation::IntSShl(a, b) }
        "IntConcat" => { let (a, b) = decode_two(body)?; Operation::IntConcat(a, b) }
        "IntSlice" => {
            let (a, rest) = decode_value(body)?;
            let (lo, hi) = rest.split_once(':').ok_or_else(bad)?;
            Operation::IntSlice(a, lo.parse().map_err(|_| bad())?, hi.parse().map_err(|_| bad())?)
        }
        "IntExt" => {
            let (value, rest) = decode_value(body)?;
            let (width, signed) = rest.split_once(':').ok_or_else(bad)?;
            Operation::IntExt {
                value,
                width: width.parse().map_err(|_| bad())?,
                signed: signed.parse().map_err(|_| bad())?,
            }
        }
        "Lift" => Operation::Lift(decode_value(body)?.0),
        "Call" => Operation::Call(decode_value(body)?.0),
        "Nop" => Operation::Nop(decode_value(body)?.0),
        "Phi" => {
            let mut args = Vec::new();
            let mut rest = body;
            while !rest.is_empty() {
                let (v, r) = decode_value(rest)?;
                args.push(v);
                rest = r;
            }
            Operation::Phi(args)
        }
        _ => return Err(bad()),
    })
}

fn encode_instruction(instr: &Instruction, out: &mut String) {
    encode_operation(instr.operation(), out);
    out.push_str(" = ");
    encode_value(instr.assignee().as_value(), out);
    out.push('\n');
}

fn decode_instruction(line: &str) -> Result<Instruction, StoreError> {
    let bad = || StoreError::NotFound(Uuid::nil());
    let (op_part, assignee_part) = line.split_once(" = ").ok_or_else(bad)?;
    let operation = decode_operation(op_part)?;
    let (assignee_value, _) = decode_value(assignee_part)?;
    let assignee = Lvalue::new(assignee_value).map_err(|_| bad())?;
    Instruction::new(operation, assignee).map_err(|_| bad())
}

fn encode_mnemonic(m: &Mnemonic) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\t{}\t{}\n", m.area().start(), m.area().end(), m.opcode()));
    out.push_str(&format!("{}\n", m.format_string()));
    out.push_str(&format!("{}\n", m.operands().len()));
    for op in m.operands() {
        let mut line = String::new();
        encode_value(op, &mut line);
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str(&format!("{}\n", m.instructions().len()));
    for instr in m.instructions() {
        encode_instruction(instr, &mut out);
    }
    out
}

fn decode_mnemonic<'a>(lines: &mut impl Iterator<Item = &'a str>) -> Result<Mnemonic, StoreError> {
    let bad = || StoreError::NotFound(Uuid::nil());
    let header = lines.next().ok_or_else(bad)?;
    let mut header_parts = header.split('\t');
    let start: u64 = header_parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
    let end: u64 = header_parts.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
    let opcode = header_parts.next().ok_or_else(bad)?.to_string();
    let format = lines.next().ok_or_else(bad)?.to_string();

    let operand_count: usize = lines.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
    let mut operands = Vec::with_capacity(operand_count);
    for _ in 0..operand_count {
        let line = lines.next().ok_or_else(bad)?;
        operands.push(decode_value(line)?.0);
    }

    let instr_count: usize = lines.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
    let mut instructions = Vec::with_capacity(instr_count);
    for _ in 0..instr_count {
        let line = lines.next().ok_or_else(bad)?;
        instructions.push(decode_instruction(line)?);
    }

    Mnemonic::new(Bound::new(start, end), opcode, format, operands, instructions).map_err(|_| bad())
}

fn encode_basic_block(block: &BasicBlock) -> String {
    let mut payload = String::new();
    payload.push_str(&format!("{}\n", block.mnemonics().len()));
    for m in block.mnemonics() {
        payload.push_str(&encode_mnemonic(m));
    }
    payload
}

impl Marshal for BasicBlock {
    fn marshal(&self, subject: Uuid) -> Vec<Triple> {
        let payload = encode_basic_block(self);
        vec![Triple::new(subject, "basic_block/mnemonics", Term::Blob(BlobId::of(payload.as_bytes())))]
    }

    fn blobs(&self) -> Vec<(BlobId, Vec<u8>)> {
        let payload = encode_basic_block(self);
        vec![(BlobId::of(payload.as_bytes()), payload.into_bytes())]
    }
}

impl Unmarshal for BasicBlock {
    fn unmarshal(subject: Uuid, archive: &Archive) -> Result<Self, StoreError> {
        let triple = archive
            .triples_for(subject)
            .find(|t| t.predicate() == "basic_block/mnemonics")
            .ok_or(StoreError::NotFound(subject))?;
        let Term::Blob(id) = triple.object() else {
            return Err(StoreError::NotFound(subject));
        };
        let bytes = archive.blob(*id).ok_or(StoreError::NotFound(subject))?;
        let payload = std::str::from_utf8(bytes).map_err(|_| StoreError::NotFound(subject))?;
        let mut lines = payload.lines();
        let count: usize = lines
            .next()
            .ok_or(StoreError::NotFound(subject))?
            .parse()
            .map_err(|_| StoreError::NotFound(subject))?;
        let mut mnemonics = Vec::with_capacity(count);
        for _ in 0..count {
            mnemonics.push(decode_mnemonic(&mut lines)?);
        }
        Ok(BasicBlock::from_mnemonics(mnemonics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Mnemonic;
    use panopticon_store::{Archive as TestArchive, MemoryStorage, StoreContext};

    #[test]
    fn basic_block_round_trips_through_the_store() {
        let def = Instruction::new(Operation::IntAdd(Value::constant(8, 1).unwrap(), Value::constant(8, 2).unwrap()), Lvalue::new(Value::variable("r0", 8, -1).unwrap()).unwrap()).unwrap();
        let m1 = Mnemonic::new(Bound::new(0, 10), "a", "a", vec![], vec![def]).unwrap();
        let m2 = Mnemonic::new(Bound::new(10, 13), "b", "b", vec![], vec![]).unwrap();
        let m3 = Mnemonic::new(Bound::new(13, 20), "c", "c", vec![], vec![]).unwrap();
        let block = BasicBlock::from_mnemonics(vec![m1, m2, m3]);

        let mut ctx = StoreContext::new(MemoryStorage::new());
        let id = Uuid::new_v4();
        let loc = ctx.insert(id, block.clone());
        ctx.save_point().unwrap();
        drop(loc);

        let reloaded = ctx.load::<BasicBlock>(id).unwrap();
        assert_eq!(*reloaded.read(), block);
    }

    #[test]
    fn archive_roundtrips_directly_without_a_store() {
        let block = BasicBlock::from_mnemonics(vec![Mnemonic::new(Bound::new(0, 1), "nop", "nop", vec![], vec![]).unwrap()]);
        let id = Uuid::new_v4();
        let mut archive = TestArchive::new();
        for (_, bytes) in block.blobs() {
            archive.insert_blob(bytes);
        }
        for t in block.marshal(id) {
            archive.insert(t);
        }

        let restored = BasicBlock::unmarshal(id, &archive).unwrap();
        assert_eq!(restored, block);
    }
}
