use criterion::{black_box, criterion_group, criterion_main, Criterion};
use panopticon::disassembler::{CodeGenerator, Disassembler, Pattern};
use panopticon::{disassembler::disassemble_procedure, Architecture, Guard, Mnemonic};
use panopticon_il::{Value, Width};
use panopticon_types::{Bound, Offset};

#[derive(Clone, Default)]
struct NoState;

struct Toy;

impl Architecture for Toy {
    type State = NoState;

    fn token_width(&self) -> Width {
        8
    }

    fn registers(&self) -> &[&'static str] {
        &[]
    }

    fn register_width(&self, _name: &str) -> Width {
        8
    }
}

fn toy_disassembler() -> Disassembler<Toy> {
    Disassembler::new()
        .rule(
            Pattern::literal(8, 0x90),
            Box::new(|state, arch, counter| {
                let mut gen = CodeGenerator::new(arch, counter);
                let _ = gen.assign_anon(Value::constant(8, 0).unwrap());
                state.mnemonic(Mnemonic::new(Bound::new(state.address, state.address + 1), "nop", "nop", vec![], gen.into_instructions()).unwrap());
            }),
        )
        .rule(
            Pattern::literal(8, 0xeb).then(Pattern::bits("........").unwrap()),
            Box::new(|state, _arch, _counter| {
                let rel = state.tokens[1] as i8 as i64;
                let target = (state.address as i64 + 2 + rel) as Offset;
                state.mnemonic(Mnemonic::new(Bound::new(state.address, state.address + 2), "jmp", "jmp {64::}", vec![Value::constant(64, target).unwrap()], vec![]).unwrap());
                state.jump(Value::constant(64, target).unwrap(), Guard::always());
            }),
        )
}

// A repeating nop-sled with an occasional short backward jump, long enough
// to exercise the worklist's block-splitting path a realistic number of
// times per run.
fn generate_program(blocks: usize, block_len: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(blocks * (block_len + 2));
    for b in 0..blocks {
        for _ in 0..block_len {
            bytes.push(0x90);
        }
        if b + 1 < blocks {
            bytes.push(0xeb);
            bytes.push(0x00);
        }
    }
    bytes
}

fn disassemble_benchmark(c: &mut Criterion) {
    let program = generate_program(200, 16);
    let dis = toy_disassembler();

    c.bench_function("disassemble_procedure/linear_sled", |b| {
        b.iter(|| {
            let proc = disassemble_procedure(&dis, &Toy, 0, black_box(program.len() as Offset), |off| program.get(off as usize).map(|v| *v as u64));
            black_box(proc.blocks().len())
        });
    });
}

criterion_group!(benches, disassemble_benchmark);
criterion_main!(benches);
