use panopticon_il::{Value, Width};

/// The architecture-specific surface the disassembler engine needs: how
/// wide its tokens are, what persistent decode state (if any) it threads
/// through a procedure's decode, and how it mints fresh IL temporaries.
///
/// One object-safe trait passed by reference into the disassembler, rather
/// than a family of free functions resolved per architecture type.
pub trait Architecture {
    /// Persistent decoder state threaded across a procedure's rules, e.g.
    /// AMD64's REX/operand-size prefixes. `()` for stateless ISAs.
    type State: Clone + Default;

    /// Bit width of one decode token (8 for byte streams, 16 for word
    /// streams, ...).
    fn token_width(&self) -> Width;

    /// Display names of this architecture's general-purpose registers.
    fn registers(&self) -> &[&'static str];

    /// Bit width of the named register. Panics if `name` is unknown.
    fn register_width(&self, name: &str) -> Width;

    /// Allocates a fresh SSA-pre temporary of `width` bits, uniquely named
    /// within one procedure's decode session.
    fn fresh_temporary(&self, counter: &std::sync::atomic::AtomicU64, width: Width) -> Value {
        let n = counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Value::variable(format!("t{n}"), width, -1).expect("generated temporary name is never empty")
    }
}
