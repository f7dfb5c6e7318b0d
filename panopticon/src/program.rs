use std::collections::{HashSet, VecDeque};

use panopticon_types::Offset;

use crate::Procedure;

/// A vertex of a [`Program`]'s call graph: either a fully disassembled
/// procedure or an external symbol that was called but never resolved to
/// bytes we own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum CallTarget {
    /// Index into [`Program::procedures`].
    #[display(fmt = "procedure #{}", _0)]
    Procedure(usize),
    /// The external symbol's name.
    #[display(fmt = "{}", _0)]
    External(String),
}

/// The call graph of every procedure disassembled from one token stream:
/// procedures, their call edges, and the external symbols they reach.
#[derive(Debug, Clone, Default)]
pub struct Program {
    name: String,
    procedures: Vec<Procedure>,
    /// Call-graph edges `(caller, callee)`.
    calls: Vec<(CallTarget, CallTarget)>,
}

impl Program {
    /// An empty, unnamed program.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// The program's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Every disassembled procedure.
    pub fn procedures(&self) -> &[Procedure] {
        &self.procedures
    }

    /// Every call-graph edge.
    pub fn calls(&self) -> &[(CallTarget, CallTarget)] {
        &self.calls
    }

    /// True if some procedure's entry block covers `entry`.
    pub fn has_procedure(&self, entry: Offset) -> bool {
        self.find_procedure_by_entry(entry).is_some()
    }

    /// The index of the procedure whose entry block starts at `entry`, if any.
    pub fn find_procedure_by_entry(&self, entry: Offset) -> Option<usize> {
        self.procedures.iter().position(|p| {
            p.entry()
                .and_then(|idx| p.blocks()[idx].area())
                .is_some_and(|area| area.start() == entry)
        })
    }

    /// The index of the procedure containing a basic block whose area
    /// covers `offset`.
    pub fn find_procedure_by_bblock(&self, offset: Offset) -> Option<usize> {
        self.procedures.iter().position(|p| p.block_containing(offset).is_some())
    }

    /// Disassembles a whole program starting at `entry`.
    ///
    /// `disassemble_one` performs the actual recursive disassembly of a
    /// single procedure given its entry offset; this function drives the
    /// worklist that discovers new procedures from `call` instructions and
    /// wires the call graph.
    pub fn disassemble(entry: Offset, mut disassemble_one: impl FnMut(Offset) -> Procedure) -> Self {
        let mut prog = Program::new("unnamed program");
        let mut call_targets: VecDeque<Offset> = VecDeque::from([entry]);
        let mut seen: HashSet<Offset> = HashSet::new();
        // Raw `(caller procedure index, callee offset)` pairs; resolved into
        // `CallTarget`s only once the whole worklist has drained, so a
        // callee discovered after its caller still ends up as
        // `CallTarget::Procedure` rather than a dangling `External` stub.
        let mut pending_calls: Vec<(usize, Offset)> = Vec::new();

        while let Some(target) = call_targets.pop_front() {
            if prog.has_procedure(target) || !seen.insert(target) {
                continue;
            }

            tracing::debug!(offset = target, "disassembling procedure");
            let mut proc = disassemble_one(target);
            if proc.entry().is_none() {
                if let Some(idx) = proc.block_containing(target) {
                    proc.set_entry(idx);
                }
            }
            proc.set_name(format!("proc_{target:#x}"));

            let calls = proc.collect_calls();
            let caller_idx = prog.procedures.len();
            prog.procedures.push(proc);

            for callee_addr in calls {
                if !prog.has_procedure(callee_addr) && !seen.contains(&callee_addr) {
                    call_targets.push_back(callee_addr);
                }
                pending_calls.push((caller_idx, callee_addr));
            }
        }

        for (caller_idx, callee_addr) in pending_calls {
            let callee = match prog.find_procedure_by_entry(callee_addr) {
                Some(idx) => CallTarget::Procedure(idx),
                None => CallTarget::External(format!("proc_{callee_addr:#x}")),
            };
            tracing::debug!(caller = %CallTarget::Procedure(caller_idx), callee = %callee, "wiring call edge");
            prog.calls.push((CallTarget::Procedure(caller_idx), callee));
        }

        prog
    }
}
