// state.rs — Compile-time state tracker
//
// Single source of truth for "where are we in the unit": graph scope,
// action scope, block depth. One instance per compilation pass, threaded
// by exclusive mutable reference into every opcode handler — there is no
// ambient or global state anywhere in the crate.
//
// Preconditions: handlers check their structural preconditions via
//   `require` before calling a transition.
// Postconditions: `in_action` implies `in_graph`; `last_action` is Some
//   iff `in_action`.
// Failure modes: closing a scope with children still open.
// Side effects: mutations are local to this instance.

use crate::diag::{CompileError, ErrorKind, Result};
use crate::ir::{Action, Graph, Instruction};
use crate::symbol::{Symbol, SymbolTable};

/// Per-compilation-unit state, created at the start of a pass and consumed
/// by `finish()` at the end (or dropped on the first fatal diagnostic).
#[derive(Debug)]
pub struct CompileState<'a> {
    pub in_graph: bool,
    pub in_action: bool,
    /// The graph currently being built, while `in_graph`.
    pub last_graph: Option<Graph>,
    /// The action currently being built, while `in_action`.
    pub last_action: Option<Action>,
    /// Graph scopes already closed, in source order.
    pub graphs: Vec<Graph>,
    symbols: &'a SymbolTable,
}

impl<'a> CompileState<'a> {
    pub fn new(symbols: &'a SymbolTable) -> Self {
        CompileState {
            in_graph: false,
            in_action: false,
            last_graph: None,
            last_action: None,
            graphs: Vec::new(),
            symbols,
        }
    }

    // ── Assertion primitive ──────────────────────────────────────────────

    /// Fail-fast precondition check. On a false condition, builds the
    /// fatal diagnostic carrying the opcode name, the reason, and an
    /// optional suggestion. The first failure ends the compilation.
    pub fn require(
        &self,
        condition: bool,
        kind: ErrorKind,
        place: &str,
        reason: impl Into<String>,
        suggestion: Option<&str>,
    ) -> Result<()> {
        if condition {
            return Ok(());
        }
        let mut err = CompileError::new(kind, place, reason);
        if let Some(s) = suggestion {
            err = err.with_suggestion(s);
        }
        Err(err)
    }

    // ── Symbol scope ─────────────────────────────────────────────────────

    /// Typed lookup against the active scope: action-level declarations
    /// are visible only while an action is open.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.symbols.resolve(name, self.in_action)
    }

    // ── Scope transitions ────────────────────────────────────────────────

    /// Open a new graph scope. Caller has checked `!in_graph`.
    pub fn enter_graph(&mut self) {
        self.in_graph = true;
        self.last_graph = Some(Graph::default());
    }

    /// Close the graph scope. Fails if an action is still open.
    pub fn exit_graph(&mut self, place: &str) -> Result<()> {
        self.require(
            !self.in_action,
            ErrorKind::UnbalancedBlock,
            place,
            "graph scope closed with an action still open",
            Some("close the action with EACTION first"),
        )?;
        let graph = self
            .last_graph
            .take()
            .expect("internal: exit_graph with no open graph");
        self.graphs.push(graph);
        self.in_graph = false;
        Ok(())
    }

    /// Open an action scope. Caller has checked `in_graph && !in_action`.
    pub fn enter_action(&mut self, name: impl Into<String>) {
        self.in_action = true;
        self.last_action = Some(Action::new(name));
    }

    /// Close the action scope. Fails on unclosed blocks. The finished
    /// action is attached to the owning graph.
    pub fn exit_action(&mut self, place: &str) -> Result<()> {
        let depth = self.action().nested_blocks;
        self.require(
            depth == 0,
            ErrorKind::UnbalancedBlock,
            place,
            format!("action closed with {} unclosed block(s)", depth),
            Some("close every block with EBLOCK before ending the action"),
        )?;
        let action = self
            .last_action
            .take()
            .expect("internal: exit_action with no open action");
        self.graph_mut().actions.push(action);
        self.in_action = false;
        Ok(())
    }

    // ── Emission ─────────────────────────────────────────────────────────

    /// Append a validated instruction to the open action.
    pub fn emit(&mut self, instruction: Instruction) {
        self.action_mut().instructions.push(instruction);
    }

    pub fn open_block(&mut self) {
        self.action_mut().nested_blocks += 1;
    }

    pub fn close_block(&mut self) {
        let action = self.action_mut();
        debug_assert!(action.nested_blocks > 0);
        action.nested_blocks -= 1;
    }

    // ── Accessors ────────────────────────────────────────────────────────
    //
    // Handlers check `in_graph`/`in_action` before touching these; a miss
    // here is a dispatcher bug, not a user error.

    pub fn graph(&self) -> &Graph {
        self.last_graph
            .as_ref()
            .expect("internal: no open graph")
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        self.last_graph
            .as_mut()
            .expect("internal: no open graph")
    }

    pub fn action(&self) -> &Action {
        self.last_action
            .as_ref()
            .expect("internal: no open action")
    }

    pub fn action_mut(&mut self) -> &mut Action {
        self.last_action
            .as_mut()
            .expect("internal: no open action")
    }

    // ── Finalization ─────────────────────────────────────────────────────

    /// End of input: every scope must be closed. Consumes the state and
    /// yields the finished graphs.
    pub fn finish(self) -> Result<Vec<Graph>> {
        self.require(
            !self.in_graph,
            ErrorKind::UnbalancedBlock,
            "<end of unit>",
            "unit ended with an open graph scope",
            Some("close the graph with EGRAPH"),
        )?;
        Ok(self.graphs)
    }
}
