// pipeline.rs — Compilation orchestration
//
// Front door of the library: lex + parse the unit, dispatch every statement
// through the opcode handlers in source order, finalize scopes, and stamp
// the result with provenance metadata.
//
// Preconditions: the symbol table is fully populated by the embedder.
// Postconditions: on Ok, every graph/action/instruction in the unit passed
//   its validations; instruction order is exactly source order.
// Failure modes: the first lex/parse error, or the first handler error.
// Side effects: none beyond the returned value.

use chumsky::span::Span as _;

use crate::diag::{CompileError, ErrorKind, Result};
use crate::ir::Graph;
use crate::opcode;
use crate::parser;
use crate::state::CompileState;
use crate::symbol::SymbolTable;

// ── Provenance ───────────────────────────────────────────────────────────

/// Provenance metadata for cache-key and reproducibility use.
///
/// `source_hash`: SHA-256 of the raw source text.
/// `declarations_fingerprint`: SHA-256 of `SymbolTable::canonical_json()`.
/// `compiler_version`: crate version from `Cargo.toml`.
#[derive(Debug, Clone)]
pub struct Provenance {
    pub source_hash: [u8; 32],
    pub declarations_fingerprint: [u8; 32],
    pub compiler_version: &'static str,
}

impl Provenance {
    /// Hex string of the source hash (64 characters).
    pub fn source_hash_hex(&self) -> String {
        bytes_to_hex(&self.source_hash)
    }

    /// Hex string of the declarations fingerprint (64 characters).
    pub fn declarations_fingerprint_hex(&self) -> String {
        bytes_to_hex(&self.declarations_fingerprint)
    }

    /// Serialize provenance as a JSON string for the IR envelope.
    pub fn to_json(&self) -> String {
        format!(
            "{{\n  \"source_hash\": \"{}\",\n  \"declarations_fingerprint\": \"{}\",\n  \"compiler_version\": \"{}\"\n}}\n",
            self.source_hash_hex(),
            self.declarations_fingerprint_hex(),
            self.compiler_version,
        )
    }
}

fn bytes_to_hex(bytes: &[u8; 32]) -> String {
    let mut s = String::with_capacity(64);
    for b in bytes {
        use std::fmt::Write;
        let _ = write!(s, "{:02x}", b);
    }
    s
}

fn sha256(data: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Compute provenance from source text and the declaration table.
pub fn compute_provenance(source: &str, symbols: &SymbolTable) -> Provenance {
    Provenance {
        source_hash: sha256(source.as_bytes()),
        declarations_fingerprint: sha256(symbols.canonical_json().as_bytes()),
        compiler_version: env!("CARGO_PKG_VERSION"),
    }
}

// ── Compiled unit ────────────────────────────────────────────────────────

/// The output of a successful compilation: validated graphs plus the
/// provenance stamp.
#[derive(Debug, Clone)]
pub struct CompiledUnit {
    pub graphs: Vec<Graph>,
    pub provenance: Provenance,
}

// ── Entry point ──────────────────────────────────────────────────────────

/// Compile one agent assembly unit against a populated declaration table.
///
/// Stops at the first error; a failed compilation yields no partial IR.
pub fn compile(source: &str, symbols: &SymbolTable) -> Result<CompiledUnit> {
    let parsed = parser::parse(source);
    if let Some(first) = parsed.errors.first() {
        let offset = first.span().start().min(source.len());
        let line = source[..offset].matches('\n').count() + 1;
        return Err(CompileError::new(
            ErrorKind::Parse,
            format!("line {}", line),
            first.to_string(),
        ));
    }
    let program = parsed
        .program
        .expect("internal: parse produced neither output nor errors");

    let mut state = CompileState::new(symbols);
    for statement in &program.statements {
        opcode::dispatch(&mut state, statement)?;
    }
    let graphs = state.finish()?;

    Ok(CompiledUnit {
        graphs,
        provenance: compute_provenance(source, symbols),
    })
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_unit_compiles_to_no_graphs() {
        let symbols = SymbolTable::new();
        let unit = compile("", &symbols).unwrap();
        assert!(unit.graphs.is_empty());
    }

    #[test]
    fn parse_error_reports_line() {
        let symbols = SymbolTable::new();
        // '!' matches no token, so lexing fails on line 2.
        let err = compile("GRAPH\n!\nEGRAPH\n", &symbols).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parse);
        assert_eq!(err.place, "line 2");
    }

    #[test]
    fn unterminated_graph_fails_at_end_of_unit() {
        let symbols = SymbolTable::new();
        let err = compile("GRAPH\nSIZE 10\n", &symbols).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnbalancedBlock);
        assert_eq!(err.place, "<end of unit>");
    }

    #[test]
    fn provenance_is_stable_for_identical_inputs() {
        let symbols = SymbolTable::new();
        let a = compile("GRAPH\nEGRAPH\n", &symbols).unwrap();
        let b = compile("GRAPH\nEGRAPH\n", &symbols).unwrap();
        assert_eq!(a.provenance.source_hash, b.provenance.source_hash);
        assert_eq!(
            a.provenance.declarations_fingerprint,
            b.provenance.declarations_fingerprint
        );
        assert_eq!(a.provenance.source_hash_hex().len(), 64);
    }

    #[test]
    fn provenance_tracks_source_changes() {
        let symbols = SymbolTable::new();
        let a = compile("GRAPH\nEGRAPH\n", &symbols).unwrap();
        let b = compile("GRAPH\nSIZE 10\nEGRAPH\n", &symbols).unwrap();
        assert_ne!(a.provenance.source_hash, b.provenance.source_hash);
    }
}
