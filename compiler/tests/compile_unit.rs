// End-to-end compilation tests through the public library API.
//
// Each test feeds a complete agent assembly unit plus a declaration table
// into `pipeline::compile` and inspects the resulting IR or diagnostic.
// Complements the unit tests inside the compiler modules, which exercise
// handlers statement-by-statement.

use aac::argument::VarType;
use aac::diag::ErrorKind;
use aac::ir::{BlockKind, CmpOp, Instruction, MParams, MathOp};
use aac::pipeline::{compile, CompiledUnit};
use aac::symbol::{Symbol, SymbolTable};

// ── Helpers ──────────────────────────────────────────────────────────────

/// Declarations shared by most tests: graph-scope `population` (immutable
/// int), action-scope scalars and lists.
fn decls() -> SymbolTable {
    let mut table = SymbolTable::new();
    table.declare_graph("population", Symbol::scalar(VarType::Int).immutable());
    table.declare_action("counter", Symbol::scalar(VarType::Int));
    table.declare_action("total", Symbol::scalar(VarType::Float));
    table.declare_action("done", Symbol::scalar(VarType::Bool));
    table.declare_action("neighbors", Symbol::list(VarType::Int));
    table.declare_action("buffer", Symbol::list(VarType::Int));
    table.declare_action("weights", Symbol::list(VarType::Float));
    table
}

fn compile_ok(source: &str) -> CompiledUnit {
    let table = decls();
    compile(source, &table).unwrap_or_else(|e| panic!("unexpected error:\n{}", e))
}

fn compile_err(source: &str) -> aac::diag::CompileError {
    let table = decls();
    compile(source, &table).expect_err("expected compilation to fail")
}

// ── Graph metadata ───────────────────────────────────────────────────────

#[test]
fn graph_with_full_metadata() {
    let unit = compile_ok("GRAPH\nSIZE 10\nSCALE 2\nMPARAMS 0 1\nEGRAPH\n");
    assert_eq!(unit.graphs.len(), 1);
    let graph = &unit.graphs[0];
    assert_eq!(graph.size, Some(10));
    assert_eq!(graph.scale, Some(2));
    assert_eq!(
        graph.m_params,
        Some(MParams {
            m0: 0,
            m_increment: 1
        })
    );
    assert!(graph.actions.is_empty());
}

#[test]
fn multiple_graphs_in_source_order() {
    let unit = compile_ok("GRAPH\nSIZE 1\nEGRAPH\nGRAPH\nSIZE 2\nEGRAPH\n");
    let sizes: Vec<_> = unit.graphs.iter().map(|g| g.size).collect();
    assert_eq!(sizes, vec![Some(1), Some(2)]);
}

#[test]
fn omitted_metadata_stays_unset() {
    let unit = compile_ok("GRAPH\nEGRAPH\n");
    let graph = &unit.graphs[0];
    assert_eq!(graph.size, None);
    assert_eq!(graph.scale, None);
    assert_eq!(graph.m_params, None);
}

#[test]
fn duplicate_size_is_redefinition() {
    let err = compile_err("GRAPH\nSIZE 10\nSIZE 20\nEGRAPH\n");
    assert_eq!(err.kind, ErrorKind::Redefinition);
    assert_eq!(err.place, "SIZE");
}

#[test]
fn size_outside_graph_is_context_error() {
    let err = compile_err("SIZE 10\n");
    assert_eq!(err.kind, ErrorKind::Context);
}

// ── Actions and instructions ─────────────────────────────────────────────

#[test]
fn action_with_instructions_in_source_order() {
    let unit = compile_ok(
        "GRAPH\n\
         ACTION tally\n\
         SET counter 0\n\
         ADD counter 1\n\
         LEN counter neighbors\n\
         EACTION\n\
         EGRAPH\n",
    );
    let action = &unit.graphs[0].actions[0];
    assert_eq!(action.name, "tally");
    assert_eq!(action.instructions.len(), 3);
    assert!(matches!(
        &action.instructions[0],
        Instruction::Set { dst, src } if dst.raw == "counter" && src.raw == "0"
    ));
    assert!(matches!(
        &action.instructions[1],
        Instruction::Math {
            op: MathOp::Add,
            ..
        }
    ));
    assert!(matches!(&action.instructions[2], Instruction::Length { .. }));
}

#[test]
fn graph_scope_symbol_visible_inside_action() {
    // `population` is declared at graph scope and immutable: readable as a
    // source operand, rejected as a destination.
    let unit = compile_ok(
        "GRAPH\nACTION read\nSET counter population\nEACTION\nEGRAPH\n",
    );
    assert_eq!(unit.graphs[0].actions[0].instructions.len(), 1);

    let err = compile_err("GRAPH\nACTION write\nSET population 5\nEACTION\nEGRAPH\n");
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
}

#[test]
fn instruction_outside_action_fails_without_partial_ir() {
    let err = compile_err("GRAPH\nSET counter 0\nEGRAPH\n");
    assert_eq!(err.kind, ErrorKind::Context);
    assert_eq!(err.place, "SET");
}

#[test]
fn type_mismatch_stops_compilation() {
    // MOD over mixed int/float operands.
    let err = compile_err(
        "GRAPH\nACTION m\nMOD counter counter total\nEACTION\nEGRAPH\n",
    );
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
    assert_eq!(err.place, "MOD");
}

#[test]
fn unknown_operand_token() {
    let err = compile_err("GRAPH\nACTION a\nSET counter missing\nEACTION\nEGRAPH\n");
    assert_eq!(err.kind, ErrorKind::UnknownSymbol);
    assert!(err.reason.contains("missing"));
}

#[test]
fn undeclared_nan_is_not_a_float_literal() {
    // `f64::from_str` would happily accept `nan`; the resolver must not.
    let err = compile_err("GRAPH\nACTION a\nSET total nan\nEACTION\nEGRAPH\n");
    assert_eq!(err.kind, ErrorKind::UnknownSymbol);
    assert!(err.reason.contains("nan"));

    let err = compile_err("GRAPH\nACTION a\nSET total inf\nEACTION\nEGRAPH\n");
    assert_eq!(err.kind, ErrorKind::UnknownSymbol);
}

#[test]
fn list_pipeline_round_trip() {
    let unit = compile_ok(
        "GRAPH\n\
         ACTION shuffle\n\
         SUBS buffer neighbors 3\n\
         LR counter buffer 0\n\
         LW buffer 0 counter\n\
         ADDE buffer counter\n\
         REME buffer 7\n\
         REMEN buffer 2\n\
         CLR weights\n\
         EACTION\n\
         EGRAPH\n",
    );
    assert_eq!(unit.graphs[0].actions[0].instructions.len(), 7);
}

// ── Blocks ───────────────────────────────────────────────────────────────

#[test]
fn nested_blocks_compile_and_stay_flat() {
    let unit = compile_ok(
        "GRAPH\n\
         ACTION loopy\n\
         WLT counter 10\n\
         IGT total 0.5\n\
         ADD counter 1\n\
         EBLOCK\n\
         EBLOCK\n\
         EACTION\n\
         EGRAPH\n",
    );
    let instructions = &unit.graphs[0].actions[0].instructions;
    assert_eq!(instructions.len(), 5);
    assert!(matches!(
        instructions[0],
        Instruction::Block {
            kind: BlockKind::While,
            cmp: CmpOp::Lt,
            ..
        }
    ));
    assert!(matches!(
        instructions[1],
        Instruction::Block {
            kind: BlockKind::If,
            cmp: CmpOp::Gt,
            ..
        }
    ));
    assert!(matches!(instructions[3], Instruction::BlockEnd));
    assert!(matches!(instructions[4], Instruction::BlockEnd));
}

#[test]
fn membership_blocks_compile() {
    let unit = compile_ok(
        "GRAPH\n\
         ACTION check\n\
         IN neighbors counter\n\
         ADD counter 1\n\
         EBLOCK\n\
         NIN neighbors 0\n\
         ADDE neighbors counter\n\
         EBLOCK\n\
         EACTION\n\
         EGRAPH\n",
    );
    let instructions = &unit.graphs[0].actions[0].instructions;
    assert_eq!(instructions.len(), 6);
    assert!(matches!(
        instructions[0],
        Instruction::InclusionBlock { negated: false, .. }
    ));
    assert!(matches!(
        instructions[3],
        Instruction::InclusionBlock { negated: true, .. }
    ));

    let err = compile_err("GRAPH\nACTION a\nIN neighbors total\nEACTION\nEGRAPH\n");
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
}

#[test]
fn eblock_without_opener_is_unbalanced() {
    // At depth zero inside an action.
    let err = compile_err("GRAPH\nACTION a\nEBLOCK\nEACTION\nEGRAPH\n");
    assert_eq!(err.kind, ErrorKind::UnbalancedBlock);
    assert_eq!(err.place, "EBLOCK");

    // Outside any action the same kind applies.
    let err = compile_err("EBLOCK\n");
    assert_eq!(err.kind, ErrorKind::UnbalancedBlock);
}

#[test]
fn unclosed_block_fails_at_eaction() {
    let err = compile_err(
        "GRAPH\nACTION a\nIGT counter 0\nEACTION\nEGRAPH\n",
    );
    assert_eq!(err.kind, ErrorKind::UnbalancedBlock);
    assert_eq!(err.place, "EACTION");
}

#[test]
fn unclosed_scopes_fail_at_end_of_unit() {
    let err = compile_err("GRAPH\nSIZE 10\n");
    assert_eq!(err.kind, ErrorKind::UnbalancedBlock);
    assert_eq!(err.place, "<end of unit>");

    let err = compile_err("GRAPH\nACTION a\nEGRAPH\n");
    assert_eq!(err.kind, ErrorKind::UnbalancedBlock);
    assert_eq!(err.place, "EGRAPH");
}

// ── Failure atomicity ────────────────────────────────────────────────────

#[test]
fn failed_compilation_yields_no_ir() {
    // The first valid graph is complete, but the error in the second one
    // discards the whole unit.
    let table = decls();
    let result = compile(
        "GRAPH\nSIZE 1\nEGRAPH\nGRAPH\nSIZE 2\nSIZE 3\nEGRAPH\n",
        &table,
    );
    let err = result.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Redefinition);
}

#[test]
fn first_error_wins() {
    // Both the context violation (SET outside action) and the unknown
    // symbol would fail; the earlier statement reports first.
    let err = compile_err("GRAPH\nSET counter nope\nEGRAPH\n");
    assert_eq!(err.kind, ErrorKind::Context);
}

// ── Comments and layout ──────────────────────────────────────────────────

#[test]
fn comments_and_blank_lines_are_ignored() {
    let unit = compile_ok(
        "# unit header\n\
         GRAPH\n\
         \n\
         % size of the world\n\
         SIZE 10\n\
         \n\
         EGRAPH\n",
    );
    assert_eq!(unit.graphs[0].size, Some(10));
}

// ── IR serialization ─────────────────────────────────────────────────────

#[test]
fn compiled_graphs_serialize_to_json() {
    let unit = compile_ok(
        "GRAPH\nSIZE 4\nACTION go\nSET done true\nEACTION\nEGRAPH\n",
    );
    let json = serde_json::to_string(&unit.graphs).unwrap();
    assert!(json.contains("\"size\":4"));
    assert!(json.contains("\"go\""));
    assert!(json.contains("\"boolean-literal\""));
    // Block bookkeeping is compile-time only.
    assert!(!json.contains("nested_blocks"));
}
