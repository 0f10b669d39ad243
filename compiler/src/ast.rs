// AST node types for agent assembly .aasm source files.
//
// The surface grammar is one statement per line: an opcode followed by
// whitespace-separated operand tokens. Operands stay raw strings here —
// typing happens later in argument resolution, against the live compile
// state.
//
// Preconditions: produced by the parser from the lexed token stream.
// Postconditions: each node's span covers the source range of the construct.
// Failure modes: none (data-only module).
// Side effects: none.

use chumsky::span::SimpleSpan;

/// Byte-offset span (alias for chumsky's `SimpleSpan`).
pub type Span = SimpleSpan;

/// A complete agent assembly unit: a sequence of statements in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
    pub span: Span,
}

/// One source line: `OPCODE arg1 [arg2 [arg3]]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub opcode: String,
    pub opcode_span: Span,
    pub args: Vec<RawToken>,
    pub span: Span,
}

/// An operand token exactly as written, with its span.
///
/// Identifiers and literals are not distinguished here; the argument
/// resolver decides against the symbol scope (symbol-table hit wins over
/// literal parse).
#[derive(Debug, Clone, PartialEq)]
pub struct RawToken {
    pub text: String,
    pub span: Span,
}
