// Parser for agent assembly .aasm source files.
//
// Parses a token stream (from the lexer) into statement nodes. Uses chumsky
// combinators. The grammar is deliberately flat — one statement per line —
// so the parser's job is grouping words into (opcode, operands) and keeping
// spans; all semantic checks happen during opcode dispatch.
//
// Preconditions: input is a valid token stream from `lexer::lex()`.
// Postconditions: returns statements in exact source order plus any errors.
// Failure modes: syntax errors produce `Rich` diagnostics.
// Side effects: none.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

use crate::ast::*;
use crate::lexer::Token;

/// Result of parsing: statements plus any errors.
#[derive(Debug)]
pub struct ParseResult {
    pub program: Option<Program>,
    pub errors: Vec<Rich<'static, Token, SimpleSpan>>,
}

/// Parse an agent assembly source string. Lexes then parses.
///
/// Returns the statement list (if parsing succeeded) plus any errors.
pub fn parse(source: &str) -> ParseResult {
    let lex_result = crate::lexer::lex(source);
    let len = source.len();

    // Convert lexer output to chumsky stream.
    let token_iter = lex_result.tokens.into_iter().map(|(tok, span)| {
        let cspan: SimpleSpan = (span.start..span.end).into();
        (tok, cspan)
    });
    let eoi: SimpleSpan = (len..len).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let parser = program_parser(source);
    let (program, parse_errors) = parser.parse(stream).into_output_errors();

    // Merge lex errors + parse errors.
    let mut all_errors: Vec<Rich<'static, Token, SimpleSpan>> = lex_result
        .errors
        .into_iter()
        .map(|e| {
            let span: SimpleSpan = (e.span.start..e.span.end).into();
            Rich::custom(span, e.message)
        })
        .collect();
    all_errors.extend(parse_errors.into_iter().map(|e| e.into_owned()));

    ParseResult {
        program,
        errors: all_errors,
    }
}

// ── Main parser builder ──
//
// Built inside one function so the `source` reference is captured once and
// shared by all combinators (word text is sliced out of the source by span).

fn program_parser<'tokens, 'src: 'tokens, I>(
    source: &'src str,
) -> impl Parser<'tokens, I, Program, extra::Err<Rich<'tokens, Token, SimpleSpan>>> + 'src
where
    'tokens: 'src,
    I: ValueInput<'tokens, Token = Token, Span = SimpleSpan>,
{
    // ── Newlines ──

    let nl = just(Token::Newline).repeated().ignored();

    // ── Word ──

    let word = just(Token::Word).map_with(move |_, e| {
        let span: SimpleSpan = e.span();
        RawToken {
            text: source[span.start()..span.end()].to_string(),
            span,
        }
    });

    // ── Statement: opcode word followed by operand words ──

    let statement = word
        .clone()
        .then(word.repeated().collect::<Vec<_>>())
        .map_with(|(opcode, args), e| Statement {
            opcode: opcode.text,
            opcode_span: opcode.span,
            args,
            span: e.span(),
        });

    // ── Program ──

    nl.clone()
        .ignore_then(
            statement
                .separated_by(just(Token::Newline).repeated().at_least(1))
                .allow_trailing()
                .collect::<Vec<_>>(),
        )
        .then_ignore(nl)
        .map_with(move |statements, e| Program {
            statements,
            span: e.span(),
        })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Program {
        let result = parse(source);
        assert!(
            result.errors.is_empty(),
            "unexpected errors: {:#?}",
            result.errors
        );
        result.program.expect("expected program")
    }

    fn parse_one_stmt(source: &str) -> Statement {
        let prog = parse_ok(source);
        assert_eq!(prog.statements.len(), 1, "expected 1 statement");
        prog.statements.into_iter().next().unwrap()
    }

    // ── Empty / blank ──

    #[test]
    fn empty_program() {
        let prog = parse_ok("");
        assert!(prog.statements.is_empty());
    }

    #[test]
    fn blank_lines_only() {
        let prog = parse_ok("\n\n\n");
        assert!(prog.statements.is_empty());
    }

    // ── Statements ──

    #[test]
    fn bare_directive() {
        let s = parse_one_stmt("GRAPH");
        assert_eq!(s.opcode, "GRAPH");
        assert!(s.args.is_empty());
    }

    #[test]
    fn directive_with_operands() {
        let s = parse_one_stmt("MPARAMS 0 1");
        assert_eq!(s.opcode, "MPARAMS");
        let texts: Vec<&str> = s.args.iter().map(|a| a.text.as_str()).collect();
        assert_eq!(texts, vec!["0", "1"]);
    }

    #[test]
    fn statements_keep_source_order() {
        let prog = parse_ok("GRAPH\nSIZE 10\nSCALE 2\nEGRAPH\n");
        let opcodes: Vec<&str> = prog.statements.iter().map(|s| s.opcode.as_str()).collect();
        assert_eq!(opcodes, vec!["GRAPH", "SIZE", "SCALE", "EGRAPH"]);
    }

    #[test]
    fn blank_lines_between_statements() {
        let prog = parse_ok("GRAPH\n\n\nSIZE 10\n\nEGRAPH");
        assert_eq!(prog.statements.len(), 3);
    }

    #[test]
    fn comments_do_not_produce_statements() {
        let prog = parse_ok("# unit header\nGRAPH\n% trailer\n");
        assert_eq!(prog.statements.len(), 1);
        assert_eq!(prog.statements[0].opcode, "GRAPH");
    }

    #[test]
    fn operand_spans_cover_source() {
        let s = parse_one_stmt("SET counter 42");
        assert_eq!(s.args[0].text, "counter");
        let span = s.args[0].span;
        assert_eq!(&"SET counter 42"[span.start()..span.end()], "counter");
    }

    #[test]
    fn negative_literal_is_one_operand() {
        let s = parse_one_stmt("SCALE -2");
        assert_eq!(s.args.len(), 1);
        assert_eq!(s.args[0].text, "-2");
    }
}
