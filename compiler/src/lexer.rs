// Lexer for agent assembly .aasm source files.
//
// Tokenizes line-oriented opcode statements. Uses the `logos` crate for
// DFA-based lexing. Newlines are significant (statement terminators);
// `#` and `%` start line comments.
//
// Preconditions: input is valid UTF-8.
// Postconditions: returns all tokens with byte-offset spans, plus any lex errors.
// Failure modes: unrecognized characters produce `LexError`; lexing continues.
// Side effects: none.

use logos::Logos;
use std::fmt;

/// Byte-offset span in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A lexer error with location.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub span: Span,
    pub message: String,
}

/// Result of lexing: tokens plus any errors (non-fatal at this stage).
#[derive(Debug)]
pub struct LexResult {
    pub tokens: Vec<(Token, Span)>,
    pub errors: Vec<LexError>,
}

/// Agent assembly token types.
///
/// Words carry no value — the parser retrieves the text from the source
/// via the span. Opcodes, identifiers, and literals are all `Word`s at
/// this stage: which is which depends on position and on the symbol scope,
/// neither of which the lexer knows.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r]+|#[^\n]*|%[^\n]*")]
pub enum Token {
    /// A bare word: opcode, identifier, or literal.
    ///
    /// The numeric alternative admits signs, decimal points, and exponents
    /// so that `-3`, `0.5`, and `1e6` lex as single tokens.
    #[regex(r"[A-Za-z_][A-Za-z0-9_.]*|-?[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?")]
    Word,

    /// One or more newlines (significant — statement terminator).
    #[regex(r"\n+")]
    Newline,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word => write!(f, "<word>"),
            Token::Newline => write!(f, "<newline>"),
        }
    }
}

// ── Public API ──

/// Lex an agent assembly source string into tokens.
///
/// Returns all successfully parsed tokens together with any errors for
/// unrecognised characters. Lexing continues past bad characters; the
/// driver promotes lex errors to fatal diagnostics before dispatch.
pub fn lex(source: &str) -> LexResult {
    let lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for (result, range) in lexer.spanned() {
        let span = Span {
            start: range.start,
            end: range.end,
        };
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => errors.push(LexError {
                span,
                message: format!("unexpected character: {:?}", &source[span.start..span.end]),
            }),
        }
    }

    LexResult { tokens, errors }
}

// ── Tests ──
