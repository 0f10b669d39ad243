// diag.rs — Unified diagnostics model
//
// Provides the fatal diagnostic type shared by every compiler phase. A
// compilation stops at the first `CompileError`; there is no warning tier
// and no recovery.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::error::Error;
use std::fmt;

// ── Error kind ───────────────────────────────────────────────────────────

/// The category of a fatal compile error.
///
/// Kinds classify the rule that was violated; the human-facing text lives
/// in `CompileError::reason`. Once assigned, a kind's semantic meaning must
/// never change — downstream tooling matches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Opcode used outside its required structural context.
    Context,
    /// A set-once graph property was set a second time.
    Redefinition,
    /// An operand's resolved type failed the opcode's compatibility check.
    TypeMismatch,
    /// Wrong number of operand tokens for an opcode.
    Arity,
    /// EBLOCK with no open block, or a scope closed with children open.
    UnbalancedBlock,
    /// Operand token is neither a declared symbol nor a valid literal.
    UnknownSymbol,
    /// Lexing or statement parsing failed before opcode dispatch.
    Parse,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Context => "context",
            ErrorKind::Redefinition => "redefinition",
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::Arity => "arity",
            ErrorKind::UnbalancedBlock => "unbalanced block",
            ErrorKind::UnknownSymbol => "unknown symbol",
            ErrorKind::Parse => "parse",
        };
        write!(f, "{}", name)
    }
}

// ── Compile error ────────────────────────────────────────────────────────

/// A fatal compile diagnostic: where it happened, why, and optionally how
/// to fix it.
///
/// `place` is the opcode or directive name under dispatch when the rule was
/// violated (e.g. `"SET"`, `"MPARAMS"`), not a byte offset — agent assembly
/// units are one statement per line, so the opcode plus the operand
/// explanation locates the fix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub place: String,
    pub reason: String,
    pub suggestion: Option<String>,
}

impl CompileError {
    /// Create a new error with no suggestion.
    pub fn new(kind: ErrorKind, place: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind,
            place: place.into(),
            reason: reason.into(),
            suggestion: None,
        }
    }

    /// Attach a remediation suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl fmt::Display for CompileError {
    /// Reference rendering: `🔥 <place>` then the reason, then the
    /// suggestion when present.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "🔥 {}\n{}", self.place, self.reason)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n{}", suggestion)?;
        }
        Ok(())
    }
}

impl Error for CompileError {}

/// Shorthand result type used by every handler and pass.
pub type Result<T> = std::result::Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_without_suggestion() {
        let e = CompileError::new(ErrorKind::Context, "SET", "SET used outside an action");
        assert_eq!(format!("{e}"), "🔥 SET\nSET used outside an action");
    }

    #[test]
    fn display_with_suggestion() {
        let e = CompileError::new(ErrorKind::UnbalancedBlock, "EBLOCK", "no open block")
            .with_suggestion("remove this EBLOCK or open a block before it");
        assert_eq!(
            format!("{e}"),
            "🔥 EBLOCK\nno open block\nremove this EBLOCK or open a block before it"
        );
    }

    #[test]
    fn kind_is_preserved() {
        let e = CompileError::new(ErrorKind::TypeMismatch, "MOD", "divisor is float");
        assert_eq!(e.kind, ErrorKind::TypeMismatch);
        assert_eq!(e.place, "MOD");
        assert!(e.suggestion.is_none());
    }
}
