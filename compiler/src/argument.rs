// argument.rs — Operand resolution and type compatibility
//
// Converts a raw operand token plus the current compile state into a typed
// `Argument`, and hosts the per-instruction-family compatibility predicates
// the opcode handlers consult before emitting IR.
//
// Types form a closed union (`VarType`) and every predicate matches on it
// exhaustively, so adding a type forces every family to take a position.
//
// Preconditions: the compile state's symbol scopes reflect the declarations
//   in effect for the current graph/action.
// Postconditions: a resolved `Argument` is immutable; each opcode invocation
//   re-resolves its tokens.
// Failure modes: tokens that are neither declared symbols nor valid literals.
// Side effects: none.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ast::RawToken;
use crate::diag::{CompileError, ErrorKind, Result};
use crate::state::CompileState;
use crate::symbol::SymbolKind;

// ── Declared type ────────────────────────────────────────────────────────

/// The closed set of operand types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VarType {
    Int,
    Float,
    Bool,
    List(Box<VarType>),
}

impl VarType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, VarType::Int | VarType::Float)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, VarType::List(_))
    }

    /// Element type, for lists.
    pub fn elem(&self) -> Option<&VarType> {
        match self {
            VarType::List(elem) => Some(elem),
            VarType::Int | VarType::Float | VarType::Bool => None,
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarType::Int => write!(f, "int"),
            VarType::Float => write!(f, "float"),
            VarType::Bool => write!(f, "bool"),
            VarType::List(elem) => write!(f, "list<{}>", elem),
        }
    }
}

impl FromStr for VarType {
    type Err = String;

    /// Parse the declaration-file spelling: `int`, `float`, `bool`,
    /// `list<T>` (nesting allowed).
    fn from_str(s: &str) -> std::result::Result<Self, String> {
        let s = s.trim();
        match s {
            "int" => Ok(VarType::Int),
            "float" => Ok(VarType::Float),
            "bool" => Ok(VarType::Bool),
            _ => {
                if let Some(inner) = s.strip_prefix("list<").and_then(|r| r.strip_suffix('>')) {
                    Ok(VarType::List(Box::new(inner.parse()?)))
                } else {
                    Err(format!("unknown type: {:?}", s))
                }
            }
        }
    }
}

impl Serialize for VarType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VarType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

// ── Argument kind ────────────────────────────────────────────────────────

/// How the operand token resolved: what category of reference it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArgKind {
    ScalarVariable,
    ListVariable,
    ListElement,
    NumericLiteral,
    BooleanLiteral,
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgKind::ScalarVariable => "scalar variable",
            ArgKind::ListVariable => "list variable",
            ArgKind::ListElement => "list element",
            ArgKind::NumericLiteral => "numeric literal",
            ArgKind::BooleanLiteral => "boolean literal",
        };
        write!(f, "{}", name)
    }
}

// ── Argument ─────────────────────────────────────────────────────────────

/// A resolved, typed reference to an operand. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Argument {
    pub raw: String,
    pub kind: ArgKind,
    pub ty: VarType,
    pub mutable: bool,
}

impl Argument {
    /// Resolve a raw token against the active symbol scope.
    ///
    /// A symbol-table hit always wins. Otherwise the token is tried as a
    /// literal under the fixed policy: `i64` parse → int, `f64` parse →
    /// float, exact `true`/`false` → bool. Anything else is an unknown
    /// symbol.
    pub fn resolve(state: &CompileState, place: &str, token: &RawToken) -> Result<Argument> {
        if let Some(symbol) = state.lookup(&token.text) {
            let kind = match symbol.kind {
                SymbolKind::Scalar => ArgKind::ScalarVariable,
                SymbolKind::List => ArgKind::ListVariable,
                SymbolKind::ListElement => ArgKind::ListElement,
            };
            return Ok(Argument {
                raw: token.text.clone(),
                kind,
                ty: symbol.ty.clone(),
                mutable: symbol.mutable,
            });
        }

        if let Some(literal) = Self::parse_literal(&token.text) {
            return Ok(literal);
        }

        Err(CompileError::new(
            ErrorKind::UnknownSymbol,
            place,
            format!(
                "{:?} is not a declared symbol and does not parse as a literal",
                token.text
            ),
        )
        .with_suggestion("declare the variable before use, or check the spelling"))
    }

    /// Literal disambiguation policy. Int wins over float for tokens both
    /// could accept (`i64` parse succeeds only without `.`/exponent).
    fn parse_literal(text: &str) -> Option<Argument> {
        if text == "true" || text == "false" {
            return Some(Argument {
                raw: text.to_string(),
                kind: ArgKind::BooleanLiteral,
                ty: VarType::Bool,
                mutable: false,
            });
        }
        if text.parse::<i64>().is_ok() {
            return Some(Argument {
                raw: text.to_string(),
                kind: ArgKind::NumericLiteral,
                ty: VarType::Int,
                mutable: false,
            });
        }
        // f64 parsing also accepts the identifier-shaped spellings nan,
        // inf, and infinity; only digit-shaped tokens qualify here.
        let numeric_shape = text
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
        if numeric_shape && text.parse::<f64>().is_ok() {
            return Some(Argument {
                raw: text.to_string(),
                kind: ArgKind::NumericLiteral,
                ty: VarType::Float,
                mutable: false,
            });
        }
        None
    }

    /// Human-readable description used in type-mismatch diagnostics.
    pub fn explain(&self) -> String {
        let access = if self.mutable { "mutable " } else { "" };
        format!("{} is a {}{} of type {}", self.raw, access, self.kind, self.ty)
    }

    // ── Compatibility predicates ─────────────────────────────────────────
    //
    // One per instruction family. `self` is the first operand of the
    // opcode; the remaining operands come in as context. Each predicate
    // matches the closed type union exhaustively.

    /// SET — `self` is a mutable slot of the same declared type as `rhs`.
    pub fn assignment_context(&self, rhs: &Argument) -> bool {
        self.mutable && self.ty == rhs.ty
    }

    /// LR — `self` receives an element of `list`, indexed by int.
    pub fn list_read_context(&self, list: &Argument, idx: &Argument) -> bool {
        match &list.ty {
            VarType::List(elem) => {
                self.mutable && self.ty == **elem && idx.ty == VarType::Int
            }
            VarType::Int | VarType::Float | VarType::Bool => false,
        }
    }

    /// LW — `self` is a mutable list written at an int index with a value
    /// of its element type.
    pub fn list_write_context(&self, idx: &Argument, value: &Argument) -> bool {
        match &self.ty {
            VarType::List(elem) => {
                self.mutable && idx.ty == VarType::Int && value.ty == **elem
            }
            VarType::Int | VarType::Float | VarType::Bool => false,
        }
    }

    /// LEN — `self` is a mutable int, `rhs` a list of any element type.
    pub fn list_length_context(&self, rhs: &Argument) -> bool {
        self.mutable && self.ty == VarType::Int && rhs.ty.is_list()
    }

    /// CLR — `self` is a mutable list.
    pub fn list_clear_context(&self) -> bool {
        self.mutable && self.ty.is_list()
    }

    /// REMEN — `self` is a mutable list, `rhs` an int count.
    pub fn list_n_removal_context(&self, rhs: &Argument) -> bool {
        self.mutable && self.ty.is_list() && rhs.ty == VarType::Int
    }

    /// SUBS — `self` and `src_list` are lists of the same element type,
    /// `num` an int count.
    pub fn list_subset_context(&self, src_list: &Argument, num: &Argument) -> bool {
        match &self.ty {
            VarType::List(_) => {
                self.mutable && self.ty == src_list.ty && num.ty == VarType::Int
            }
            VarType::Int | VarType::Float | VarType::Bool => false,
        }
    }

    /// ADDE / REME — `self` is a mutable list, `rhs` its element type.
    pub fn list_modification_context(&self, rhs: &Argument) -> bool {
        match &self.ty {
            VarType::List(elem) => self.mutable && rhs.ty == **elem,
            VarType::Int | VarType::Float | VarType::Bool => false,
        }
    }

    /// IN / NIN — `self` is a list, `rhs` a value of its element type.
    /// Read-only test, so no mutability requirement.
    pub fn list_inclusion_context(&self, rhs: &Argument) -> bool {
        match &self.ty {
            VarType::List(elem) => rhs.ty == **elem,
            VarType::Int | VarType::Float | VarType::Bool => false,
        }
    }

    /// MOD — all three operands numeric, same declared type, `self` mutable.
    pub fn math_modulo_context(&self, dividend: &Argument, divisor: &Argument) -> bool {
        self.mutable
            && self.ty.is_numeric()
            && dividend.ty == self.ty
            && divisor.ty == self.ty
    }

    /// ADD / SUBT / MULT / DIV — `self` mutable numeric, `rhs` same type.
    pub fn math_context(&self, rhs: &Argument) -> bool {
        self.mutable && self.ty.is_numeric() && rhs.ty == self.ty
    }

    /// ROUND — `self` is a mutable numeric slot.
    pub fn round_number_context(&self) -> bool {
        self.mutable && self.ty.is_numeric()
    }

    /// IGT / IGTEQ / ILT / ILTEQ / WGT / WGTEQ / WLT / WLTEQ — ordered
    /// comparison needs numerics of the same type.
    pub fn ordered_comparison_context(&self, rhs: &Argument) -> bool {
        self.ty.is_numeric() && rhs.ty == self.ty
    }

    /// IEQ / INEQ / WEQ / WNEQ — equality works on any matching scalar type.
    pub fn unordered_comparison_context(&self, rhs: &Argument) -> bool {
        match &self.ty {
            VarType::Int | VarType::Float | VarType::Bool => rhs.ty == self.ty,
            VarType::List(_) => false,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────
