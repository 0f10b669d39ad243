// symbol.rs — Declaration lookup surface
//
// The declaration mechanism itself is external to this crate: some embedder
// (CLI declarations file, test fixture, host application) populates the
// table before compilation. The compiler only consumes typed lookups during
// argument resolution.
//
// Preconditions: populated before `pipeline::compile` runs.
// Postconditions: lookups never mutate the table.
// Failure modes: none (misses surface as UnknownSymbol at resolution).
// Side effects: none.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::argument::VarType;

// ── Symbol ───────────────────────────────────────────────────────────────

/// Declaration category, as supplied by the external mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymbolKind {
    Scalar,
    List,
    /// A named reference to one element of a list (e.g. a reserved dotted
    /// name like `xs.head`). `ty` is the element type.
    ListElement,
}

/// One declared name: its category, declared type, and mutability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub kind: SymbolKind,
    #[serde(rename = "type")]
    pub ty: VarType,
    /// Declared names default to mutable; the embedder can pin reserved
    /// read-only parameters.
    #[serde(default = "default_mutable")]
    pub mutable: bool,
}

fn default_mutable() -> bool {
    true
}

impl Symbol {
    pub fn scalar(ty: VarType) -> Self {
        Symbol {
            kind: SymbolKind::Scalar,
            ty,
            mutable: true,
        }
    }

    pub fn list(elem: VarType) -> Self {
        Symbol {
            kind: SymbolKind::List,
            ty: VarType::List(Box::new(elem)),
            mutable: true,
        }
    }

    pub fn immutable(mut self) -> Self {
        self.mutable = false;
        self
    }
}

// ── Symbol table ─────────────────────────────────────────────────────────

/// Graph-level and action-level declaration scopes.
///
/// Action-scope names shadow graph-scope names while an action is open;
/// outside an action only the graph scope is visible.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolTable {
    #[serde(default)]
    pub graph: HashMap<String, Symbol>,
    #[serde(default)]
    pub action: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_graph(&mut self, name: impl Into<String>, symbol: Symbol) {
        self.graph.insert(name.into(), symbol);
    }

    pub fn declare_action(&mut self, name: impl Into<String>, symbol: Symbol) {
        self.action.insert(name.into(), symbol);
    }

    /// Compact JSON with keys in sorted order, independent of hash-map
    /// iteration order. Used for fingerprinting, never for display.
    pub fn canonical_json(&self) -> String {
        use std::collections::BTreeMap;

        #[derive(Serialize)]
        struct Canonical<'a> {
            graph: BTreeMap<&'a str, &'a Symbol>,
            action: BTreeMap<&'a str, &'a Symbol>,
        }

        let canonical = Canonical {
            graph: self.graph.iter().map(|(k, v)| (k.as_str(), v)).collect(),
            action: self.action.iter().map(|(k, v)| (k.as_str(), v)).collect(),
        };
        serde_json::to_string(&canonical).expect("internal: symbol table serializes")
    }

    /// Typed lookup: action scope first (when visible), then graph scope.
    pub fn resolve(&self, name: &str, action_scope_visible: bool) -> Option<&Symbol> {
        if action_scope_visible {
            if let Some(symbol) = self.action.get(name) {
                return Some(symbol);
            }
        }
        self.graph.get(name)
    }
}
