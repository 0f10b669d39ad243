// ir.rs — Typed IR node model
//
// The validated instruction/action/graph entities the opcode handlers
// populate and the downstream code generator consumes. A single tagged
// `Instruction` enum carries exactly the operand tuple each opcode family
// needs, so malformed nodes are unrepresentable.
//
// Preconditions: nodes are built only after all handler validations pass.
// Postconditions: instructions are immutable once constructed; an action's
//   instruction order is exactly source order.
// Failure modes: none (data-only module).
// Side effects: none.

use serde::Serialize;

use crate::argument::Argument;

// ── Graph ────────────────────────────────────────────────────────────────

/// Generation parameters for preferential-attachment wiring: the seed
/// population `m0` and the per-step attachment increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MParams {
    pub m0: u64,
    pub m_increment: u64,
}

/// One simulation graph definition.
///
/// Each of `size`/`scale`/`m_params` is set at most once, and only while
/// the graph scope is open with no action open. `None` means the directive
/// was omitted; no silent defaults are applied here.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Graph {
    pub size: Option<u64>,
    pub scale: Option<u64>,
    pub m_params: Option<MParams>,
    /// Actions closed inside this graph scope, in source order.
    pub actions: Vec<Action>,
}

// ── Action ───────────────────────────────────────────────────────────────

/// A named, ordered instruction script attached to an agent behavior.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Action {
    pub name: String,
    pub instructions: Vec<Instruction>,
    /// Open block depth. Only EBLOCK decrements; never negative.
    #[serde(skip)]
    pub nested_blocks: u32,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Action {
            name: name.into(),
            instructions: Vec::new(),
            nested_blocks: 0,
        }
    }
}

// ── Instruction ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MathOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlockKind {
    If,
    While,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CmpOp {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Neq,
}

/// One executable operation. Each arm owns its operands; no sharing across
/// instructions (every use re-resolves its tokens).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Instruction {
    Set {
        dst: Argument,
        src: Argument,
    },
    ListRead {
        dst: Argument,
        list: Argument,
        idx: Argument,
    },
    ListWrite {
        list: Argument,
        idx: Argument,
        value: Argument,
    },
    Modulo {
        dst: Argument,
        dividend: Argument,
        divisor: Argument,
    },
    Length {
        dst: Argument,
        list: Argument,
    },
    Round {
        num: Argument,
    },
    Clear {
        list: Argument,
    },
    Subset {
        dst_list: Argument,
        src_list: Argument,
        num: Argument,
    },
    RemoveNElements {
        list: Argument,
        num: Argument,
    },
    Math {
        op: MathOp,
        dst: Argument,
        rhs: Argument,
    },
    AddElement {
        list: Argument,
        element: Argument,
    },
    RemoveElement {
        list: Argument,
        element: Argument,
    },
    /// A conditional (`If`) or loop (`While`) block opener. Closed by a
    /// matching `BlockEnd`.
    Block {
        kind: BlockKind,
        cmp: CmpOp,
        left: Argument,
        right: Argument,
    },
    /// Membership-test block opener (IN / NIN). Conditional only; closed
    /// by a matching `BlockEnd`.
    InclusionBlock {
        negated: bool,
        list: Argument,
        element: Argument,
    },
    /// Block terminator emitted by EBLOCK, keeping the flat instruction
    /// list self-delimiting for the code generator.
    BlockEnd,
}
