// opcode.rs — Opcode dispatch and handlers
//
// One handler per instruction/directive. Every handler follows the same
// shape: structural precondition → arity → operand resolution → type
// compatibility → IR emission (or graph metadata mutation). Any failure is
// fatal; nothing is mutated before all checks pass.
//
// Preconditions: statements arrive in source order from the parser.
// Postconditions: on Ok, exactly the effects in the opcode table applied.
// Failure modes: context, arity, redefinition, type-mismatch, unknown
//   symbol, unbalanced block — all via `CompileError`.
// Side effects: mutates the threaded `CompileState` only.

use crate::argument::Argument;
use crate::ast::{RawToken, Statement};
use crate::diag::{CompileError, ErrorKind, Result};
use crate::ir::{BlockKind, CmpOp, Instruction, MParams, MathOp};
use crate::state::CompileState;

// ── Dispatch ─────────────────────────────────────────────────────────────

/// Route one statement to its opcode handler.
pub fn dispatch(state: &mut CompileState, stmt: &Statement) -> Result<()> {
    match stmt.opcode.as_str() {
        // Structural directives
        "GRAPH" => graph(state, stmt),
        "EGRAPH" => egraph(state, stmt),
        "ACTION" => action(state, stmt),
        "EACTION" => eaction(state, stmt),
        "SIZE" => size(state, stmt),
        "SCALE" => scale(state, stmt),
        "MPARAMS" => mparams(state, stmt),

        // Action instructions
        "SET" => set(state, stmt),
        "LR" => list_read(state, stmt),
        "LW" => list_write(state, stmt),
        "MOD" => modulo(state, stmt),
        "LEN" => length(state, stmt),
        "ROUND" => round(state, stmt),
        "CLR" => clear(state, stmt),
        "SUBS" => subset(state, stmt),
        "REMEN" => remove_n(state, stmt),
        "ADDE" => add_element(state, stmt),
        "REME" => remove_element(state, stmt),

        "ADD" => math(state, stmt, MathOp::Add),
        "SUBT" => math(state, stmt, MathOp::Subtract),
        "MULT" => math(state, stmt, MathOp::Multiply),
        "DIV" => math(state, stmt, MathOp::Divide),

        // Block openers: conditionals and loops
        "IGT" => block_open(state, stmt, BlockKind::If, CmpOp::Gt),
        "IGTEQ" => block_open(state, stmt, BlockKind::If, CmpOp::Gte),
        "ILT" => block_open(state, stmt, BlockKind::If, CmpOp::Lt),
        "ILTEQ" => block_open(state, stmt, BlockKind::If, CmpOp::Lte),
        "IEQ" => block_open(state, stmt, BlockKind::If, CmpOp::Eq),
        "INEQ" => block_open(state, stmt, BlockKind::If, CmpOp::Neq),
        "WGT" => block_open(state, stmt, BlockKind::While, CmpOp::Gt),
        "WGTEQ" => block_open(state, stmt, BlockKind::While, CmpOp::Gte),
        "WLT" => block_open(state, stmt, BlockKind::While, CmpOp::Lt),
        "WLTEQ" => block_open(state, stmt, BlockKind::While, CmpOp::Lte),
        "WEQ" => block_open(state, stmt, BlockKind::While, CmpOp::Eq),
        "WNEQ" => block_open(state, stmt, BlockKind::While, CmpOp::Neq),

        "IN" => inclusion_block(state, stmt, false),
        "NIN" => inclusion_block(state, stmt, true),

        "EBLOCK" => eblock(state, stmt),

        other => Err(CompileError::new(
            ErrorKind::Parse,
            other,
            format!("unrecognized opcode {:?}", other),
        )
        .with_suggestion("check the opcode spelling; opcodes are upper-case")),
    }
}

// ── Shared checks ────────────────────────────────────────────────────────

/// Fixed positional arity. Checked before any resolution so a wrong token
/// count never reaches the symbol table.
fn operands<'a, const N: usize>(place: &str, stmt: &'a Statement) -> Result<[&'a RawToken; N]> {
    if stmt.args.len() != N {
        return Err(CompileError::new(
            ErrorKind::Arity,
            place,
            format!(
                "{} expects {} operand(s), got {}",
                place,
                N,
                stmt.args.len()
            ),
        ));
    }
    let mut iter = stmt.args.iter();
    Ok(std::array::from_fn(|_| {
        iter.next().expect("internal: length checked above")
    }))
}

fn require_action(state: &CompileState, place: &str) -> Result<()> {
    state.require(
        state.in_action,
        ErrorKind::Context,
        place,
        format!("{} is only valid inside an action", place),
        Some("open an action with ACTION first"),
    )
}

/// Graph metadata directives: in a graph, with no action open.
fn require_graph_meta(state: &CompileState, place: &str) -> Result<()> {
    state.require(
        state.in_graph && !state.in_action,
        ErrorKind::Context,
        place,
        format!("{} is only valid inside a graph, outside any action", place),
        Some("move the directive between GRAPH and the first ACTION"),
    )
}

/// Parse a token as a non-negative integer literal (rejects signs,
/// decimals, and anything symbol-shaped). `u64::from_str` tolerates a
/// leading `+`, so the first character must be a digit.
fn uint_literal(place: &str, what: &str, tok: &RawToken) -> Result<u64> {
    let digit_shaped = tok.text.starts_with(|c: char| c.is_ascii_digit());
    digit_shaped
        .then(|| tok.text.parse::<u64>().ok())
        .flatten()
        .ok_or_else(|| {
            CompileError::new(
                ErrorKind::TypeMismatch,
                place,
                format!(
                    "{} must be a non-negative integer literal, got {:?}",
                    what, tok.text
                ),
            )
        })
}

// ── Structural directives ────────────────────────────────────────────────

fn graph(state: &mut CompileState, stmt: &Statement) -> Result<()> {
    state.require(
        !state.in_graph,
        ErrorKind::Context,
        "GRAPH",
        "GRAPH cannot be nested inside another graph",
        Some("close the previous graph with EGRAPH first"),
    )?;
    operands::<0>("GRAPH", stmt)?;
    state.enter_graph();
    Ok(())
}

fn egraph(state: &mut CompileState, stmt: &Statement) -> Result<()> {
    state.require(
        state.in_graph,
        ErrorKind::Context,
        "EGRAPH",
        "EGRAPH with no open graph",
        None,
    )?;
    operands::<0>("EGRAPH", stmt)?;
    state.exit_graph("EGRAPH")
}

fn action(state: &mut CompileState, stmt: &Statement) -> Result<()> {
    state.require(
        state.in_graph,
        ErrorKind::Context,
        "ACTION",
        "ACTION is only valid inside a graph",
        Some("open a graph with GRAPH first"),
    )?;
    state.require(
        !state.in_action,
        ErrorKind::Context,
        "ACTION",
        "ACTION cannot be nested inside another action",
        Some("close the previous action with EACTION first"),
    )?;
    let [name] = operands::<1>("ACTION", stmt)?;
    let ident_shaped = name
        .text
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    state.require(
        ident_shaped,
        ErrorKind::Parse,
        "ACTION",
        format!("action name must be an identifier, got {:?}", name.text),
        None,
    )?;
    state.enter_action(name.text.clone());
    Ok(())
}

fn eaction(state: &mut CompileState, stmt: &Statement) -> Result<()> {
    require_action(state, "EACTION")?;
    operands::<0>("EACTION", stmt)?;
    state.exit_action("EACTION")
}

fn size(state: &mut CompileState, stmt: &Statement) -> Result<()> {
    require_graph_meta(state, "SIZE")?;
    state.require(
        state.graph().size.is_none(),
        ErrorKind::Redefinition,
        "SIZE",
        "graph size is already set",
        Some("remove the duplicate SIZE directive"),
    )?;
    let [tok] = operands::<1>("SIZE", stmt)?;
    let value = uint_literal("SIZE", "graph size", tok)?;
    state.graph_mut().size = Some(value);
    Ok(())
}

fn scale(state: &mut CompileState, stmt: &Statement) -> Result<()> {
    require_graph_meta(state, "SCALE")?;
    state.require(
        state.graph().scale.is_none(),
        ErrorKind::Redefinition,
        "SCALE",
        "graph scale is already set",
        Some("remove the duplicate SCALE directive"),
    )?;
    let [tok] = operands::<1>("SCALE", stmt)?;
    let value = uint_literal("SCALE", "graph scale", tok)?;
    state.require(
        value > 0,
        ErrorKind::TypeMismatch,
        "SCALE",
        "graph scale must be a positive integer",
        None,
    )?;
    state.graph_mut().scale = Some(value);
    Ok(())
}

fn mparams(state: &mut CompileState, stmt: &Statement) -> Result<()> {
    require_graph_meta(state, "MPARAMS")?;
    state.require(
        state.graph().m_params.is_none(),
        ErrorKind::Redefinition,
        "MPARAMS",
        "graph m-params are already set",
        Some("remove the duplicate MPARAMS directive"),
    )?;
    let [m0_tok, inc_tok] = operands::<2>("MPARAMS", stmt)?;
    let m0 = uint_literal("MPARAMS", "m0", m0_tok)?;
    let m_increment = uint_literal("MPARAMS", "m increment", inc_tok)?;
    state.graph_mut().m_params = Some(MParams { m0, m_increment });
    Ok(())
}

// ── Action instructions ──────────────────────────────────────────────────

fn set(state: &mut CompileState, stmt: &Statement) -> Result<()> {
    require_action(state, "SET")?;
    let [dst_tok, src_tok] = operands::<2>("SET", stmt)?;
    let dst = Argument::resolve(state, "SET", dst_tok)?;
    let src = Argument::resolve(state, "SET", src_tok)?;
    state.require(
        dst.assignment_context(&src),
        ErrorKind::TypeMismatch,
        "SET",
        format!("{}; {}", dst.explain(), src.explain()),
        Some("SET needs a mutable destination of the same type as the source"),
    )?;
    state.emit(Instruction::Set { dst, src });
    Ok(())
}

fn list_read(state: &mut CompileState, stmt: &Statement) -> Result<()> {
    require_action(state, "LR")?;
    let [dst_tok, list_tok, idx_tok] = operands::<3>("LR", stmt)?;
    let dst = Argument::resolve(state, "LR", dst_tok)?;
    let list = Argument::resolve(state, "LR", list_tok)?;
    let idx = Argument::resolve(state, "LR", idx_tok)?;
    state.require(
        dst.list_read_context(&list, &idx),
        ErrorKind::TypeMismatch,
        "LR",
        format!("{}; {}; {}", dst.explain(), list.explain(), idx.explain()),
        Some("LR needs a mutable destination matching the list element type and an int index"),
    )?;
    state.emit(Instruction::ListRead { dst, list, idx });
    Ok(())
}

fn list_write(state: &mut CompileState, stmt: &Statement) -> Result<()> {
    require_action(state, "LW")?;
    let [list_tok, idx_tok, value_tok] = operands::<3>("LW", stmt)?;
    let list = Argument::resolve(state, "LW", list_tok)?;
    let idx = Argument::resolve(state, "LW", idx_tok)?;
    let value = Argument::resolve(state, "LW", value_tok)?;
    state.require(
        list.list_write_context(&idx, &value),
        ErrorKind::TypeMismatch,
        "LW",
        format!("{}; {}; {}", list.explain(), idx.explain(), value.explain()),
        Some("LW needs a mutable list, an int index, and a value of the element type"),
    )?;
    state.emit(Instruction::ListWrite { list, idx, value });
    Ok(())
}

fn modulo(state: &mut CompileState, stmt: &Statement) -> Result<()> {
    require_action(state, "MOD")?;
    let [dst_tok, dividend_tok, divisor_tok] = operands::<3>("MOD", stmt)?;
    let dst = Argument::resolve(state, "MOD", dst_tok)?;
    let dividend = Argument::resolve(state, "MOD", dividend_tok)?;
    let divisor = Argument::resolve(state, "MOD", divisor_tok)?;
    state.require(
        dst.math_modulo_context(&dividend, &divisor),
        ErrorKind::TypeMismatch,
        "MOD",
        format!(
            "{}; {}; {}",
            dst.explain(),
            dividend.explain(),
            divisor.explain()
        ),
        Some("MOD needs three numeric operands of the same type, destination mutable"),
    )?;
    state.emit(Instruction::Modulo {
        dst,
        dividend,
        divisor,
    });
    Ok(())
}

fn length(state: &mut CompileState, stmt: &Statement) -> Result<()> {
    require_action(state, "LEN")?;
    let [dst_tok, list_tok] = operands::<2>("LEN", stmt)?;
    let dst = Argument::resolve(state, "LEN", dst_tok)?;
    let list = Argument::resolve(state, "LEN", list_tok)?;
    state.require(
        dst.list_length_context(&list),
        ErrorKind::TypeMismatch,
        "LEN",
        format!("{}; {}", dst.explain(), list.explain()),
        Some("LEN needs a mutable int destination and a list source"),
    )?;
    state.emit(Instruction::Length { dst, list });
    Ok(())
}

fn round(state: &mut CompileState, stmt: &Statement) -> Result<()> {
    require_action(state, "ROUND")?;
    let [num_tok] = operands::<1>("ROUND", stmt)?;
    let num = Argument::resolve(state, "ROUND", num_tok)?;
    state.require(
        num.round_number_context(),
        ErrorKind::TypeMismatch,
        "ROUND",
        num.explain(),
        Some("ROUND needs a mutable numeric operand"),
    )?;
    state.emit(Instruction::Round { num });
    Ok(())
}

fn clear(state: &mut CompileState, stmt: &Statement) -> Result<()> {
    require_action(state, "CLR")?;
    let [list_tok] = operands::<1>("CLR", stmt)?;
    let list = Argument::resolve(state, "CLR", list_tok)?;
    state.require(
        list.list_clear_context(),
        ErrorKind::TypeMismatch,
        "CLR",
        list.explain(),
        Some("CLR needs a mutable list"),
    )?;
    state.emit(Instruction::Clear { list });
    Ok(())
}

fn subset(state: &mut CompileState, stmt: &Statement) -> Result<()> {
    require_action(state, "SUBS")?;
    let [dst_tok, src_tok, num_tok] = operands::<3>("SUBS", stmt)?;
    let dst_list = Argument::resolve(state, "SUBS", dst_tok)?;
    let src_list = Argument::resolve(state, "SUBS", src_tok)?;
    let num = Argument::resolve(state, "SUBS", num_tok)?;
    state.require(
        dst_list.list_subset_context(&src_list, &num),
        ErrorKind::TypeMismatch,
        "SUBS",
        format!(
            "{}; {}; {}",
            dst_list.explain(),
            src_list.explain(),
            num.explain()
        ),
        Some("SUBS needs two lists of the same element type and an int count"),
    )?;
    state.emit(Instruction::Subset {
        dst_list,
        src_list,
        num,
    });
    Ok(())
}

fn remove_n(state: &mut CompileState, stmt: &Statement) -> Result<()> {
    require_action(state, "REMEN")?;
    let [list_tok, num_tok] = operands::<2>("REMEN", stmt)?;
    let list = Argument::resolve(state, "REMEN", list_tok)?;
    let num = Argument::resolve(state, "REMEN", num_tok)?;
    state.require(
        list.list_n_removal_context(&num),
        ErrorKind::TypeMismatch,
        "REMEN",
        format!("{}; {}", list.explain(), num.explain()),
        Some("REMEN needs a mutable list and an int count"),
    )?;
    state.emit(Instruction::RemoveNElements { list, num });
    Ok(())
}

fn add_element(state: &mut CompileState, stmt: &Statement) -> Result<()> {
    require_action(state, "ADDE")?;
    let [list_tok, elem_tok] = operands::<2>("ADDE", stmt)?;
    let list = Argument::resolve(state, "ADDE", list_tok)?;
    let element = Argument::resolve(state, "ADDE", elem_tok)?;
    state.require(
        list.list_modification_context(&element),
        ErrorKind::TypeMismatch,
        "ADDE",
        format!("{}; {}", list.explain(), element.explain()),
        Some("ADDE needs a mutable list and an element of its type"),
    )?;
    state.emit(Instruction::AddElement { list, element });
    Ok(())
}

fn remove_element(state: &mut CompileState, stmt: &Statement) -> Result<()> {
    require_action(state, "REME")?;
    let [list_tok, elem_tok] = operands::<2>("REME", stmt)?;
    let list = Argument::resolve(state, "REME", list_tok)?;
    let element = Argument::resolve(state, "REME", elem_tok)?;
    state.require(
        list.list_modification_context(&element),
        ErrorKind::TypeMismatch,
        "REME",
        format!("{}; {}", list.explain(), element.explain()),
        Some("REME needs a mutable list and an element of its type"),
    )?;
    state.emit(Instruction::RemoveElement { list, element });
    Ok(())
}

fn math(state: &mut CompileState, stmt: &Statement, op: MathOp) -> Result<()> {
    let place = stmt.opcode.as_str();
    require_action(state, place)?;
    let [dst_tok, rhs_tok] = operands::<2>(place, stmt)?;
    let dst = Argument::resolve(state, place, dst_tok)?;
    let rhs = Argument::resolve(state, place, rhs_tok)?;
    state.require(
        dst.math_context(&rhs),
        ErrorKind::TypeMismatch,
        place,
        format!("{}; {}", dst.explain(), rhs.explain()),
        Some("arithmetic needs a mutable numeric destination and an operand of the same type"),
    )?;
    state.emit(Instruction::Math { op, dst, rhs });
    Ok(())
}

// ── Blocks ───────────────────────────────────────────────────────────────

fn block_open(
    state: &mut CompileState,
    stmt: &Statement,
    kind: BlockKind,
    cmp: CmpOp,
) -> Result<()> {
    let place = stmt.opcode.as_str();
    require_action(state, place)?;
    let [left_tok, right_tok] = operands::<2>(place, stmt)?;
    let left = Argument::resolve(state, place, left_tok)?;
    let right = Argument::resolve(state, place, right_tok)?;
    let ordered = matches!(cmp, CmpOp::Gt | CmpOp::Gte | CmpOp::Lt | CmpOp::Lte);
    let compatible = if ordered {
        left.ordered_comparison_context(&right)
    } else {
        left.unordered_comparison_context(&right)
    };
    state.require(
        compatible,
        ErrorKind::TypeMismatch,
        place,
        format!("{}; {}", left.explain(), right.explain()),
        Some("comparison operands must share a type; ordered comparisons need numerics"),
    )?;
    state.emit(Instruction::Block {
        kind,
        cmp,
        left,
        right,
    });
    state.open_block();
    Ok(())
}

fn inclusion_block(state: &mut CompileState, stmt: &Statement, negated: bool) -> Result<()> {
    let place = stmt.opcode.as_str();
    require_action(state, place)?;
    let [list_tok, elem_tok] = operands::<2>(place, stmt)?;
    let list = Argument::resolve(state, place, list_tok)?;
    let element = Argument::resolve(state, place, elem_tok)?;
    state.require(
        list.list_inclusion_context(&element),
        ErrorKind::TypeMismatch,
        place,
        format!("{}; {}", list.explain(), element.explain()),
        Some("membership tests need a list and a value of its element type"),
    )?;
    state.emit(Instruction::InclusionBlock {
        negated,
        list,
        element,
    });
    state.open_block();
    Ok(())
}

fn eblock(state: &mut CompileState, stmt: &Statement) -> Result<()> {
    // Regardless of whether an action is open, EBLOCK without a matching
    // opener is an unbalanced-block error.
    operands::<0>("EBLOCK", stmt)?;
    let has_open_block = state.in_action && state.action().nested_blocks > 0;
    state.require(
        has_open_block,
        ErrorKind::UnbalancedBlock,
        "EBLOCK",
        "EBLOCK with no open block",
        Some("open a block with a conditional or loop opcode first"),
    )?;
    state.emit(Instruction::BlockEnd);
    state.close_block();
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────────────
