// aac — Agent Assembly Compiler
//
// Library root. Compiles line-oriented agent assembly units into a
// validated, typed IR of graphs, actions, and instructions.

pub mod argument;
pub mod ast;
pub mod diag;
pub mod ir;
pub mod lexer;
pub mod opcode;
pub mod parser;
pub mod pipeline;
pub mod state;
pub mod symbol;
