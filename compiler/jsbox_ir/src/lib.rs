//! jsbox IR - data shared between the parser and the evaluator.
//!
//! This crate contains:
//! - [`CodeSlice`]: a cheap view into one shared source buffer
//! - [`Constants`]: the side tables the constant extractor fills with string,
//!   regex and template literals
//! - [`Node`]: the tagged tree the tree builder produces, one variant per
//!   opcode family, with [`Opcode`] naming every operator the evaluator's
//!   operator table must handle
//! - [`Program`]: an immutable, shareable compiled script
//!
//! # Design Philosophy
//!
//! - **Parse once, run many**: a `Program` is immutable after compilation and
//!   is shared by reference-counting across executions.
//! - **Static operand shapes**: every opcode family has its own variant, so
//!   the evaluator matches exhaustively instead of probing untyped triples.

mod code;
mod constants;
mod node;
mod program;

pub use code::CodeSlice;
pub use constants::{Constants, RegexLiteral, TemplateLiteral};
pub use node::{
    DeclKind, FunctionDef, FunctionKind, Literal, LogicalOp, LoopAction, LoopBinding, LoopIteration,
    LoopNode, Node, ObjectEntry, ObjectKey, Opcode, Param, SwitchCase, SwitchNode, TryNode,
};
pub use program::{DeferredBody, FunctionBody, Program};
