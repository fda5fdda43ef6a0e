//! Lowered syntax: the arena AST the semantic passes work on.

pub mod ast;
pub mod lower;

pub use ast::{
    ArithOp, Ast, AstFlags, AstId, AstKind, AstNode, BinaryOp, ImportTarget, PostfixOp,
    PredefinedType, Signature, UnaryOp, dotted_name,
};
pub use lower::{LowerError, lower};
