//! Arithmetic expression evaluator (spec §4.7): a column-reference /
//! `+ - * /` tree, compiled once to postfix and walked by a small
//! per-chunk stack machine.

pub mod expression;

pub use expression::{ArithOp, Expr, ExprEvaluator};
