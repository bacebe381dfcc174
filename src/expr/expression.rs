//! Expression trees (spec §4.7): `+ - * /` over column leaves, compiled
//! once to postfix, evaluated per chunk by a small stack machine.
//!
//! Grounded in the host's expression system shape (a tree type plus a
//! stateless executor walking it), but narrowed to the spec's literal
//! scope — arithmetic only, no casts, no scalar literals, no functions.

use crate::common::error::{EngineError, EngineResult};
use crate::types::{Chunk, ColumnArray, Schema};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// The expression tree as authored. Leaves are column references by
/// name; internal nodes are one of the four arithmetic operators.
#[derive(Debug, Clone)]
pub enum Expr {
    Column(String),
    BinaryOp { left: Box<Expr>, op: ArithOp, right: Box<Expr> },
}

impl Expr {
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(name.into())
    }

    pub fn binary(left: Expr, op: ArithOp, right: Expr) -> Self {
        Expr::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }
}

enum PostfixToken {
    Column(usize),
    Op(ArithOp),
}

/// A compiled expression: column references resolved to indices once at
/// construction, ready to be walked against any chunk of the same
/// schema (spec §4.7 "converted to postfix at initialization").
pub struct ExprEvaluator {
    postfix: Vec<PostfixToken>,
}

impl ExprEvaluator {
    pub fn compile(expr: &Expr, schema: &Schema) -> EngineResult<Self> {
        let mut postfix = Vec::new();
        Self::walk(expr, schema, &mut postfix)?;
        Ok(Self { postfix })
    }

    fn walk(expr: &Expr, schema: &Schema, out: &mut Vec<PostfixToken>) -> EngineResult<()> {
        match expr {
            Expr::Column(name) => {
                out.push(PostfixToken::Column(schema.require_index(name)?));
                Ok(())
            }
            Expr::BinaryOp { left, op, right } => {
                Self::walk(left, schema, out)?;
                Self::walk(right, schema, out)?;
                out.push(PostfixToken::Op(*op));
                Ok(())
            }
        }
    }

    /// Evaluate against one chunk, producing an output array for that
    /// chunk (spec §4.7 "`evaluate(chunk_id)`").
    pub fn evaluate(&self, chunk: &Chunk) -> EngineResult<ColumnArray> {
        let mut stack: Vec<ColumnArray> = Vec::new();
        for token in &self.postfix {
            match token {
                PostfixToken::Column(idx) => stack.push(chunk.column(*idx).clone()),
                PostfixToken::Op(op) => {
                    let right = stack.pop().ok_or_else(stack_underflow)?;
                    let left = stack.pop().ok_or_else(stack_underflow)?;
                    stack.push(apply_binary(&left, &right, *op)?);
                }
            }
        }
        stack.pop().ok_or_else(stack_underflow)
    }
}

fn stack_underflow() -> EngineError {
    EngineError::Internal("expression stack underflow".to_string())
}

/// No implicit type conversion (spec §4.7): both operands must already
/// share a numeric variant.
fn apply_binary(left: &ColumnArray, right: &ColumnArray, op: ArithOp) -> EngineResult<ColumnArray> {
    match (left, right) {
        (ColumnArray::Int64(a), ColumnArray::Int64(b)) => {
            Ok(ColumnArray::Int64(zip_apply(a, b, |x, y| apply_int_op(x, y, op))))
        }
        (ColumnArray::Int32(a), ColumnArray::Int32(b)) => {
            Ok(ColumnArray::Int32(zip_apply(a, b, |x, y| apply_int_op(x as i64, y as i64, op) as i32)))
        }
        (ColumnArray::Float64(a), ColumnArray::Float64(b)) => {
            Ok(ColumnArray::Float64(zip_apply(a, b, |x, y| apply_float_op(x, y, op))))
        }
        (ColumnArray::Float32(a), ColumnArray::Float32(b)) => {
            Ok(ColumnArray::Float32(zip_apply(a, b, |x, y| apply_float_op(x as f64, y as f64, op) as f32)))
        }
        _ => Err(EngineError::TypeMismatch {
            operator: "expr_binary",
            column: "<expression>".to_string(),
            expected: format!("{:?}", left_variant_name(left)),
            found: format!("{:?}", left_variant_name(right)),
        }),
    }
}

fn left_variant_name(array: &ColumnArray) -> &'static str {
    match array {
        ColumnArray::Boolean(_) => "Boolean",
        ColumnArray::Int8(_) => "Int8",
        ColumnArray::Int16(_) => "Int16",
        ColumnArray::Int32(_) => "Int32",
        ColumnArray::Int64(_) => "Int64",
        ColumnArray::UInt8(_) => "UInt8",
        ColumnArray::UInt16(_) => "UInt16",
        ColumnArray::UInt32(_) => "UInt32",
        ColumnArray::UInt64(_) => "UInt64",
        ColumnArray::Float32(_) => "Float32",
        ColumnArray::Float64(_) => "Float64",
        ColumnArray::Utf8 { .. } => "Utf8",
        ColumnArray::FixedBinary { .. } => "FixedBinary",
    }
}

fn zip_apply<T: Copy>(a: &[T], b: &[T], f: impl Fn(T, T) -> T) -> Vec<T> {
    a.iter().zip(b.iter()).map(|(&x, &y)| f(x, y)).collect()
}

fn apply_int_op(x: i64, y: i64, op: ArithOp) -> i64 {
    match op {
        ArithOp::Add => x.wrapping_add(y),
        ArithOp::Sub => x.wrapping_sub(y),
        ArithOp::Mul => x.wrapping_mul(y),
        ArithOp::Div => x.checked_div(y).unwrap_or(0),
    }
}

fn apply_float_op(x: f64, y: f64, op: ArithOp) -> f64 {
    match op {
        ArithOp::Add => x + y,
        ArithOp::Sub => x - y,
        ArithOp::Mul => x * y,
        ArithOp::Div => x / y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Field, LogicalType, Schema};

    fn make_chunk() -> Chunk {
        Chunk::new(vec![ColumnArray::Int64(vec![10, 20, 30]), ColumnArray::Int64(vec![1, 2, 3])]).unwrap()
    }

    fn schema() -> Schema {
        Schema::new(vec![Field::new("a", LogicalType::Int64), Field::new("b", LogicalType::Int64)])
    }

    #[test]
    fn evaluates_addition_elementwise() {
        let expr = Expr::binary(Expr::column("a"), ArithOp::Add, Expr::column("b"));
        let evaluator = ExprEvaluator::compile(&expr, &schema()).unwrap();
        let out = evaluator.evaluate(&make_chunk()).unwrap();
        match out {
            ColumnArray::Int64(v) => assert_eq!(v, vec![11, 22, 33]),
            _ => panic!("expected int64"),
        }
    }

    #[test]
    fn mismatched_types_are_fatal() {
        let chunk = Chunk::new(vec![
            ColumnArray::Int64(vec![1, 2]),
            ColumnArray::Float64(vec![1.0, 2.0]),
        ])
        .unwrap();
        let schema = Schema::new(vec![Field::new("a", LogicalType::Int64), Field::new("b", LogicalType::Float64)]);
        let expr = Expr::binary(Expr::column("a"), ArithOp::Add, Expr::column("b"));
        let evaluator = ExprEvaluator::compile(&expr, &schema).unwrap();
        assert!(evaluator.evaluate(&chunk).is_err());
    }

    #[test]
    fn division_by_zero_is_deterministic_zero() {
        let expr = Expr::binary(Expr::column("a"), ArithOp::Div, Expr::column("zero"));
        let chunk = Chunk::new(vec![ColumnArray::Int64(vec![10]), ColumnArray::Int64(vec![0])]).unwrap();
        let schema = Schema::new(vec![Field::new("a", LogicalType::Int64), Field::new("zero", LogicalType::Int64)]);
        let evaluator = ExprEvaluator::compile(&expr, &schema).unwrap();
        match evaluator.evaluate(&chunk).unwrap() {
            ColumnArray::Int64(v) => assert_eq!(v, vec![0]),
            _ => panic!("expected int64"),
        }
    }
}
