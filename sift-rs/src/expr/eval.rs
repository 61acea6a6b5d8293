//! Tree-walking evaluator.
//!
//! Each node visit increments an explicit depth counter and decrements it on
//! return, so the depth ceiling (default 100) is enforced by the evaluator
//! itself rather than by the native stack.

use std::cmp::Ordering;

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::context::{is_safe_key, Context};
use super::value::Value;
use crate::error::ExprError;

pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Largest numeric index accepted by `object[index]`.
pub const MAX_INDEX: usize = 10_000;

pub struct Evaluator<'c> {
    ctx: &'c Context,
    depth: usize,
    max_depth: usize,
}

impl<'c> Evaluator<'c> {
    pub fn new(ctx: &'c Context) -> Self {
        Evaluator { ctx, depth: 0, max_depth: DEFAULT_MAX_DEPTH }
    }

    pub fn max_depth(mut self, n: usize) -> Self {
        self.max_depth = n;
        self
    }

    pub fn eval(&mut self, expr: &Expr) -> Result<Value, ExprError> {
        if self.depth >= self.max_depth {
            return Err(ExprError::Eval(format!(
                "maximum recursion depth of {} exceeded",
                self.max_depth
            )));
        }
        self.depth += 1;
        let result = self.eval_node(expr);
        self.depth -= 1;
        result
    }

    fn eval_node(&mut self, expr: &Expr) -> Result<Value, ExprError> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),

            Expr::Identifier(name) => {
                if !is_safe_key(name) {
                    return Err(ExprError::Security(format!("access not allowed: {name}")));
                }
                Ok(self.ctx.get(name).cloned().unwrap_or_default())
            }

            Expr::Binary(op, lhs, rhs) => {
                let l = self.eval(lhs)?;
                let r = self.eval(rhs)?;
                eval_binop(*op, l, r)
            }

            Expr::Unary(op, operand) => {
                let v = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!v.truthy()),
                    UnaryOp::Neg => v.arith_neg(),
                })
            }

            Expr::Member(object, property) => {
                let obj = self.eval(object)?;
                Ok(member(&obj, property))
            }

            Expr::Index(object, index) => {
                let obj = self.eval(object)?;
                let idx = self.eval(index)?;
                Ok(lookup_index(&obj, &idx))
            }

            Expr::Conditional(test, consequent, alternate) => {
                if self.eval(test)?.truthy() {
                    self.eval(consequent)
                } else {
                    self.eval(alternate)
                }
            }
        }
    }
}

/// Evaluate `expr` against `ctx` with the default depth ceiling.
pub fn evaluate(expr: &Expr, ctx: &Context) -> Result<Value, ExprError> {
    Evaluator::new(ctx).eval(expr)
}

// ── Operators ─────────────────────────────────────────────────────────────────

fn eval_binop(op: BinaryOp, l: Value, r: Value) -> Result<Value, ExprError> {
    let ord = || l.compare(&r);
    Ok(match op {
        BinaryOp::Eq => Value::Bool(l.loose_eq(&r)),
        BinaryOp::Ne => Value::Bool(!l.loose_eq(&r)),
        BinaryOp::StrictEq => Value::Bool(l.strict_eq(&r)),
        BinaryOp::StrictNe => Value::Bool(!l.strict_eq(&r)),
        BinaryOp::And => {
            if l.truthy() {
                r
            } else {
                l
            }
        }
        BinaryOp::Or => {
            if l.truthy() {
                l
            } else {
                r
            }
        }
        // Absent, null, or NaN on either side: arithmetic is NaN and
        // ordering is always false.
        _ if l.is_void() || r.is_void() => {
            if op.is_arithmetic() {
                Value::Number(f64::NAN)
            } else {
                Value::Bool(false)
            }
        }
        BinaryOp::Add => l.arith_add(&r),
        BinaryOp::Sub => l.arith_sub(&r),
        BinaryOp::Mul => l.arith_mul(&r),
        BinaryOp::Div => l.arith_div(&r)?,
        BinaryOp::Rem => l.arith_rem(&r),
        BinaryOp::Lt => Value::Bool(ord() == Some(Ordering::Less)),
        BinaryOp::Le => Value::Bool(matches!(ord(), Some(Ordering::Less | Ordering::Equal))),
        BinaryOp::Gt => Value::Bool(ord() == Some(Ordering::Greater)),
        BinaryOp::Ge => Value::Bool(matches!(ord(), Some(Ordering::Greater | Ordering::Equal))),
    })
}

// ── Property access ───────────────────────────────────────────────────────────

/// `object.property`; never fails, unsafe or missing properties are absent.
fn member(obj: &Value, property: &str) -> Value {
    if !is_safe_key(property) {
        return Value::Absent;
    }
    match obj {
        Value::Str(s) if property == "length" => Value::Number(s.chars().count() as f64),
        Value::List(items) if property == "length" => Value::Number(items.len() as f64),
        Value::Map(map) => map.get(property).cloned().unwrap_or_default(),
        Value::Host(view) => view.get(property),
        _ => Value::Absent,
    }
}

/// `object[index]`: string keys must be safe, numeric keys must be whole
/// numbers in `0..=MAX_INDEX`.
fn lookup_index(obj: &Value, index: &Value) -> Value {
    let key = match index {
        Value::Str(s) if is_safe_key(s) => s.clone(),
        Value::Number(n) if n.fract() == 0.0 && (0.0..=MAX_INDEX as f64).contains(n) => {
            (*n as usize).to_string()
        }
        _ => return Value::Absent,
    };
    match obj {
        Value::List(items) => match key.parse::<usize>() {
            Ok(i) => items.get(i).cloned().unwrap_or_default(),
            Err(_) if key == "length" => Value::Number(items.len() as f64),
            Err(_) => Value::Absent,
        },
        Value::Map(map) => map.get(&key).cloned().unwrap_or_default(),
        Value::Host(view) => view.get(&key),
        _ => Value::Absent,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
