//! Expression evaluation and dotted-path value resolution.

use crate::ast::{BinOp, Expr, UnaryOp};
use crate::error::{Error, Result};
use crate::parser::parse;
use crate::registry::Registry;
use crate::value::{Scope, Value};

/// Resolve a dotted path (`a.b.c`) against the scope, one segment at a time.
///
/// The first segment is a direct scope lookup; each further segment goes
/// through the current value's record capability. A missing key, a missing
/// field, or a non-record intermediate terminates resolution with `Null`;
/// "not found" is never an error here. This is also what gives `x == null`
/// its meaning: `null` is just an identifier that resolves to nothing.
pub fn resolve_path(scope: &Scope, path: &str) -> Value {
    let mut segments = path.split('.');
    let first = match segments.next() {
        Some(s) => s,
        None => return Value::Null,
    };
    let mut current = match scope.get(first) {
        Some(v) => v.clone(),
        None => return Value::Null,
    };
    for segment in segments {
        current = match &current {
            Value::Record(record) => match record.get(segment) {
                Some(v) => v,
                None => return Value::Null,
            },
            _ => return Value::Null,
        };
    }
    current
}

/// Tokenize, parse, and evaluate an expression in one step. The AST is
/// built per call and dropped on return.
pub fn evaluate(input: &str, scope: &Scope, registry: &Registry) -> Result<Value> {
    let expr = parse(input)?;
    Evaluator { scope, registry }.eval(&expr)
}

pub struct Evaluator<'a> {
    pub scope: &'a Scope,
    pub registry: &'a Registry,
}

impl Evaluator<'_> {
    pub fn eval(&self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Binary { op, left, right } => self.eval_binary(*op, left, right),
            Expr::Unary { op: UnaryOp::Not, operand } => {
                match self.eval(operand)? {
                    Value::Bool(b) => Ok(Value::Bool(!b)),
                    other => Err(Error::Eval(format!(
                        "`!` needs a boolean operand, got {:?}",
                        other
                    ))),
                }
            }
            Expr::Ident(path) => Ok(resolve_path(self.scope, path)),
            Expr::Int(n) => Ok(Value::Int(*n)),
            Expr::Float(f) => Ok(Value::Float(*f)),
            Expr::Str(s) => Ok(Value::Text(s.clone())),
            Expr::Dollar(name) => {
                if name == "AUTO" {
                    Ok(Value::Auto)
                } else {
                    // Other $names pass through as raw text shorthand.
                    Ok(Value::Text(format!("${}", name)))
                }
            }
            Expr::Ternary { cond, then, otherwise } => {
                // Only the selected branch is evaluated, so the untaken
                // side can reference values that would fail to resolve.
                match self.eval(cond)? {
                    Value::Bool(true) => self.eval(then),
                    Value::Bool(false) => self.eval(otherwise),
                    other => Err(Error::Eval(format!(
                        "ternary condition must be boolean, got {:?}",
                        other
                    ))),
                }
            }
            Expr::Call { name, args } => {
                let func = self.registry.function(name).ok_or_else(|| {
                    Error::Eval(format!("call to unregistered function `{}`", name))
                })?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                Ok(func(&values))
            }
        }
    }

    fn eval_binary(&self, op: BinOp, left: &Expr, right: &Expr) -> Result<Value> {
        let l = self.eval(left)?;
        let r = self.eval(right)?;
        match op {
            BinOp::And => Ok(Value::Bool(as_bool(&l, "&&")? && as_bool(&r, "&&")?)),
            BinOp::Or => Ok(Value::Bool(as_bool(&l, "||")? || as_bool(&r, "||")?)),
            BinOp::Eq => Ok(Value::Bool(values_equal(&l, &r))),
            BinOp::Ne => Ok(Value::Bool(!values_equal(&l, &r))),
            BinOp::Gt | BinOp::Lt | BinOp::Ge | BinOp::Le => compare_ordered(op, &l, &r),
        }
    }
}

fn as_bool(v: &Value, op: &str) -> Result<bool> {
    match v {
        Value::Bool(b) => Ok(*b),
        other => Err(Error::Eval(format!(
            "`{}` needs boolean operands, got {:?}",
            op, other
        ))),
    }
}

/// Equality: identity for matching primitive kinds, `Null` only equals
/// `Null`, and everything else falls back to comparing text renderings (so
/// `a == '1'` holds when `a` is the text `"1"` or the integer `1`).
fn values_equal(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::Text(a), Value::Text(b)) => a == b,
        (Value::Auto, Value::Auto) => true,
        _ => l.render_text() == r.render_text(),
    }
}

fn compare_ordered(op: BinOp, l: &Value, r: &Value) -> Result<Value> {
    // Boolean pairs order by agreement: equal booleans satisfy any ordering
    // operator, unequal ones satisfy none.
    if let (Value::Bool(a), Value::Bool(b)) = (l, r) {
        return Ok(Value::Bool(a == b));
    }
    let (lf, rf) = match (l.as_f64(), r.as_f64()) {
        (Some(lf), Some(rf)) => (lf, rf),
        _ => {
            return Err(Error::Eval(format!(
                "cannot order {:?} against {:?}",
                l, r
            )))
        }
    };
    let result = match op {
        BinOp::Gt => lf > rf,
        BinOp::Lt => lf < rf,
        BinOp::Ge => lf >= rf,
        BinOp::Le => lf <= rf,
        _ => unreachable!(),
    };
    Ok(Value::Bool(result))
}
