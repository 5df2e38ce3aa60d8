//! Logical builtins. Arguments arrive already evaluated; an argument
//! that happens to be a zero-argument code block is invoked lazily,
//! which is what makes the short-circuit idioms work.

use crate::interpreter::{BlockValue, EvalResult, Interpreter, Value};

use super::expect_arity;

pub fn not(_int: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    expect_arity(&args, 1)?;
    Ok(Value::Bool(!args[0].truthy()))
}

/// `and` / `all`: true unless any argument is falsy; stops at the first
/// falsy one.
pub fn all(int: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    for arg in &args {
        if !lazy_truthy(int, arg)? {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

/// `or` / `any`: false unless any argument is truthy; stops at the first
/// truthy one.
pub fn any(int: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    for arg in &args {
        if lazy_truthy(int, arg)? {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

/// Truthiness, invoking blocks that can be called without arguments.
fn lazy_truthy(int: &mut Interpreter, value: &Value) -> EvalResult<bool> {
    if let Value::Block(block) = value {
        let callable_without_args = match &**block {
            BlockValue::Source { code, .. } => code.params.is_empty(),
            BlockValue::Compiled { code, .. } => code.takes_no_fixed_params(),
        };
        if callable_without_args {
            let result = int.call(value, Vec::new())?;
            return Ok(result.truthy());
        }
    }
    Ok(value.truthy())
}
