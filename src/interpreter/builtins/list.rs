//! List builtins. Lists are immutable; `append` and `insert` build new
//! ones.

use crate::interpreter::{EvalError, EvalResult, Interpreter, Value};

use super::{expect_arity, list_value, number};

pub fn get(_int: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    expect_arity(&args, 2)?;
    let items = list_value(&args[0])?;
    let index = checked_index(&args[1], items.len())?;
    Ok(items[index].clone())
}

pub fn append(_int: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    expect_arity(&args, 2)?;
    let items = list_value(&args[0])?;
    let mut out = items.to_vec();
    out.push(args[1].clone());
    Ok(Value::list(out))
}

pub fn insert(_int: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    expect_arity(&args, 3)?;
    let items = list_value(&args[0])?;
    let index = clamped_index(&args[1], items.len())?;
    let mut out = items.to_vec();
    out.insert(index, args[2].clone());
    Ok(Value::list(out))
}

/// An index for reading: must be an integer, negative counts from the
/// end, and it has to land inside the list.
fn checked_index(value: &Value, len: usize) -> EvalResult<usize> {
    let index = raw_index(value, len)?;
    if index >= 0 && (index as usize) < len {
        Ok(index as usize)
    } else {
        Err(EvalError::IndexOutOfRange)
    }
}

/// An index for inserting: out-of-range positions clamp to the ends.
fn clamped_index(value: &Value, len: usize) -> EvalResult<usize> {
    let index = raw_index(value, len)?;
    Ok(index.max(0).min(len as i64) as usize)
}

fn raw_index(value: &Value, len: usize) -> EvalResult<i64> {
    let number = number(value)?;
    let index = number.to_i64().ok_or(EvalError::NonIntegerIndex)?;
    if index < 0 {
        Ok(index + len as i64)
    } else {
        Ok(index)
    }
}
