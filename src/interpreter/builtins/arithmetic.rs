//! Arithmetic builtins: variadic folds over decimal numbers.

use crate::decimal::Decimal;
use crate::interpreter::{EvalError, EvalResult, Interpreter, Value};

use super::{expect_at_least, number};

pub fn add(_int: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    fold(args, |a, b| Ok(a + b))
}

pub fn sub(_int: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    fold(args, |a, b| Ok(a - b))
}

pub fn mul(_int: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    fold(args, |a, b| Ok(a * b))
}

pub fn div(_int: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    fold(args, |a, b| a.checked_div(b).ok_or(EvalError::DivisionByZero))
}

pub fn pow(_int: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    fold(args, |a, b| {
        a.checked_pow(b).ok_or(EvalError::InvalidExponent)
    })
}

fn fold<F>(args: Vec<Value>, op: F) -> EvalResult<Value>
where
    F: Fn(&Decimal, &Decimal) -> EvalResult<Decimal>,
{
    expect_at_least(&args, 1)?;
    let mut accum = number(&args[0])?.clone();
    for arg in &args[1..] {
        accum = op(&accum, number(arg)?)?;
    }
    Ok(Value::Number(accum))
}
