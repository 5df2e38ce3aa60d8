//! Control-flow builtins. They receive their block operands as evaluated
//! code block values and invoke them on demand.

use crate::interpreter::{EvalResult, Interpreter, Value};

use super::{expect_arity, expect_at_least, list_value};

/// Invoke `cond` before every iteration and `action` while it holds;
/// the result is the list of action results.
pub fn while_(int: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    expect_arity(&args, 2)?;
    let mut results = Vec::new();
    loop {
        let condition = int.call(&args[0], Vec::new())?;
        if !condition.truthy() {
            break;
        }
        results.push(int.call(&args[1], Vec::new())?);
    }
    Ok(Value::list(results))
}

/// Select one of two already-evaluated values; nothing is invoked.
pub fn either(_int: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    expect_arity(&args, 3)?;
    if args[0].truthy() {
        Ok(args[1].clone())
    } else {
        Ok(args[2].clone())
    }
}

/// Invoke the chosen branch with no arguments; the branches must be
/// callable, which is what keeps the untaken side lazy.
pub fn if_(int: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    expect_arity(&args, 3)?;
    let branch = if args[0].truthy() { &args[1] } else { &args[2] };
    let branch = branch.clone();
    int.call(&branch, Vec::new())
}

/// Zip the argument lists and invoke the action once per row; the
/// shortest list wins. Returns the list of results.
pub fn foreach(int: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    expect_at_least(&args, 1)?;
    let action = args[0].clone();
    let lists = args[1..]
        .iter()
        .map(|arg| list_value(arg).map(|l| l.clone()))
        .collect::<EvalResult<Vec<_>>>()?;

    if lists.is_empty() {
        return Ok(Value::list(Vec::new()));
    }
    let rows = lists.iter().map(|l| l.len()).min().unwrap_or(0);

    let mut results = Vec::with_capacity(rows);
    for row in 0..rows {
        let row_args = lists.iter().map(|l| l[row].clone()).collect();
        results.push(int.call(&action, row_args)?);
    }
    Ok(Value::list(results))
}

/// Call the first argument with the remaining ones.
pub fn do_(int: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    expect_at_least(&args, 1)?;
    let callee = args[0].clone();
    int.call(&callee, args[1..].to_vec())
}

/// The sequencing builtin `;`: arguments were evaluated in order, the
/// last one is the value.
pub fn seq(_int: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    Ok(args.last().cloned().unwrap_or(Value::Null))
}
