//! Reference cells: the language's only mutable primitive, read with `!`
//! and written with `<-`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::interpreter::{EvalResult, Interpreter, Value};

use super::{expect_arity, reference_cell};

pub fn reference(_int: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    expect_arity(&args, 1)?;
    Ok(Value::Reference(Rc::new(RefCell::new(args[0].clone()))))
}

/// `!r`: read the cell.
pub fn load(_int: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    expect_arity(&args, 1)?;
    let cell = reference_cell(&args[0])?;
    let value = cell.borrow().clone();
    Ok(value)
}

/// `r <- v`: overwrite the cell, yielding Null.
pub fn store(_int: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    expect_arity(&args, 2)?;
    let cell = reference_cell(&args[0])?;
    *cell.borrow_mut() = args[1].clone();
    Ok(Value::Null)
}
