// f-lang -- an interpreter and compiler for the F language
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! I/O builtins: printing and scoped file access.

use std::fs::OpenOptions;
use std::io::Write;

use crate::interpreter::{EvalError, EvalResult, FileHandle, Interpreter, Value};

use super::{expect_arity, file_handle, string};

/// Print all arguments separated by spaces, followed by a newline.
pub fn print(_int: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    let line = args
        .iter()
        .map(|arg| arg.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    println!("{}", line);
    Ok(Value::Null)
}

pub fn write_line(_int: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    expect_arity(&args, 2)?;
    let handle = file_handle(&args[0])?;
    let line = string(&args[1])?;
    let mut guard = handle.0.borrow_mut();
    let file = guard.as_mut().ok_or(EvalError::ClosedFile)?;
    writeln!(file, "{}", line).map_err(|e| EvalError::Io(e.to_string()))?;
    Ok(Value::Null)
}

/// `withOpenFile action path mode`: open the file, invoke the action with
/// the handle, and close the file on every exit path. A handle that
/// escapes the action is left closed.
pub fn with_open_file(int: &mut Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    expect_arity(&args, 3)?;
    let action = args[0].clone();
    let path = string(&args[1])?.to_string();
    let mode = string(&args[2])?.to_string();

    let file = match mode.as_str() {
        "r" => OpenOptions::new().read(true).open(&path),
        "w" => OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path),
        "a" => OpenOptions::new().append(true).create(true).open(&path),
        other => return Err(EvalError::InvalidFileMode(other.to_owned())),
    }
    .map_err(|e| EvalError::Io(e.to_string()))?;

    let handle = FileHandle::new(file);
    let result = int.call(&action, vec![Value::File(handle.clone())]);
    // closing is unconditional, dropping the file flushes it
    handle.0.borrow_mut().take();
    result
}
