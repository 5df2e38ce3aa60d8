//! The built-in registry: a process-wide table populated once at startup
//! and then frozen. It is handed to every evaluator as a shared immutable
//! map; user code can shadow a builtin name in a frame, but never rebind
//! the registry entry itself.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::decimal::Decimal;

use super::value::{Builtin, BuiltinFn, FileHandle, Value};
use super::{EvalError, EvalResult};

pub mod arithmetic;
pub mod control;
pub mod io;
pub mod list;
pub mod logic;
pub mod reference;
pub mod relational;

pub struct Builtins {
    table: HashMap<&'static str, Value>,
}

impl Builtins {
    /// Build the standard registry. `argv` becomes the top-level `...`
    /// binding (the command-line arguments as strings).
    pub fn standard(argv: Vec<String>) -> Rc<Builtins> {
        let prim: &[(&'static str, BuiltinFn)] = &[
            // arithmetic
            ("+", arithmetic::add),
            ("-", arithmetic::sub),
            ("*", arithmetic::mul),
            ("/", arithmetic::div),
            ("**", arithmetic::pow),
            // comparison
            ("=", relational::eq),
            ("!=", relational::ne),
            (">", relational::gt),
            (">=", relational::ge),
            ("<", relational::lt),
            ("<=", relational::le),
            // logic
            ("not", logic::not),
            ("and", logic::all),
            ("all", logic::all),
            ("or", logic::any),
            ("any", logic::any),
            // control
            ("while", control::while_),
            ("either", control::either),
            ("if", control::if_),
            ("foreach", control::foreach),
            ("do", control::do_),
            (";", control::seq),
            // references
            ("reference", reference::reference),
            ("!", reference::load),
            ("<-", reference::store),
            // lists
            ("get", list::get),
            ("append", list::append),
            ("insert", list::insert),
            // I/O
            ("print", io::print),
            ("writeLine", io::write_line),
            ("withOpenFile", io::with_open_file),
        ];

        let mut table = HashMap::new();
        for &(name, run) in prim {
            table.insert(name, Value::Builtin(Builtin { name, run }));
        }
        table.insert("true", Value::Bool(true));
        table.insert("false", Value::Bool(false));
        table.insert("Null", Value::Null);
        table.insert(
            "...",
            Value::list(argv.into_iter().map(|a| Value::Str(a.into())).collect()),
        );
        Rc::new(Builtins { table })
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.table.get(name)
    }
}

// Argument helpers shared by the builtin modules.

pub(crate) fn expect_arity(args: &[Value], expected: usize) -> EvalResult<()> {
    if args.len() != expected {
        Err(EvalError::Arity {
            expected,
            at_least: false,
            got: args.len(),
        })
    } else {
        Ok(())
    }
}

pub(crate) fn expect_at_least(args: &[Value], expected: usize) -> EvalResult<()> {
    if args.len() < expected {
        Err(EvalError::Arity {
            expected,
            at_least: true,
            got: args.len(),
        })
    } else {
        Ok(())
    }
}

pub(crate) fn number(value: &Value) -> EvalResult<&Decimal> {
    match value {
        Value::Number(n) => Ok(n),
        other => Err(EvalError::Type {
            expected: "number",
            got: other.type_name(),
        }),
    }
}

pub(crate) fn string(value: &Value) -> EvalResult<&Rc<str>> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(EvalError::Type {
            expected: "string",
            got: other.type_name(),
        }),
    }
}

pub(crate) fn list_value(value: &Value) -> EvalResult<&Rc<[Value]>> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(EvalError::Type {
            expected: "list",
            got: other.type_name(),
        }),
    }
}

pub(crate) fn reference_cell(value: &Value) -> EvalResult<&Rc<RefCell<Value>>> {
    match value {
        Value::Reference(cell) => Ok(cell),
        other => Err(EvalError::Type {
            expected: "reference",
            got: other.type_name(),
        }),
    }
}

pub(crate) fn file_handle(value: &Value) -> EvalResult<&FileHandle> {
    match value {
        Value::File(handle) => Ok(handle),
        other => Err(EvalError::Type {
            expected: "file",
            got: other.type_name(),
        }),
    }
}
