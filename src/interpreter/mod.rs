// f-lang -- an interpreter and compiler for the F language
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! The tree-walking interpreter: evaluates the AST against a chain of
//! frames, dispatching free names through the builtin registry.

use std::fmt;
use std::rc::Rc;

use log::warn;

use crate::ast_compiler;
use crate::decimal::Decimal;
use crate::lang::ast::{Block, Expr, Module};

pub mod builtins;
pub mod value;

pub use builtins::Builtins;
pub use value::{BlockValue, Builtin, BuiltinFn, FileHandle, Frame, FrameRef, Value};

pub type EvalResult<T> = Result<T, EvalError>;

#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// The name is not bound in any frame nor in the registry.
    Undefined(String),
    /// Rebinding of a name within the same frame.
    AlreadyBound(String),
    /// Tried to call something that cannot be called.
    Uncallable(&'static str),
    /// An operand had the wrong shape.
    Type {
        expected: &'static str,
        got: &'static str,
    },
    /// Wrong number of arguments in a call.
    Arity {
        expected: usize,
        at_least: bool,
        got: usize,
    },
    /// A numeric literal that does not parse.
    InvalidNumber(String),
    /// A list index with a fractional part.
    NonIntegerIndex,
    /// A list index outside the list.
    IndexOutOfRange,
    DivisionByZero,
    /// `**` with a fractional exponent.
    InvalidExponent,
    /// `...expr` outside of an argument or list position.
    SpliceOutsideCall,
    /// A file handle used after its `withOpenFile` action returned.
    ClosedFile,
    InvalidFileMode(String),
    /// An operating system error from one of the I/O builtins.
    Io(String),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Undefined(name) => write!(f, "NameError: name '{}' is not defined", name),
            EvalError::AlreadyBound(name) => write!(f, "NameError: '{}' is already taken", name),
            EvalError::Uncallable(what) => write!(f, "TypeError: a {} is not callable", what),
            EvalError::Type { expected, got } => {
                write!(f, "TypeError: expected a {}, got a {}", expected, got)
            }
            EvalError::Arity {
                expected,
                at_least,
                got,
            } => write!(
                f,
                "ValueError: not enough arguments (expected {}{}, got {})",
                if *at_least { "at least " } else { "" },
                expected,
                got
            ),
            EvalError::InvalidNumber(lexeme) => {
                write!(f, "ValueError: invalid number literal '{}'", lexeme)
            }
            EvalError::NonIntegerIndex => write!(f, "ValueError: list index must be an integer"),
            EvalError::IndexOutOfRange => write!(f, "ValueError: list index out of range"),
            EvalError::DivisionByZero => write!(f, "ValueError: division by zero"),
            EvalError::InvalidExponent => write!(f, "ValueError: exponent must be an integer"),
            EvalError::SpliceOutsideCall => {
                write!(f, "ValueError: '...' splice outside of a call")
            }
            EvalError::ClosedFile => write!(f, "ValueError: file handle is closed"),
            EvalError::InvalidFileMode(mode) => {
                write!(f, "ValueError: invalid file mode '{}'", mode)
            }
            EvalError::Io(message) => write!(f, "IOError: {}", message),
        }
    }
}

impl std::error::Error for EvalError {}

pub struct Interpreter {
    /// The frozen registry resolving free names.
    builtins: Rc<Builtins>,
    /// Points to the current innermost frame.
    frame: FrameRef,
}

impl Interpreter {
    pub fn new(builtins: Rc<Builtins>) -> Self {
        Self {
            builtins,
            frame: Frame::new().into_ref(),
        }
    }

    pub fn builtins(&self) -> &Rc<Builtins> {
        &self.builtins
    }

    pub fn current_frame(&self) -> FrameRef {
        Rc::clone(&self.frame)
    }

    /// Create a new innermost frame for bindings.
    pub fn push_frame(&mut self) {
        self.frame = Frame::nest(Rc::clone(&self.frame)).into_ref();
    }

    /// Remove the innermost frame and all its bindings.
    pub fn pop_frame(&mut self) {
        let parent = self.frame.borrow().parent();
        if let Some(parent) = parent {
            self.frame = parent;
        } else {
            warn!("trying to pop the root frame");
        }
    }

    pub fn eval_module(&mut self, module: &Module) -> EvalResult<Value> {
        self.eval_statements(&module.statements)
    }

    /// Evaluate statements in order in the current frame; the result is
    /// the value of the last statement, or Null if there is none.
    pub fn eval_statements(&mut self, statements: &[Expr]) -> EvalResult<Value> {
        let mut result = Value::Null;
        for statement in statements {
            result = self.eval(statement)?;
        }
        Ok(result)
    }

    pub fn eval(&mut self, expr: &Expr) -> EvalResult<Value> {
        match expr {
            Expr::Number(lexeme) => parse_number(lexeme).map(Value::Number),
            Expr::Str(s) => Ok(Value::Str(s.as_str().into())),
            Expr::Name(name) => self.lookup(name),
            Expr::Call { func, args } => {
                let callee = self.eval(func)?;
                let arguments = self.eval_arguments(args)?;
                self.call(&callee, arguments)
            }
            Expr::List(items) => Ok(Value::List(self.eval_arguments(items)?.into())),
            Expr::Variadic(_) => Err(EvalError::SpliceOutsideCall),
            // Evaluating a block literal captures the frame that is
            // active right now; two evaluations capture different frames.
            Expr::Block(code) => Ok(Value::Block(Rc::new(BlockValue::Source {
                code: Rc::clone(code),
                captured: Some(Rc::clone(&self.frame)),
            }))),
            Expr::Assign { name, value } => {
                let value = self.eval(value)?;
                self.bind(name, value.clone())?;
                Ok(value)
            }
        }
    }

    /// Bind a name in the current frame.
    pub fn bind(&mut self, name: &str, value: Value) -> EvalResult<()> {
        if self
            .frame
            .borrow_mut()
            .define(name.to_owned(), value)
            .is_some()
        {
            Err(EvalError::AlreadyBound(name.to_owned()))
        } else {
            Ok(())
        }
    }

    /// Resolve a name against the frame chain, falling back to the
    /// builtin registry for free names.
    pub fn lookup(&self, name: &str) -> EvalResult<Value> {
        if let Some(value) = self.frame.borrow().lookup(name) {
            return Ok(value);
        }
        self.builtins
            .lookup(name)
            .cloned()
            .ok_or_else(|| EvalError::Undefined(name.to_owned()))
    }

    /// Evaluate arguments left to right, splicing each `...e` by
    /// expanding the list it evaluates to.
    fn eval_arguments(&mut self, args: &[Expr]) -> EvalResult<Vec<Value>> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            if let Expr::Variadic(inner) = arg {
                match self.eval(inner)? {
                    Value::List(items) => out.extend(items.iter().cloned()),
                    other => {
                        return Err(EvalError::Type {
                            expected: "list",
                            got: other.type_name(),
                        })
                    }
                }
            } else {
                out.push(self.eval(arg)?);
            }
        }
        Ok(out)
    }

    /// Invoke a callable with already-evaluated arguments.
    pub fn call(&mut self, callee: &Value, args: Vec<Value>) -> EvalResult<Value> {
        match callee {
            Value::Builtin(builtin) => (builtin.run)(self, args),
            Value::Block(block) => match &**block {
                BlockValue::Source { code, captured } => {
                    self.call_source_block(code, captured.clone(), args)
                }
                BlockValue::Compiled { code, captured } => {
                    ast_compiler::call_block(self, code, captured, args)
                }
            },
            other => Err(EvalError::Uncallable(other.type_name())),
        }
    }

    fn call_source_block(
        &mut self,
        code: &Rc<Block>,
        captured: Option<FrameRef>,
        args: Vec<Value>,
    ) -> EvalResult<Value> {
        // Blocks that were never evaluated have no captured frame and
        // run in a fresh child of the current frame.
        let parent = captured.unwrap_or_else(|| Rc::clone(&self.frame));
        let frame = Frame::nest(parent).into_ref();
        bind_arguments(&frame, code, args)?;

        let saved = std::mem::replace(&mut self.frame, frame);
        let result = self.eval_block_body(code);
        self.frame = saved;
        result
    }

    fn eval_block_body(&mut self, code: &Block) -> EvalResult<Value> {
        for statement in &code.statements {
            self.eval(statement)?;
        }
        match &code.ret {
            Some(ret) => self.eval(ret),
            None => Ok(Value::Null),
        }
    }
}

/// Bind call arguments to the parameters of a block, splitting around the
/// variadic parameter if there is one.
fn bind_arguments(frame: &FrameRef, code: &Block, args: Vec<Value>) -> EvalResult<()> {
    let mut frame = frame.borrow_mut();
    let mut define = |name: &str, value: Value| -> EvalResult<()> {
        if frame.define(name.to_owned(), value).is_some() {
            Err(EvalError::AlreadyBound(name.to_owned()))
        } else {
            Ok(())
        }
    };

    match &code.variadic {
        None => {
            if args.len() != code.params.len() {
                return Err(EvalError::Arity {
                    expected: code.params.len(),
                    at_least: false,
                    got: args.len(),
                });
            }
            for (param, arg) in code.params.iter().zip(args) {
                define(param, arg)?;
            }
        }
        Some((index, name)) => {
            let pre = &code.params[..*index];
            let post = &code.params[*index..];
            if args.len() < pre.len() + post.len() {
                return Err(EvalError::Arity {
                    expected: pre.len() + post.len(),
                    at_least: true,
                    got: args.len(),
                });
            }
            let middle = args[pre.len()..args.len() - post.len()].to_vec();
            for (param, arg) in pre.iter().zip(&args[..pre.len()]) {
                define(param, arg.clone())?;
            }
            for (param, arg) in post.iter().zip(&args[args.len() - post.len()..]) {
                define(param, arg.clone())?;
            }
            define(name, Value::list(middle))?;
        }
    }
    Ok(())
}

pub(crate) fn parse_number(lexeme: &str) -> EvalResult<Decimal> {
    lexeme
        .parse()
        .map_err(|_| EvalError::InvalidNumber(lexeme.to_owned()))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lang::parse_module;

    fn int(i: i64) -> Value {
        Value::Number(Decimal::from_int(i))
    }

    fn ints(values: &[i64]) -> Value {
        Value::list(values.iter().copied().map(int).collect())
    }

    fn eval_program(input: &str) -> Vec<EvalResult<Value>> {
        let module = parse_module(input).unwrap();
        let mut interp = Interpreter::new(Builtins::standard(Vec::new()));
        module.statements.iter().map(|s| interp.eval(s)).collect()
    }

    /// Evaluate all statements and compare the value of the last one.
    fn expect_last(input: &str, expected: Value) {
        let results = eval_program(input);
        let last = results.last().expect("program is empty");
        assert_eq!(last.as_ref(), Ok(&expected), "\nprogram: {}", input);
    }

    fn expect_last_error(input: &str, expected: EvalError) {
        let results = eval_program(input);
        let last = results.last().expect("program is empty");
        assert_eq!(last.as_ref().err(), Some(&expected), "\nprogram: {}", input);
    }

    #[test]
    fn arithmetic() {
        expect_last("1 + 2", int(3));
        expect_last("7 - 2 - 1", int(4));
        expect_last("2 ** 10", int(1024));
        expect_last("1 / 4", Value::Number("0.25".parse().unwrap()));
        expect_last("2 * 3 * 4", int(24));
        expect_last_error("1 / 0", EvalError::DivisionByZero);
        expect_last_error("2 ** 0.5", EvalError::InvalidExponent);
        expect_last_error(
            "1 + \"x\"",
            EvalError::Type {
                expected: "number",
                got: "string",
            },
        );
    }

    #[test]
    fn assignment_yields_and_is_single() {
        let results = eval_program("x := 1; x; x := 2");
        assert_eq!(results[0], Ok(int(1)));
        assert_eq!(results[1], Ok(int(1)));
        assert_eq!(results[2], Err(EvalError::AlreadyBound("x".into())));
    }

    #[test]
    fn names_and_calls() {
        expect_last_error("nosuch", EvalError::Undefined("nosuch".into()));
        expect_last_error("1 2", EvalError::Uncallable("number"));
        // shadowing a builtin name is fine
        expect_last("print := 5; print", int(5));
    }

    #[test]
    fn comparisons() {
        expect_last("1 = 1.0", Value::Bool(true));
        expect_last("\"a\" = \"a\"", Value::Bool(true));
        expect_last("{1, 2} = {1, 2}", Value::Bool(true));
        expect_last("[|x| x] = [|x| x]", Value::Bool(false));
        expect_last("b := [1]; b = b", Value::Bool(true));
        expect_last("1 != 2", Value::Bool(true));
        expect_last("2 >= 2", Value::Bool(true));
        expect_last("1 > 2", Value::Bool(false));
    }

    #[test]
    fn closures_capture_the_evaluation_frame() {
        // two evaluations of the same literal capture different frames
        expect_last(
            "counter := [|n| r := reference n; [r <- (!r + 1); !r]]; \
             c1 := counter 0; c2 := counter 10; \
             {do c1, do c1, do c2, do c1}",
            ints(&[1, 2, 11, 3]),
        );
    }

    #[test]
    fn closure_capture_scenario() {
        expect_last(
            "make := [|x| [|y| x + y]]; add3 := make 3; {add3 4, add3 10}",
            ints(&[7, 13]),
        );
    }

    #[test]
    fn factorial_with_references() {
        expect_last(
            "factorial := [|n| total := reference 1; i := reference n; \
             while [!i > 0] [total <- (!total * !i); i <- (!i - 1)]; !total]; \
             factorial 5",
            int(120),
        );
    }

    #[test]
    fn while_collects_results() {
        expect_last(
            "i := reference 3; while [!i > 0] [i <- (!i - 1); !i]",
            ints(&[2, 1, 0]),
        );
    }

    #[test]
    fn logic_short_circuits_blocks() {
        expect_last(
            "c := reference 0; t := [c <- (!c + 1); true]; or false t; !c",
            int(1),
        );
        expect_last(
            "c := reference 0; t := [c <- (!c + 1); true]; or true t; !c",
            int(0),
        );
        expect_last("and false [print \"nope\"]", Value::Bool(false));
        expect_last("not Null", Value::Bool(true));
        expect_last("not 0", Value::Bool(false));
        expect_last("any false Null true", Value::Bool(true));
        expect_last("all true true", Value::Bool(true));
    }

    #[test]
    fn variadic_parameters() {
        expect_last(
            "f := [|a ...r b| {a, r, b}]; f 1 2 3 4",
            Value::list(vec![int(1), ints(&[2, 3]), int(4)]),
        );
        expect_last("g := [|...| ...]; g 1 2", ints(&[1, 2]));
        expect_last_error(
            "h := [|x| x]; h 1 2",
            EvalError::Arity {
                expected: 1,
                at_least: false,
                got: 2,
            },
        );
        expect_last_error(
            "f := [|a ...r b| r]; f 1",
            EvalError::Arity {
                expected: 2,
                at_least: true,
                got: 1,
            },
        );
    }

    #[test]
    fn variadic_splice() {
        expect_last("xs := {1, 2}; do [|a b c| a + b + c] ...xs 3", int(6));
        expect_last("xs := {1, 2}; {0, ...xs}", ints(&[0, 1, 2]));
        expect_last_error(
            "do [||] ...1",
            EvalError::Type {
                expected: "list",
                got: "number",
            },
        );
    }

    #[test]
    fn control_builtins() {
        expect_last("either true 1 2", int(1));
        expect_last("either Null 1 2", int(2));
        expect_last("if true [1] [2]", int(1));
        expect_last("if false [1] [2]", int(2));
        expect_last_error("if true 1 2", EvalError::Uncallable("number"));
        expect_last("foreach [|a b| a + b] {1, 2} {10, 20, 30}", ints(&[11, 22]));
        expect_last("(1; 2; 3)", int(3));
    }

    #[test]
    fn list_builtins() {
        expect_last("get {1, 2, 3} 1", int(2));
        expect_last("get {1, 2, 3} (0 - 1)", int(3));
        expect_last_error("get {1} 1.5", EvalError::NonIntegerIndex);
        expect_last_error("get {1} 5", EvalError::IndexOutOfRange);
        expect_last("append {1} 2", ints(&[1, 2]));
        expect_last("insert {1, 3} 1 2", ints(&[1, 2, 3]));
    }

    #[test]
    fn argv_is_bound_to_dots() {
        let module = parse_module("...").unwrap();
        let mut interp =
            Interpreter::new(Builtins::standard(vec!["a".to_owned(), "b".to_owned()]));
        let result = interp.eval_module(&module).unwrap();
        assert_eq!(
            result,
            Value::list(vec![Value::string("a"), Value::string("b")])
        );
    }

    /// Programs running on top of the real standard library.
    fn expect_with_stdlib(input: &str, expected: Value) {
        let stdlib = parse_module(include_str!("../../stdlib.f")).unwrap();
        let mut interp = Interpreter::new(Builtins::standard(Vec::new()));
        interp.eval_module(&stdlib).expect("stdlib must evaluate");
        interp.push_frame();
        let module = parse_module(input).unwrap();
        let result = interp.eval_module(&module);
        assert_eq!(result.as_ref(), Ok(&expected), "\nprogram: {}", input);
    }

    #[test]
    fn stdlib_functions() {
        expect_with_stdlib("reduce [|a b| a + b] 0 {1, 2, 3, 4}", int(10));
        expect_with_stdlib("map [|x| x * 2] {1, 2, 3}", ints(&[2, 4, 6]));
        expect_with_stdlib("filter [|x| x > 1] {1, 2, 3}", ints(&[2, 3]));
        expect_with_stdlib("length {5, 6}", int(2));
        expect_with_stdlib("reverse {1, 2, 3}", ints(&[3, 2, 1]));
    }

    #[test]
    fn variadic_sum_scenario() {
        expect_with_stdlib(
            "sum := [|...xs| reduce [|a b| a + b] 0 xs]; sum 1 2 3 4",
            int(10),
        );
    }

    #[test]
    fn with_open_file_writes_and_closes() {
        let path = std::env::temp_dir().join("f_lang_interpreter_io_test.txt");
        let path_str = path.display().to_string();
        let program = format!(
            "withOpenFile [|f| writeLine f \"hello\"; writeLine f \"world\"] \"{}\" \"w\"",
            path_str
        );
        expect_last(&program, Value::Null);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "hello\nworld\n"
        );

        // handles escaping the action are closed
        let program = format!(
            "h := reference Null; \
             withOpenFile [|f| h <- f] \"{}\" \"w\"; \
             writeLine !h \"late\"",
            path_str
        );
        expect_last_error(&program, EvalError::ClosedFile);
        let _ = std::fs::remove_file(&path);
    }
}
