// f-lang -- an interpreter and compiler for the F language
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! The AST compiler backend: every name is resolved at compile time to a
//! frame slot (or to the registry), and the compiled program runs over
//! slot-vector frames. Shares the value model and the builtins with the
//! tree-walking interpreter, so builtins calling back into blocks work
//! across both backends.

use std::cell::RefCell;
use std::rc::Rc;

use crate::c_compiler::cast::{self, AnalysisError, CKind, CNode};
use crate::c_compiler::scope::{NameRef, ScopeId, Scopes};
use crate::interpreter::{parse_number, BlockValue, EvalError, EvalResult, Interpreter, Value};
use crate::lang::ast::Expr;

pub type SlotFrameRef = Rc<SlotFrame>;

/// A runtime frame of the compiled backend: one slot per name defined in
/// the corresponding scope. A slot holds `None` until its name is bound,
/// so use-before-assignment fails like an unbound name does in the
/// interpreter.
#[derive(Debug)]
pub struct SlotFrame {
    slots: RefCell<Vec<Option<Value>>>,
    parent: Option<SlotFrameRef>,
}

impl SlotFrame {
    pub fn root(slot_count: usize) -> SlotFrameRef {
        Rc::new(SlotFrame {
            slots: RefCell::new(vec![None; slot_count]),
            parent: None,
        })
    }

    fn nest(parent: &SlotFrameRef, slot_count: usize) -> SlotFrameRef {
        Rc::new(SlotFrame {
            slots: RefCell::new(vec![None; slot_count]),
            parent: Some(Rc::clone(parent)),
        })
    }

    /// Grow to at least `slot_count` slots; the REPL extends the module
    /// frame as new statements define new names.
    pub fn ensure_slots(&self, slot_count: usize) {
        let mut slots = self.slots.borrow_mut();
        if slots.len() < slot_count {
            slots.resize(slot_count, None);
        }
    }

    fn get(&self, slot: usize) -> Option<Value> {
        self.slots.borrow().get(slot).cloned().flatten()
    }

    /// Fill a slot; `false` if it was already filled.
    fn fill(&self, slot: usize, value: Value) -> bool {
        let mut slots = self.slots.borrow_mut();
        match &slots[slot] {
            Some(_) => false,
            None => {
                slots[slot] = Some(value);
                true
            }
        }
    }
}

/// Resolved ops: the AST with every name reference replaced by how it
/// resolves.
#[derive(Debug)]
pub enum Code {
    Const(Value),
    LoadLocal { slot: usize, name: String },
    LoadOuter { depth: usize, slot: usize, name: String },
    LoadBuiltin { name: String },
    Call { func: Box<Code>, args: Vec<Arg> },
    MakeList(Vec<Arg>),
    MakeBlock(Rc<BlockCode>),
    Assign { slot: usize, name: String, value: Box<Code> },
    /// A `...e` outside of an argument or list position.
    StraySplice,
}

#[derive(Debug)]
pub enum Arg {
    Positional(Code),
    Splice(Code),
}

/// A compiled code block: the parameter layout plus the compiled body.
/// Parameter slots come first in the frame, in definition order: the
/// fixed parameters, then the variadic rest-list.
#[derive(Debug)]
pub struct BlockCode {
    pre_params: usize,
    post_params: usize,
    variadic: bool,
    slot_count: usize,
    statements: Vec<Code>,
    ret: Option<Code>,
}

impl BlockCode {
    /// Whether the block can be invoked without any arguments.
    pub fn takes_no_fixed_params(&self) -> bool {
        self.pre_params == 0 && self.post_params == 0
    }
}

pub fn compile(scopes: &Scopes, node: &CNode) -> EvalResult<Code> {
    Ok(match &node.kind {
        CKind::Number(lexeme) => Code::Const(Value::Number(parse_number(lexeme)?)),
        CKind::Str(s) => Code::Const(Value::Str(s.as_str().into())),
        CKind::Name(name) => match scopes.resolve(node.scope, name) {
            NameRef::Local { slot } => Code::LoadLocal {
                slot,
                name: name.clone(),
            },
            NameRef::Outer { depth, slot } => Code::LoadOuter {
                depth,
                slot,
                name: name.clone(),
            },
            NameRef::Builtin => Code::LoadBuiltin { name: name.clone() },
        },
        CKind::Call { func, args } => Code::Call {
            func: Box::new(compile(scopes, func)?),
            args: compile_args(scopes, args)?,
        },
        CKind::List(items) => Code::MakeList(compile_args(scopes, items)?),
        CKind::Variadic(_) => Code::StraySplice,
        CKind::Assign { name, value } => {
            let slot = match scopes.resolve(node.scope, name) {
                NameRef::Local { slot } => slot,
                _ => unreachable!("assignment target resolves locally"),
            };
            Code::Assign {
                slot,
                name: name.clone(),
                value: Box::new(compile(scopes, value)?),
            }
        }
        CKind::Block {
            inner,
            params,
            variadic,
            statements,
            ret,
        } => {
            let (pre_params, post_params) = match variadic {
                Some((index, _)) => (*index, params.len() - index),
                None => (params.len(), 0),
            };
            Code::MakeBlock(Rc::new(BlockCode {
                pre_params,
                post_params,
                variadic: variadic.is_some(),
                slot_count: scopes.get(*inner).defined.len(),
                statements: statements
                    .iter()
                    .map(|statement| compile(scopes, statement))
                    .collect::<EvalResult<_>>()?,
                ret: ret
                    .as_ref()
                    .map(|ret| compile(scopes, ret))
                    .transpose()?,
            }))
        }
    })
}

fn compile_args(scopes: &Scopes, args: &[CNode]) -> EvalResult<Vec<Arg>> {
    args.iter()
        .map(|arg| match &arg.kind {
            CKind::Variadic(inner) => Ok(Arg::Splice(compile(scopes, inner)?)),
            _ => Ok(Arg::Positional(compile(scopes, arg)?)),
        })
        .collect()
}

pub fn exec(int: &mut Interpreter, code: &Code, frame: &SlotFrameRef) -> EvalResult<Value> {
    match code {
        Code::Const(value) => Ok(value.clone()),
        Code::LoadLocal { slot, name } => frame
            .get(*slot)
            .ok_or_else(|| EvalError::Undefined(name.clone())),
        Code::LoadOuter { depth, slot, name } => {
            let mut current = Rc::clone(frame);
            for _ in 0..*depth {
                current = match &current.parent {
                    Some(parent) => Rc::clone(parent),
                    None => return Err(EvalError::Undefined(name.clone())),
                };
            }
            current
                .get(*slot)
                .ok_or_else(|| EvalError::Undefined(name.clone()))
        }
        Code::LoadBuiltin { name } => int
            .builtins()
            .lookup(name)
            .cloned()
            .ok_or_else(|| EvalError::Undefined(name.clone())),
        Code::Call { func, args } => {
            let callee = exec(int, func, frame)?;
            let arguments = exec_args(int, args, frame)?;
            int.call(&callee, arguments)
        }
        Code::MakeList(items) => Ok(Value::List(exec_args(int, items, frame)?.into())),
        Code::MakeBlock(block) => Ok(Value::Block(Rc::new(BlockValue::Compiled {
            code: Rc::clone(block),
            captured: Rc::clone(frame),
        }))),
        Code::Assign { slot, name, value } => {
            let value = exec(int, value, frame)?;
            if !frame.fill(*slot, value.clone()) {
                return Err(EvalError::AlreadyBound(name.clone()));
            }
            Ok(value)
        }
        Code::StraySplice => Err(EvalError::SpliceOutsideCall),
    }
}

fn exec_args(int: &mut Interpreter, args: &[Arg], frame: &SlotFrameRef) -> EvalResult<Vec<Value>> {
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        match arg {
            Arg::Positional(code) => out.push(exec(int, code, frame)?),
            Arg::Splice(code) => match exec(int, code, frame)? {
                Value::List(items) => out.extend(items.iter().cloned()),
                other => {
                    return Err(EvalError::Type {
                        expected: "list",
                        got: other.type_name(),
                    })
                }
            },
        }
    }
    Ok(out)
}

/// Invoke a compiled block: push a slot frame under the captured one,
/// bind the arguments, run the body.
pub fn call_block(
    int: &mut Interpreter,
    code: &Rc<BlockCode>,
    captured: &SlotFrameRef,
    args: Vec<Value>,
) -> EvalResult<Value> {
    let frame = SlotFrame::nest(captured, code.slot_count);
    let fixed = code.pre_params + code.post_params;

    if !code.variadic {
        if args.len() != fixed {
            return Err(EvalError::Arity {
                expected: fixed,
                at_least: false,
                got: args.len(),
            });
        }
        for (slot, value) in args.into_iter().enumerate() {
            frame.fill(slot, value);
        }
    } else {
        if args.len() < fixed {
            return Err(EvalError::Arity {
                expected: fixed,
                at_least: true,
                got: args.len(),
            });
        }
        for (slot, value) in args[..code.pre_params].iter().enumerate() {
            frame.fill(slot, value.clone());
        }
        for (offset, value) in args[args.len() - code.post_params..].iter().enumerate() {
            frame.fill(code.pre_params + offset, value.clone());
        }
        let middle = args[code.pre_params..args.len() - code.post_params].to_vec();
        frame.fill(fixed, Value::list(middle));
    }

    let mut result = Value::Null;
    for statement in &code.statements {
        result = exec(int, statement, &frame)?;
    }
    match &code.ret {
        Some(ret) => exec(int, ret, &frame),
        None => Ok(Value::Null),
    }
}

/// Compiles and runs module statements, keeping the module scope and the
/// module frame alive so a REPL can feed more statements later.
pub struct Session {
    scopes: Scopes,
    module_scope: ScopeId,
    frame: SlotFrameRef,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Session {
        let scopes = Scopes::new();
        let module_scope = scopes.root();
        Session {
            scopes,
            module_scope,
            frame: SlotFrame::root(0),
        }
    }

    /// Analyze, compile and execute statements in the module scope,
    /// returning each statement's value.
    pub fn run(&mut self, int: &mut Interpreter, statements: &[Expr]) -> EvalResult<Vec<Value>> {
        let nodes = cast::analyze_statements(&mut self.scopes, self.module_scope, statements)
            .map_err(|error| match error {
                AnalysisError::Redefined(name) => EvalError::AlreadyBound(name),
            })?;
        let code = nodes
            .iter()
            .map(|node| compile(&self.scopes, node))
            .collect::<EvalResult<Vec<_>>>()?;
        self.frame
            .ensure_slots(self.scopes.get(self.module_scope).defined.len());

        let mut values = Vec::with_capacity(code.len());
        for statement in &code {
            values.push(exec(int, statement, &self.frame)?);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::decimal::Decimal;
    use crate::interpreter::Builtins;
    use crate::lang::parse_module;

    fn int(i: i64) -> Value {
        Value::Number(Decimal::from_int(i))
    }

    fn run_program(input: &str) -> EvalResult<Value> {
        let module = parse_module(input).unwrap();
        let mut interp = Interpreter::new(Builtins::standard(Vec::new()));
        let mut session = Session::new();
        session
            .run(&mut interp, &module.statements)
            .map(|values| values.last().cloned().unwrap_or(Value::Null))
    }

    fn expect_last(input: &str, expected: Value) {
        assert_eq!(run_program(input), Ok(expected), "\nprogram: {}", input);
    }

    #[test]
    fn factorial_matches_the_interpreter() {
        expect_last(
            "factorial := [|n| total := reference 1; i := reference n; \
             while [!i > 0] [total <- (!total * !i); i <- (!i - 1)]; !total]; \
             factorial 5",
            int(120),
        );
    }

    #[test]
    fn closures_capture_slot_frames() {
        expect_last(
            "counter := [|n| r := reference n; [r <- (!r + 1); !r]]; \
             c1 := counter 0; c2 := counter 10; \
             {do c1, do c1, do c2, do c1}",
            Value::list(vec![int(1), int(2), int(11), int(3)]),
        );
    }

    #[test]
    fn variadic_binding() {
        expect_last(
            "f := [|a ...r b| {a, r, b}]; f 1 2 3 4",
            Value::list(vec![
                int(1),
                Value::list(vec![int(2), int(3)]),
                int(4),
            ]),
        );
        expect_last("g := [|...| ...]; g 1 2", Value::list(vec![int(1), int(2)]));
    }

    #[test]
    fn splices_expand() {
        expect_last("xs := {1, 2}; do [|a b c| a + b + c] ...xs 3", int(6));
    }

    #[test]
    fn use_before_assignment_is_undefined() {
        let result = run_program("f := [print x; x := 1; x]; do f");
        assert_eq!(result, Err(EvalError::Undefined("x".into())));
    }

    #[test]
    fn double_definition_is_already_bound() {
        let result = run_program("x := 1; x := 2");
        assert_eq!(result, Err(EvalError::AlreadyBound("x".into())));
    }

    #[test]
    fn builtins_resolve_through_the_registry() {
        expect_last("not false", Value::Bool(true));
        expect_last("either (1 < 2) \"a\" \"b\"", Value::string("a"));
    }

    #[test]
    fn module_scope_shadows_builtins() {
        expect_last("while := 5; while", int(5));
    }

    #[test]
    fn repl_grows_the_module_frame() {
        let mut interp = Interpreter::new(Builtins::standard(Vec::new()));
        let mut session = Session::new();
        let run = |session: &mut Session, interp: &mut Interpreter, line: &str| {
            let module = parse_module(line).unwrap();
            session.run(interp, &module.statements)
        };
        assert_eq!(run(&mut session, &mut interp, "x := 2"), Ok(vec![int(2)]));
        assert_eq!(
            run(&mut session, &mut interp, "y := x * 21; y"),
            Ok(vec![int(42), int(42)])
        );
        assert_eq!(
            run(&mut session, &mut interp, "x := 0"),
            Err(EvalError::AlreadyBound("x".into()))
        );
    }
}
