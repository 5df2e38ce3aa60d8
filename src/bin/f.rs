// f-lang -- an interpreter and compiler for the F language
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! `f` - run F programs through the interpreter, the AST compiler or the
//! C transpiler.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::exit;
use std::rc::Rc;
use std::str::FromStr;

use log::{error, info};
use simple_logger;
use structopt::StructOpt;

use f_lang::ast_compiler;
use f_lang::c_compiler;
use f_lang::interpreter::{Builtins, Interpreter};
use f_lang::lang::{self, ast, span};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Ast,
    Interpreter,
    Compiler,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Mode, String> {
        match s {
            "a" | "ast" => Ok(Mode::Ast),
            "i" | "interpreter" => Ok(Mode::Interpreter),
            "c" | "compiler" => Ok(Mode::Compiler),
            other => Err(format!(
                "unknown mode '{}', expected a|ast, i|interpreter or c|compiler",
                other
            )),
        }
    }
}

#[derive(Debug, StructOpt)]
#[structopt(name = "f", about = "Interpreter and compiler for the F language")]
struct Opt {
    #[structopt(short = "v", long = "verbose")]
    verbose: bool,

    /// Execution backend: a/ast, i/interpreter or c/compiler.
    #[structopt(short = "m", long = "mode", default_value = "i")]
    mode: Mode,

    /// The program to run; a line-by-line REPL when omitted.
    #[structopt(parse(from_os_str))]
    program: Option<PathBuf>,

    /// Arguments passed to the program as the top-level `...` list.
    args: Vec<String>,
}

/// The standard library is read from the working directory before the
/// user program in every mode; its failure aborts startup.
const STDLIB_PATH: &str = "stdlib.f";

fn main() {
    let opt = Opt::from_args();

    let level = if opt.verbose {
        log::Level::Trace
    } else {
        log::Level::Info
    };
    simple_logger::init_with_level(level).unwrap();

    exit(run(opt));
}

fn run(opt: Opt) -> i32 {
    let stdlib = match load_stdlib() {
        Some(module) => module,
        None => return 1,
    };

    if opt.mode == Mode::Compiler {
        if !opt.args.is_empty() {
            error!("compiler mode does not take program arguments");
            return 1;
        }
        return match &opt.program {
            Some(path) => run_compiler(path, stdlib),
            None => {
                error!("the REPL is not available in compiler mode");
                1
            }
        };
    }

    let builtins = Builtins::standard(opt.args.clone());
    match (&opt.program, opt.mode) {
        (Some(path), Mode::Interpreter) => run_interpreter(path, stdlib, builtins),
        (None, Mode::Interpreter) => repl_interpreter(stdlib, builtins),
        (Some(path), Mode::Ast) => run_ast(path, stdlib, builtins),
        (None, Mode::Ast) => repl_ast(stdlib, builtins),
        (_, Mode::Compiler) => unreachable!("handled above"),
    }
}

fn load_stdlib() -> Option<ast::Module> {
    let source = match std::fs::read_to_string(STDLIB_PATH) {
        Ok(source) => source,
        Err(err) => {
            error!("cannot load {}: {}", STDLIB_PATH, err);
            return None;
        }
    };
    parse_or_report(STDLIB_PATH, &source)
}

fn load_program(path: &Path) -> Option<ast::Module> {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            error!("cannot read {}: {}", path.display(), err);
            return None;
        }
    };
    parse_or_report(&path.display().to_string(), &source)
}

fn parse_or_report(name: &str, source: &str) -> Option<ast::Module> {
    match lang::parse_module(source) {
        Ok(module) => Some(module),
        Err(err) => {
            let pos = span::position(source, err.location().begin);
            error!(
                "{}:{}:{}: parse error: {}",
                name,
                pos.line,
                pos.column,
                err.info()
            );
            None
        }
    }
}

// ==================== interpreter mode ====================

fn run_interpreter(path: &Path, stdlib: ast::Module, builtins: Rc<Builtins>) -> i32 {
    let program = match load_program(path) {
        Some(module) => module,
        None => return 1,
    };

    let mut interp = Interpreter::new(builtins);
    if let Err(err) = interp.eval_module(&stdlib) {
        error!("stdlib failed: {}", err);
        return 1;
    }
    interp.push_frame();
    match interp.eval_module(&program) {
        Ok(_) => 0,
        Err(err) => {
            error!("{}", err);
            1
        }
    }
}

fn repl_interpreter(stdlib: ast::Module, builtins: Rc<Builtins>) -> i32 {
    let mut interp = Interpreter::new(builtins);
    if let Err(err) = interp.eval_module(&stdlib) {
        error!("stdlib failed: {}", err);
        return 1;
    }
    interp.push_frame();

    repl_loop(|line| {
        let module = match parse_or_report("<repl>", line) {
            Some(module) => module,
            None => return,
        };
        for statement in &module.statements {
            match interp.eval(statement) {
                Ok(value) => println!("{}", value),
                Err(err) => {
                    error!("{}", err);
                    break;
                }
            }
        }
    })
}

// ==================== AST compiler mode ====================

fn run_ast(path: &Path, stdlib: ast::Module, builtins: Rc<Builtins>) -> i32 {
    let program = match load_program(path) {
        Some(module) => module,
        None => return 1,
    };

    let mut interp = Interpreter::new(builtins);
    let mut session = ast_compiler::Session::new();
    if let Err(err) = session.run(&mut interp, &stdlib.statements) {
        error!("stdlib failed: {}", err);
        return 1;
    }
    match session.run(&mut interp, &program.statements) {
        Ok(_) => 0,
        Err(err) => {
            error!("{}", err);
            1
        }
    }
}

fn repl_ast(stdlib: ast::Module, builtins: Rc<Builtins>) -> i32 {
    let mut interp = Interpreter::new(builtins);
    let mut session = ast_compiler::Session::new();
    if let Err(err) = session.run(&mut interp, &stdlib.statements) {
        error!("stdlib failed: {}", err);
        return 1;
    }

    repl_loop(|line| {
        let module = match parse_or_report("<repl>", line) {
            Some(module) => module,
            None => return,
        };
        match session.run(&mut interp, &module.statements) {
            Ok(values) => {
                for value in values {
                    println!("{}", value);
                }
            }
            Err(err) => error!("{}", err),
        }
    })
}

/// Read stdin line by line, handing each non-empty line to the callback.
fn repl_loop<F: FnMut(&str)>(mut handle: F) -> i32 {
    let stdin = io::stdin();
    let mut input = String::new();
    loop {
        print!("> ");
        io::stdout().flush().ok();
        input.clear();
        match stdin.read_line(&mut input) {
            Ok(0) => return 0,
            Ok(_) => {}
            Err(err) => {
                error!("{}", err);
                return 1;
            }
        }
        let line = input.trim();
        if line.is_empty() {
            continue;
        }
        handle(line);
    }
}

// ==================== C compiler mode ====================

fn run_compiler(path: &Path, stdlib: ast::Module) -> i32 {
    let program = match load_program(path) {
        Some(module) => module,
        None => return 1,
    };

    // stdlib and program compile as one module
    let mut statements = stdlib.statements;
    statements.extend(program.statements);
    let module = ast::Module { statements };

    match c_compiler::compile_to_executable(&module, path) {
        Ok(executable) => {
            info!("built {}", executable.display());
            0
        }
        Err(c_compiler::BuildError::Analysis { source }) => {
            error!("{}", source);
            1
        }
        Err(err) => {
            error!("{}", err);
            2
        }
    }
}
