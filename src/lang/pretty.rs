use super::ast::*;
use std::fmt::Write;

struct PrettyPrinter {
    output: String,
}

/// Render a module back into source the parser accepts, such that
/// re-parsing yields the same tree. Calls and operator applications are
/// parenthesized to make the result independent of precedence.
pub fn pretty_module(module: &Module) -> String {
    let mut printer = PrettyPrinter::new();
    for (i, statement) in module.statements.iter().enumerate() {
        if i > 0 {
            printer.output.push_str(";\n");
        }
        printer.print(statement);
    }
    printer.output
}

pub fn pretty(expr: &Expr) -> String {
    let mut printer = PrettyPrinter::new();
    printer.print(expr);
    printer.output
}

impl PrettyPrinter {
    fn new() -> Self {
        Self {
            output: String::new(),
        }
    }

    fn print(&mut self, expr: &Expr) {
        match expr {
            Expr::Number(lexeme) => self.output.push_str(lexeme),
            Expr::Str(s) => self.print_string(s),
            Expr::Name(n) => self.output.push_str(n),
            Expr::Call { func, args } => self.print_call(func, args),
            Expr::List(items) => self.print_list(items),
            Expr::Variadic(inner) => {
                self.output.push_str("... ");
                self.print(inner);
            }
            Expr::Block(block) => self.print_block(block),
            Expr::Assign { name, value } => {
                write!(&mut self.output, "{} := ", name).unwrap();
                self.print(value);
            }
        }
    }

    fn print_call(&mut self, func: &Expr, args: &[Expr]) {
        self.output.push('(');
        match func {
            // operator applications print in their surface form
            Expr::Name(op) if is_binary_operator(op) && args.len() == 2 => {
                self.print(&args[0]);
                write!(&mut self.output, " {} ", op).unwrap();
                self.print(&args[1]);
            }
            Expr::Name(op) if op == "!" && args.len() == 1 => {
                self.output.push('!');
                self.print(&args[0]);
            }
            Expr::Name(op) if op == ";" && !args.is_empty() => {
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.output.push_str("; ");
                    }
                    self.print(arg);
                }
            }
            _ => {
                self.print(func);
                for arg in args {
                    self.output.push(' ');
                    self.print(arg);
                }
            }
        }
        self.output.push(')');
    }

    fn print_list(&mut self, items: &[Expr]) {
        self.output.push('{');
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.output.push_str(", ");
            }
            self.print(item);
        }
        self.output.push('}');
    }

    fn print_block(&mut self, block: &Block) {
        self.output.push('[');
        if !block.params.is_empty() || block.variadic.is_some() {
            self.output.push('|');
            let mut names: Vec<&str> = block.params.iter().map(String::as_str).collect();
            let rendered;
            if let Some((index, name)) = &block.variadic {
                rendered = if name == "..." {
                    "...".to_owned()
                } else {
                    format!("...{}", name)
                };
                names.insert(*index, &rendered);
            }
            self.output.push_str(&names.join(" "));
            self.output.push('|');
            self.output.push(' ');
        }
        let mut first = true;
        for statement in block
            .statements
            .iter()
            .chain(block.ret.iter().map(|ret| &**ret))
        {
            if !first {
                self.output.push_str("; ");
            }
            first = false;
            self.print(statement);
        }
        self.output.push(']');
    }

    fn print_string(&mut self, s: &str) {
        self.output.push('"');
        for ch in s.chars() {
            match ch {
                '\\' => self.output.push_str("\\\\"),
                '"' => self.output.push_str("\\\""),
                '\n' => self.output.push_str("\\n"),
                '\r' => self.output.push_str("\\r"),
                '\t' => self.output.push_str("\\t"),
                '\x07' => self.output.push_str("\\a"),
                '\x08' => self.output.push_str("\\b"),
                '\x0b' => self.output.push_str("\\v"),
                '\x0c' => self.output.push_str("\\f"),
                other => self.output.push(other),
            }
        }
        self.output.push('"');
    }
}

fn is_binary_operator(op: &str) -> bool {
    LEVELS_FLAT.contains(&op)
}

const LEVELS_FLAT: [&str; 13] = [
    "<-", "=", "!=", "<", "<=", ">", ">=", "+", "-", "*", "/", "**", ";",
];
