//! Assembles the C translation unit: one function per code block,
//! emitted in post-order, wrapped in the fixed runtime header.

use super::scope::{c_name, ScopeId, Scopes};

const TEMPLATE_HEADER: &str = "#include \"f_runtime.c\"\n\n";

#[derive(Debug)]
enum CStmt {
    Line(String),
    Compound { open: String, body: Vec<CStmt> },
}

impl CStmt {
    fn render(&self, indent: usize, out: &mut String) {
        match self {
            CStmt::Line(line) => {
                // Only calls, assignments and returns have an effect;
                // bare values are elided.
                if line.contains('(') || line.contains('=') || line.contains("return") {
                    out.push_str(&" ".repeat(indent));
                    out.push_str(line);
                    out.push_str(";\n");
                }
            }
            CStmt::Compound { open, body } => {
                out.push_str(&" ".repeat(indent));
                out.push_str(open);
                out.push_str(" {\n");
                for statement in body {
                    statement.render(indent + 4, out);
                }
                out.push_str(&" ".repeat(indent));
                out.push_str("}\n");
            }
        }
    }
}

#[derive(Debug)]
struct CFunction {
    name: String,
    scope: ScopeId,
    body: Vec<CStmt>,
    temp_counter: u32,
}

impl CFunction {
    fn render(&self, scopes: &Scopes, out: &mut String) {
        let scope = scopes.get(self.scope);

        if !scope.defined.is_empty() {
            out.push_str(&format!("struct _self_{} {{\n", self.name));
            for name in scope.defined.keys() {
                out.push_str(&format!("    f_object {};\n", c_name(name)));
            }
            out.push_str("};\n");
        }

        if self.name == "main" {
            out.push_str("int main(int argc, char** argv) {\n");
            out.push_str("    setup(argc, argv);\n");
        } else {
            let outer = scopes.outer(self.scope);
            if !outer.is_empty() {
                out.push_str(&format!("struct _outer_{} {{\n", self.name));
                for name in &outer {
                    out.push_str(&format!("    f_object {};\n", c_name(name)));
                }
                out.push_str("};\n");
                out.push_str(&format!(
                    "f_object {}(struct _outer_{}* outer, f_object args) {{\n",
                    self.name, self.name
                ));
            } else {
                out.push_str(&format!(
                    "f_object {}(void* UNUSED(outer), f_object args) {{\n",
                    self.name
                ));
            }
        }

        if !scope.defined.is_empty() {
            out.push_str(&format!("    struct _self_{} self = {{0}};\n", self.name));
        }
        for statement in &self.body {
            statement.render(4, out);
        }
        out.push_str("}\n\n");
    }
}

#[derive(Debug)]
enum StackEntry {
    Function(CFunction),
    Compound { open: String, body: Vec<CStmt> },
}

/// Builds the translation unit through a stack of open emission targets.
/// Finished functions accumulate in post-order; `main` closes last.
#[derive(Debug)]
pub struct CBuilder {
    finished: Vec<CFunction>,
    stack: Vec<StackEntry>,
    function_counter: u32,
}

impl CBuilder {
    pub fn new(module_scope: ScopeId) -> CBuilder {
        CBuilder {
            finished: Vec::new(),
            stack: vec![StackEntry::Function(CFunction {
                name: "main".to_owned(),
                scope: module_scope,
                body: Vec::new(),
                temp_counter: 0,
            })],
            function_counter: 0,
        }
    }

    pub fn start_function(&mut self, scope: ScopeId) -> String {
        let name = format!("f{:08X}", self.function_counter);
        self.function_counter += 1;
        self.stack.push(StackEntry::Function(CFunction {
            name: name.clone(),
            scope,
            body: Vec::new(),
            temp_counter: 0,
        }));
        name
    }

    pub fn end_function(&mut self) {
        match self.stack.pop() {
            Some(StackEntry::Function(function)) => self.finished.push(function),
            _ => unreachable!("end_function without an open function"),
        }
    }

    pub fn start_compound(&mut self, open: String) {
        self.stack.push(StackEntry::Compound {
            open,
            body: Vec::new(),
        });
    }

    pub fn end_compound(&mut self) {
        match self.stack.pop() {
            Some(StackEntry::Compound { open, body }) => {
                self.body_mut().push(CStmt::Compound { open, body });
            }
            _ => unreachable!("end_compound without an open compound"),
        }
    }

    pub fn push_simple(&mut self, line: String) {
        self.body_mut().push(CStmt::Line(line));
    }

    /// A fresh temporary, unique within the innermost open function.
    pub fn temp_var(&mut self) -> String {
        for entry in self.stack.iter_mut().rev() {
            if let StackEntry::Function(function) = entry {
                let name = format!("temp_{:04X}", function.temp_counter);
                function.temp_counter += 1;
                return name;
            }
        }
        unreachable!("temp_var without an open function")
    }

    fn body_mut(&mut self) -> &mut Vec<CStmt> {
        match self.stack.last_mut() {
            Some(StackEntry::Function(function)) => &mut function.body,
            Some(StackEntry::Compound { body, .. }) => body,
            None => unreachable!("no open emission target"),
        }
    }

    /// Close `main` and render the whole translation unit.
    pub fn finish(mut self, scopes: &Scopes) -> String {
        self.end_function();
        let mut out = TEMPLATE_HEADER.to_owned();
        for function in &self.finished {
            function.render(scopes, &mut out);
        }
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bare_values_are_elided() {
        let mut out = String::new();
        CStmt::Line("temp_0001".to_owned()).render(4, &mut out);
        assert_eq!(out, "");
        CStmt::Line("self.x = temp_0001".to_owned()).render(4, &mut out);
        assert_eq!(out, "    self.x = temp_0001;\n");
        out.clear();
        CStmt::Line("return temp_0001".to_owned()).render(4, &mut out);
        assert_eq!(out, "    return temp_0001;\n");
    }

    #[test]
    fn compounds_nest() {
        let scopes = Scopes::new();
        let root = scopes.root();
        let mut builder = CBuilder::new(root);
        builder.push_simple("f_object t = NULL".to_owned());
        builder.start_compound("if (truthy(t))".to_owned());
        builder.push_simple("t = call(t, list(0))".to_owned());
        builder.end_compound();
        let output = builder.finish(&scopes);
        assert!(output.starts_with("#include \"f_runtime.c\""));
        assert!(output.contains("int main(int argc, char** argv) {"));
        assert!(output.contains("    setup(argc, argv);"));
        assert!(output.contains("    if (truthy(t)) {\n        t = call(t, list(0));\n    }"));
    }
}
