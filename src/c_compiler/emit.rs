//! Lowers the scope-annotated tree to C source against the contract of
//! `f_runtime.c`.

use super::builder::CBuilder;
use super::cast::{Analysis, CKind, CNode};
use super::scope::{c_name, operator_field, NameRef, ScopeId, Scopes};

/// Emit the whole module as one translation unit.
pub fn generate(analysis: &Analysis) -> String {
    let mut builder = CBuilder::new(analysis.module_scope);
    for statement in &analysis.statements {
        let value = emit(&mut builder, &analysis.scopes, statement);
        builder.push_simple(value);
    }
    builder.finish(&analysis.scopes)
}

/// Emit one node, pushing its side-effect statements into the builder and
/// returning the C expression for its value.
fn emit(b: &mut CBuilder, scopes: &Scopes, node: &CNode) -> String {
    match &node.kind {
        CKind::Number(lexeme) => format!("number({})", lexeme),
        CKind::Str(s) => format!("string(\"{}\")", c_escape(s)),
        CKind::Name(name) => name_ref(scopes, node.scope, name),
        CKind::Variadic(inner) => format!("variadic({})", emit(b, scopes, inner)),
        CKind::List(items) => emit_list(b, scopes, items),
        CKind::Assign { name, value } => {
            let target = name_ref(scopes, node.scope, name);
            let value = emit(b, scopes, value);
            b.push_simple(format!("{} = {}", target, value));
            target
        }
        CKind::Call { func, args } => emit_call(b, scopes, func, args),
        CKind::Block { .. } => emit_block(b, scopes, node),
    }
}

fn emit_call(b: &mut CBuilder, scopes: &Scopes, func: &CNode, args: &[CNode]) -> String {
    // The special lowerings apply only when the callee is a free name
    // with that exact spelling.
    if let CKind::Name(name) = &func.kind {
        if let NameRef::Builtin = scopes.resolve(func.scope, name) {
            match name.as_str() {
                // Sequencing: all but the last argument become bare
                // statements, the last one is the value.
                ";" if !args.is_empty() => {
                    for arg in &args[..args.len() - 1] {
                        let value = emit(b, scopes, arg);
                        b.push_simple(value);
                    }
                    return emit(b, scopes, &args[args.len() - 1]);
                }
                // The branches are zero-argument callables; invoking the
                // chosen one inside the `if` keeps the other lazy.
                "if" if args.len() == 3 => {
                    let temp = b.temp_var();
                    b.push_simple(format!("f_object {} = NULL", temp));
                    let condition = emit(b, scopes, &args[0]);
                    b.start_compound(format!("if (truthy({}))", condition));
                    let then = emit(b, scopes, &args[1]);
                    b.push_simple(format!("{} = call({}, list(0))", temp, then));
                    b.end_compound();
                    b.start_compound("else".to_owned());
                    let otherwise = emit(b, scopes, &args[2]);
                    b.push_simple(format!("{} = call({}, list(0))", temp, otherwise));
                    b.end_compound();
                    return temp;
                }
                // A direct `do` with a known head skips the dispatch
                // through the builtin.
                "do" if !args.is_empty() && !matches!(args[0].kind, CKind::Variadic(_)) => {
                    let callee = emit(b, scopes, &args[0]);
                    let list = emit_list(b, scopes, &args[1..]);
                    let temp = b.temp_var();
                    b.push_simple(format!("f_object {} = call({}, {})", temp, callee, list));
                    return temp;
                }
                _ => {}
            }
        }
    }

    let callee = emit(b, scopes, func);
    let list = emit_list(b, scopes, args);
    let temp = b.temp_var();
    b.push_simple(format!("f_object {} = call({}, {})", temp, callee, list));
    temp
}

fn emit_list(b: &mut CBuilder, scopes: &Scopes, items: &[CNode]) -> String {
    if items.is_empty() {
        return "list(0)".to_owned();
    }
    let rendered = items
        .iter()
        .map(|item| emit(b, scopes, item))
        .collect::<Vec<_>>()
        .join(", ");
    format!("list_v({}, {})", items.len(), rendered)
}

fn emit_block(b: &mut CBuilder, scopes: &Scopes, node: &CNode) -> String {
    let (inner, params, variadic, statements, ret) = match &node.kind {
        CKind::Block {
            inner,
            params,
            variadic,
            statements,
            ret,
        } => (*inner, params, variadic, statements, ret),
        _ => unreachable!("emit_block on a non-block node"),
    };

    let fname = b.start_function(inner);

    match variadic {
        Some((index, var_name)) => {
            let pre = &params[..*index];
            let post = &params[*index..];
            for (i, name) in pre.iter().enumerate() {
                b.push_simple(format!(
                    "self.{} = args->list.elements[{}]",
                    c_name(name),
                    i
                ));
            }
            b.push_simple(format!(
                "self.{} = sublist(args, {}, args->list.count - {})",
                c_name(var_name),
                index,
                post.len()
            ));
            for (i, name) in post.iter().rev().enumerate() {
                b.push_simple(format!(
                    "self.{} = args->list.elements[args->list.count - {}]",
                    c_name(name),
                    i + 1
                ));
            }
        }
        None => {
            for (i, name) in params.iter().enumerate() {
                b.push_simple(format!(
                    "self.{} = args->list.elements[{}]",
                    c_name(name),
                    i
                ));
            }
        }
    }

    for statement in statements {
        let value = emit(b, scopes, statement);
        b.push_simple(value);
    }
    match ret {
        Some(ret) => {
            let value = emit(b, scopes, ret);
            b.push_simple(format!("return {}", value));
        }
        None => b.push_simple("return builtins.Null".to_owned()),
    }
    b.end_function();

    // Captures are copied into a heap-duplicated record, so the callable
    // outlives the enclosing activation.
    let outer = scopes.outer(inner);
    if outer.is_empty() {
        format!("callable(NULL, (function_type) {})", fname)
    } else {
        let fields = outer
            .iter()
            .map(|name| format!(".{} = {}", c_name(name), name_ref(scopes, node.scope, name)))
            .collect::<Vec<_>>()
            .join(", ");
        let temp = b.temp_var();
        b.push_simple(format!(
            "struct _outer_{} {} = {{{}}}",
            fname, temp, fields
        ));
        format!(
            "callable(copied(&{}, sizeof({})), (function_type) {})",
            temp, temp, fname
        )
    }
}

/// How a name is spelled in C at the given scope: a local `self` field,
/// a captured `outer` field, or a runtime-table entry.
fn name_ref(scopes: &Scopes, scope: ScopeId, name: &str) -> String {
    match scopes.resolve(scope, name) {
        NameRef::Local { .. } => format!("self.{}", c_name(name)),
        NameRef::Outer { .. } => format!("outer->{}", c_name(name)),
        NameRef::Builtin => match operator_field(name) {
            Some(field) => format!("operators.{}", field),
            None => format!("builtins.{}", c_name(name)),
        },
    }
}

fn c_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x07' => out.push_str("\\a"),
            '\x08' => out.push_str("\\b"),
            '\x0b' => out.push_str("\\v"),
            '\x0c' => out.push_str("\\f"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::super::cast::analyze;
    use super::*;
    use crate::lang::parse_module;
    use expect_test::{expect, Expect};

    fn check(input: &str, output: Expect) {
        let analysis = analyze(&parse_module(input).unwrap()).unwrap();
        output.assert_eq(generate(&analysis).trim_end());
    }

    fn generated(input: &str) -> String {
        let analysis = analyze(&parse_module(input).unwrap()).unwrap();
        generate(&analysis)
    }

    #[test]
    fn print_of_a_sum() {
        check(
            "print 1 + 2;",
            expect![[r#"
                #include "f_runtime.c"

                int main(int argc, char** argv) {
                    setup(argc, argv);
                    f_object temp_0000 = call(operators.add, list_v(2, number(1), number(2)));
                    f_object temp_0001 = call(builtins.print, list_v(1, temp_0000));
                }"#]],
        );
    }

    #[test]
    fn closure_record_construction() {
        check(
            "make := [|x| [|y| x + y]];",
            expect![[r#"
                #include "f_runtime.c"

                struct _self_f00000001 {
                    f_object y;
                };
                struct _outer_f00000001 {
                    f_object x;
                };
                f_object f00000001(struct _outer_f00000001* outer, f_object args) {
                    struct _self_f00000001 self = {0};
                    self.y = args->list.elements[0];
                    f_object temp_0000 = call(operators.add, list_v(2, outer->x, self.y));
                    return temp_0000;
                }

                struct _self_f00000000 {
                    f_object x;
                };
                f_object f00000000(void* UNUSED(outer), f_object args) {
                    struct _self_f00000000 self = {0};
                    self.x = args->list.elements[0];
                    struct _outer_f00000001 temp_0000 = {.x = self.x};
                    return callable(copied(&temp_0000, sizeof(temp_0000)), (function_type) f00000001);
                }

                struct _self_main {
                    f_object make;
                };
                int main(int argc, char** argv) {
                    setup(argc, argv);
                    struct _self_main self = {0};
                    self.make = callable(NULL, (function_type) f00000000);
                }"#]],
        );
    }

    #[test]
    fn if_lowering_is_lazy() {
        let output = generated("x := if true [1] [2];");
        assert!(output.contains("f_object temp_0000 = NULL;"));
        assert!(output.contains("if (truthy(builtins.true_)) {"));
        assert!(output.contains("temp_0000 = call(callable(NULL, (function_type) f00000000), list(0));"));
        assert!(output.contains("    else {"));
    }

    #[test]
    fn sequencing_lowers_to_statements() {
        let output = generated("x := (print 1; 2);");
        // the print happens as a bare statement, the value is the 2
        assert!(output.contains("call(builtins.print, list_v(1, number(1)))"));
        assert!(output.contains("self.x = number(2);"));
    }

    #[test]
    fn do_with_known_head_is_direct() {
        let output = generated("f := [|a| a]; do f 1;");
        assert!(output.contains("call(self.f, list_v(1, number(1)))"));
        assert!(!output.contains("builtins.do_"));

        // with a spliced first argument the generic dispatch stays
        let spliced = generated("xs := {[|a| a], 1}; do ...xs;");
        assert!(spliced.contains("call(builtins.do_, list_v(1, variadic(self.xs)))"));
    }

    #[test]
    fn variadic_parameters_use_sublist() {
        let output = generated("f := [|a ...r b| r];");
        assert!(output.contains("self.a = args->list.elements[0];"));
        assert!(output.contains("self.r = sublist(args, 1, args->list.count - 1);"));
        assert!(output.contains("self.b = args->list.elements[args->list.count - 1];"));
    }

    #[test]
    fn keywords_and_dots_translate() {
        let output = generated("while [true] [1];");
        assert!(output.contains("call(builtins.while_"));
        assert!(output.contains("builtins.true_"));

        let dots = generated("print ...;");
        assert!(dots.contains("call(builtins.print, list_v(1, builtins._dot_dot_dot))"));
    }

    #[test]
    fn strings_are_escaped() {
        let output = generated("print \"a\\nb\\\"c\";");
        assert!(output.contains("string(\"a\\nb\\\"c\")"));
    }
}
