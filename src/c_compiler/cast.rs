//! The C backend's own view of the program: the AST re-built with a
//! scope attached to every node, produced by a single top-down pass that
//! also fills the scopes' `used` and `defined` sets.

use std::fmt;

use crate::lang::ast::{Expr, Module};

use super::scope::{ScopeId, Scopes};

#[derive(Debug)]
pub struct CNode {
    /// The scope the node occurs in.
    pub scope: ScopeId,
    pub kind: CKind,
}

#[derive(Debug)]
pub enum CKind {
    Number(String),
    Str(String),
    Name(String),
    Call {
        func: Box<CNode>,
        args: Vec<CNode>,
    },
    Variadic(Box<CNode>),
    List(Vec<CNode>),
    Block {
        /// The scope introduced by the block body.
        inner: ScopeId,
        params: Vec<String>,
        variadic: Option<(usize, String)>,
        statements: Vec<CNode>,
        ret: Option<Box<CNode>>,
    },
    Assign {
        name: String,
        value: Box<CNode>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// A name bound twice in the same scope.
    Redefined(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::Redefined(name) => {
                write!(f, "NameError: '{}' is already taken", name)
            }
        }
    }
}

impl std::error::Error for AnalysisError {}

pub struct Analysis {
    pub scopes: Scopes,
    pub statements: Vec<CNode>,
    pub module_scope: ScopeId,
}

pub fn analyze(module: &Module) -> Result<Analysis, AnalysisError> {
    let mut scopes = Scopes::new();
    let module_scope = scopes.root();
    let statements = analyze_statements(&mut scopes, module_scope, &module.statements)?;
    Ok(Analysis {
        scopes,
        statements,
        module_scope,
    })
}

/// Analyze additional statements against an existing scope; used by the
/// module entry point and to grow a REPL scope line by line.
pub fn analyze_statements(
    scopes: &mut Scopes,
    scope: ScopeId,
    statements: &[Expr],
) -> Result<Vec<CNode>, AnalysisError> {
    statements
        .iter()
        .map(|statement| walk(scopes, scope, statement))
        .collect()
}

fn walk(scopes: &mut Scopes, scope: ScopeId, expr: &Expr) -> Result<CNode, AnalysisError> {
    let kind = match expr {
        Expr::Number(lexeme) => CKind::Number(lexeme.clone()),
        Expr::Str(s) => CKind::Str(s.clone()),
        Expr::Name(name) => {
            scopes.mark_used(scope, name);
            CKind::Name(name.clone())
        }
        Expr::Assign { name, value } => {
            if !scopes.define(scope, name) {
                return Err(AnalysisError::Redefined(name.clone()));
            }
            CKind::Assign {
                name: name.clone(),
                value: Box::new(walk(scopes, scope, value)?),
            }
        }
        Expr::Block(block) => {
            let inner = scopes.child(scope);
            for param in &block.params {
                if !scopes.define(inner, param) {
                    return Err(AnalysisError::Redefined(param.clone()));
                }
            }
            if let Some((_, name)) = &block.variadic {
                if !scopes.define(inner, name) {
                    return Err(AnalysisError::Redefined(name.clone()));
                }
            }
            let statements = analyze_statements(scopes, inner, &block.statements)?;
            let ret = match &block.ret {
                Some(ret) => Some(Box::new(walk(scopes, inner, ret)?)),
                None => None,
            };
            // Captured names propagate upward, so that every enclosing
            // frame knows what it must be able to produce.
            for name in scopes.outer(inner) {
                scopes.mark_used(scope, &name);
            }
            CKind::Block {
                inner,
                params: block.params.clone(),
                variadic: block.variadic.clone(),
                statements,
                ret,
            }
        }
        Expr::List(items) => CKind::List(analyze_statements(scopes, scope, items)?),
        Expr::Call { func, args } => CKind::Call {
            func: Box::new(walk(scopes, scope, func)?),
            args: analyze_statements(scopes, scope, args)?,
        },
        Expr::Variadic(inner) => CKind::Variadic(Box::new(walk(scopes, scope, inner)?)),
    };
    Ok(CNode { scope, kind })
}

#[cfg(test)]
mod test {
    use super::super::scope::NameRef;
    use super::*;
    use crate::lang::parse_module;

    fn analyzed(input: &str) -> Analysis {
        analyze(&parse_module(input).unwrap()).unwrap()
    }

    /// The §-invariants of the analyzer: captured names are a subset of
    /// the used set, never locally defined, and every used name
    /// classifies as local, outer or builtin.
    fn check_invariants(analysis: &Analysis) {
        let mut stack = vec![analysis.module_scope];
        let mut blocks: Vec<&CNode> = analysis.statements.iter().collect();
        while let Some(node) = blocks.pop() {
            match &node.kind {
                CKind::Block {
                    inner,
                    statements,
                    ret,
                    ..
                } => {
                    stack.push(*inner);
                    blocks.extend(statements.iter());
                    if let Some(ret) = ret {
                        blocks.push(&**ret);
                    }
                }
                CKind::Call { func, args } => {
                    blocks.push(&**func);
                    blocks.extend(args.iter());
                }
                CKind::List(items) => blocks.extend(items.iter()),
                CKind::Variadic(inner) => blocks.push(&**inner),
                CKind::Assign { value, .. } => blocks.push(&**value),
                _ => {}
            }
        }

        for &id in &stack {
            let scope = analysis.scopes.get(id);
            let outer = analysis.scopes.outer(id);
            for name in &outer {
                assert!(scope.used.contains(name), "outer ⊆ used violated: {}", name);
                assert!(
                    !scope.defined.contains_key(name),
                    "defined ∩ outer non-empty: {}",
                    name
                );
            }
            for name in &scope.used {
                // resolution is total
                let _ = analysis.scopes.resolve(id, name);
            }
        }
    }

    #[test]
    fn closure_captures_are_classified() {
        let analysis = analyzed("make := [|x| [|y| x + y]]");
        check_invariants(&analysis);

        // module scope: `make` is local, `+` is builtin
        let root = analysis.module_scope;
        assert_eq!(
            analysis.scopes.resolve(root, "make"),
            NameRef::Local { slot: 0 }
        );

        // the inner block captures `x` from the outer block
        let outer_block = match &analysis.statements[0].kind {
            CKind::Assign { value, .. } => match &value.kind {
                CKind::Block { inner, ret, .. } => (inner, ret),
                other => panic!("expected block, got {:?}", other),
            },
            other => panic!("expected assignment, got {:?}", other),
        };
        let inner_block = match &outer_block.1.as_ref().unwrap().kind {
            CKind::Block { inner, .. } => *inner,
            other => panic!("expected block, got {:?}", other),
        };
        assert_eq!(analysis.scopes.outer(inner_block), vec!["x".to_owned()]);
        assert_eq!(
            analysis.scopes.resolve(inner_block, "x"),
            NameRef::Outer { depth: 1, slot: 0 }
        );
        assert_eq!(analysis.scopes.resolve(inner_block, "+"), NameRef::Builtin);

        // the capture propagated into the outer block's used set, where
        // it resolves locally and is therefore not captured again
        assert!(analysis.scopes.get(*outer_block.0).used.contains("x"));
        assert_eq!(analysis.scopes.outer(*outer_block.0), Vec::<String>::new());
    }

    #[test]
    fn transitive_captures_propagate() {
        let analysis = analyzed("f := [|x| [[x]]]");
        check_invariants(&analysis);
        // the innermost block captures x through the middle block
        let mut inner_most = None;
        let mut nodes: Vec<&CNode> = analysis.statements.iter().collect();
        while let Some(node) = nodes.pop() {
            match &node.kind {
                CKind::Block {
                    inner,
                    ret,
                    statements,
                    ..
                } => {
                    inner_most = Some(*inner);
                    nodes.extend(statements.iter());
                    if let Some(ret) = ret {
                        nodes.push(&**ret);
                    }
                }
                CKind::Assign { value, .. } => nodes.push(&**value),
                _ => {}
            }
        }
        let inner_most = inner_most.unwrap();
        assert_eq!(
            analysis.scopes.resolve(inner_most, "x"),
            NameRef::Outer { depth: 2, slot: 0 }
        );
    }

    #[test]
    fn double_definition_fails() {
        let result = analyze(&parse_module("x := 1; x := 2").unwrap());
        assert_eq!(result.err(), Some(AnalysisError::Redefined("x".into())));
    }

    #[test]
    fn variadic_parameter_defines_its_name() {
        let analysis = analyzed("f := [|a ...r b| r]");
        check_invariants(&analysis);
        let inner = match &analysis.statements[0].kind {
            CKind::Assign { value, .. } => match &value.kind {
                CKind::Block { inner, .. } => *inner,
                other => panic!("expected block, got {:?}", other),
            },
            other => panic!("expected assignment, got {:?}", other),
        };
        // definition order: fixed parameters first, then the variadic
        assert_eq!(analysis.scopes.resolve(inner, "a"), NameRef::Local { slot: 0 });
        assert_eq!(analysis.scopes.resolve(inner, "b"), NameRef::Local { slot: 1 });
        assert_eq!(analysis.scopes.resolve(inner, "r"), NameRef::Local { slot: 2 });
    }
}
