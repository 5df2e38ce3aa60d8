//! Compile-time scopes: the static counterpart to runtime frames. Scopes
//! are created during analysis and never mutated afterwards.

use std::collections::BTreeSet;

use indexmap::IndexMap;

/// Identifies a scope within a [`Scopes`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeId(usize);

#[derive(Debug, Default)]
pub struct Scope {
    /// Names referenced in this scope, including those captured by
    /// nested scopes.
    pub used: BTreeSet<String>,
    /// Names bound in this scope, in definition order. The position
    /// doubles as the struct-field and slot index.
    pub defined: IndexMap<String, usize>,
    pub parent: Option<ScopeId>,
}

/// How a name reference resolves against a scope chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameRef {
    /// Defined in the scope itself.
    Local { slot: usize },
    /// Defined in an ancestor scope, `depth` hops up the parent chain.
    Outer { depth: usize, slot: usize },
    /// Defined nowhere; the runtime registry must produce it.
    Builtin,
}

#[derive(Debug)]
pub struct Scopes {
    arena: Vec<Scope>,
}

impl Scopes {
    /// A fresh arena containing only the root scope.
    pub fn new() -> Scopes {
        Scopes {
            arena: vec![Scope::default()],
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn child(&mut self, parent: ScopeId) -> ScopeId {
        self.arena.push(Scope {
            parent: Some(parent),
            ..Scope::default()
        });
        ScopeId(self.arena.len() - 1)
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.arena[id.0]
    }

    pub fn mark_used(&mut self, id: ScopeId, name: &str) {
        self.arena[id.0].used.insert(name.to_owned());
    }

    /// Bind a name in the scope; `false` if it was already bound there.
    pub fn define(&mut self, id: ScopeId, name: &str) -> bool {
        let defined = &mut self.arena[id.0].defined;
        if defined.contains_key(name) {
            false
        } else {
            let index = defined.len();
            defined.insert(name.to_owned(), index);
            true
        }
    }

    pub fn resolve(&self, id: ScopeId, name: &str) -> NameRef {
        let mut depth = 0;
        let mut current = id;
        loop {
            let scope = self.get(current);
            if let Some(&slot) = scope.defined.get(name) {
                return if depth == 0 {
                    NameRef::Local { slot }
                } else {
                    NameRef::Outer { depth, slot }
                };
            }
            match scope.parent {
                Some(parent) => {
                    depth += 1;
                    current = parent;
                }
                None => return NameRef::Builtin,
            }
        }
    }

    /// The captured names of a scope: used here, defined in an ancestor.
    /// Sorted, so that emission is deterministic.
    pub fn outer(&self, id: ScopeId) -> Vec<String> {
        self.get(id)
            .used
            .iter()
            .filter(|name| matches!(self.resolve(id, name), NameRef::Outer { .. }))
            .cloned()
            .collect()
    }
}

/// Language keywords that would collide with C keywords when used as
/// field identifiers.
const KEYWORDS: [&str; 6] = ["if", "else", "while", "do", "false", "true"];

/// Translate a language name into a C identifier. Operators never go
/// through here; they dispatch through the operator table instead.
pub fn c_name(name: &str) -> String {
    if name == "..." {
        return "_dot_dot_dot".to_owned();
    }
    if KEYWORDS.contains(&name) {
        format!("{}_", name)
    } else {
        name.to_owned()
    }
}

/// The field of the runtime's `operators` table an operator name
/// dispatches through.
pub fn operator_field(name: &str) -> Option<&'static str> {
    Some(match name {
        ";" => "semicolon",
        "+" => "add",
        "-" => "sub",
        "*" => "mul",
        "/" => "div",
        "**" => "pow",
        "=" => "eq",
        "!=" => "ne",
        ">" => "gt",
        ">=" => "ge",
        "<" => "lt",
        "<=" => "le",
        "<-" => "store",
        "!" => "load",
        _ => return None,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn resolution_kinds() {
        let mut scopes = Scopes::new();
        let root = scopes.root();
        scopes.define(root, "a");
        let inner = scopes.child(root);
        scopes.define(inner, "b");

        assert_eq!(scopes.resolve(inner, "b"), NameRef::Local { slot: 0 });
        assert_eq!(
            scopes.resolve(inner, "a"),
            NameRef::Outer { depth: 1, slot: 0 }
        );
        assert_eq!(scopes.resolve(inner, "print"), NameRef::Builtin);
        assert_eq!(scopes.resolve(root, "a"), NameRef::Local { slot: 0 });
    }

    #[test]
    fn define_is_single_assignment() {
        let mut scopes = Scopes::new();
        let root = scopes.root();
        assert!(scopes.define(root, "x"));
        assert!(!scopes.define(root, "x"));
    }

    #[test]
    fn outer_names_are_sorted_and_exclude_builtins() {
        let mut scopes = Scopes::new();
        let root = scopes.root();
        scopes.define(root, "b");
        scopes.define(root, "a");
        let inner = scopes.child(root);
        scopes.mark_used(inner, "b");
        scopes.mark_used(inner, "a");
        scopes.mark_used(inner, "print");
        assert_eq!(scopes.outer(inner), vec!["a".to_owned(), "b".to_owned()]);
    }

    #[test]
    fn name_translation() {
        assert_eq!(c_name("x"), "x");
        assert_eq!(c_name("while"), "while_");
        assert_eq!(c_name("..."), "_dot_dot_dot");
        assert_eq!(operator_field("**"), Some("pow"));
        assert_eq!(operator_field("<-"), Some("store"));
        assert_eq!(operator_field("x"), None);
    }
}
