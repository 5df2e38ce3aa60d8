use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::rc::Rc;

use crate::ast_compiler;
use crate::decimal::Decimal;
use crate::lang::ast;

use super::{EvalResult, Interpreter};

/// Evaluating expressions results in values.
///
/// Values should be small enough so that they can be cloned without a big
/// performance hit; anything bigger sits behind an `Rc`.
#[derive(Debug, Clone)]
pub enum Value {
    /// The null singleton
    Null,
    /// A boolean
    Bool(bool),
    /// An arbitrary-precision decimal number
    Number(Decimal),
    /// A string with escape sequences already resolved
    Str(Rc<str>),
    /// A list of fully evaluated values
    List(Rc<[Value]>),
    /// A code block, optionally carrying the frame it captured
    Block(Rc<BlockValue>),
    /// A native callable from the registry
    Builtin(Builtin),
    /// A mutable cell, the only value with interior mutability
    Reference(Rc<RefCell<Value>>),
    /// An open file handle, produced by `withOpenFile`
    File(FileHandle),
}

/// The function type behind builtin values. Builtins receive their
/// arguments already evaluated, and may call back into the evaluator for
/// block arguments.
pub type BuiltinFn = fn(&mut Interpreter, Vec<Value>) -> EvalResult<Value>;

/// A primitive operation exposed to the interpreted language.
#[derive(Copy, Clone)]
pub struct Builtin {
    pub name: &'static str,
    pub run: BuiltinFn,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Builtin(<{}>)", self.name)
    }
}

impl PartialEq for Builtin {
    fn eq(&self, other: &Self) -> bool {
        let self_ptr = self.run as *const ();
        let other_ptr = other.run as *const ();
        self_ptr == other_ptr
    }
}
impl Eq for Builtin {}

/// A code block value: code plus the frame that was active when the
/// block literal was evaluated. Calling it pushes a new frame whose
/// parent is the captured one.
#[derive(Debug, Clone)]
pub enum BlockValue {
    /// A block evaluated by the tree-walking interpreter. `captured` is
    /// `None` only for block literals that are invoked without having
    /// been evaluated (the top-level module); callers then nest the
    /// current frame instead.
    Source {
        code: Rc<ast::Block>,
        captured: Option<FrameRef>,
    },
    /// A block compiled to resolved ops, capturing a slot frame.
    Compiled {
        code: Rc<ast_compiler::BlockCode>,
        captured: ast_compiler::SlotFrameRef,
    },
}

/// A file handle passed to the action of `withOpenFile`; emptied when the
/// action returns, so that escaped handles fail cleanly.
#[derive(Debug, Clone)]
pub struct FileHandle(pub Rc<RefCell<Option<fs::File>>>);

impl FileHandle {
    pub fn new(file: fs::File) -> Self {
        FileHandle(Rc::new(RefCell::new(Some(file))))
    }
}

impl Value {
    pub fn string(s: &str) -> Value {
        Value::Str(s.into())
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(items.into())
    }

    /// Only `Null` and `false` are falsy.
    pub fn truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Bool(false))
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Block(_) | Value::Builtin(_))
    }

    /// The name of the value's shape, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Block(_) => "code block",
            Value::Builtin(_) => "builtin",
            Value::Reference(_) => "reference",
            Value::File(_) => "file",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(x), Value::Bool(y)) => x == y,
            (Value::Number(x), Value::Number(y)) => x == y,
            (Value::Str(x), Value::Str(y)) => x == y,
            (Value::List(x), Value::List(y)) => x == y,
            // blocks and builtins compare by identity
            (Value::Block(x), Value::Block(y)) => Rc::ptr_eq(x, y),
            (Value::Builtin(x), Value::Builtin(y)) => x == y,
            (Value::Reference(x), Value::Reference(y)) => Rc::ptr_eq(x, y),
            (Value::File(x), Value::File(y)) => Rc::ptr_eq(&x.0, &y.0),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(true) => write!(f, "true"),
            Value::Bool(false) => write!(f, "false"),
            Value::Number(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "}}")
            }
            Value::Block(_) => write!(f, "<code block>"),
            Value::Builtin(b) => write!(f, "<{}>", b.name),
            Value::Reference(_) => write!(f, "<reference>"),
            Value::File(_) => write!(f, "<file>"),
        }
    }
}

/// A reference to a shared frame.
pub type FrameRef = Rc<RefCell<Frame>>;

/// A runtime scope for names. Frames are lexically chained and names are
/// single-assignment within a frame.
#[derive(Debug, Clone)]
pub struct Frame {
    bindings: HashMap<String, Value>,
    parent: Option<FrameRef>,
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
            parent: None,
        }
    }

    /// Wrap this frame into a `FrameRef`.
    pub fn into_ref(self) -> FrameRef {
        Rc::new(RefCell::new(self))
    }

    /// Create a nested frame inside the given parent frame.
    pub fn nest(parent: FrameRef) -> Self {
        Self {
            bindings: HashMap::new(),
            parent: Some(parent),
        }
    }

    /// Return a reference to the parent frame, if any.
    pub fn parent(&self) -> Option<FrameRef> {
        self.parent.clone()
    }

    /// Bind a name in this frame, if possible. On success, it returns
    /// `None`, otherwise it gives the arguments back to the caller;
    /// names are never rebound within a frame.
    pub fn define(&mut self, name: String, value: Value) -> Option<(String, Value)> {
        if self.bindings.get(&name).is_none() {
            self.bindings.insert(name, value);
            None
        } else {
            Some((name, value))
        }
    }

    /// Return a copy of the value of the given name, walking parent
    /// frames, or `None` if it is not bound anywhere.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.get(name) {
            Some(value.clone())
        } else if let Some(parent) = self.parent.as_ref() {
            parent.borrow().lookup(name)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Null.truthy());
        assert!(!Value::Bool(false).truthy());
        assert!(Value::Bool(true).truthy());
        assert!(Value::Number(Decimal::zero()).truthy());
        assert!(Value::string("").truthy());
        assert!(Value::list(vec![]).truthy());
    }

    #[test]
    fn display() {
        assert_eq!(Value::Null.to_string(), "Null");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Number(Decimal::from_int(120)).to_string(), "120");
        assert_eq!(Value::string("x").to_string(), "x");
        assert_eq!(
            Value::list(vec![
                Value::Number(Decimal::from_int(1)),
                Value::string("a")
            ])
            .to_string(),
            "{1, a}"
        );
    }

    #[test]
    fn equality() {
        assert_eq!(Value::string("ab"), Value::string("ab"));
        assert_eq!(
            Value::list(vec![Value::Null]),
            Value::list(vec![Value::Null])
        );
        assert_ne!(Value::Null, Value::Bool(false));
        let r = Value::Reference(Rc::new(RefCell::new(Value::Null)));
        assert_eq!(r.clone(), r);
        assert_ne!(r, Value::Reference(Rc::new(RefCell::new(Value::Null))));
    }

    #[test]
    fn frames_are_single_assignment() {
        let mut frame = Frame::new();
        assert!(frame.define("x".into(), Value::Null).is_none());
        assert!(frame.define("x".into(), Value::Bool(true)).is_some());
    }

    #[test]
    fn lookup_walks_parents() {
        let mut root = Frame::new();
        root.define("x".into(), Value::Bool(true));
        let child = Frame::nest(root.into_ref());
        assert_eq!(child.lookup("x"), Some(Value::Bool(true)));
        assert_eq!(child.lookup("y"), None);
    }
}
