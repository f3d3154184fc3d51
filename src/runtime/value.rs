use crate::runtime::{
    environment::Environment,
    error::RuntimeResult,
    interpreter::{CallContext, Interpreter},
};
use std::fmt;
use std::rc::Rc;

pub type NativeFn = Rc<dyn Fn(&mut Interpreter, &CallContext, Vec<Arg>) -> RuntimeResult<Value>>;

/// A handle to a host object. Cloning is cheap and shares the underlying object.
#[derive(Clone)]
pub enum Value {
    Null,
    Logical(bool),
    Double(f64),
    Integer(i64),
    Str(Rc<str>),
    Symbol(Rc<str>),
    List(ListValue),
    Call(Rc<CallExpr>),
    Closure(Rc<Closure>),
    Builtin(Rc<Builtin>),
    Environment(Environment),
    /// Marks a formal parameter that was neither supplied nor defaulted.
    Missing,
}

impl Value {
    pub fn string(text: impl Into<Rc<str>>) -> Self {
        Value::Str(text.into())
    }

    pub fn symbol(name: impl Into<Rc<str>>) -> Self {
        Value::Symbol(name.into())
    }

    pub fn call(function: Value, args: Vec<Arg>) -> Self {
        Value::Call(Rc::new(CallExpr { function, args }))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(ListValue::new(items, None))
    }

    /// Wraps symbols and calls in `quote()` so that evaluating the result
    /// yields `self` instead of looking it up or calling it.
    pub fn quoted(&self) -> Value {
        match self {
            Value::Symbol(_) | Value::Call(_) => {
                Value::call(Value::symbol("quote"), vec![Arg::positional(self.clone())])
            }
            other => other.clone(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Logical(_) => "logical",
            Value::Double(_) => "double",
            Value::Integer(_) => "integer",
            Value::Str(_) => "character",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
            Value::Call(_) => "language",
            Value::Closure(_) => "closure",
            Value::Builtin(_) => "builtin",
            Value::Environment(_) => "environment",
            Value::Missing => "missing",
        }
    }

    pub fn is_vector(&self) -> bool {
        matches!(
            self,
            Value::Null
                | Value::Logical(_)
                | Value::Double(_)
                | Value::Integer(_)
                | Value::Str(_)
                | Value::List(_)
        )
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Value::Closure(_) | Value::Builtin(_))
    }

    pub fn length(&self) -> usize {
        match self {
            Value::Null | Value::Missing => 0,
            Value::List(list) => list.len(),
            Value::Call(call) => call.args.len() + 1,
            Value::Environment(env) => env.len(),
            _ => 1,
        }
    }

    /// Elements visited when mapping over a value. A call yields its function
    /// followed by its argument values.
    pub fn elements(&self) -> Vec<Value> {
        match self {
            Value::Null => Vec::new(),
            Value::List(list) => list.items.to_vec(),
            Value::Call(call) => std::iter::once(call.function.clone())
                .chain(call.args.iter().map(|arg| arg.value.clone()))
                .collect(),
            other => vec![other.clone()],
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(text) | Value::Symbol(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Double(value) => Some(*value),
            Value::Integer(value) => Some(*value as f64),
            Value::Logical(value) => Some(if *value { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) | (Value::Missing, Value::Missing) => true,
            (Value::Logical(a), Value::Logical(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Str(a), Value::Str(b)) | (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::List(a), Value::List(b)) => a.items == b.items && a.names == b.names,
            (Value::Call(a), Value::Call(b)) => Rc::ptr_eq(a, b) || a == b,
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => Rc::ptr_eq(a, b),
            (Value::Environment(a), Value::Environment(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Logical(true) => write!(f, "TRUE"),
            Value::Logical(false) => write!(f, "FALSE"),
            Value::Double(value) => write!(f, "{value}"),
            Value::Integer(value) => write!(f, "{value}L"),
            Value::Str(text) => write!(f, "{text:?}"),
            Value::Symbol(name) => write!(f, "{name}"),
            Value::List(list) => {
                write!(f, "list(")?;
                for (idx, item) in list.items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    match list.name(idx) {
                        Some(name) => write!(f, "{name} = {item}")?,
                        None => write!(f, "{item}")?,
                    }
                }
                write!(f, ")")
            }
            Value::Call(call) => write!(f, "{call}"),
            Value::Closure(closure) => {
                write!(f, "function(")?;
                for (idx, formal) in closure.formals.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    match &formal.default {
                        Some(default) => write!(f, "{} = {}", formal.name, default)?,
                        None => write!(f, "{}", formal.name)?,
                    }
                }
                write!(f, ") {}", closure.body)
            }
            Value::Builtin(builtin) => write!(f, "<builtin: {}>", builtin.name),
            Value::Environment(env) => write!(f, "{env:?}"),
            Value::Missing => Ok(()),
        }
    }
}

#[derive(Clone, PartialEq)]
pub struct ListValue {
    pub items: Rc<Vec<Value>>,
    pub names: Option<Rc<Vec<String>>>,
}

impl ListValue {
    pub fn new(items: Vec<Value>, names: Option<Vec<String>>) -> Self {
        Self {
            items: Rc::new(items),
            names: names.map(Rc::new),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names
            .as_ref()
            .and_then(|names| names.get(index))
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }
}

/// One argument slot of a call: an optional name tag and a value.
#[derive(Clone, Debug, PartialEq)]
pub struct Arg {
    pub tag: Option<String>,
    pub value: Value,
}

impl Arg {
    pub fn positional(value: Value) -> Self {
        Self { tag: None, value }
    }

    pub fn named(tag: impl Into<String>, value: Value) -> Self {
        Self {
            tag: Some(tag.into()),
            value,
        }
    }
}

/// An unevaluated function call.
#[derive(Clone, Debug, PartialEq)]
pub struct CallExpr {
    pub function: Value,
    pub args: Vec<Arg>,
}

impl CallExpr {
    pub fn new(function: Value) -> Self {
        Self {
            function,
            args: Vec::new(),
        }
    }

    /// Appends an untagged slot and returns its position.
    pub fn push(&mut self, value: Value) -> usize {
        self.args.push(Arg::positional(value));
        self.args.len() - 1
    }

    pub fn set_tag(&mut self, position: usize, tag: &str) {
        if let Some(arg) = self.args.get_mut(position) {
            arg.tag = Some(tag.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

impl fmt::Display for CallExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Value::Symbol(op), [ns, name]) = (&self.function, self.args.as_slice()) {
            if &**op == ":::" || &**op == "::" {
                return write!(f, "{}{}{}", ns.value, op, name.value);
            }
        }
        write!(f, "{}(", self.function)?;
        for (idx, arg) in self.args.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            match &arg.tag {
                Some(tag) => write!(f, "{tag} = {}", arg.value)?,
                None => write!(f, "{}", arg.value)?,
            }
        }
        write!(f, ")")
    }
}

#[derive(Clone, Debug)]
pub struct Formal {
    pub name: String,
    pub default: Option<Value>,
}

#[derive(Debug)]
pub struct Closure {
    pub formals: Vec<Formal>,
    pub body: Value,
    pub env: Environment,
}

impl Closure {
    pub fn new(formals: Vec<Formal>, body: Value, env: Environment) -> Self {
        Self { formals, body, env }
    }
}

pub struct Builtin {
    pub name: String,
    /// Special builtins receive their arguments unevaluated.
    pub special: bool,
    pub func: NativeFn,
}

impl Builtin {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&mut Interpreter, &CallContext, Vec<Arg>) -> RuntimeResult<Value> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            special: false,
            func: Rc::new(func),
        }
    }

    pub fn special(
        name: impl Into<String>,
        func: impl Fn(&mut Interpreter, &CallContext, Vec<Arg>) -> RuntimeResult<Value> + 'static,
    ) -> Self {
        Self {
            special: true,
            ..Self::new(name, func)
        }
    }

    pub fn into_value(self) -> Value {
        Value::Builtin(Rc::new(self))
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("special", &self.special)
            .finish()
    }
}
