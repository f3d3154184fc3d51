use crate::runtime::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

struct Frame {
    label: Option<String>,
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Environment>,
}

/// A lexical scope. Clones share the same scope; equality is identity.
#[derive(Clone)]
pub struct Environment(Rc<Frame>);

/// A handle that does not keep its scope alive.
#[derive(Clone)]
pub struct WeakEnvironment(Weak<Frame>);

impl WeakEnvironment {
    pub fn upgrade(&self) -> Option<Environment> {
        self.0.upgrade().map(Environment)
    }

    pub fn is_live(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl Environment {
    /// The root scope. It has no parent and nothing is ever looked up through it.
    pub fn empty() -> Self {
        Self::build(Some("R_EmptyEnv".into()), None)
    }

    pub fn child_of(parent: &Environment) -> Self {
        Self::build(None, Some(parent.clone()))
    }

    pub fn labelled(label: impl Into<String>, parent: &Environment) -> Self {
        Self::build(Some(label.into()), Some(parent.clone()))
    }

    fn build(label: Option<String>, parent: Option<Environment>) -> Self {
        Self(Rc::new(Frame {
            label,
            bindings: RefCell::new(HashMap::new()),
            parent,
        }))
    }

    pub fn define(&self, name: &str, value: Value) {
        self.0.bindings.borrow_mut().insert(name.to_string(), value);
    }

    pub fn get_local(&self, name: &str) -> Option<Value> {
        self.0.bindings.borrow().get(name).cloned()
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut current = Some(self);
        while let Some(env) = current {
            if let Some(value) = env.get_local(name) {
                return Some(value);
            }
            current = env.parent();
        }
        None
    }

    /// Like [`Environment::lookup`] but skips bindings that are not functions.
    pub fn lookup_function(&self, name: &str) -> Option<Value> {
        let mut current = Some(self);
        while let Some(env) = current {
            if let Some(value) = env.get_local(name).filter(Value::is_function) {
                return Some(value);
            }
            current = env.parent();
        }
        None
    }

    pub fn parent(&self) -> Option<&Environment> {
        self.0.parent.as_ref()
    }

    pub fn label(&self) -> Option<&str> {
        self.0.label.as_deref()
    }

    pub fn len(&self) -> usize {
        self.0.bindings.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn downgrade(&self) -> WeakEnvironment {
        WeakEnvironment(Rc::downgrade(&self.0))
    }

    /// Drops every binding. A closure defined in a scope keeps that scope
    /// alive through its own `env`, so cycles are only broken here.
    pub fn clear(&self) {
        let bindings = std::mem::take(&mut *self.0.bindings.borrow_mut());
        drop(bindings);
    }

    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Environment {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label() {
            Some(label) => write!(f, "<environment: {label}>"),
            None => write!(f, "<environment: {:p}>", Rc::as_ptr(&self.0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_parents() {
        let root = Environment::empty();
        let outer = Environment::labelled("outer", &root);
        outer.define("x", Value::Integer(1));
        let inner = Environment::child_of(&outer);
        assert_eq!(inner.lookup("x"), Some(Value::Integer(1)));
        assert_eq!(inner.get_local("x"), None);
        assert_eq!(inner.lookup("y"), None);
    }

    #[test]
    fn function_lookup_skips_shadowing_values() {
        let root = Environment::empty();
        let outer = Environment::child_of(&root);
        let list = Value::list(Vec::new());
        let builtin = crate::runtime::value::Builtin::new("f", |_, _, _| Ok(Value::Null))
            .into_value();
        outer.define("f", builtin.clone());
        let inner = Environment::child_of(&outer);
        inner.define("f", list);
        assert_eq!(inner.lookup_function("f"), Some(builtin));
    }

    #[test]
    fn identity_not_contents() {
        let root = Environment::empty();
        let a = Environment::child_of(&root);
        let b = Environment::child_of(&root);
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
        assert!(root.parent().is_none());
        assert_eq!(a.parent(), Some(&root));
    }

    #[test]
    fn clear_breaks_closure_cycles() {
        let root = Environment::empty();
        let scope = Environment::child_of(&root);
        let closure = crate::runtime::value::Closure::new(Vec::new(), Value::Null, scope.clone());
        scope.define("f", Value::Closure(Rc::new(closure)));
        let weak = scope.downgrade();
        scope.clear();
        drop(scope);
        assert!(!weak.is_live());
        assert!(weak.upgrade().is_none());
    }
}
