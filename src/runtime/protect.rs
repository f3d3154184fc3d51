//! Protection stack for handles held only by native code.
//!
//! The stack is a thread-local LIFO ledger. Native routines never touch it
//! directly: they open a [`ProtectScope`], route every intermediate through
//! [`ProtectScope::protect`], and the scope pops exactly what it pushed when it
//! is dropped.

use crate::runtime::value::Value;
use std::cell::RefCell;
use tracing::{error, trace};

thread_local! {
    static STACK: RefCell<Vec<Value>> = const { RefCell::new(Vec::new()) };
}

/// Current number of protected handles on this thread.
pub fn depth() -> usize {
    STACK.with(|stack| stack.borrow().len())
}

#[derive(Debug)]
pub struct ProtectScope {
    base: usize,
    acquired: usize,
}

impl ProtectScope {
    pub fn new() -> Self {
        Self {
            base: depth(),
            acquired: 0,
        }
    }

    pub fn protect(&mut self, value: Value) -> Value {
        STACK.with(|stack| stack.borrow_mut().push(value.clone()));
        self.acquired += 1;
        value
    }

    pub fn acquired(&self) -> usize {
        self.acquired
    }

    /// Releases everything this scope protected. Equivalent to dropping it.
    pub fn release(self) {}
}

impl Default for ProtectScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProtectScope {
    fn drop(&mut self) {
        STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            let expected = self.base + self.acquired;
            if stack.len() != expected {
                error!(
                    base = self.base,
                    acquired = self.acquired,
                    depth = stack.len(),
                    "protection stack misnested"
                );
            }
            stack.truncate(self.base);
        });
        trace!(released = self.acquired, depth = self.base, "protect scope closed");
    }
}
