use crate::language::parser::parse_program;
use crate::runtime::{
    environment::Environment,
    error::{RuntimeError, RuntimeResult},
    protect::ProtectScope,
    value::{Closure, Value},
    Interpreter,
};
use std::cell::OnceCell;
use std::rc::Rc;
use tracing::debug;

/// Builds `sys.frame(-1)` as an unevaluated call. The `-1` assumes the lookup
/// runs inside exactly one frame of its own (the throwaway closure below);
/// revisit it if that changes.
const CALLER_FRAME_SNIPPET: &str = "as.call(list(sys.frame, -1))";

thread_local! {
    static CALLER_FRAME_EXPR: OnceCell<Value> = const { OnceCell::new() };
}

fn caller_frame_expr() -> RuntimeResult<Value> {
    CALLER_FRAME_EXPR.with(|cell| -> RuntimeResult<Value> {
        if let Some(expr) = cell.get() {
            return Ok(expr.clone());
        }
        let expr = parse_program(CALLER_FRAME_SNIPPET)?
            .into_iter()
            .next()
            .ok_or_else(|| RuntimeError::TypeMismatch {
                message: "caller frame snippet is empty".into(),
            })?;
        Ok(cell.get_or_init(|| expr).clone())
    })
}

/// Returns the scope of the script function that called the native entry
/// point currently running, or the global scope at top level.
///
/// The lookup is wrapped in a zero-argument closure whose scope is the empty
/// environment and which is itself called from the empty environment, so the
/// frame arithmetic is the same no matter which native helper asks and no
/// binding from a real calling scope can leak into the lookup.
pub fn resolve_caller_environment(host: &mut Interpreter) -> RuntimeResult<Environment> {
    let mut scope = ProtectScope::new();
    let parsed = scope.protect(caller_frame_expr()?);
    let base = host.base_env();
    let body = scope.protect(host.eval(&parsed, &base)?);

    let empty = host.empty_env();
    let closure = scope.protect(Value::Closure(Rc::new(Closure::new(
        Vec::new(),
        body,
        empty.clone(),
    ))));
    let call = scope.protect(Value::call(closure, Vec::new()));
    let out = scope.protect(host.eval(&call, &empty)?);

    match out {
        Value::Environment(env) => {
            debug!(caller = ?env, depth = host.frames().depth(), "resolved caller frame");
            Ok(env)
        }
        other => Err(RuntimeError::TypeMismatch {
            message: format!("caller frame lookup returned {}", other.type_name()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostConfig;
    use crate::runtime::{
        protect,
        value::{Arg, Builtin},
    };
    use std::cell::RefCell;

    /// Installs `where_am_i()`, a native entry point that records the resolved
    /// caller scope.
    fn host_with_recorder() -> (Interpreter, Rc<RefCell<Option<Environment>>>) {
        let mut host = Interpreter::new(HostConfig::default());
        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        host.define_builtin(Builtin::new("where_am_i", move |host, _, _: Vec<Arg>| {
            let env = resolve_caller_environment(host)?;
            *sink.borrow_mut() = Some(env);
            Ok(Value::Null)
        }));
        (host, seen)
    }

    #[test]
    fn resolves_the_function_that_called_the_native_entry_point() {
        let (mut host, seen) = host_with_recorder();
        let global = host.global_env();
        let here = host
            .eval_str("f <- function(x) { where_am_i(); environment() }\nf(1)", &global)
            .expect("eval");
        let Value::Environment(frame) = here else {
            panic!("expected an environment");
        };
        let resolved = seen.borrow().clone().expect("where_am_i ran");
        assert_eq!(resolved, frame);
        assert_eq!(resolved.get_local("x"), Some(Value::Double(1.0)));
        assert_eq!(host.frames().depth(), 0);
    }

    #[test]
    fn resolves_the_innermost_caller_when_nested() {
        let (mut host, seen) = host_with_recorder();
        let global = host.global_env();
        host.eval_str(
            "inner <- function(tag) where_am_i()\nouter <- function() inner(\"inner\")\nouter()",
            &global,
        )
        .expect("eval");
        let resolved = seen.borrow().clone().expect("where_am_i ran");
        assert_eq!(resolved.get_local("tag"), Some(Value::string("inner")));
    }

    #[test]
    fn top_level_caller_is_the_global_scope() {
        let (mut host, seen) = host_with_recorder();
        let global = host.global_env();
        host.eval_str("where_am_i()", &global).expect("eval");
        assert_eq!(seen.borrow().clone(), Some(global));
    }

    #[test]
    fn leaves_the_protection_stack_balanced() {
        let (mut host, _) = host_with_recorder();
        let global = host.global_env();
        let before = protect::depth();
        host.eval_str("where_am_i()", &global).expect("eval");
        assert_eq!(protect::depth(), before);
    }

    #[test]
    fn snippet_is_parsed_once_per_thread() {
        let first = caller_frame_expr().expect("parse");
        let second = caller_frame_expr().expect("parse");
        let (Value::Call(a), Value::Call(b)) = (&first, &second) else {
            panic!("expected calls");
        };
        assert!(Rc::ptr_eq(a, b));
    }
}
