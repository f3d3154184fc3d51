use crate::runtime::{
    args::{match_arguments, required},
    error::{Condition, RuntimeError, RuntimeResult},
    interpreter::{CallContext, Interpreter},
    value::{Arg, Builtin, CallExpr, Closure, Formal, ListValue, Value},
};
use std::rc::Rc;

pub fn install(host: &mut Interpreter) {
    host.define_builtin(Builtin::special("quote", quote));
    host.define_builtin(Builtin::special("function", function));
    host.define_builtin(Builtin::special("{", block));
    host.define_builtin(Builtin::special("<-", assign));
    host.define_builtin(Builtin::special(":::", namespace_get));
    host.define_builtin(Builtin::special("::", namespace_get));
    host.define_builtin(Builtin::new("list", list));
    host.define_builtin(Builtin::new("as.call", as_call));
    host.define_builtin(Builtin::new("sys.frame", sys_frame));
    host.define_builtin(Builtin::new("environment", |_, ctx, _| {
        Ok(Value::Environment(ctx.env.clone()))
    }));
    host.define_builtin(Builtin::new("emptyenv", |host, _, _| {
        Ok(Value::Environment(host.empty_env()))
    }));
    host.define_builtin(Builtin::new("baseenv", |host, _, _| {
        Ok(Value::Environment(host.base_env()))
    }));
    host.define_builtin(Builtin::new("globalenv", |host, _, _| {
        Ok(Value::Environment(host.global_env()))
    }));
    host.define_builtin(Builtin::new("identical", identical));
    host.define_builtin(Builtin::new("length", length));
    host.define_builtin(Builtin::new("stop", stop));
}

fn quote(_: &mut Interpreter, _: &CallContext, args: Vec<Arg>) -> RuntimeResult<Value> {
    let mut slots = match_arguments("quote", &["expr"], args)?;
    required("quote", "expr", slots.remove(0))
}

/// `function(formals, body)`; the parser encodes formals as a named list whose
/// values are the defaults, with `Missing` for "no default".
fn function(_: &mut Interpreter, ctx: &CallContext, args: Vec<Arg>) -> RuntimeResult<Value> {
    let mut slots = match_arguments("function", &["formals", "body"], args)?.into_iter();
    let formals = match slots.next().flatten() {
        Some(Value::List(list)) => (0..list.len())
            .map(|index| Formal {
                name: list.name(index).unwrap_or_default().to_string(),
                default: match &list.items[index] {
                    Value::Missing => None,
                    default => Some(default.clone()),
                },
            })
            .collect(),
        None | Some(Value::Null) => Vec::new(),
        Some(other) => {
            return Err(RuntimeError::TypeMismatch {
                message: format!("invalid formal argument list of type {}", other.type_name()),
            })
        }
    };
    let body = slots.next().flatten().unwrap_or(Value::Null);
    Ok(Value::Closure(Rc::new(Closure::new(
        formals,
        body,
        ctx.env.clone(),
    ))))
}

fn block(host: &mut Interpreter, ctx: &CallContext, args: Vec<Arg>) -> RuntimeResult<Value> {
    let mut last = Value::Null;
    for arg in &args {
        last = host.eval(&arg.value, &ctx.env)?;
    }
    Ok(last)
}

fn assign(host: &mut Interpreter, ctx: &CallContext, args: Vec<Arg>) -> RuntimeResult<Value> {
    let mut slots = match_arguments("<-", &["target", "value"], args)?.into_iter();
    let target = required("<-", "target", slots.next().flatten())?;
    let expr = required("<-", "value", slots.next().flatten())?;
    let name = match target {
        Value::Symbol(name) => name,
        other => {
            return Err(RuntimeError::TypeMismatch {
                message: format!("invalid assignment target {other}"),
            })
        }
    };
    let value = host.eval(&expr, &ctx.env)?;
    ctx.env.define(&name, value.clone());
    Ok(value)
}

fn namespace_get(host: &mut Interpreter, ctx: &CallContext, args: Vec<Arg>) -> RuntimeResult<Value> {
    let op = ctx.call.function.to_string();
    let mut slots = match_arguments(&op, &["pkg", "name"], args)?.into_iter();
    let name_of = |slot: Option<Option<Value>>, formal: &str| {
        let value = required(&op, formal, slot.flatten())?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| RuntimeError::TypeMismatch {
                message: format!("`{op}` expects a name, received {}", value.type_name()),
            })
    };
    let pkg = name_of(slots.next(), "pkg")?;
    let name = name_of(slots.next(), "name")?;
    host.namespace(&pkg)?
        .get_local(&name)
        .ok_or(RuntimeError::UnknownExport {
            namespace: pkg,
            name,
        })
}

fn list(_: &mut Interpreter, _: &CallContext, args: Vec<Arg>) -> RuntimeResult<Value> {
    let named = args.iter().any(|arg| arg.tag.is_some());
    let mut items = Vec::with_capacity(args.len());
    let mut names = Vec::with_capacity(args.len());
    for arg in args {
        names.push(arg.tag.unwrap_or_default());
        items.push(arg.value);
    }
    Ok(Value::List(ListValue::new(items, named.then_some(names))))
}

/// Turns `list(f, a, b = c)` into the unevaluated call `f(a, b = c)`.
fn as_call(_: &mut Interpreter, _: &CallContext, args: Vec<Arg>) -> RuntimeResult<Value> {
    let mut slots = match_arguments("as.call", &["x"], args)?;
    let Value::List(list) = required("as.call", "x", slots.remove(0))? else {
        return Err(RuntimeError::TypeMismatch {
            message: "invalid argument list".into(),
        });
    };
    let Some(function) = list.items.first() else {
        return Err(RuntimeError::TypeMismatch {
            message: "invalid argument list".into(),
        });
    };
    let mut call = CallExpr::new(function.clone());
    for (index, item) in list.items.iter().enumerate().skip(1) {
        let position = call.push(item.clone());
        if let Some(name) = list.name(index) {
            call.set_tag(position, name);
        }
    }
    Ok(Value::Call(Rc::new(call)))
}

fn sys_frame(host: &mut Interpreter, ctx: &CallContext, args: Vec<Arg>) -> RuntimeResult<Value> {
    let mut slots = match_arguments("sys.frame", &["which"], args)?;
    let which = match slots.remove(0) {
        None => 0,
        Some(value) => match value.as_number() {
            Some(number) if number.fract() == 0.0 => number as i64,
            _ => {
                return Err(RuntimeError::TypeMismatch {
                    message: format!("invalid `which` argument {value}"),
                })
            }
        },
    };
    let current = host.frames().frame_number(&ctx.env);
    let global = host.global_env();
    let env = host.frames().sys_frame(which, current, &global)?;
    Ok(Value::Environment(env))
}

fn identical(_: &mut Interpreter, _: &CallContext, args: Vec<Arg>) -> RuntimeResult<Value> {
    let mut slots = match_arguments("identical", &["x", "y"], args)?.into_iter();
    let x = required("identical", "x", slots.next().flatten())?;
    let y = required("identical", "y", slots.next().flatten())?;
    Ok(Value::Logical(x == y))
}

fn length(_: &mut Interpreter, _: &CallContext, args: Vec<Arg>) -> RuntimeResult<Value> {
    let mut slots = match_arguments("length", &["x"], args)?;
    let x = required("length", "x", slots.remove(0))?;
    Ok(Value::Integer(x.length() as i64))
}

fn stop(_: &mut Interpreter, ctx: &CallContext, args: Vec<Arg>) -> RuntimeResult<Value> {
    let mut message = String::new();
    for arg in &args {
        match &arg.value {
            Value::Str(text) => message.push_str(text),
            other => message.push_str(&other.to_string()),
        }
    }
    Err(Condition::new(
        vec!["simpleError".into(), "error".into(), "condition".into()],
        message,
        ctx.env.clone(),
        Value::Null,
    )
    .into())
}

#[cfg(test)]
mod tests {
    use crate::config::HostConfig;
    use crate::runtime::{
        error::RuntimeError,
        interpreter::Interpreter,
        value::{Arg, Value},
    };

    fn eval(source: &str) -> Result<Value, RuntimeError> {
        let mut host = Interpreter::new(HostConfig::default());
        let global = host.global_env();
        host.eval_str(source, &global)
    }

    #[test]
    fn as_call_builds_an_unevaluated_call() {
        let value = eval("as.call(list(quote(f), 1, b = \"x\"))").expect("eval");
        let Value::Call(call) = value else {
            panic!("expected a call");
        };
        assert_eq!(call.function, Value::symbol("f"));
        assert_eq!(
            call.args,
            vec![
                Arg::positional(Value::Double(1.0)),
                Arg::named("b", Value::string("x")),
            ]
        );
    }

    #[test]
    fn sys_frame_zero_is_global() {
        let value = eval("identical(sys.frame(0), globalenv())").expect("eval");
        assert_eq!(value, Value::Logical(true));
    }

    #[test]
    fn sys_frame_counts_back_from_the_calling_frame() {
        let source = "
            outer <- function() { here <- environment(); inner(here) }
            inner <- function(expected) identical(sys.frame(-1), expected)
            outer()
        ";
        assert_eq!(eval(source).expect("eval"), Value::Logical(true));
    }

    #[test]
    fn sys_frame_below_the_stack_fails() {
        assert!(matches!(
            eval("sys.frame(-1)"),
            Err(RuntimeError::FrameOutOfRange { which: -1 })
        ));
    }

    #[test]
    fn stop_signals_from_the_calling_scope() {
        let mut host = Interpreter::new(HostConfig::default());
        let global = host.global_env();
        let err = host
            .eval_str("f <- function() stop(\"bad \", 1)\nf()", &global)
            .expect_err("signals");
        let condition = err.as_condition().expect("condition");
        assert_eq!(condition.message, "bad 1");
        assert!(condition.inherits("error"));
        assert_eq!(condition.origin.parent(), Some(&global));
    }

    #[test]
    fn namespace_lookup_requires_a_known_export() {
        let mut host = Interpreter::new(HostConfig::default());
        let global = host.global_env();
        host.register_namespace("pkg").define("value", Value::Integer(4));
        assert_eq!(
            host.eval_str("pkg:::value", &global).expect("eval"),
            Value::Integer(4)
        );
        assert_eq!(
            host.eval_str("pkg::value", &global).expect("eval"),
            Value::Integer(4)
        );
        assert!(matches!(
            host.eval_str("pkg:::missing", &global),
            Err(RuntimeError::UnknownExport { .. })
        ));
        assert!(matches!(
            host.eval_str("nope:::value", &global),
            Err(RuntimeError::UnknownNamespace { .. })
        ));
    }
}
