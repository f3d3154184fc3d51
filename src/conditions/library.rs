use crate::runtime::{
    args::{match_arguments, optional_string, required, required_count, required_string},
    error::{Condition, RuntimeError, RuntimeResult},
    interpreter::{CallContext, Interpreter},
    value::{Arg, Builtin, Value},
};
use std::rc::Rc;
use tracing::debug;

const BAD_TYPE: &str = "stop_bad_type";
const BAD_ELEMENT_TYPE: &str = "stop_bad_element_type";
const BAD_ELEMENT_LENGTH: &str = "stop_bad_element_length";

/// Installs the condition constructors into the configured namespace.
pub fn install(host: &mut Interpreter) {
    let namespace = host.config().conditions.namespace.clone();
    let exports = host.register_namespace(&namespace);
    let prefix: Rc<str> = format!("{namespace}_error").into();

    let class = Rc::clone(&prefix);
    exports.define(
        BAD_TYPE,
        Builtin::new(BAD_TYPE, move |_, ctx, args| bad_type(&class, ctx, args)).into_value(),
    );
    let class = Rc::clone(&prefix);
    exports.define(
        BAD_ELEMENT_TYPE,
        Builtin::new(BAD_ELEMENT_TYPE, move |_, ctx, args| {
            bad_element_type(&class, ctx, args)
        })
        .into_value(),
    );
    let class = prefix;
    exports.define(
        BAD_ELEMENT_LENGTH,
        Builtin::new(BAD_ELEMENT_LENGTH, move |_, ctx, args| {
            bad_element_length(&class, ctx, args)
        })
        .into_value(),
    );
    debug!(%namespace, "installed condition constructors");
}

/// Describes `x` the way messages refer to it: "a string", "`TRUE`", "NULL".
pub fn friendly_type_of(x: &Value) -> String {
    match x {
        Value::Null => "NULL".into(),
        Value::Logical(_) => format!("`{x}`"),
        Value::Double(_) => "a number".into(),
        Value::Integer(_) => "an integer".into(),
        Value::Str(_) => "a string".into(),
        Value::Symbol(_) => "a symbol".into(),
        Value::List(list) if list.is_empty() => "an empty list".into(),
        Value::List(_) => "a list".into(),
        Value::Call(_) => "a call".into(),
        Value::Closure(_) | Value::Builtin(_) => "a function".into(),
        Value::Environment(_) => "an environment".into(),
        Value::Missing => "a missing argument".into(),
    }
}

fn signal(prefix: &str, kind: &str, message: String, ctx: &CallContext, x: Value) -> RuntimeError {
    Condition::new(
        vec![format!("{prefix}_{kind}"), prefix.to_string()],
        message,
        ctx.env.clone(),
        x,
    )
    .into()
}

fn element_name(what: Option<String>, arg: Option<String>, index: usize) -> String {
    match arg {
        Some(arg) => format!("`{arg}[[{index}]]`"),
        None => format!("{} {index}", what.as_deref().unwrap_or("Element")),
    }
}

fn bad_type(prefix: &str, ctx: &CallContext, args: Vec<Arg>) -> RuntimeResult<Value> {
    let mut slots = match_arguments(BAD_TYPE, &["x", "expected", "what", "arg"], args)?.into_iter();
    let x = required(BAD_TYPE, "x", slots.next().flatten())?;
    let expected = required_string(BAD_TYPE, "expected", slots.next().flatten())?;
    let what = optional_string(BAD_TYPE, slots.next().flatten())?;
    let arg = optional_string(BAD_TYPE, slots.next().flatten())?;

    let who = what
        .or_else(|| arg.map(|arg| format!("`{arg}`")))
        .unwrap_or_else(|| "Object".into());
    let message = format!("{who} must be {expected}, not {}.", friendly_type_of(&x));
    Err(signal(prefix, "bad_type", message, ctx, x))
}

fn bad_element_type(prefix: &str, ctx: &CallContext, args: Vec<Arg>) -> RuntimeResult<Value> {
    let mut slots = match_arguments(
        BAD_ELEMENT_TYPE,
        &["x", "index", "expected", "what", "arg"],
        args,
    )?
    .into_iter();
    let x = required(BAD_ELEMENT_TYPE, "x", slots.next().flatten())?;
    let index = required_count(BAD_ELEMENT_TYPE, "index", slots.next().flatten())?;
    let expected = required_string(BAD_ELEMENT_TYPE, "expected", slots.next().flatten())?;
    let what = optional_string(BAD_ELEMENT_TYPE, slots.next().flatten())?;
    let arg = optional_string(BAD_ELEMENT_TYPE, slots.next().flatten())?;

    let message = format!(
        "{} must be {expected}, not {}.",
        element_name(what, arg, index),
        friendly_type_of(&x)
    );
    Err(signal(prefix, "bad_element_type", message, ctx, x))
}

fn bad_element_length(prefix: &str, ctx: &CallContext, args: Vec<Arg>) -> RuntimeResult<Value> {
    let mut slots = match_arguments(
        BAD_ELEMENT_LENGTH,
        &["x", "index", "expected_length", "what", "arg", "recycle"],
        args,
    )?
    .into_iter();
    let x = required(BAD_ELEMENT_LENGTH, "x", slots.next().flatten())?;
    let index = required_count(BAD_ELEMENT_LENGTH, "index", slots.next().flatten())?;
    let expected =
        required_count(BAD_ELEMENT_LENGTH, "expected_length", slots.next().flatten())?;
    let what = optional_string(BAD_ELEMENT_LENGTH, slots.next().flatten())?;
    let arg = optional_string(BAD_ELEMENT_LENGTH, slots.next().flatten())?;
    let recycle = matches!(slots.next().flatten(), Some(Value::Logical(true)));

    let wanted = if recycle {
        format!("length 1 or {expected}")
    } else {
        format!("length {expected}")
    };
    let message = format!(
        "{} must have {wanted}, not {}.",
        element_name(what, arg, index),
        x.length()
    );
    Err(signal(prefix, "bad_element_length", message, ctx, x))
}
