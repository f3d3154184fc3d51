//! Native validators that report bad input through the condition library.
//!
//! Each is also registered as a builtin, so a script calling one of them is
//! the "caller" any resulting condition is signaled from.

use crate::conditions::{stop_bad_element_length, stop_bad_element_type, stop_bad_type};
use crate::runtime::{
    args::{match_arguments, required, required_count, required_string},
    environment::Environment,
    error::{Condition, RuntimeResult},
    interpreter::{CallContext, Interpreter},
    protect::ProtectScope,
    value::{Arg, Builtin, ListValue, Value},
};
use tracing::trace;

pub fn install(host: &mut Interpreter) {
    host.define_builtin(Builtin::new("check_vector", |host, _, args| {
        let (x, name) = value_and_name("check_vector", args)?;
        check_vector(host, &x, &name)?;
        Ok(Value::Null)
    }));
    host.define_builtin(Builtin::new("check_list", |host, _, args| {
        let (x, name) = value_and_name("check_list", args)?;
        check_list(host, &x, &name)?;
        Ok(Value::Null)
    }));
    host.define_builtin(Builtin::new("pmap_length", |host, _, args| {
        let (l, name) = value_and_name("pmap_length", args)?;
        let n = pmap_length(host, &l, &name)?;
        Ok(Value::Integer(n as i64))
    }));
    host.define_builtin(Builtin::new("check_result_length", |host, _, args| {
        let mut slots = match_arguments("check_result_length", &["result", "i"], args)?.into_iter();
        let result = required("check_result_length", "result", slots.next().flatten())?;
        let index = required_count("check_result_length", "i", slots.next().flatten())?;
        check_result_length(host, &result, index)?;
        Ok(Value::Null)
    }));
    host.define_builtin(Builtin::new("map_vec", map_vec));
    host.define_builtin(Builtin::new("map2", map2));
    host.define_builtin(Builtin::new("pmap", pmap));
}

fn value_and_name(function: &str, args: Vec<Arg>) -> RuntimeResult<(Value, String)> {
    let mut slots = match_arguments(function, &["x", "name"], args)?.into_iter();
    let x = required(function, "x", slots.next().flatten())?;
    let name = required_string(function, "name", slots.next().flatten())?;
    Ok((x, name))
}

/// `NULL`, scalars, lists and calls pass.
pub fn check_vector(host: &mut Interpreter, x: &Value, name: &str) -> RuntimeResult<()> {
    if x.is_vector() || matches!(x, Value::Call(_)) {
        return Ok(());
    }
    match stop_bad_type(host, x, "a vector", None, Some(name))? {}
}

pub fn check_list(host: &mut Interpreter, x: &Value, name: &str) -> RuntimeResult<()> {
    if matches!(x, Value::List(_)) {
        return Ok(());
    }
    match stop_bad_type(host, x, "a list", None, Some(name))? {}
}

/// Common length of the vectors in `l`, with length-1 elements recycled.
/// Zero for an empty list and one when every element is a scalar.
pub fn pmap_length(host: &mut Interpreter, l: &Value, name: &str) -> RuntimeResult<usize> {
    let Value::List(list) = l else {
        match stop_bad_type(host, l, "a list", None, Some(name))? {}
    };

    let mut has_scalar = false;
    let mut common = None;
    for (j, elt) in list.items.iter().enumerate() {
        if !elt.is_vector() {
            match stop_bad_element_type(host, elt, j + 1, "a vector", None, Some(name))? {}
        }
        let len = elt.length();
        if len == 1 {
            has_scalar = true;
            continue;
        }
        match common {
            None => common = Some(len),
            Some(n) if n != len => {
                match stop_bad_element_length(host, elt, j + 1, n, None, Some(name), true)? {}
            }
            Some(_) => {}
        }
    }
    Ok(common.unwrap_or(usize::from(has_scalar)))
}

/// The `index`-th (1-based) result of a mapped call must be a scalar.
pub fn check_result_length(host: &mut Interpreter, result: &Value, index: usize) -> RuntimeResult<()> {
    if result.length() == 1 {
        return Ok(());
    }
    match stop_bad_element_length(host, result, index, 1, Some("Result"), None, false)? {}
}

fn check_function(host: &mut Interpreter, f: &Value) -> RuntimeResult<()> {
    if f.is_function() {
        return Ok(());
    }
    match stop_bad_type(host, f, "a function", None, Some(".f"))? {}
}

/// Calls `.f` `n` times with the arguments `args_at(i)` builds, checking that
/// every result is a scalar.
fn call_loop(
    host: &mut Interpreter,
    env: &Environment,
    f: &Value,
    n: usize,
    mut args_at: impl FnMut(usize) -> Vec<Arg>,
) -> RuntimeResult<Vec<Value>> {
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let mut scope = ProtectScope::new();
        let call = scope.protect(Value::call(f.clone(), args_at(i)));
        let result = scope.protect(host.eval(&call, env)?);
        check_result_length(host, &result, i + 1)?;
        trace!(index = i + 1, "mapped element");
        out.push(result);
    }
    Ok(out)
}

fn names_of(x: &Value) -> Option<Vec<String>> {
    match x {
        Value::List(list) => list.names.as_deref().cloned(),
        _ => None,
    }
}

/// Element `i` of `elements`, or the only element when it is recycled.
fn recycled(elements: &[Value], i: usize) -> Value {
    let value = if elements.len() == 1 {
        &elements[0]
    } else {
        &elements[i]
    };
    value.quoted()
}

/// `map_vec(.x, .f)`: calls `.f` on each element of `.x` and collects the
/// scalar results into a list carrying the names of `.x`.
fn map_vec(host: &mut Interpreter, ctx: &CallContext, args: Vec<Arg>) -> RuntimeResult<Value> {
    let mut slots = match_arguments("map_vec", &[".x", ".f"], args)?.into_iter();
    let x = required("map_vec", ".x", slots.next().flatten())?;
    let f = required("map_vec", ".f", slots.next().flatten())?;
    check_vector(host, &x, ".x")?;
    check_function(host, &f)?;

    let elements = x.elements();
    let out = call_loop(host, &ctx.env, &f, elements.len(), |i| {
        vec![Arg::positional(elements[i].quoted())]
    })?;
    Ok(Value::List(ListValue::new(out, names_of(&x))))
}

/// `map2(.x, .y, .f)`: calls `.f(.x[[i]], .y[[i]])`. A length-1 input is
/// recycled against the other one.
fn map2(host: &mut Interpreter, ctx: &CallContext, args: Vec<Arg>) -> RuntimeResult<Value> {
    let mut slots = match_arguments("map2", &[".x", ".y", ".f"], args)?.into_iter();
    let x = required("map2", ".x", slots.next().flatten())?;
    let y = required("map2", ".y", slots.next().flatten())?;
    let f = required("map2", ".f", slots.next().flatten())?;
    check_vector(host, &x, ".x")?;
    check_vector(host, &y, ".y")?;
    check_function(host, &f)?;

    let xs = x.elements();
    let ys = y.elements();
    let (nx, ny) = (xs.len(), ys.len());
    if nx != ny && nx != 1 && ny != 1 {
        return Err(Condition::new(
            vec!["simpleError".into(), "error".into(), "condition".into()],
            format!(
                "Mapped vectors must have consistent lengths:\n* `.x` has length {nx}\n* `.y` has length {ny}"
            ),
            ctx.env.clone(),
            Value::Null,
        )
        .into());
    }
    let n = if nx == 1 { ny } else { nx };

    let out = call_loop(host, &ctx.env, &f, n, |i| {
        vec![
            Arg::positional(recycled(&xs, i)),
            Arg::positional(recycled(&ys, i)),
        ]
    })?;
    Ok(Value::List(ListValue::new(out, names_of(&x))))
}

/// `pmap(.l, .f)`: calls `.f` with the `i`-th element of every vector in `.l`,
/// tagged with that vector's name in `.l`. Scalars are recycled.
fn pmap(host: &mut Interpreter, ctx: &CallContext, args: Vec<Arg>) -> RuntimeResult<Value> {
    let mut slots = match_arguments("pmap", &[".l", ".f"], args)?.into_iter();
    let l = required("pmap", ".l", slots.next().flatten())?;
    let f = required("pmap", ".f", slots.next().flatten())?;
    let n = pmap_length(host, &l, ".l")?;
    check_function(host, &f)?;

    let Value::List(list) = &l else {
        return Ok(Value::list(Vec::new()));
    };
    let columns: Vec<(Option<&str>, Vec<Value>)> = list
        .items
        .iter()
        .enumerate()
        .map(|(j, column)| (list.name(j), column.elements()))
        .collect();

    let out = call_loop(host, &ctx.env, &f, n, |i| {
        columns
            .iter()
            .map(|(name, elements)| {
                let value = recycled(elements, i);
                match name {
                    Some(name) => Arg::named(*name, value),
                    None => Arg::positional(value),
                }
            })
            .collect()
    })?;
    let names = list.items.first().and_then(names_of);
    Ok(Value::List(ListValue::new(out, names)))
}
