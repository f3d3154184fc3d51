use crate::conditions::caller::resolve_caller_environment;
use crate::runtime::{
    error::{RuntimeError, RuntimeResult},
    protect::ProtectScope,
    value::{Arg, CallExpr, Value},
    Interpreter,
};
use std::convert::Infallible;
use std::rc::Rc;
use tracing::{debug, error};

/// A slot of a constructor call after the offending value, in the order the
/// condition library declares its parameters.
#[derive(Clone, Debug, PartialEq)]
pub enum Slot {
    Value(Value),
    /// Tagged with `tag` when supplied; an untagged `NULL` otherwise.
    Optional {
        tag: &'static str,
        value: Option<String>,
    },
}

fn optional(tag: &'static str, value: Option<&str>) -> Slot {
    Slot::Optional {
        tag,
        value: value.map(str::to_string),
    }
}

/// A typed request for one of the condition library's constructors.
pub trait ConditionRequest {
    /// Exported name of the constructor. Also names the operation in
    /// contract-violation errors.
    const CONSTRUCTOR: &'static str;

    fn subject(&self) -> &Value;

    fn slots(&self) -> Vec<Slot>;
}

#[derive(Clone, Copy, Debug)]
pub struct BadType<'a> {
    pub x: &'a Value,
    pub expected: &'a str,
    pub what: Option<&'a str>,
    pub arg: Option<&'a str>,
}

impl ConditionRequest for BadType<'_> {
    const CONSTRUCTOR: &'static str = "stop_bad_type";

    fn subject(&self) -> &Value {
        self.x
    }

    fn slots(&self) -> Vec<Slot> {
        vec![
            Slot::Value(Value::string(self.expected)),
            optional("what", self.what),
            optional("arg", self.arg),
        ]
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BadElementType<'a> {
    pub x: &'a Value,
    /// 1-based.
    pub index: usize,
    pub expected: &'a str,
    pub what: Option<&'a str>,
    pub arg: Option<&'a str>,
}

impl ConditionRequest for BadElementType<'_> {
    const CONSTRUCTOR: &'static str = "stop_bad_element_type";

    fn subject(&self) -> &Value {
        self.x
    }

    fn slots(&self) -> Vec<Slot> {
        vec![
            Slot::Value(Value::Double(self.index as f64)),
            Slot::Value(Value::string(self.expected)),
            optional("what", self.what),
            optional("arg", self.arg),
        ]
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BadElementLength<'a> {
    pub x: &'a Value,
    /// 1-based.
    pub index: usize,
    pub expected_length: usize,
    pub what: Option<&'a str>,
    pub arg: Option<&'a str>,
    pub recycle: bool,
}

impl ConditionRequest for BadElementLength<'_> {
    const CONSTRUCTOR: &'static str = "stop_bad_element_length";

    fn subject(&self) -> &Value {
        self.x
    }

    fn slots(&self) -> Vec<Slot> {
        vec![
            Slot::Value(Value::Double(self.index as f64)),
            Slot::Value(Value::Double(self.expected_length as f64)),
            optional("what", self.what),
            optional("arg", self.arg),
            // Binds `recycle` by position: the library declares it after `what` and `arg`.
            Slot::Value(Value::Logical(self.recycle)),
        ]
    }
}

/// Builds `<namespace>:::<constructor>(x, ...)` for `request`. Every handle
/// created here, the call included, is protected in `scope`.
pub fn build_call<R: ConditionRequest>(
    scope: &mut ProtectScope,
    namespace: &str,
    request: &R,
) -> Value {
    let function = scope.protect(Value::call(
        Value::symbol(":::"),
        vec![
            Arg::positional(Value::symbol(namespace)),
            Arg::positional(Value::symbol(R::CONSTRUCTOR)),
        ],
    ));
    let mut call = CallExpr::new(function);
    call.push(scope.protect(request.subject().quoted()));

    let mut tagged = Vec::new();
    for slot in request.slots() {
        match slot {
            Slot::Value(value) => {
                call.push(scope.protect(value));
            }
            Slot::Optional {
                tag,
                value: Some(text),
            } => {
                let position = call.push(scope.protect(Value::string(text)));
                tagged.push((position, tag));
            }
            Slot::Optional { value: None, .. } => {
                call.push(Value::Null);
            }
        }
    }
    for (position, tag) in tagged {
        call.set_tag(position, tag);
    }
    scope.protect(Value::Call(Rc::new(call)))
}

/// Signals the condition described by `request` from the scope of whoever
/// called the running native entry point. Never succeeds: the constructor
/// signals, and a constructor that returns is reported as
/// [`RuntimeError::Internal`].
pub fn report<R: ConditionRequest>(
    host: &mut Interpreter,
    request: &R,
) -> RuntimeResult<Infallible> {
    let namespace = host.config().conditions.namespace.clone();
    debug!(operation = R::CONSTRUCTOR, %namespace, "reporting condition");

    let mut scope = ProtectScope::new();
    let call = build_call(&mut scope, &namespace, request);
    let env = resolve_caller_environment(host)?;
    scope.protect(Value::Environment(env.clone()));

    let returned = host.eval(&call, &env)?;
    scope.release();
    error!(
        operation = R::CONSTRUCTOR,
        %returned,
        "condition constructor returned instead of signaling"
    );
    Err(RuntimeError::Internal {
        operation: R::CONSTRUCTOR,
    })
}

pub fn stop_bad_type(
    host: &mut Interpreter,
    x: &Value,
    expected: &str,
    what: Option<&str>,
    arg: Option<&str>,
) -> RuntimeResult<Infallible> {
    report(
        host,
        &BadType {
            x,
            expected,
            what,
            arg,
        },
    )
}

pub fn stop_bad_element_type(
    host: &mut Interpreter,
    x: &Value,
    index: usize,
    expected: &str,
    what: Option<&str>,
    arg: Option<&str>,
) -> RuntimeResult<Infallible> {
    report(
        host,
        &BadElementType {
            x,
            index,
            expected,
            what,
            arg,
        },
    )
}

pub fn stop_bad_element_length(
    host: &mut Interpreter,
    x: &Value,
    index: usize,
    expected_length: usize,
    what: Option<&str>,
    arg: Option<&str>,
    recycle: bool,
) -> RuntimeResult<Infallible> {
    report(
        host,
        &BadElementLength {
            x,
            index,
            expected_length,
            what,
            arg,
            recycle,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::protect;
    use pretty_assertions::assert_eq;

    fn args_of(call: &Value) -> Vec<Arg> {
        match call {
            Value::Call(call) => call.args.clone(),
            other => panic!("expected a call, got {other}"),
        }
    }

    #[test]
    fn optional_slots_are_tagged_only_when_supplied() {
        let x = Value::Integer(1);
        let mut scope = ProtectScope::new();
        let call = build_call(
            &mut scope,
            "purrr",
            &BadType {
                x: &x,
                expected: "character",
                what: Some("Result"),
                arg: None,
            },
        );
        assert_eq!(
            call.to_string(),
            "purrr:::stop_bad_type(1L, \"character\", what = \"Result\", NULL)"
        );
        assert_eq!(args_of(&call)[3], Arg::positional(Value::Null));
    }

    #[test]
    fn protection_count_follows_the_argument_shape() {
        let x = Value::symbol("lhs");
        let mut scope = ProtectScope::new();
        build_call(
            &mut scope,
            "purrr",
            &BadElementLength {
                x: &x,
                index: 2,
                expected_length: 5,
                what: None,
                arg: Some(".l"),
                recycle: true,
            },
        );
        // operator, x, index, length, arg, recycle, call
        assert_eq!(scope.acquired(), 7);
    }

    #[test]
    fn language_subjects_are_quoted() {
        let x = Value::symbol("lhs");
        let mut scope = ProtectScope::new();
        let call = build_call(
            &mut scope,
            "purrr",
            &BadType {
                x: &x,
                expected: "a vector",
                what: None,
                arg: None,
            },
        );
        assert_eq!(args_of(&call)[0].value.to_string(), "quote(lhs)");
    }

    #[test]
    fn release_happens_even_when_building_is_abandoned() {
        let before = protect::depth();
        {
            let x = Value::Null;
            let mut scope = ProtectScope::new();
            build_call(
                &mut scope,
                "purrr",
                &BadElementType {
                    x: &x,
                    index: 1,
                    expected: "a vector",
                    what: None,
                    arg: None,
                },
            );
        }
        assert_eq!(protect::depth(), before);
    }
}
