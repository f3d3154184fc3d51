use crate::runtime::{
    error::{RuntimeError, RuntimeResult},
    value::{Arg, Value},
};

/// Binds actual arguments to `formals`: tagged arguments by exact name, then
/// untagged arguments fill the remaining formals left to right. Unfilled
/// formals come back as `None`.
pub fn match_arguments(
    function: &str,
    formals: &[&str],
    args: Vec<Arg>,
) -> RuntimeResult<Vec<Option<Value>>> {
    let mut slots: Vec<Option<Value>> = vec![None; formals.len()];
    let mut positional = Vec::new();
    for arg in args {
        match arg.tag {
            Some(tag) => {
                let index = formals.iter().position(|formal| *formal == tag).ok_or_else(|| {
                    RuntimeError::UnusedArgument {
                        function: function.to_string(),
                        argument: tag.clone(),
                    }
                })?;
                if slots[index].is_some() {
                    return Err(RuntimeError::DuplicateArgument {
                        function: function.to_string(),
                        name: tag,
                    });
                }
                slots[index] = Some(arg.value);
            }
            None => positional.push(arg.value),
        }
    }

    let mut open = slots.iter_mut().filter(|slot| slot.is_none());
    for value in positional {
        match open.next() {
            Some(slot) => *slot = Some(value),
            None => {
                return Err(RuntimeError::UnusedArgument {
                    function: function.to_string(),
                    argument: value.to_string(),
                })
            }
        }
    }
    Ok(slots)
}

/// Reads an optional string argument where `NULL` means "not supplied".
pub fn optional_string(function: &str, value: Option<Value>) -> RuntimeResult<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Str(text)) => Ok(Some(text.to_string())),
        Some(other) => Err(RuntimeError::TypeMismatch {
            message: format!(
                "`{function}` expected a string or NULL, received {}",
                other.type_name()
            ),
        }),
    }
}

pub fn required(function: &str, name: &str, value: Option<Value>) -> RuntimeResult<Value> {
    match value {
        None | Some(Value::Missing) => {
            tracing::debug!(function, argument = name, "required argument not supplied");
            Err(RuntimeError::MissingArgument {
                name: name.to_string(),
            })
        }
        Some(value) => Ok(value),
    }
}

pub fn required_string(function: &str, name: &str, value: Option<Value>) -> RuntimeResult<String> {
    match required(function, name, value)? {
        Value::Str(text) => Ok(text.to_string()),
        other => Err(RuntimeError::TypeMismatch {
            message: format!(
                "`{function}` expected `{name}` to be a string, received {}",
                other.type_name()
            ),
        }),
    }
}

pub fn required_count(function: &str, name: &str, value: Option<Value>) -> RuntimeResult<usize> {
    let value = required(function, name, value)?;
    match value.as_number() {
        Some(number) if number >= 0.0 && number.fract() == 0.0 => Ok(number as usize),
        _ => Err(RuntimeError::TypeMismatch {
            message: format!(
                "`{function}` expected `{name}` to be a non-negative whole number, received {value}"
            ),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tags_bind_first_then_positions_fill_the_gaps() {
        let slots = match_arguments(
            "f",
            &["x", "expected", "what", "arg"],
            vec![
                Arg::positional(Value::Integer(1)),
                Arg::positional(Value::string("character")),
                Arg::positional(Value::Null),
                Arg::named("arg", Value::string("x")),
            ],
        )
        .expect("match");
        assert_eq!(
            slots,
            vec![
                Some(Value::Integer(1)),
                Some(Value::string("character")),
                Some(Value::Null),
                Some(Value::string("x")),
            ]
        );
    }

    #[test]
    fn unfilled_formals_are_none() {
        let slots = match_arguments("f", &["a", "b"], vec![Arg::positional(Value::Null)])
            .expect("match");
        assert_eq!(slots, vec![Some(Value::Null), None]);
    }

    #[test]
    fn rejects_unknown_and_surplus_arguments() {
        assert!(matches!(
            match_arguments("f", &["a"], vec![Arg::named("b", Value::Null)]),
            Err(RuntimeError::UnusedArgument { .. })
        ));
        assert!(matches!(
            match_arguments(
                "f",
                &["a"],
                vec![Arg::positional(Value::Null), Arg::positional(Value::Null)]
            ),
            Err(RuntimeError::UnusedArgument { .. })
        ));
        assert!(matches!(
            match_arguments(
                "f",
                &["a"],
                vec![Arg::named("a", Value::Null), Arg::named("a", Value::Null)]
            ),
            Err(RuntimeError::DuplicateArgument { .. })
        ));
    }

    #[test]
    fn null_reads_as_absent_string() {
        assert_eq!(optional_string("f", Some(Value::Null)).expect("ok"), None);
        assert_eq!(
            optional_string("f", Some(Value::string("x"))).expect("ok"),
            Some("x".to_string())
        );
        assert!(optional_string("f", Some(Value::Integer(1))).is_err());
    }
}
