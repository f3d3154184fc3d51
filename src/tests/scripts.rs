use crate::bootstrap;
use crate::config::HostConfig;
use crate::diagnostics::render_error;
use crate::runtime::{error::RuntimeError, protect, value::Value};
use pretty_assertions::assert_eq;

const SCRIPT: &str = r#"
square_all <- function(xs) map_vec(xs, function(x) list(x, x))
validate <- function(input) {
    checked <- "validate"
    pmap_length(input, ".l")
}
"#;

fn host(config: HostConfig) -> crate::runtime::Interpreter {
    let mut host = bootstrap(config);
    let global = host.global_env();
    host.eval_str(SCRIPT, &global).expect("definitions");
    host
}

#[test]
fn mapped_results_are_checked_from_the_mapping_function() {
    let mut host = host(HostConfig::default());
    let global = host.global_env();
    let before = protect::depth();
    let err = host
        .eval_str("square_all(list(1, 2))", &global)
        .expect_err("results have length 2");

    let condition = err.as_condition().expect("condition");
    assert_eq!(condition.message, "Result 1 must have length 1, not 2.");
    assert_eq!(
        condition.class,
        vec![
            "purrr_error_bad_element_length".to_string(),
            "purrr_error".to_string()
        ]
    );
    assert!(condition.origin.get_local("xs").is_some());
    assert_eq!(protect::depth(), before);
    assert_eq!(host.frames().depth(), 0);
}

#[test]
fn nested_callers_see_their_own_frame() {
    let mut host = host(HostConfig::default());
    let global = host.global_env();
    let err = host
        .eval_str(
            "outer <- function() validate(list(list(1, 2), list(1, 2, 3)))\nouter()",
            &global,
        )
        .expect_err("lengths differ");
    let condition = err.as_condition().expect("condition");
    assert_eq!(condition.message, "`.l[[2]]` must have length 1 or 2, not 3.");
    assert_eq!(
        condition.origin.get_local("checked"),
        Some(Value::string("validate"))
    );
}

#[test]
fn top_level_calls_signal_from_the_global_scope() {
    let mut host = host(HostConfig::default());
    let global = host.global_env();
    let err = host
        .eval_str("check_vector(function() 1, \"fn\")", &global)
        .expect_err("not a vector");
    let condition = err.as_condition().expect("condition");
    assert_eq!(condition.message, "`fn` must be a vector, not a function.");
    assert_eq!(condition.origin, global);
}

#[test]
fn configured_namespace_drives_lookup_and_classes() {
    let config = HostConfig::from_toml_str("[conditions]\nnamespace = \"checks\"\n").expect("config");
    let mut host = host(config);
    let global = host.global_env();
    let err = host
        .eval_str("validate(1)", &global)
        .expect_err("not a list");
    let condition = err.as_condition().expect("condition");
    assert!(condition.inherits("checks_error_bad_type"));
    assert!(!condition.inherits("purrr_error"));
    assert!(matches!(
        host.eval_str("purrr:::stop_bad_type(1, \"a list\", NULL, NULL)", &global),
        Err(RuntimeError::UnknownNamespace { .. })
    ));
}

#[test]
fn conditions_render_with_their_class_as_code() {
    let mut host = host(HostConfig::default());
    let global = host.global_env();
    let err = host
        .eval_str("validate(\"text\")", &global)
        .expect_err("not a list");
    let report = render_error(&err, None);
    assert!(report.contains("purrr_error_bad_type"), "{report}");
    assert!(report.contains("`.l` must be a list, not a string."), "{report}");
}

#[test]
fn successful_scripts_return_their_last_value() {
    let mut host = host(HostConfig::default());
    let global = host.global_env();
    let value = host
        .eval_str("validate(list(1, list(1, 2), \"a\"))", &global)
        .expect("lengths agree");
    assert_eq!(value, Value::Integer(2));
}
