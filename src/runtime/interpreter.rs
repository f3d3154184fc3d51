use crate::config::HostConfig;
use crate::language::parser::parse_program;
use crate::runtime::{
    args::match_arguments,
    builtins,
    environment::{Environment, WeakEnvironment},
    error::{RuntimeError, RuntimeResult},
    frames::{CallStack, Frame},
    value::{Arg, Builtin, CallExpr, Closure, Value},
};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::trace;

/// What a builtin sees of the call that invoked it.
#[derive(Clone, Debug)]
pub struct CallContext {
    /// Scope the call was evaluated in.
    pub env: Environment,
    pub call: Rc<CallExpr>,
}

pub struct Interpreter {
    config: HostConfig,
    empty: Environment,
    base: Environment,
    global: Environment,
    namespaces: HashMap<String, Environment>,
    frames: CallStack,
    /// Every closure frame created so far, for teardown.
    scopes: Vec<WeakEnvironment>,
}

impl Interpreter {
    pub fn new(config: HostConfig) -> Self {
        let empty = Environment::empty();
        let base = Environment::labelled("base", &empty);
        let global = Environment::labelled("R_GlobalEnv", &base);
        let frames = CallStack::new(config.runtime.max_frames);
        let mut host = Self {
            config,
            empty,
            base,
            global,
            namespaces: HashMap::new(),
            frames,
            scopes: Vec::new(),
        };
        builtins::install(&mut host);
        host
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn empty_env(&self) -> Environment {
        self.empty.clone()
    }

    pub fn base_env(&self) -> Environment {
        self.base.clone()
    }

    pub fn global_env(&self) -> Environment {
        self.global.clone()
    }

    pub fn frames(&self) -> &CallStack {
        &self.frames
    }

    pub fn define_builtin(&mut self, builtin: Builtin) {
        let name = builtin.name.clone();
        self.base.define(&name, builtin.into_value());
    }

    /// Returns the namespace scope called `name`, creating it on first use.
    pub fn register_namespace(&mut self, name: &str) -> Environment {
        let base = &self.base;
        self.namespaces
            .entry(name.to_string())
            .or_insert_with(|| Environment::labelled(format!("namespace:{name}"), base))
            .clone()
    }

    pub fn namespace(&self, name: &str) -> RuntimeResult<Environment> {
        self.namespaces
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownNamespace {
                name: name.to_string(),
            })
    }

    /// Parses `source` and evaluates each expression in `env`, returning the
    /// value of the last one.
    pub fn eval_str(&mut self, source: &str, env: &Environment) -> RuntimeResult<Value> {
        let program = parse_program(source)?;
        let mut last = Value::Null;
        for expr in &program {
            last = self.eval(expr, env)?;
        }
        Ok(last)
    }

    pub fn eval(&mut self, expr: &Value, env: &Environment) -> RuntimeResult<Value> {
        match expr {
            Value::Symbol(name) => match env.lookup(name) {
                Some(Value::Missing) => Err(RuntimeError::MissingArgument {
                    name: name.to_string(),
                }),
                Some(value) => Ok(value),
                None => Err(RuntimeError::UnboundVariable {
                    name: name.to_string(),
                }),
            },
            Value::Call(call) => self.eval_call(call, env),
            other => Ok(other.clone()),
        }
    }

    fn eval_call(&mut self, call: &Rc<CallExpr>, env: &Environment) -> RuntimeResult<Value> {
        let function = match &call.function {
            Value::Symbol(name) => {
                env.lookup_function(name)
                    .ok_or_else(|| RuntimeError::UnknownFunction {
                        name: name.to_string(),
                    })?
            }
            other => self.eval(other, env)?,
        };
        match &function {
            Value::Builtin(builtin) => {
                let args = if builtin.special {
                    call.args.clone()
                } else {
                    self.eval_args(&call.args, env)?
                };
                let context = CallContext {
                    env: env.clone(),
                    call: Rc::clone(call),
                };
                let func = Rc::clone(&builtin.func);
                (*func)(self, &context, args)
            }
            Value::Closure(closure) => {
                let args = self.eval_args(&call.args, env)?;
                self.apply_closure(closure, args)
            }
            other => Err(RuntimeError::NotAFunction {
                found: other.type_name(),
            }),
        }
    }

    fn eval_args(&mut self, args: &[Arg], env: &Environment) -> RuntimeResult<Vec<Arg>> {
        args.iter()
            .map(|arg| -> RuntimeResult<Arg> {
                Ok(Arg {
                    tag: arg.tag.clone(),
                    value: self.eval(&arg.value, env)?,
                })
            })
            .collect()
    }

    /// Calls `closure` with already evaluated `args`. The call runs in a fresh
    /// frame whose scope is a child of the closure's own scope.
    pub fn apply_closure(&mut self, closure: &Rc<Closure>, args: Vec<Arg>) -> RuntimeResult<Value> {
        let formals: Vec<&str> = closure.formals.iter().map(|formal| formal.name.as_str()).collect();
        let slots = match_arguments("closure", &formals, args)?;
        let env = Environment::child_of(&closure.env);
        self.track(&env);
        let mut defaulted = Vec::new();
        for (formal, slot) in closure.formals.iter().zip(slots) {
            match slot {
                Some(value) => env.define(&formal.name, value),
                None => {
                    env.define(&formal.name, Value::Missing);
                    if let Some(default) = &formal.default {
                        defaulted.push((formal.name.as_str(), default));
                    }
                }
            }
        }

        self.frames.push(Frame { env: env.clone() })?;
        trace!(depth = self.frames.depth(), "entered closure frame");
        let result = (|| {
            for (name, default) in defaulted {
                let value = self.eval(default, &env)?;
                env.define(name, value);
            }
            self.eval(&closure.body, &env)
        })();
        self.frames.pop();
        result
    }

    fn track(&mut self, env: &Environment) {
        if self.scopes.len() == self.scopes.capacity() {
            self.scopes.retain(WeakEnvironment::is_live);
        }
        self.scopes.push(env.downgrade());
    }
}

/// Scopes and the closures bound in them reference each other, so nothing a
/// host created is freed until the host clears them here.
impl Drop for Interpreter {
    fn drop(&mut self) {
        let live: Vec<Environment> = self
            .scopes
            .drain(..)
            .filter_map(|scope| scope.upgrade())
            .collect();
        trace!(frames = live.len(), "tearing down host scopes");
        for env in &live {
            env.clear();
        }
        for env in self.namespaces.values() {
            env.clear();
        }
        self.global.clear();
        self.base.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::value::Formal;

    fn host() -> Interpreter {
        Interpreter::new(HostConfig::default())
    }

    #[test]
    fn symbols_resolve_through_scopes() {
        let mut host = host();
        let global = host.global_env();
        global.define("x", Value::Integer(3));
        let value = host.eval(&Value::symbol("x"), &global).expect("eval");
        assert_eq!(value, Value::Integer(3));
        assert!(matches!(
            host.eval(&Value::symbol("nope"), &global),
            Err(RuntimeError::UnboundVariable { .. })
        ));
    }

    #[test]
    fn closures_bind_arguments_and_defaults() {
        let mut host = host();
        let global = host.global_env();
        let closure = Rc::new(Closure::new(
            vec![
                Formal {
                    name: "a".into(),
                    default: None,
                },
                Formal {
                    name: "b".into(),
                    default: Some(Value::symbol("a")),
                },
            ],
            Value::call(
                Value::symbol("list"),
                vec![
                    Arg::positional(Value::symbol("a")),
                    Arg::positional(Value::symbol("b")),
                ],
            ),
            global.clone(),
        ));
        let result = host
            .apply_closure(&closure, vec![Arg::positional(Value::Integer(7))])
            .expect("call");
        assert_eq!(
            result,
            Value::list(vec![Value::Integer(7), Value::Integer(7)])
        );
        assert_eq!(host.frames().depth(), 0);
    }

    #[test]
    fn unsupplied_formal_without_default_is_missing() {
        let mut host = host();
        let global = host.global_env();
        let closure = Rc::new(Closure::new(
            vec![Formal {
                name: "a".into(),
                default: None,
            }],
            Value::symbol("a"),
            global.clone(),
        ));
        assert!(matches!(
            host.apply_closure(&closure, Vec::new()),
            Err(RuntimeError::MissingArgument { .. })
        ));
        assert_eq!(host.frames().depth(), 0);
    }

    #[test]
    fn non_functions_cannot_be_called() {
        let mut host = host();
        let global = host.global_env();
        let call = Value::call(Value::Integer(1), Vec::new());
        assert!(matches!(
            host.eval(&call, &global),
            Err(RuntimeError::NotAFunction { found: "integer" })
        ));
    }

    #[test]
    fn runaway_recursion_hits_the_frame_limit() {
        let mut config = HostConfig::default();
        config.runtime.max_frames = 16;
        let mut host = Interpreter::new(config);
        let global = host.global_env();
        let result = host.eval_str("f <- function() f()\nf()", &global);
        assert!(matches!(
            result,
            Err(RuntimeError::StackOverflow { limit: 16 })
        ));
        assert_eq!(host.frames().depth(), 0);
    }

    #[test]
    fn namespaces_are_created_once() {
        let mut host = host();
        let first = host.register_namespace("pkg");
        let second = host.register_namespace("pkg");
        assert_eq!(first, second);
        assert!(host.namespace("pkg").is_ok());
        assert!(matches!(
            host.namespace("other"),
            Err(RuntimeError::UnknownNamespace { .. })
        ));
    }

    #[test]
    fn dropping_the_host_frees_self_referencing_scopes() {
        let mut host = host();
        let global = host.global_env();
        let value = host
            .eval_str(
                "f <- function() { g <- function() 1; environment() }\nf()",
                &global,
            )
            .expect("eval");
        let Value::Environment(frame) = value else {
            panic!("expected an environment");
        };
        let frame_ref = frame.downgrade();
        let global_ref = global.downgrade();
        drop(frame);
        drop(global);
        assert!(frame_ref.is_live());

        drop(host);
        assert!(!frame_ref.is_live());
        assert!(!global_ref.is_live());
    }
}
