use crate::language::errors::SyntaxError;
use crate::runtime::{environment::Environment, value::Value};
use miette::Diagnostic;
use std::fmt;
use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Debug, Error, Diagnostic)]
pub enum RuntimeError {
    #[error("object `{name}` not found")]
    #[diagnostic(code(host::unbound_variable))]
    UnboundVariable { name: String },
    #[error("could not find function `{name}`")]
    #[diagnostic(code(host::unknown_function))]
    UnknownFunction { name: String },
    #[error("argument `{name}` is missing, with no default")]
    #[diagnostic(code(host::missing_argument))]
    MissingArgument { name: String },
    #[error("attempt to apply non-function (found {found})")]
    #[diagnostic(code(host::not_a_function))]
    NotAFunction { found: &'static str },
    #[error("unused argument `{argument}` in call to `{function}`")]
    #[diagnostic(code(host::unused_argument))]
    UnusedArgument { function: String, argument: String },
    #[error("formal argument `{name}` matched by multiple actual arguments in `{function}`")]
    #[diagnostic(code(host::duplicate_argument))]
    DuplicateArgument { function: String, name: String },
    #[error("Type mismatch: {message}")]
    #[diagnostic(code(host::type_mismatch))]
    TypeMismatch { message: String },
    #[error("there is no namespace called `{name}`")]
    #[diagnostic(code(host::unknown_namespace))]
    UnknownNamespace { name: String },
    #[error("object `{name}` not found in namespace `{namespace}`")]
    #[diagnostic(code(host::unknown_export))]
    UnknownExport { namespace: String, name: String },
    #[error("not that many frames on the stack (which = {which})")]
    #[diagnostic(code(host::frame_out_of_range))]
    FrameOutOfRange { which: i64 },
    #[error("evaluation nested too deeply: more than {limit} frames")]
    #[diagnostic(
        code(host::stack_overflow),
        help("raise `runtime.max_frames` if the recursion is intended")
    )]
    StackOverflow { limit: usize },
    #[error(transparent)]
    #[diagnostic(code(host::syntax))]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Condition(Condition),
    #[error("Internal error: `{operation}()` should have thrown earlier")]
    #[diagnostic(code(host::internal))]
    Internal { operation: &'static str },
}

impl RuntimeError {
    pub fn as_condition(&self) -> Option<&Condition> {
        match self {
            RuntimeError::Condition(condition) => Some(condition),
            _ => None,
        }
    }
}

impl From<Condition> for RuntimeError {
    fn from(condition: Condition) -> Self {
        RuntimeError::Condition(condition)
    }
}

/// A signaled condition. `origin` is the scope the signaling call was
/// evaluated in, which is what users see as the call site.
#[derive(Clone, Debug)]
pub struct Condition {
    pub class: Vec<String>,
    pub message: String,
    pub origin: Environment,
    pub subject: Value,
}

impl Condition {
    pub fn new(
        class: Vec<String>,
        message: impl Into<String>,
        origin: Environment,
        subject: Value,
    ) -> Self {
        Self {
            class,
            message: message.into(),
            origin,
            subject,
        }
    }

    pub fn inherits(&self, class: &str) -> bool {
        self.class.iter().any(|candidate| candidate == class)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Condition {}

impl Diagnostic for Condition {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.class
            .first()
            .map(|class| Box::new(class) as Box<dyn fmt::Display + 'a>)
    }
}
