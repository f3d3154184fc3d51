pub mod args;
pub mod builtins;
pub mod environment;
pub mod error;
pub mod frames;
pub mod interpreter;
pub mod protect;
pub mod value;

pub use interpreter::Interpreter;
