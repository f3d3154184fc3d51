pub mod checks;
pub mod cli;
pub mod conditions;
pub mod config;
pub mod diagnostics;
pub mod language;
pub mod runtime;

use config::HostConfig;
use runtime::Interpreter;

/// A host with the base builtins, the condition library and the native
/// validators installed.
pub fn bootstrap(config: HostConfig) -> Interpreter {
    let mut host = Interpreter::new(config);
    conditions::library::install(&mut host);
    checks::install(&mut host);
    host
}

#[cfg(test)]
mod tests;
