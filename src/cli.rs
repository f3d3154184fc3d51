use crate::{bootstrap, config::HostConfig, diagnostics::render_error};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::info;

pub const USAGE: &str = "Usage: caller-conditions <script> [config.toml]";

/// Runs `caller-conditions <script> [config.toml]` with `args` excluding the
/// program name, and returns the process exit code.
pub fn run(args: &[String], out: &mut impl Write, err: &mut impl Write) -> io::Result<i32> {
    let (script, config_path) = match args {
        [script] => (script, None),
        [script, config] => (script, Some(config)),
        _ => {
            writeln!(err, "{USAGE}")?;
            return Ok(2);
        }
    };

    let config = match config_path {
        Some(path) => match HostConfig::load(Path::new(path)) {
            Ok(config) => config,
            Err(error) => {
                writeln!(err, "{error}")?;
                return Ok(2);
            }
        },
        None => HostConfig::default(),
    };

    let source = match fs::read_to_string(script) {
        Ok(source) => source,
        Err(error) => {
            writeln!(err, "Failed to access {script}: {error}")?;
            return Ok(1);
        }
    };

    let mut host = bootstrap(config);
    let global = host.global_env();
    info!(%script, "evaluating script");
    match host.eval_str(&source, &global) {
        Ok(value) => {
            writeln!(out, "{value}")?;
            Ok(0)
        }
        Err(error) => {
            writeln!(err, "{}", render_error(&error, Some((script.as_str(), source.as_str()))))?;
            Ok(1)
        }
    }
}
