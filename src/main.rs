use caller_conditions::cli;
use std::env;
use std::io;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let code = match cli::run(&args, &mut io::stdout(), &mut io::stderr()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("failed to write output: {err}");
            1
        }
    };
    std::process::exit(code);
}
