// mila: compile a Mila program and run it on the reference VM

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process;

use mila::vm::{Limits, Machine, RuntimeError, StdConsole};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let program_name = args.first().map(|s| s.as_str()).unwrap_or("mila");

    let Some(path) = args.get(1) else {
        eprintln!("Error: No input file provided");
        eprintln!();
        eprintln!("Usage: {} <file.mila>", program_name);
        process::exit(1);
    };

    if !Path::new(path).exists() {
        eprintln!("Error: File '{}' not found", path);
        process::exit(1);
    }

    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Error: Cannot read '{}': {}", path, err);
            process::exit(1);
        }
    };

    let module = match mila::compile(&source) {
        Ok(module) => module,
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    };
    debug!(functions = module.functions.len(), "compiled");

    let limits = Limits::from_env();
    let mut machine = Machine::new(&module, StdConsole::new()).with_limits(limits);
    let result = machine.run();
    let status = exit_status(result, io::stdout().flush());
    if status != 0 {
        process::exit(status);
    }
}

/// Report how a run ended and pick the process exit status.
///
/// A runtime error wins (status 2); otherwise failing to flush program
/// output is an I/O failure (status 1).
fn exit_status(result: Result<(), RuntimeError>, flushed: io::Result<()>) -> i32 {
    if let Err(err) = &flushed {
        eprintln!("Error: Cannot write program output: {}", err);
    }

    match result {
        Err(err) => {
            eprintln!("Runtime error: {}", err);
            2
        }
        Ok(()) if flushed.is_err() => 1,
        Ok(()) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broken_pipe() -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed"))
    }

    #[test]
    fn test_exit_status() {
        assert_eq!(exit_status(Ok(()), Ok(())), 0);
        assert_eq!(exit_status(Ok(()), broken_pipe()), 1);
        assert_eq!(exit_status(Err(RuntimeError::InputExhausted), Ok(())), 2);
        assert_eq!(exit_status(Err(RuntimeError::InputExhausted), broken_pipe()), 2);
    }
}
