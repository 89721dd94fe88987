//! Program input and output
//!
//! The executor performs all I/O through a [`Console`]. [`StdConsole`] talks
//! to the process's stdin/stdout; [`MockConsole`] queues input and records
//! output so tests can assert on what a program printed.

use super::errors::RuntimeError;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

pub trait Console {
    /// Read the next whitespace-separated integer.
    fn read_int(&mut self) -> Result<i64, RuntimeError>;

    fn write(&mut self, text: &str) -> Result<(), RuntimeError>;
}

impl<C: Console + ?Sized> Console for &mut C {
    fn read_int(&mut self) -> Result<i64, RuntimeError> {
        (**self).read_int()
    }

    fn write(&mut self, text: &str) -> Result<(), RuntimeError> {
        (**self).write(text)
    }
}

fn parse_int(word: &str) -> Result<i64, RuntimeError> {
    word.parse().map_err(|_| RuntimeError::InvalidInput {
        text: word.to_string(),
    })
}

/// Console backed by the process's standard streams.
#[derive(Debug, Default)]
pub struct StdConsole {
    pending: VecDeque<String>,
}

impl StdConsole {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Console for StdConsole {
    fn read_int(&mut self) -> Result<i64, RuntimeError> {
        // Prompts written with `write` must be visible before blocking on input
        io::stdout().flush().map_err(io_error)?;

        while self.pending.is_empty() {
            let mut line = String::new();
            let read = io::stdin().lock().read_line(&mut line).map_err(io_error)?;
            if read == 0 {
                return Err(RuntimeError::InputExhausted);
            }
            self.pending
                .extend(line.split_whitespace().map(str::to_string));
        }

        match self.pending.pop_front() {
            Some(word) => parse_int(&word),
            None => Err(RuntimeError::InputExhausted),
        }
    }

    fn write(&mut self, text: &str) -> Result<(), RuntimeError> {
        io::stdout().write_all(text.as_bytes()).map_err(io_error)
    }
}

fn io_error(err: io::Error) -> RuntimeError {
    RuntimeError::Io {
        message: err.to_string(),
    }
}

/// In-memory console for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MockConsole {
    input: VecDeque<String>,
    output: String,
}

impl MockConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Console whose `readln` calls consume the words of `input` in order.
    pub fn with_input(input: &str) -> Self {
        Self {
            input: input.split_whitespace().map(str::to_string).collect(),
            output: String::new(),
        }
    }

    /// Everything written so far.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Get all lines as a vector of strings
    pub fn get_output(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.output.split('\n').map(str::to_string).collect();
        // Remove trailing empty string if text ended with newline
        if lines.last().is_some_and(|s| s.is_empty()) {
            lines.pop();
        }
        lines
    }
}

impl Console for MockConsole {
    fn read_int(&mut self) -> Result<i64, RuntimeError> {
        match self.input.pop_front() {
            Some(word) => parse_int(&word),
            None => Err(RuntimeError::InputExhausted),
        }
    }

    fn write(&mut self, text: &str) -> Result<(), RuntimeError> {
        self.output.push_str(text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_console_lines() {
        let mut console = MockConsole::new();
        console.write("1").unwrap();
        console.write("2\n").unwrap();
        console.write("3\n").unwrap();
        assert_eq!(console.get_output(), vec!["12", "3"]);
    }

    #[test]
    fn test_mock_console_input() {
        let mut console = MockConsole::with_input("4 -5\n x");
        assert_eq!(console.read_int(), Ok(4));
        assert_eq!(console.read_int(), Ok(-5));
        assert!(matches!(console.read_int(), Err(RuntimeError::InvalidInput { .. })));
        assert_eq!(console.read_int(), Err(RuntimeError::InputExhausted));
    }
}
