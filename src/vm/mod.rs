//! Reference executor for lowered modules
//!
//! - [`engine`]: the [`Machine`] that interprets [`crate::ir::Module`]s
//! - [`console`]: program I/O ([`StdConsole`], [`MockConsole`])
//! - [`errors`]: [`RuntimeError`]
//!
//! Execution is bounded by [`Limits`], which can be read from the
//! environment with [`Limits::from_env`].

pub mod console;
pub mod engine;
pub mod errors;

pub use console::{Console, MockConsole, StdConsole};
pub use engine::Machine;
pub use errors::RuntimeError;

use std::env;
use tracing::warn;

/// Maximum active Mila calls unless configured otherwise
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1000;

/// Resource bounds for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_call_depth: usize,
    /// Instructions plus terminators executed; `None` is unbounded.
    pub max_steps: Option<u64>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_steps: None,
        }
    }
}

impl Limits {
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn with_max_steps(mut self, steps: u64) -> Self {
        self.max_steps = Some(steps);
        self
    }

    /// Defaults overridden by `MILA_MAX_CALL_DEPTH` and `MILA_MAX_STEPS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut limits = Self::default();

        if let Some(depth) = parse_var("MILA_MAX_CALL_DEPTH", &lookup) {
            limits.max_call_depth = depth;
        }
        if let Some(steps) = parse_var("MILA_MAX_STEPS", &lookup) {
            limits.max_steps = Some(steps);
        }
        limits
    }
}

fn parse_var<T: std::str::FromStr>(
    key: &str,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring malformed limit");
            None
        }
    }
}
