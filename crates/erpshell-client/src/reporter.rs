//! User-visible notices.
//!
//! Soft conditions (ignored options, legacy domains, models or databases that
//! cannot be found, failed logins) and the module dispatcher summary are text
//! meant for the operator, not log records. They go through a [`Reporter`] so
//! the CLI can print them and tests can capture them.

use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

/// Sink for operator-facing messages.
pub trait Reporter: Send + Sync + std::fmt::Debug {
    /// Informational line.
    fn notice(&self, message: &str);

    /// Deprecation or advisory warning.
    fn warn(&self, message: &str);

    /// Error the operation recovered from.
    fn error(&self, message: &str);
}

/// Prints every message to stdout, errors prefixed with `Error: `.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn notice(&self, message: &str) {
        println!("{message}");
    }

    fn warn(&self, message: &str) {
        println!("Warning: {message}");
    }

    fn error(&self, message: &str) {
        println!("Error: {message}");
    }
}

/// Severity of a recorded message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Notice,
    Warning,
    Error,
}

/// Records messages in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryReporter {
    lines: Arc<Mutex<Vec<(Level, String)>>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<(Level, String)> {
        std::mem::take(&mut *self.lines.lock())
    }

    /// Messages recorded at `level`, without draining.
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    fn push(&self, level: Level, message: &str) {
        self.lines.lock().push((level, message.to_string()));
    }
}

impl Reporter for MemoryReporter {
    fn notice(&self, message: &str) {
        self.push(Level::Notice, message);
    }

    fn warn(&self, message: &str) {
        self.push(Level::Warning, message);
    }

    fn error(&self, message: &str) {
        self.push(Level::Error, message);
    }
}

/// Render a value the way an interactive session shows it: `'text'`, `True`,
/// `None`, `[1, 2]`, `{'k': 'v'}`.
pub fn repr(value: &Value) -> String {
    let mut out = String::new();
    write_repr(&mut out, value);
    out
}

fn write_repr(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("None"),
        Value::Bool(true) => out.push_str("True"),
        Value::Bool(false) => out.push_str("False"),
        Value::Number(n) => {
            let _ = write!(out, "{n}");
        }
        Value::String(s) => {
            out.push('\'');
            for ch in s.chars() {
                match ch {
                    '\'' => out.push_str("\\'"),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    c => out.push(c),
                }
            }
            out.push('\'');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_repr(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "'{key}': ");
                write_repr(out, item);
            }
            out.push('}');
        }
    }
}
