//! Input and output abstraction for the engine.
//!
//! The engine never touches process streams directly: WRITE goes to the
//! primary stream of an [`OutputSink`], DPRINT and BREAK to its diagnostic
//! stream, and READ pulls lines from an [`InputSource`]. The std
//! implementations wire these to stdin/stdout/stderr; the collecting and
//! scripted implementations exist for tests and embedding.

use std::collections::VecDeque;
use std::io::BufRead;

/// Source of lines for READ.
pub trait InputSource {
    /// Returns the next input line without its trailing newline, or `None`
    /// once input is exhausted.
    fn read_line(&mut self) -> Option<String>;
}

/// Destination for program output.
pub trait OutputSink {
    /// Receives rendered WRITE output; `text` includes its terminator.
    fn primary(&mut self, text: &str);

    /// Receives DPRINT and BREAK output.
    fn diagnostic(&mut self, text: &str);
}

/// Reads lines from stdin, blocking until one is available.
#[derive(Debug, Default)]
pub struct StdInput;

impl InputSource for StdInput {
    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                if line.ends_with('\n') {
                    line.pop();
                    if line.ends_with('\r') {
                        line.pop();
                    }
                }
                Some(line)
            }
        }
    }
}

/// Writes primary output to stdout and diagnostics to stderr.
#[derive(Debug, Default)]
pub struct StdStreams;

impl OutputSink for StdStreams {
    fn primary(&mut self, text: &str) {
        print!("{text}");
    }

    fn diagnostic(&mut self, text: &str) {
        eprint!("{text}");
    }
}

/// An `OutputSink` that collects both streams into strings.
#[derive(Debug, Default)]
pub struct CollectOutput {
    primary: String,
    diagnostic: String,
}

impl CollectOutput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The collected primary output so far.
    #[must_use]
    pub fn primary_output(&self) -> &str {
        &self.primary
    }

    /// The collected diagnostic output so far.
    #[must_use]
    pub fn diagnostic_output(&self) -> &str {
        &self.diagnostic
    }

    /// Consumes the sink and returns the primary output.
    #[must_use]
    pub fn into_primary(self) -> String {
        self.primary
    }
}

impl OutputSink for CollectOutput {
    fn primary(&mut self, text: &str) {
        self.primary.push_str(text);
    }

    fn diagnostic(&mut self, text: &str) {
        self.diagnostic.push_str(text);
    }
}

/// An `InputSource` fed from a fixed list of lines.
#[derive(Debug, Default)]
pub struct ScriptedInput(VecDeque<String>);

impl ScriptedInput {
    #[must_use]
    pub fn new<S: Into<String>>(lines: impl IntoIterator<Item = S>) -> Self {
        Self(lines.into_iter().map(Into::into).collect())
    }
}

impl InputSource for ScriptedInput {
    fn read_line(&mut self) -> Option<String> {
        self.0.pop_front()
    }
}

/// An `InputSource` that is always exhausted.
#[derive(Debug, Default)]
pub struct NoInput;

impl InputSource for NoInput {
    fn read_line(&mut self) -> Option<String> {
        None
    }
}
