//! Print output abstraction.
//!
//! Everything the interpreted program prints goes through a [`PrintWriter`],
//! so embedders can capture or discard output instead of writing to stdout.

/// Receives the output of `puts`.
pub trait PrintWriter {
    /// Writes `text` exactly as given; no newline is appended.
    fn print(&mut self, text: &str);
}

/// Writes to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdPrint;

impl PrintWriter for StdPrint {
    fn print(&mut self, text: &str) {
        print!("{text}");
    }
}

/// Discards all output.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrint;

impl PrintWriter for NoPrint {
    fn print(&mut self, _text: &str) {}
}

/// Collects output into a string, for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct CollectStringPrint {
    output: String,
}

impl CollectStringPrint {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.output
    }
}

impl PrintWriter for CollectStringPrint {
    fn print(&mut self, text: &str) {
        self.output.push_str(text);
    }
}
