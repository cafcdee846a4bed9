//! Terminal output component

use std::io::Write;
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::registry::Component;
use crate::stringify::stringify;
use crate::value::Value;

/// No space is inserted after these characters
const NO_SPACE_AFTER: &str = " \r\n\t={[(<>";

/// No space is inserted before words starting with these characters
const NO_SPACE_BEFORE: &str = " \r\n\t=}])<>;:,.!?%";

/// Writes formatted lines to a sink (stdout by default)
pub struct Terminal {
    sink: Mutex<Box<dyn Write + Send>>,
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminal {
    /// Canonical name of the terminal component
    pub const CLASS: &'static str = "Savoksi\\Paate";

    /// Create a terminal writing to stdout
    pub fn new() -> Self {
        Self::with_sink(std::io::stdout())
    }

    /// Create a terminal writing to `sink`
    pub fn with_sink(sink: impl Write + Send + 'static) -> Self {
        Self {
            sink: Mutex::new(Box::new(sink)),
        }
    }

    /// Format `words` as one line and write it
    pub fn print(&self, words: &[Value]) -> Result<()> {
        let line = format_line(words);
        let mut sink = self
            .sink
            .lock()
            .map_err(|_| Error::io("cannot write to {1}", Self::CLASS, "lock poisoned"))?;
        sink.write_all(line.as_bytes())
            .and_then(|_| sink.flush())
            .map_err(|e| Error::io("cannot write to {1}", Self::CLASS, e))
    }
}

impl Component for Terminal {
    fn class_name(&self) -> &str {
        Self::CLASS
    }
}

/// Join stringified words into one output line
///
/// Words are separated by single spaces, except at the start of the line,
/// before an empty word, after an opening bracket or whitespace, and before
/// closing brackets and punctuation. A newline is added unless the line
/// already ends in one; a trailing `$` is dropped instead.
///
/// ```
/// use savoksi_core::terminal::format_line;
/// use savoksi_core::Value;
///
/// let words = [Value::from("tulos"), Value::from("("), Value::from(3), Value::from(").")];
/// assert_eq!(format_line(&words), "tulos (3).\n");
/// ```
pub fn format_line(words: &[Value]) -> String {
    let mut line = String::new();

    for word in words {
        let word = stringify(word);
        let spaced = !line.is_empty()
            && !word.is_empty()
            && !line.ends_with(|c: char| NO_SPACE_AFTER.contains(c))
            && !word.starts_with(|c: char| NO_SPACE_BEFORE.contains(c));
        if spaced {
            line.push(' ');
        }
        line.push_str(&word);
    }

    if line.ends_with('$') {
        line.pop();
    } else if !line.ends_with(['\r', '\n']) {
        line.push('\n');
    }

    line
}

/// In-memory sink shared between a terminal and a test
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct Capture(std::sync::Arc<Mutex<Vec<u8>>>);

#[cfg(test)]
impl Capture {
    pub(crate) fn text(&self) -> String {
        let bytes = self.0.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

#[cfg(test)]
impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| std::io::Error::other("poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
