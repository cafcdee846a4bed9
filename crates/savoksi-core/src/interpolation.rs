//! Message templating
//!
//! Templates contain `{...}` placeholders:
//! - `{1}`, `{2}`: positional arguments, counting from one
//! - `{nimi}`, `{palvelimet[0].osoite}`: paths into the arguments
//! - `{}`: the first argument
//!
//! Anything else after a `{` is copied through unchanged. A placeholder that
//! looks like a path but does not parse as one is an error. When a template
//! uses no placeholders at all, the arguments are appended after a space,
//! so `interpolate("unknown component", &["x".into()])` still says which
//! component.

use std::borrow::Cow;

use crate::error::Result;
use crate::path::{self, Path};
use crate::stringify::stringify;
use crate::value::Value;

/// How far past a `{` a placeholder may extend, closing `}` included
const LOOKAHEAD: usize = 80;

/// Substitute `args` into `template`, failing on malformed placeholder paths
///
/// A single container or object argument is used as the argument source
/// directly; otherwise the arguments form a sequence.
///
/// ```
/// use savoksi_core::{try_interpolate, ErrorKind, Value};
///
/// let args = [Value::from("x"), Value::from("y")];
/// assert_eq!(try_interpolate("{2} ja {1}", &args).unwrap(), "y ja x");
/// assert_eq!(try_interpolate("{a..b}", &args).unwrap_err().kind, ErrorKind::Lexical);
/// ```
pub fn try_interpolate(template: &str, args: &[Value]) -> Result<String> {
    let source = match args {
        [single] if single.is_aggregate() => Cow::Borrowed(single),
        _ => Cow::Owned(Value::Sequence(args.to_vec())),
    };

    let (mut text, substituted) = Scanner::new(template).render(&source)?;

    if !substituted && !source.is_empty_container() {
        let tail = match source.as_sequence() {
            Some([single]) if !single.is_null() => stringify(single),
            _ => stringify(&source),
        };
        if !tail.is_empty() {
            text.push(' ');
            text.push_str(&tail);
        }
    }

    Ok(text)
}

/// Substitute `args` into `template`, never failing
///
/// A malformed placeholder path renders as the error's message instead of
/// the template. Error messages are built with this.
///
/// ```
/// use savoksi_core::{interpolate, Value};
///
/// let args = [Value::from("x"), Value::from("y")];
/// assert_eq!(interpolate("{2} ja {1}", &args), "y ja x");
/// assert_eq!(interpolate("plain", &[Value::from("extra")]), "plain extra");
/// assert_eq!(interpolate("{a..b}", &args), "invalid index a..b");
/// ```
pub fn interpolate(template: &str, args: &[Value]) -> String {
    try_interpolate(template, args).unwrap_or_else(|e| {
        log::warn!("Cannot interpolate '{}': {}", template, e.message());
        e.message().to_string()
    })
}

/// Scanner over template text
struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// Render the template, reporting whether any placeholder was replaced
    fn render(&mut self, source: &Value) -> Result<(String, bool)> {
        let mut out = String::with_capacity(self.input.len());
        let mut substituted = false;

        while self.pos < self.input.len() {
            let rest = self.rest();
            let Some(offset) = rest.find('{') else {
                out.push_str(rest);
                break;
            };
            out.push_str(&rest[..offset]);
            self.pos += offset + 1;

            let Some((target, consumed)) = self.placeholder() else {
                out.push('{');
                continue;
            };

            match path::get(target, source)? {
                Some(value) => out.push_str(&stringify(&value)),
                None => out.push_str("null"),
            }
            self.pos += consumed;
            substituted = true;
        }

        Ok((out, substituted))
    }

    /// Classify the text after a `{`, returning the target and the length
    /// up to and including the closing `}`
    fn placeholder(&self) -> Option<(Path, usize)> {
        let rest = self.rest();
        let window = &rest.as_bytes()[..rest.len().min(LOOKAHEAD)];

        let digits = window.iter().take_while(|b| b.is_ascii_digit()).count();
        if digits > 0 && window[0] != b'0' && window.get(digits) == Some(&b'}') {
            if let Ok(n) = rest[..digits].parse::<usize>() {
                return Some((Path::Index(n - 1), digits + 1));
            }
        }

        let name = window
            .iter()
            .take_while(|&&b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'[' | b']' | b'-'))
            .count();
        if name > 0 && window.get(name) == Some(&b'}') {
            return Some((Path::from(&rest[..name]), name + 1));
        }

        if window.first() == Some(&b'}') {
            return Some((Path::Index(0), 1));
        }

        None
    }
}
