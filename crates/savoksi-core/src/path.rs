//! Path indexing into nested values
//!
//! Paths look like `tietokanta.osoite`, `taulu[4].a` or `[0][5]`. Reads are
//! miss-tolerant: a path that leads nowhere yields `None`, never an error.
//! Writes create intermediate mappings and merge containers into
//! containers, but refuse to swap a scalar for a container or the other
//! way round.

use indexmap::IndexMap;
use std::borrow::Cow;
use std::fmt;

use crate::error::{Error, ErrorKind, Result};
use crate::value::{sequence_index, Value};

/// A path argument
///
/// Paths may be given as text that still needs tokenizing, as ready-made
/// keys, as a single integer index, or as [`Path::Whole`] for the value
/// itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Path {
    /// The whole value
    #[default]
    Whole,
    /// A single sequence index
    Index(usize),
    /// Unparsed path text
    Text(String),
    /// Pre-tokenized keys
    Keys(Vec<String>),
}

impl Path {
    /// Resolve into keys, `None` meaning the whole value
    pub fn into_keys(self) -> Result<Option<Vec<String>>> {
        match self {
            Path::Whole => Ok(None),
            Path::Index(i) => Ok(Some(vec![i.to_string()])),
            Path::Text(text) => tokenize(&text).map(Some),
            Path::Keys(keys) => Ok(Some(keys)),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Path::Whole => Ok(()),
            Path::Index(i) => write!(f, "[{}]", i),
            Path::Text(text) => f.write_str(text),
            Path::Keys(keys) => f.write_str(&keys.join(".")),
        }
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Path::Text(s.to_string())
    }
}

impl From<String> for Path {
    fn from(s: String) -> Self {
        Path::Text(s)
    }
}

impl From<&String> for Path {
    fn from(s: &String) -> Self {
        Path::Text(s.clone())
    }
}

impl From<usize> for Path {
    fn from(i: usize) -> Self {
        Path::Index(i)
    }
}

impl From<Vec<String>> for Path {
    fn from(keys: Vec<String>) -> Self {
        Path::Keys(keys)
    }
}

impl From<&[&str]> for Path {
    fn from(keys: &[&str]) -> Self {
        Path::Keys(keys.iter().map(|k| k.to_string()).collect())
    }
}

impl<T: Into<Path>> From<Option<T>> for Path {
    fn from(path: Option<T>) -> Self {
        path.map_or(Path::Whole, Into::into)
    }
}

/// Why a path failed to tokenize
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    InvalidIndex,
    UnexpectedAfterIndex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Expecting a bare key or a bracketed index
    Key,
    /// Expecting `.` or `[` after a key
    Sep,
}

/// Two-state scanner over path text
struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn current(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.current() {
            self.pos += c.len_utf8();
        }
    }

    fn scan(&mut self) -> std::result::Result<Vec<String>, Fault> {
        let mut keys = Vec::new();
        let mut state = State::Key;

        while let Some(c) = self.current() {
            match state {
                State::Key => {
                    match c {
                        '.' | ']' => return Err(Fault::InvalidIndex),
                        '[' => {
                            self.advance();
                            let rest = &self.input[self.pos..];
                            let end = rest.find(']').ok_or(Fault::InvalidIndex)?;
                            // `[]` contributes nothing
                            if end > 0 {
                                keys.push(rest[..end].to_string());
                            }
                            self.pos += end + 1;
                        }
                        _ => keys.push(self.collect_key()),
                    }
                    state = State::Sep;
                }
                State::Sep => match c {
                    '.' => {
                        self.advance();
                        if self.current().is_none() {
                            return Err(Fault::InvalidIndex);
                        }
                        state = State::Key;
                    }
                    '[' => state = State::Key,
                    _ => return Err(Fault::UnexpectedAfterIndex),
                },
            }
        }

        Ok(keys)
    }

    /// Consume a maximal run of characters other than `[`, `]` and `.`
    fn collect_key(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.current() {
            if matches!(c, '[' | ']' | '.') {
                break;
            }
            self.advance();
        }
        self.input[start..self.pos].to_string()
    }
}

/// Split path text into keys
///
/// ```
/// use savoksi_core::path::tokenize;
///
/// assert_eq!(tokenize("taulu[4].a").unwrap(), vec!["taulu", "4", "a"]);
/// assert!(tokenize(".b").is_err());
/// ```
pub fn tokenize(path: &str) -> Result<Vec<String>> {
    Tokenizer::new(path).scan().map_err(|fault| match fault {
        Fault::InvalidIndex => Error::invalid_index(path),
        Fault::UnexpectedAfterIndex => Error::unexpected_after_index(path),
    })
}

/// Read the value at `path` inside `container`
///
/// Mapping keys and sequence indices are followed first, object properties
/// second. The result borrows from `container` until a step goes through an
/// object property, after which it is owned.
pub fn get<'a>(path: impl Into<Path>, container: &'a Value) -> Result<Option<Cow<'a, Value>>> {
    let keys = match path.into().into_keys()? {
        Some(keys) => keys,
        None => return Ok(Some(Cow::Borrowed(container))),
    };

    let mut current = Cow::Borrowed(container);
    for key in &keys {
        current = match current {
            Cow::Borrowed(value) => match value.child(key) {
                Some(child) => Cow::Borrowed(child),
                None => match value.property(key) {
                    Some(property) => Cow::Owned(property),
                    None => return Ok(None),
                },
            },
            Cow::Owned(value) => match value.child(key).cloned().or_else(|| value.property(key)) {
                Some(next) => Cow::Owned(next),
                None => return Ok(None),
            },
        };
    }

    Ok(Some(current))
}

/// Write `value` at `path` inside `container`
///
/// A null container becomes an empty mapping. Existing nulls count as
/// absent.
pub fn set(container: &mut Value, path: impl Into<Path>, value: Value) -> Result<()> {
    let path = path.into();
    let label = path.to_string();
    let keys = path.into_keys()?.ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidArgument,
            "cannot assign to the whole value",
            &[],
        )
    })?;

    let Some((last, parents)) = keys.split_last() else {
        return assign(container, value, &label);
    };

    if container.is_null() {
        *container = Value::Mapping(IndexMap::new());
    }

    let mut node = container;
    for key in parents {
        let slot = entry(node, key, &label)?;
        if slot.is_null() {
            *slot = Value::Mapping(IndexMap::new());
        } else if !slot.is_container() {
            return Err(Error::type_conflict("cannot descend through scalar", label));
        }
        node = slot;
    }

    let slot = entry(node, last, &label)?;
    assign(slot, value, &label)
}

/// Apply the last-step rules to an existing slot
fn assign(slot: &mut Value, value: Value, label: &str) -> Result<()> {
    if slot.is_null() {
        *slot = value;
        return Ok(());
    }

    if !slot.is_container() {
        if value.is_container() {
            return Err(Error::type_conflict("cannot replace scalar with container", label));
        }
        *slot = value;
        return Ok(());
    }

    match value {
        Value::Mapping(map) => {
            for (key, item) in map {
                let child = entry(slot, &key, label)?;
                assign(child, item, label)?;
            }
            Ok(())
        }
        Value::Sequence(seq) => {
            for (index, item) in seq.into_iter().enumerate() {
                let child = entry(slot, &index.to_string(), label)?;
                assign(child, item, label)?;
            }
            Ok(())
        }
        _ => Err(Error::type_conflict("cannot replace container with scalar", label)),
    }
}

/// Mutable slot for `key` inside a container, inserted as null when absent
///
/// A sequence accepts existing indices and the index one past its end;
/// any other key turns it into a mapping keyed by index text.
fn entry<'a>(node: &'a mut Value, key: &str, label: &str) -> Result<&'a mut Value> {
    if let Value::Sequence(seq) = &mut *node {
        let fits = sequence_index(key).is_some_and(|i| i <= seq.len());
        if !fits {
            let items = std::mem::take(seq);
            *node = Value::Mapping(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| (i.to_string(), item))
                    .collect(),
            );
        }
    }

    match node {
        Value::Mapping(map) => Ok(map.entry(key.to_string()).or_insert(Value::Null)),
        Value::Sequence(seq) => {
            let index = sequence_index(key).unwrap_or(seq.len());
            if index == seq.len() {
                seq.push(Value::Null);
            }
            seq.get_mut(index)
                .ok_or_else(|| Error::type_conflict("cannot descend through scalar", label))
        }
        _ => Err(Error::type_conflict("cannot descend through scalar", label)),
    }
}
