//! Name canonicalization
//!
//! Components are requested by short names such as `paate` or
//! `sovellus:asenna-komento` and registered under canonical names such as
//! `Savoksi\Paate` or `Sovellus\AsennaKomento`. [`canonicalize`] and
//! [`shorten`] convert between the two. Results are memoized per
//! `(name, suffix)` for the lifetime of the process.

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use crate::error::{Error, Result};

/// Namespace prepended to names that do not carry one
pub const DEFAULT_NAMESPACE: &str = "Savoksi";

/// Separator between namespace segments of a canonical name
pub const SEPARATOR: char = '\\';

type Memo = RwLock<HashMap<(String, String), String>>;

static CANONICAL: OnceLock<Memo> = OnceLock::new();
static SHORT: OnceLock<Memo> = OnceLock::new();

/// Convert a short name into a canonical name
///
/// Words are capitalized and concatenated; `-` and `_` join words, `:` and
/// `\` separate namespaces. Names without a namespace land in
/// [`DEFAULT_NAMESPACE`]. A non-empty `suffix` is appended unless the
/// name already ends with it.
///
/// ```
/// use savoksi_core::naming::canonicalize;
///
/// assert_eq!(canonicalize("asenna", "Komento").unwrap(), "Savoksi\\AsennaKomento");
/// assert_eq!(canonicalize("sovellus:luo-tili", "").unwrap(), "Sovellus\\LuoTili");
/// ```
pub fn canonicalize(name: &str, suffix: &str) -> Result<String> {
    memoized(&CANONICAL, name, suffix, || build_canonical(name, suffix))
}

/// Convert a canonical name back into a short name
///
/// The default namespace prefix is dropped, as is a trailing `suffix`
/// unless it forms a whole namespace segment of its own.
///
/// ```
/// use savoksi_core::naming::shorten;
///
/// assert_eq!(shorten("Savoksi\\AsennaKomento", "Komento").unwrap(), "asenna");
/// assert_eq!(shorten("Sovellus\\LuoTili", "").unwrap(), "sovellus:luo-tili");
/// ```
pub fn shorten(name: &str, suffix: &str) -> Result<String> {
    memoized(&SHORT, name, suffix, || build_short(name, suffix))
}

fn memoized(
    memo: &'static OnceLock<Memo>,
    name: &str,
    suffix: &str,
    build: impl FnOnce() -> Result<String>,
) -> Result<String> {
    let memo = memo.get_or_init(Default::default);
    let key = (name.to_string(), suffix.to_string());

    if let Some(hit) = memo.read().ok().and_then(|m| m.get(&key).cloned()) {
        log::trace!("Name cache hit: {:?} ({:?}) -> {}", name, suffix, hit);
        return Ok(hit);
    }

    let result = build()?;
    if let Ok(mut m) = memo.write() {
        m.insert(key, result.clone());
    }
    Ok(result)
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, 'å' | 'ä' | 'ö' | 'Å' | 'Ä' | 'Ö')
}

fn is_word_start(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, 'å' | 'ä' | 'ö' | 'Å' | 'Ä' | 'Ö')
}

fn is_word_tail(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, 'å' | 'ä' | 'ö')
}

fn is_upper(c: char) -> bool {
    c.is_ascii_uppercase() || matches!(c, 'Å' | 'Ä' | 'Ö')
}

fn build_canonical(name: &str, suffix: &str) -> Result<String> {
    if name.is_empty() {
        return Err(Error::invalid_name(name));
    }

    let mut result = String::with_capacity(name.len() + suffix.len() + DEFAULT_NAMESPACE.len());
    let mut chars = name.chars().peekable();

    loop {
        if let Some(first) = chars.next_if(|&c| is_word_char(c)) {
            result.extend(first.to_uppercase());
            while let Some(c) = chars.next_if(|&c| is_word_char(c)) {
                result.push(c);
            }
        }

        match chars.next() {
            Some(':' | '\\') => result.push(SEPARATOR),
            Some('-' | '_') => {}
            Some(_) => return Err(Error::invalid_name(name)),
            None => break,
        }
    }

    if !result.contains(SEPARATOR) {
        result.insert(0, SEPARATOR);
        result.insert_str(0, DEFAULT_NAMESPACE);
    }

    if !suffix.is_empty() && !result.ends_with(suffix) {
        result.push_str(suffix);
    }

    Ok(result)
}

fn build_short(name: &str, suffix: &str) -> Result<String> {
    if name.is_empty() {
        return Err(Error::invalid_name(name));
    }

    let start = name
        .strip_prefix(DEFAULT_NAMESPACE)
        .and_then(|rest| rest.strip_prefix(SEPARATOR))
        .map_or(0, |rest| name.len() - rest.len());

    let mut end = name.len();
    if !suffix.is_empty() && name[start..].len() > suffix.len() && name.ends_with(suffix) {
        let cut = end - suffix.len();
        // A suffix that is a namespace segment of its own stays
        if !name[..cut].ends_with(SEPARATOR) {
            end = cut;
        }
    }

    let mut result = String::with_capacity(end - start + 4);
    let mut chars = name[start..end].chars().peekable();

    while chars.peek().is_some() {
        if let Some(first) = chars.next_if(|&c| is_word_start(c)) {
            result.extend(first.to_lowercase());
            while let Some(c) = chars.next_if(|&c| is_word_tail(c)) {
                result.push(c);
            }
        }

        match chars.peek().copied() {
            Some('\\' | ':') => {
                result.push(':');
                chars.next();
            }
            Some('-' | '_') => {
                result.push('-');
                chars.next();
            }
            // Next word starts here
            Some(c) if is_upper(c) => result.push('-'),
            Some(_) => return Err(Error::invalid_name(name)),
            None => break,
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_canonicalize_default_namespace() {
        assert_eq!(canonicalize("paate", "").unwrap(), "Savoksi\\Paate");
        assert_eq!(canonicalize("luo-tili", "").unwrap(), "Savoksi\\LuoTili");
        assert_eq!(canonicalize("luo_tili", "").unwrap(), "Savoksi\\LuoTili");
        assert_eq!(canonicalize("äiti", "").unwrap(), "Savoksi\\Äiti");
    }

    #[test]
    fn test_canonicalize_namespaces() {
        assert_eq!(
            canonicalize("sovellus:asenna-komento", "").unwrap(),
            "Sovellus\\AsennaKomento"
        );
        assert_eq!(canonicalize("Savoksi\\Paate", "").unwrap(), "Savoksi\\Paate");
        assert_eq!(canonicalize("a:b:c", "").unwrap(), "A\\B\\C");
    }

    #[test]
    fn test_canonicalize_suffix() {
        assert_eq!(canonicalize("asenna", "Komento").unwrap(), "Savoksi\\AsennaKomento");
        assert_eq!(
            canonicalize("asenna-komento", "Komento").unwrap(),
            "Savoksi\\AsennaKomento"
        );
        assert_eq!(canonicalize("oma:komento", "Komento").unwrap(), "Oma\\Komento");
    }

    #[test]
    fn test_canonicalize_keeps_inner_case() {
        assert_eq!(canonicalize("json", "").unwrap(), "Savoksi\\Json");
        assert_eq!(canonicalize("luoTili", "").unwrap(), "Savoksi\\LuoTili");
    }

    #[test]
    fn test_canonicalize_rejects_invalid_characters() {
        for name in ["a b", "tili!", "a.b", ""] {
            let err = canonicalize(name, "").unwrap_err();
            assert_eq!(err.kind, ErrorKind::Lexical, "name {:?}", name);
        }
        assert_eq!(
            canonicalize("a b", "").unwrap_err().message(),
            "invalid class name a b"
        );
    }

    #[test]
    fn test_shorten() {
        assert_eq!(shorten("Savoksi\\Paate", "").unwrap(), "paate");
        assert_eq!(shorten("Sovellus\\Asenna", "").unwrap(), "sovellus:asenna");
        assert_eq!(shorten("LuoTilitBertta", "").unwrap(), "luo-tilit-bertta");
        assert_eq!(shorten("luo_tilit", "").unwrap(), "luo-tilit");
        assert_eq!(shorten("Savoksi\\Äiti", "").unwrap(), "äiti");
    }

    #[test]
    fn test_shorten_suffix() {
        assert_eq!(shorten("Savoksi\\AsennaKomento", "Komento").unwrap(), "asenna");
        assert_eq!(shorten("Oma\\Komento", "Komento").unwrap(), "oma:komento");
        assert_eq!(shorten("Savoksi\\Komento", "Komento").unwrap(), "komento");
        assert_eq!(shorten("Komento", "Komento").unwrap(), "komento");
    }

    #[test]
    fn test_shorten_rejects_invalid_characters() {
        assert_eq!(shorten("Savoksi\\2fa", "").unwrap_err().kind, ErrorKind::Lexical);
        assert_eq!(shorten("Tili Bertta", "").unwrap_err().kind, ErrorKind::Lexical);
        assert_eq!(shorten("", "").unwrap_err().kind, ErrorKind::Lexical);
    }

    #[test]
    fn test_short_names_round_trip() {
        for short in [
            "paate",
            "asenna-komento",
            "sovellus:asenna-komento",
            "luo-tilit-bertta",
            "a:b:c",
            "äiti:ikä",
            "tili2",
        ] {
            let canonical = canonicalize(short, "").unwrap();
            assert_eq!(shorten(&canonical, "").unwrap(), short);
        }
    }

    #[test]
    fn test_canonical_names_round_trip() {
        for (canonical, suffix) in [
            ("Savoksi\\AsennaKomento", "Komento"),
            ("Savoksi\\PaivitaKomento", "Komento"),
            ("Oma\\Komento", "Komento"),
            ("Savoksi\\Paate", ""),
            ("Sovellus\\LuoTiliSovellus", "Sovellus"),
        ] {
            let short = shorten(canonical, suffix).unwrap();
            assert_eq!(canonicalize(&short, suffix).unwrap(), canonical);
        }
    }

    #[test]
    fn test_memoized_results_are_stable() {
        let first = canonicalize("muisti-testi", "Komento").unwrap();
        let second = canonicalize("muisti-testi", "Komento").unwrap();
        assert_eq!(first, second);
        assert_eq!(canonicalize("muisti-testi", "").unwrap(), "Savoksi\\MuistiTesti");
    }
}
