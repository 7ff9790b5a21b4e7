//! JSONP unwrapping for the two envelope styles the backend produces.
//!
//! - [`JsonpDialect::Standard`]: `callback({...})`, strict JSON inside the parentheses.
//! - [`JsonpDialect::Malformed`]: `var x = {key:value,key:'value'};`, a flat list of
//!   `key:value` tokens that is not valid JSON and is decoded best-effort.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::error::{LotteryError, Result};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonpDialect {
    Standard,
    Malformed,
}

/// Extract the payload of a JSONP body.
///
/// `unquote` percent-decodes values of the malformed dialect; it has no
/// effect on the standard dialect.
pub fn decode(text: &str, dialect: JsonpDialect, unquote: bool) -> Result<Value> {
    match dialect {
        JsonpDialect::Standard => {
            let inner = between(text, '(', ')')?;
            Ok(serde_json::from_str(inner)?)
        }
        JsonpDialect::Malformed => {
            let inner = between(text, '{', '}')?;
            Ok(Value::Object(decode_pairs(inner, unquote)))
        }
    }
}

/// `application/x-www-form-urlencoded` style decoding: `+` is a space and
/// invalid UTF-8 sequences are replaced rather than rejected.
pub fn unquote_plus(input: &str) -> String {
    let spaced = input.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned()
}

/// Text strictly between the first `open` and the last `close`.
fn between(text: &str, open: char, close: char) -> Result<&str> {
    let start = text
        .find(open)
        .ok_or_else(|| LotteryError::Jsonp(format!("missing '{}' in response: {}", open, text)))?;
    let end = text
        .rfind(close)
        .ok_or_else(|| LotteryError::Jsonp(format!("missing '{}' in response: {}", close, text)))?;

    if end <= start {
        return Err(LotteryError::Jsonp(format!(
            "'{}' appears before '{}' in response: {}",
            close, open, text
        )));
    }

    Ok(&text[start + open.len_utf8()..end])
}

fn decode_pairs(inner: &str, unquote: bool) -> Map<String, Value> {
    let mut pairs = Map::new();

    for token in inner.split(',') {
        // Tokens without a colon carry no key/value pair; skip them.
        let Some((key, value)) = token.trim().split_once(':') else {
            continue;
        };

        let value = strip_quotes(value.trim());
        let value = if unquote {
            unquote_plus(value)
        } else {
            value.to_string()
        };

        pairs.insert(key.trim().to_string(), Value::String(value));
    }

    pairs
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['\'', '"'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("'abc'"), "abc");
        assert_eq!(strip_quotes("\"abc\""), "abc");
        assert_eq!(strip_quotes("'abc"), "'abc");
        assert_eq!(strip_quotes("'"), "'");
        assert_eq!(strip_quotes("''"), "");
        assert_eq!(strip_quotes("abc"), "abc");
    }

    #[test]
    fn test_unquote_plus() {
        assert_eq!(unquote_plus("a+b%20c"), "a b c");
        assert_eq!(unquote_plus("%E4%B8%AD"), "中");
        assert_eq!(unquote_plus("100%"), "100%");
    }

    #[test]
    fn test_between_rejects_reversed_delimiters() {
        assert!(between(")(", '(', ')').is_err());
        assert_eq!(between("cb(1)", '(', ')').unwrap(), "1");
    }
}
