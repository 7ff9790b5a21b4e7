// Raw HTTP response snapshot
// Author: kelexine (https://github.com/kelexine)

use crate::error::Result;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use serde_json::Value;

/// Charsets that are decoded as declared instead of being forced to UTF-8.
/// Re-decoding these as UTF-8 would garble otherwise correct text.
pub const LEGACY_ENCODINGS: &[&str] = &["gbk"];

/// Transport-level view of one response attempt, with the body already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub reason: String,
    /// Charset the body text was decoded with.
    pub encoding: String,
    pub text: String,
}

impl RawResponse {
    pub fn new(
        status: u16,
        reason: impl Into<String>,
        encoding: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            status,
            reason: reason.into(),
            encoding: encoding.into(),
            text: text.into(),
        }
    }

    /// Read a `reqwest` response to completion.
    ///
    /// The body is decoded as UTF-8 unless the server declared one of the
    /// [`LEGACY_ENCODINGS`], in which case that charset is honoured.
    pub async fn from_reqwest(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let reason = status.canonical_reason().unwrap_or_default().to_string();

        let legacy = declared_charset(response.headers())
            .filter(|charset| LEGACY_ENCODINGS.contains(&charset.as_str()));

        let (encoding, text) = match legacy {
            Some(charset) => {
                let text = response.text_with_charset(&charset).await?;
                (charset, text)
            }
            None => {
                let body = response.bytes().await?;
                ("utf-8".to_string(), String::from_utf8_lossy(&body).into_owned())
            }
        };

        Ok(Self {
            status: status.as_u16(),
            reason,
            encoding,
            text,
        })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as plain JSON.
    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.text)?)
    }
}

/// Lower-cased `charset` parameter of the `Content-Type` header, if any.
pub(crate) fn declared_charset(headers: &HeaderMap) -> Option<String> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if name.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"').to_ascii_lowercase())
        } else {
            None
        }
    })
}
