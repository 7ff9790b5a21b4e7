//! Response normalization: decoding, success verdicts, and response logging.
//!
//! The backend reports success through several unrelated conventions. They
//! are checked as an ordered list of [`SuccessRule`]s, where every rule that
//! applies overrides the verdict of the rules before it, so the more specific
//! shapes at the end of the list win over the generic return-code keys.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use super::jsonp::{self, unquote_plus, JsonpDialect};
use super::{Diagnostics, RawResponse};
use crate::error::Result;
use crate::metrics;
use crate::utils::logging::log_at;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, Level};

/// How a response body is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    #[default]
    Json,
    JsonpStandard,
    JsonpMalformed,
}

impl ResponseFormat {
    pub fn dialect(self) -> Option<JsonpDialect> {
        match self {
            ResponseFormat::Json => None,
            ResponseFormat::JsonpStandard => Some(JsonpDialect::Standard),
            ResponseFormat::JsonpMalformed => Some(JsonpDialect::Malformed),
        }
    }
}

/// Decoding and logging switches for [`process_result`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOptions {
    pub format: ResponseFormat,
    pub need_unquote: bool,
    pub pretty: bool,
    /// Log the payload at info/error. When false it is still logged, at debug.
    pub print_res: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            format: ResponseFormat::Json,
            need_unquote: true,
            pretty: false,
            print_res: true,
        }
    }
}

/// Return-code keys, in priority order. Only the first one present is used.
pub const RETURN_CODE_KEYS: &[&str] = &["ret", "code", "iRet", "status", "ecode"];

/// One success convention. `verdict` returns `None` when the payload does not
/// use this convention.
pub struct SuccessRule {
    pub name: &'static str,
    pub verdict: fn(&Value) -> Option<bool>,
}

pub const SUCCESS_RULES: &[SuccessRule] = &[
    SuccessRule {
        name: "return code",
        verdict: return_code_verdict,
    },
    SuccessRule {
        name: "video activity sys_code",
        verdict: sys_code_verdict,
    },
    SuccessRule {
        name: "card gift",
        verdict: card_gift_verdict,
    },
    SuccessRule {
        name: "bare integer",
        verdict: bare_integer_verdict,
    },
];

/// Decide whether a decoded payload reports success.
///
/// Payloads matching none of [`SUCCESS_RULES`] count as successful: most
/// endpoints carry no status key at all. This also means a failure from an
/// endpoint with an unknown shape is reported as success.
pub fn is_request_ok(data: &Value) -> bool {
    SUCCESS_RULES.iter().fold(true, |success, rule| {
        match (rule.verdict)(data) {
            Some(verdict) => verdict,
            None => success,
        }
    })
}

fn return_code_verdict(data: &Value) -> Option<bool> {
    let object = data.as_object()?;
    let (key, value) = RETURN_CODE_KEYS
        .iter()
        .find_map(|key| object.get(*key).map(|value| (*key, value)))?;

    if key == "status" {
        if let Value::String(text) = value {
            // Any Unicode numeric char passes here, not only ASCII digits. A
            // full-width "１" then fails integer parsing and keeps the default.
            if text.is_empty() || !text.chars().all(char::is_numeric) {
                return Some(false);
            }
        }
        return parse_code(key, value).map(|code| matches!(code, 0 | 1 | 200));
    }

    parse_code(key, value).map(|code| code == 0)
}

fn sys_code_verdict(data: &Value) -> Option<bool> {
    let sys_code = data.get("data")?.as_object()?.get("sys_code")?;
    parse_code("sys_code", sys_code).map(|code| code == 0)
}

fn card_gift_verdict(data: &Value) -> Option<bool> {
    let ret = data.get("13333")?.as_object()?.get("ret")?;
    parse_code("13333.ret", ret).map(|code| code == 0)
}

fn bare_integer_verdict(data: &Value) -> Option<bool> {
    match data {
        Value::Number(number) if number.is_i64() || number.is_u64() => {
            Some(number.as_i64() == Some(0))
        }
        _ => None,
    }
}

/// Interpret a status value as an integer, accepting numeric strings.
fn parse_code(key: &str, value: &Value) -> Option<i64> {
    let code = match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|f| f.trunc() as i64)),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        Value::Bool(flag) => Some(i64::from(*flag)),
        _ => None,
    };

    if code.is_none() {
        error!("is_request_ok: cannot read {} as an integer, value={}", key, value);
    }
    code
}

/// Reduce responses whose useful part is buried in a large envelope.
///
/// Returns `None` when the payload should be logged as-is.
pub fn pre_process_data(data: &Value) -> Option<Value> {
    let object = data.as_object()?;
    if !(object.contains_key("frame_resp") && object.contains_key("data")) {
        return None;
    }

    let inner = &object["data"];
    let code = inner
        .get("sys_code")
        .or_else(|| object.get("ret"))
        .cloned()
        .unwrap_or(Value::Null);
    let prize_id = inner.get("prize_id").cloned().unwrap_or_else(|| json!("0"));

    Some(json!({
        "msg": extract_qq_video_message(data),
        "code": code,
        "prize_id": prize_id
    }))
}

/// Lottery text of a video-activity response, followed by the top-level `msg`.
pub fn extract_qq_video_message(res: &Value) -> String {
    let data = &res["data"];

    let mut msg = if let Some(text) = data.get("lottery_txt") {
        value_text(text)
    } else if let Some(words) = data.get("wording_info") {
        value_text(&words["custom_words"])
    } else {
        String::new()
    };

    if let Some(extra) = res.get("msg") {
        msg.push_str(" | ");
        msg.push_str(&value_text(extra));
    }

    msg
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Serialize `data` for a log line, percent-decoding it for readability.
pub fn pretty_json(data: &Value, pretty: bool) -> String {
    let serialized = if pretty {
        serde_json::to_string_pretty(data)
    } else {
        serde_json::to_string(data)
    }
    .unwrap_or_else(|_| data.to_string());

    unquote_plus(&serialized)
}

/// Decode a response, judge it, log it, and record it in `diagnostics`.
///
/// `raw` is `None` when every retry failed; that is logged and reported as
/// `Ok(None)`. Undecodable bodies are returned as errors.
pub fn process_result(
    ctx: &str,
    raw: Option<RawResponse>,
    options: &ProcessOptions,
    diagnostics: &Diagnostics,
) -> Result<Option<Value>> {
    let Some(raw) = raw else {
        error!("{}\tno response received, request abandoned", ctx);
        return Ok(None);
    };

    diagnostics.record_response(&raw);
    if !raw.is_success() {
        debug!("{}\tHTTP {} {}", ctx, raw.status, raw.reason);
    }

    let data = match options.format.dialect() {
        Some(dialect) => jsonp::decode(&raw.text, dialect, options.need_unquote)?,
        None => raw.json()?,
    };

    let success = is_request_ok(&data);
    metrics::record_business_result(success);

    let level = match (options.print_res, success) {
        (true, true) => Level::INFO,
        (true, false) => Level::ERROR,
        (false, _) => Level::DEBUG,
    };

    match pre_process_data(&data) {
        None => log_at(level, &format!("{}\t{}", ctx, pretty_json(&data, options.pretty))),
        Some(processed) => {
            log_at(
                level,
                &format!("{}\t{}", ctx, pretty_json(&processed, options.pretty)),
            );
            debug!("{}(raw)\t{}", ctx, pretty_json(&data, options.pretty));
        }
    }

    diagnostics.record_payload(&data);

    Ok(Some(data))
}
