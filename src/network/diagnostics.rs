// Last-seen response state for crash reports
// Author: kelexine (https://github.com/kelexine)

use super::RawResponse;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// Status line and body of the most recently processed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseInfo {
    pub status_code: u16,
    pub reason: String,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct DiagnosticSnapshot {
    pub last_response: Option<ResponseInfo>,
    pub last_payload: Option<Value>,
}

/// Shared handle to the last response and payload seen by a façade.
///
/// Written after every processed response and only read when something
/// goes wrong. Last write wins.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    inner: Arc<Mutex<DiagnosticSnapshot>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_response(&self, response: &RawResponse) {
        self.inner.lock().last_response = Some(ResponseInfo {
            status_code: response.status,
            reason: response.reason.clone(),
            text: response.text.clone(),
        });
    }

    pub fn record_payload(&self, payload: &Value) {
        self.inner.lock().last_payload = Some(payload.clone());
    }

    pub fn snapshot(&self) -> DiagnosticSnapshot {
        self.inner.lock().clone()
    }

    /// Human-readable dump for error reports.
    pub fn report(&self) -> String {
        let snapshot = self.snapshot();
        let mut report = String::new();

        match &snapshot.last_response {
            Some(info) => report.push_str(&format!(
                "last response: {} {}\n{}\n",
                info.status_code, info.reason, info.text
            )),
            None => report.push_str("last response: <none>\n"),
        }
        match &snapshot.last_payload {
            Some(payload) => report.push_str(&format!("last payload: {}", payload)),
            None => report.push_str("last payload: <none>"),
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_last_write_wins() {
        let diagnostics = Diagnostics::new();
        assert!(diagnostics.snapshot().last_response.is_none());

        diagnostics.record_response(&RawResponse::new(500, "Internal Server Error", "utf-8", "oops"));
        diagnostics.record_response(&RawResponse::new(200, "OK", "utf-8", r#"{"ret":0}"#));
        diagnostics.record_payload(&json!({"ret": 0}));

        let snapshot = diagnostics.snapshot();
        let info = snapshot.last_response.unwrap();
        assert_eq!(info.status_code, 200);
        assert_eq!(info.text, r#"{"ret":0}"#);
        assert_eq!(snapshot.last_payload, Some(json!({"ret": 0})));
    }

    #[test]
    fn test_clones_share_state() {
        let diagnostics = Diagnostics::new();
        let reporter = diagnostics.clone();
        diagnostics.record_payload(&json!(1));
        assert!(reporter.report().contains("last payload: 1"));
        assert!(reporter.report().contains("last response: <none>"));
    }
}
