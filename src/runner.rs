//! Per-account workflow runner.
//!
//! Builds one [`Network`] per enabled account and executes that account's
//! configured requests in order. Accounts run one after another, or through a
//! bounded concurrent pool when `common.enable_multiprocessing` is set. A
//! failing account is reported together with its last seen response and
//! never stops the others.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::config::{AccountConfig, AppConfig, HttpMethod, RequestConfig};
use crate::error::Result;
use crate::network::{is_request_ok, Body, Credentials, Diagnostics, Network, RequestOptions};
use chrono::Local;
use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};

/// Outcome of one account's workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountReport {
    pub index: usize,
    pub name: String,
    pub succeeded: usize,
    pub failed: usize,
    /// Set when the workflow stopped early on an error.
    pub aborted: Option<String>,
}

impl AccountReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.aborted.is_none()
    }
}

/// Run every enabled account, optionally restricted to the one named `only`.
pub async fn run(config: &AppConfig, only: Option<&str>) -> Vec<AccountReport> {
    let start = Local::now();

    for (idx, account) in config.accounts.iter().enumerate() {
        if !account.is_enabled() {
            info!("account #{} ({}) is disabled, skipping", idx + 1, account.name);
        }
    }

    let selected: Vec<_> = config
        .enabled_accounts()
        .filter(|(_, account)| only.map_or(true, |name| name == account.name))
        .collect();

    let common = &config.common;
    let pool_size = common.pool_size(selected.len());

    let reports = if common.enable_multiprocessing && pool_size > 1 {
        info!("running {} account(s) with {} in parallel", selected.len(), pool_size);
        stream::iter(selected)
            .map(|(index, account)| run_account(index, account, config))
            .buffer_unordered(pool_size)
            .collect::<Vec<_>>()
            .await
    } else {
        let mut reports = Vec::with_capacity(selected.len());
        for (index, account) in selected {
            reports.push(run_account(index, account, config).await);
        }
        reports
    };

    info!(
        "processed {} account(s) in {}s",
        reports.len(),
        (Local::now() - start).num_milliseconds() as f64 / 1000.0
    );

    reports
}

/// Execute one account's requests and summarize the outcome.
pub async fn run_account(index: usize, account: &AccountConfig, config: &AppConfig) -> AccountReport {
    let start = Local::now();
    warn!("------------ account #{} ({}) ------------", index, account.name);

    let diagnostics = Diagnostics::new();
    let mut report = AccountReport {
        index,
        name: account.name.clone(),
        succeeded: 0,
        failed: 0,
        aborted: None,
    };

    if let Err(e) = run_requests(account, config, diagnostics.clone(), &mut report).await {
        error!(
            "account #{} ({}) stopped: {}\n{}",
            index,
            account.name,
            e,
            diagnostics.report()
        );
        report.aborted = Some(e.to_string());
    }

    info!(
        "account #{} ({}) finished in {}s: {} ok, {} failed",
        index,
        account.name,
        (Local::now() - start).num_milliseconds() as f64 / 1000.0,
        report.succeeded,
        report.failed
    );

    report
}

async fn run_requests(
    account: &AccountConfig,
    config: &AppConfig,
    diagnostics: Diagnostics,
    report: &mut AccountReport,
) -> Result<()> {
    let credentials = Credentials::new(&account.device_id, &account.uin, &account.skey);
    let network = Network::new(&credentials, &config.common, diagnostics)?
        .sanitize_tokens(config.logging.sanitize_tokens);

    for request in &account.requests {
        let options = request_options(request);
        let result = match request.method {
            HttpMethod::Get => network.get(&request.ctx, &request.url, options).await?,
            HttpMethod::Post => {
                network
                    .post(&request.ctx, &request.url, request_body(request), options)
                    .await?
            }
        };

        match result {
            Some(payload) if is_request_ok(&payload) => report.succeeded += 1,
            _ => report.failed += 1,
        }
    }

    Ok(())
}

pub(crate) fn request_options(request: &RequestConfig) -> RequestOptions {
    let mut options = RequestOptions::new()
        .format(request.format)
        .need_unquote(request.need_unquote)
        .extra_cookies(request.extra_cookies.clone());
    options.extra_headers = request.extra_headers.clone();
    if request.disable_retry {
        options = options.disable_retry();
    }
    options
}

pub(crate) fn request_body(request: &RequestConfig) -> Body {
    if let Some(form) = &request.form {
        Body::Form(form.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    } else if let Some(json) = &request.json {
        Body::Json(json.clone())
    } else {
        Body::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::ResponseFormat;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn request() -> RequestConfig {
        RequestConfig {
            ctx: "query".to_string(),
            url: "http://localhost/query".to_string(),
            method: HttpMethod::Post,
            form: None,
            json: None,
            format: ResponseFormat::JsonpMalformed,
            need_unquote: false,
            disable_retry: true,
            extra_cookies: "p_skey=1;".to_string(),
            extra_headers: BTreeMap::new(),
        }
    }

    #[test]
    fn test_form_takes_precedence_over_json() {
        let mut req = request();
        req.json = Some(json!({"a": 1}));
        assert!(matches!(request_body(&req), Body::Json(_)));

        let mut form = BTreeMap::new();
        form.insert("k".to_string(), "v".to_string());
        req.form = Some(form);
        match request_body(&req) {
            Body::Form(pairs) => assert_eq!(pairs, vec![("k".to_string(), "v".to_string())]),
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_request_options_mapping() {
        let options = request_options(&request());
        assert_eq!(options.process.format, ResponseFormat::JsonpMalformed);
        assert!(!options.process.need_unquote);
        assert!(options.disable_retry);
        assert_eq!(options.extra_cookies, "p_skey=1;");
    }

    fn account(name: &str, enable: bool) -> AccountConfig {
        AccountConfig {
            name: name.to_string(),
            enable,
            ..AccountConfig::default()
        }
    }

    #[tokio::test]
    async fn test_run_skips_disabled_and_unselected_accounts() {
        let mut config = AppConfig::default();
        config.common.enable_multiprocessing = false;
        config.accounts = vec![account("a", true), account("b", false), account("c", true)];

        let reports = run(&config, None).await;
        let indices: Vec<_> = reports.iter().map(|report| report.index).collect();
        assert_eq!(indices, vec![1, 3]);
        assert!(reports.iter().all(AccountReport::is_clean));

        let reports = run(&config, Some("c")).await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].index, 3);
        assert_eq!(reports[0].name, "c");

        assert!(run(&config, Some("b")).await.is_empty());
    }

    #[test]
    fn test_report_is_clean() {
        let mut report = AccountReport {
            index: 1,
            name: "a".to_string(),
            succeeded: 2,
            failed: 0,
            aborted: None,
        };
        assert!(report.is_clean());
        report.failed = 1;
        assert!(!report.is_clean());
    }
}
