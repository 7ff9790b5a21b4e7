// Per-account HTTP façade for the reward/lottery backend
// Author: kelexine (https://github.com/kelexine)

mod diagnostics;
pub mod jsonp;
pub mod normalize;
mod response;

pub use diagnostics::{DiagnosticSnapshot, Diagnostics, ResponseInfo};
pub use jsonp::JsonpDialect;
pub use normalize::{is_request_ok, process_result, ProcessOptions, ResponseFormat};
pub use response::{RawResponse, LEGACY_ENCODINGS};

use crate::config::CommonConfig;
use crate::error::{LotteryError, Result};
use crate::utils::logging::sanitize;
use crate::utils::retry::{try_request, AcceptAll, ResponseValidator};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, COOKIE};
use reqwest::Client;
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// App version the backend expects in cookies and the user agent.
pub const APP_VERSION: &str = "106";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Session material of one account.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    pub device_id: String,
    pub uin: String,
    pub skey: String,
}

// Custom Debug impl that never logs the session key
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("device_id", &self.device_id)
            .field("uin", &self.uin)
            .field("skey", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    pub fn new(
        device_id: impl Into<String>,
        uin: impl Into<String>,
        skey: impl Into<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            uin: uin.into(),
            skey: skey.into(),
        }
    }
}

/// Request body of a POST.
#[derive(Debug, Clone, Default)]
pub enum Body {
    #[default]
    None,
    /// Sent as `application/x-www-form-urlencoded`.
    Form(Vec<(String, String)>),
    /// Sent as `application/json`.
    Json(Value),
}

impl Body {
    fn content_type(&self) -> &'static str {
        match self {
            Body::Json(_) => JSON_CONTENT_TYPE,
            Body::None | Body::Form(_) => FORM_CONTENT_TYPE,
        }
    }
}

/// Per-call switches for [`Network::get`] and [`Network::post`].
#[derive(Clone)]
pub struct RequestOptions {
    pub process: ProcessOptions,
    /// Appended to the account's base cookie string.
    pub extra_cookies: String,
    /// Replace base headers of the same name.
    pub extra_headers: BTreeMap<String, String>,
    pub validator: Option<Arc<dyn ResponseValidator>>,
    /// POST only: one attempt, transport errors are returned to the caller.
    pub disable_retry: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            process: ProcessOptions::default(),
            extra_cookies: String::new(),
            extra_headers: BTreeMap::new(),
            validator: None,
            disable_retry: false,
        }
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format(mut self, format: ResponseFormat) -> Self {
        self.process.format = format;
        self
    }

    pub fn need_unquote(mut self, need_unquote: bool) -> Self {
        self.process.need_unquote = need_unquote;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.process.pretty = true;
        self
    }

    /// Log the response at debug level only.
    pub fn quiet(mut self) -> Self {
        self.process.print_res = false;
        self
    }

    pub fn extra_cookies(mut self, cookies: impl Into<String>) -> Self {
        self.extra_cookies = cookies.into();
        self
    }

    pub fn extra_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(name.into(), value.into());
        self
    }

    pub fn validator(mut self, validator: impl ResponseValidator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn disable_retry(mut self) -> Self {
        self.disable_retry = true;
        self
    }
}

/// HTTP client bound to one account's credentials.
///
/// Every request carries the account cookie and a synthetic mobile user agent,
/// goes through the retry executor, and is decoded by [`process_result`].
pub struct Network {
    http_client: Client,
    common: CommonConfig,
    base_cookies: String,
    base_headers: HeaderMap,
    diagnostics: Diagnostics,
    sanitize_tokens: bool,
}

impl Network {
    pub fn new(
        credentials: &Credentials,
        common: &CommonConfig,
        diagnostics: Diagnostics,
    ) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(common.http_timeout))
            .connect_timeout(Duration::from_secs(common.http_timeout))
            .gzip(true)
            .use_rustls_tls()
            .build()
            .map_err(|e| LotteryError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let base_cookies = format!(
            "djc_appSource=android; djc_appVersion={}; acctype=; uin={}; skey={};",
            APP_VERSION, credentials.uin, credentials.skey
        );

        let user_agent = format!(
            "TencentDaojucheng=v4.1.6.0&appSource=android&appVersion={}&ch=10003&sDeviceID={}\
             &firmwareVersion=9&phoneBrand=Xiaomi&phoneVersion=MIX+2&displayMetrics=1080 * 2030\
             &cpu=AArch64 Processor rev 1 (aarch64)&net=wifi&sVersionName=v4.1.6.0 Mobile GameHelper_1006/2103050005",
            APP_VERSION, credentials.device_id
        );

        let mut base_headers = HeaderMap::new();
        for (name, value) in [
            ("User-Agent", user_agent.as_str()),
            ("Charset", "UTF-8"),
            ("Referer", "https://daoju.qq.com/index.shtml"),
            ("Connection", "Keep-Alive"),
            ("Accept-Encoding", "gzip"),
            ("Cookie", base_cookies.as_str()),
        ] {
            insert_header(&mut base_headers, name, value)?;
        }

        debug!("Created HTTP client for uin {}", credentials.uin);

        Ok(Self {
            http_client,
            common: common.clone(),
            base_cookies,
            base_headers,
            diagnostics,
            sanitize_tokens: true,
        })
    }

    /// Whether session keys are masked when cookies are logged. On by default.
    pub fn sanitize_tokens(mut self, enabled: bool) -> Self {
        self.sanitize_tokens = enabled;
        self
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    fn loggable_cookies(&self, cookies: &str) -> String {
        if self.sanitize_tokens {
            sanitize(cookies)
        } else {
            cookies.to_string()
        }
    }

    /// GET `url` and decode the response.
    ///
    /// Returns `Ok(None)` when every attempt failed.
    #[track_caller]
    pub fn get<'a>(
        &'a self,
        ctx: &'a str,
        url: &'a str,
        options: RequestOptions,
    ) -> impl Future<Output = Result<Option<Value>>> + 'a {
        let call_site = Location::caller();

        async move {
            let cookies = format!("{}{}", self.base_cookies, options.extra_cookies);
            let headers = self.build_headers(&cookies, None, &options.extra_headers)?;

            let request_fn = || {
                let request = self.http_client.get(url).headers(headers.clone());
                async move { RawResponse::from_reqwest(request.send().await?).await }
            };

            let validator = validator_of(&options);
            let res = try_request(ctx, "get", request_fn, &self.common.retry, validator).await;

            debug!("{} cookies = {}", ctx, self.loggable_cookies(&cookies));

            process_result(
                &with_call_site(call_site, ctx),
                res,
                &options.process,
                &self.diagnostics,
            )
        }
    }

    /// POST `body` to `url` and decode the response.
    ///
    /// With `options.disable_retry` exactly one attempt is made and a
    /// transport error is returned as `Err`; otherwise exhausted retries
    /// yield `Ok(None)`.
    #[track_caller]
    pub fn post<'a>(
        &'a self,
        ctx: &'a str,
        url: &'a str,
        body: Body,
        options: RequestOptions,
    ) -> impl Future<Output = Result<Option<Value>>> + 'a {
        let call_site = Location::caller();

        async move {
            let cookies = format!("{}{}", self.base_cookies, options.extra_cookies);
            let headers =
                self.build_headers(&cookies, Some(body.content_type()), &options.extra_headers)?;

            let request_fn = || {
                let request = match &body {
                    Body::None => self.http_client.post(url),
                    Body::Form(pairs) => self.http_client.post(url).form(pairs),
                    Body::Json(value) => self.http_client.post(url).json(value),
                }
                // applied after the body so explicit headers win over reqwest's defaults
                .headers(headers.clone());
                async move { RawResponse::from_reqwest(request.send().await?).await }
            };

            let res = if options.disable_retry {
                Some(request_fn().await?)
            } else {
                let validator = validator_of(&options);
                try_request(ctx, "post", request_fn, &self.common.retry, validator).await
            };

            match &body {
                Body::None => {}
                Body::Form(pairs) => debug!("{} data = {:?}", ctx, pairs),
                Body::Json(value) => debug!("{} json = {}", ctx, value),
            }
            debug!("{} cookies = {}", ctx, self.loggable_cookies(&cookies));

            process_result(
                &with_call_site(call_site, ctx),
                res,
                &options.process,
                &self.diagnostics,
            )
        }
    }

    /// Base headers, then cookie and content type, then `extra`.
    /// A later header replaces an earlier one with the same name.
    pub(crate) fn build_headers(
        &self,
        cookies: &str,
        content_type: Option<&str>,
        extra: &BTreeMap<String, String>,
    ) -> Result<HeaderMap> {
        let mut headers = self.base_headers.clone();

        insert_header(&mut headers, COOKIE.as_str(), cookies)?;
        if let Some(content_type) = content_type {
            insert_header(&mut headers, CONTENT_TYPE.as_str(), content_type)?;
        }
        for (name, value) in extra {
            insert_header(&mut headers, name, value)?;
        }

        Ok(headers)
    }
}

fn validator_of(options: &RequestOptions) -> &dyn ResponseValidator {
    match &options.validator {
        Some(validator) => validator.as_ref(),
        None => &AcceptAll,
    }
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<()> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| LotteryError::InvalidHeader(format!("{}: {}", name, e)))?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|e| LotteryError::InvalidHeader(format!("{}: {}", name, e)))?;
    headers.insert(header_name, header_value);
    Ok(())
}

fn with_call_site(location: &Location<'_>, ctx: &str) -> String {
    format!("[{}:{}] {}", location.file(), location.line(), ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network() -> Network {
        let credentials = Credentials::new("device-1", "o12345", "@skey");
        Network::new(&credentials, &CommonConfig::default(), Diagnostics::new()).unwrap()
    }

    #[test]
    fn test_extra_header_replaces_cookie() {
        let network = network();
        let mut extra = BTreeMap::new();
        extra.insert("Cookie".to_string(), "z=1".to_string());

        let headers = network
            .build_headers("uin=o12345; skey=@skey;", None, &extra)
            .unwrap();

        assert_eq!(headers.get_all(COOKIE).iter().count(), 1);
        assert_eq!(headers[COOKIE], "z=1");
    }

    #[test]
    fn test_base_headers_present() {
        let network = network();
        let headers = network
            .build_headers("c=1", Some(FORM_CONTENT_TYPE), &BTreeMap::new())
            .unwrap();

        assert_eq!(headers[COOKIE], "c=1");
        assert_eq!(headers[CONTENT_TYPE], FORM_CONTENT_TYPE);
        assert_eq!(headers["Referer"], "https://daoju.qq.com/index.shtml");
        assert!(headers["User-Agent"]
            .to_str()
            .unwrap()
            .contains("sDeviceID=device-1"));
    }

    #[test]
    fn test_extra_headers_match_case_insensitively() {
        let network = network();
        let mut extra = BTreeMap::new();
        extra.insert("content-type".to_string(), "text/plain".to_string());

        let headers = network
            .build_headers("c=1", Some(JSON_CONTENT_TYPE), &extra)
            .unwrap();
        assert_eq!(headers.get_all(CONTENT_TYPE).iter().count(), 1);
        assert_eq!(headers[CONTENT_TYPE], "text/plain");
    }

    #[test]
    fn test_cookie_logging_honours_sanitize_tokens() {
        let cookies = "uin=o12345; skey=@skey; p_skey=abc;";

        let masked = network().loggable_cookies(cookies);
        assert!(!masked.contains("@skey"));
        assert!(!masked.contains("abc"));
        assert!(masked.contains("uin=o12345"));

        let plain = network().sanitize_tokens(false).loggable_cookies(cookies);
        assert_eq!(plain, cookies);
    }

    #[test]
    fn test_body_content_type() {
        assert_eq!(Body::Json(Value::Null).content_type(), JSON_CONTENT_TYPE);
        assert_eq!(Body::Form(vec![]).content_type(), FORM_CONTENT_TYPE);
        assert_eq!(Body::None.content_type(), FORM_CONTENT_TYPE);
    }

    #[test]
    fn test_credentials_debug_masks_skey() {
        let credentials = Credentials::new("d", "o1", "@secret");
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("@secret"));
    }

    #[test]
    fn test_call_site_prefix() {
        let ctx = with_call_site(Location::caller(), "query");
        assert!(ctx.starts_with("[src/network/mod.rs:"));
        assert!(ctx.ends_with("] query"));
    }
}
