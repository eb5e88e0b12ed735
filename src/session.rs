use std::{fmt, sync::Arc, time::Duration};

use reqwest::{
    header::{self, HeaderMap, HeaderValue},
    Method,
};
use tokio::time::sleep;
use url::Url;

use crate::{
    backoff::{retry_after_secs, Backoff},
    pages::{Items, Pages},
    params::{normalize, Args, Payload, Prepared},
    response::{ApiRequest, ApiResponse},
    status::{check_response, THROTTLE_STATUS},
    ExpectedCodes, RateLimitPolicy, Result, SessionOptions, SparkError,
};

/// Base URL of the public Spark API.
pub const DEFAULT_API_URL: &str = "https://api.ciscospark.com/v1/";
/// Environment variable holding the access token.
pub const ACCESS_TOKEN_ENV: &str = "SPARK_ACCESS_TOKEN";
/// Environment variable overriding [`DEFAULT_API_URL`].
pub const BASE_URL_ENV: &str = "SPARK_BASE_URL";

const JSON_UTF8: &str = "application/json;charset=utf-8";

/// Authenticated connection to the Spark REST API.
///
/// Every call takes `&mut self`: a session runs one logical request at a
/// time, and the last response and backoff step it tracks belong to that
/// instance alone. A clone starts with its own copy of both.
#[derive(Clone)]
pub struct Session {
    http: reqwest::Client,
    base_url: Url,
    token: String,
    headers: HeaderMap,
    timeout: Option<Duration>,
    last_response: Option<ApiResponse>,
    backoff: Backoff,
    ratelimit_policy: Option<Arc<dyn RateLimitPolicy>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("backoff", &self.backoff)
            .field("ratelimit_policy", &self.ratelimit_policy.is_some())
            .finish()
    }
}

impl Session {
    /// Creates a session against [`DEFAULT_API_URL`].
    pub fn new(access_token: impl Into<String>) -> Result<Self> {
        Self::with_base_url(access_token, DEFAULT_API_URL)
    }

    /// Creates a session against a custom base URL.
    ///
    /// The URL needs a scheme and a host. A missing trailing slash is added
    /// so relative paths resolve below it.
    pub fn with_base_url(access_token: impl Into<String>, base_url: impl AsRef<str>) -> Result<Self> {
        let base_url = validate_base_url(base_url.as_ref())?;
        let token = access_token.into();

        let mut authorization = HeaderValue::from_str(&normalize_bearer_authorization(&token))
            .map_err(|_| {
                SparkError::Config("access token is not a valid header value".to_owned())
            })?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, authorization);
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_UTF8));

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            token,
            headers,
            timeout: None,
            last_response: None,
            backoff: Backoff::default(),
            ratelimit_policy: None,
        })
    }

    /// Creates a session from environment variables.
    ///
    /// Reads:
    /// - `SPARK_ACCESS_TOKEN` — access token (required)
    /// - `SPARK_BASE_URL` — API base URL (optional)
    pub fn from_env() -> Result<Self> {
        let token = std::env::var(ACCESS_TOKEN_ENV).map_err(|_| {
            SparkError::Config(format!("missing {ACCESS_TOKEN_ENV} environment variable"))
        })?;
        if token.trim().is_empty() {
            return Err(SparkError::Config(format!(
                "{ACCESS_TOKEN_ENV} is set but empty"
            )));
        }
        match std::env::var(BASE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => Self::with_base_url(token, url.trim()),
            _ => Self::new(token),
        }
    }

    /// Applies session options such as the default timeout.
    pub fn with_options(mut self, opts: SessionOptions) -> Result<Self> {
        self.timeout = opts.timeout()?;
        Ok(self)
    }

    /// Registers the policy consulted when the API throttles a request.
    pub fn with_ratelimit_policy(mut self, policy: impl RateLimitPolicy + 'static) -> Self {
        self.ratelimit_policy = Some(Arc::new(policy));
        self
    }

    pub fn set_ratelimit_policy(&mut self, policy: Option<Arc<dyn RateLimitPolicy>>) {
        self.ratelimit_policy = policy;
    }

    pub fn ratelimit_policy(&self) -> Option<Arc<dyn RateLimitPolicy>> {
        self.ratelimit_policy.clone()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn access_token(&self) -> &str {
        &self.token
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Sets the default timeout. Zero is rejected.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        if timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(SparkError::Config(
                "timeout must be greater than zero".to_owned(),
            ));
        }
        self.timeout = timeout;
        Ok(())
    }

    /// Copy of the headers sent with every request.
    pub fn headers(&self) -> HeaderMap {
        self.headers.clone()
    }

    /// Merges `headers` into the default headers, replacing equal names.
    pub fn update_headers(&mut self, headers: HeaderMap) {
        let mut current = None;
        for (name, value) in headers {
            match name {
                Some(name) => {
                    self.headers.insert(name.clone(), value);
                    current = Some(name);
                }
                // further values of the previous name
                None => {
                    if let Some(name) = &current {
                        self.headers.append(name.clone(), value);
                    }
                }
            }
        }
    }

    /// Snapshot of the most recent validated response.
    ///
    /// Useful to tell apart codes that share an outcome, such as `200` and
    /// `409` for an idempotent add.
    pub fn last_response(&self) -> Option<&ApiResponse> {
        self.last_response.as_ref()
    }

    /// Current index into the backoff wait sequence.
    pub fn backoff_step(&self) -> u32 {
        self.backoff.step()
    }

    /// Resolves `path` against the base URL. Absolute URLs pass through.
    pub fn urljoin(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|err| {
            SparkError::UnsupportedArgument(format!("invalid request path '{path}': {err}"))
        })
    }

    /// `GET` returning the decoded JSON body.
    pub async fn get<A: Into<Args>>(
        &mut self,
        path: &str,
        fields: &[&str],
        args: A,
    ) -> Result<serde_json::Value> {
        self.call(Method::GET, path, fields, args.into())
            .await?
            .json()
    }

    /// `POST` with eligible fields as the JSON body.
    pub async fn post<A: Into<Args>>(
        &mut self,
        path: &str,
        fields: &[&str],
        args: A,
    ) -> Result<serde_json::Value> {
        self.call(Method::POST, path, fields, args.into())
            .await?
            .json()
    }

    /// `PUT` with eligible fields as the JSON body.
    pub async fn put<A: Into<Args>>(
        &mut self,
        path: &str,
        fields: &[&str],
        args: A,
    ) -> Result<serde_json::Value> {
        self.call(Method::PUT, path, fields, args.into())
            .await?
            .json()
    }

    /// `DELETE`; expects `204` unless overridden.
    pub async fn delete<A: Into<Args>>(
        &mut self,
        path: &str,
        fields: &[&str],
        args: A,
    ) -> Result<()> {
        self.call(Method::DELETE, path, fields, args.into())
            .await
            .map(|_| ())
    }

    /// Lazily walks the pages of a list endpoint.
    ///
    /// Arguments are checked here. The first request is sent on the first
    /// [`Pages::next_page`] call; later pages follow the server's `next` link
    /// as-is.
    pub fn get_pages<A: Into<Args>>(
        &mut self,
        path: &str,
        fields: &[&str],
        args: A,
    ) -> Result<Pages<'_>> {
        let url = self.urljoin(path)?;
        let prepared = normalize(&Method::GET, fields, args.into())?;
        Ok(Pages::new(self, url, prepared))
    }

    /// Lazily walks the `items` of every page of a list endpoint.
    pub fn get_items<A: Into<Args>>(
        &mut self,
        path: &str,
        fields: &[&str],
        args: A,
    ) -> Result<Items<'_>> {
        self.get_pages(path, fields, args).map(Items::new)
    }

    async fn call(
        &mut self,
        method: Method,
        path: &str,
        fields: &[&str],
        args: Args,
    ) -> Result<ApiResponse> {
        let url = self.urljoin(path)?;
        let Prepared {
            payload,
            timeout,
            expected,
        } = normalize(&method, fields, args)?;
        self.exchange(method, &url, &payload, timeout, &expected)
            .await
    }

    /// Sends one logical request, absorbing `429`s the policy agrees to wait
    /// out, then validates the final response.
    pub(crate) async fn exchange(
        &mut self,
        method: Method,
        url: &Url,
        payload: &Payload,
        timeout: Option<Duration>,
        expected: &ExpectedCodes,
    ) -> Result<ApiResponse> {
        let expected = expected.without_throttle();
        let timeout = timeout.or(self.timeout);

        loop {
            let (request, response) = self.send_once(&method, url, payload, timeout).await?;

            if response.status != THROTTLE_STATUS {
                self.backoff.relax();
                return self.record_and_check(request, response, &expected);
            }

            let wait = self.backoff.throttled(retry_after_secs(&response.headers));
            let retry = self
                .ratelimit_policy
                .as_ref()
                .is_some_and(|policy| policy.should_retry(wait));

            if !retry {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    "{} {} throttled; not retrying (suggested wait {:?})",
                    method,
                    url,
                    wait
                );
                return self.record_and_check(request, response, &expected);
            }

            #[cfg(feature = "tracing")]
            tracing::debug!(
                "{} {} throttled; retrying after {:?} (backoff step {})",
                method,
                url,
                wait,
                self.backoff.step()
            );

            sleep(wait).await;
        }
    }

    fn record_and_check(
        &mut self,
        request: ApiRequest,
        response: ApiResponse,
        expected: &ExpectedCodes,
    ) -> Result<ApiResponse> {
        self.last_response = Some(response.clone());
        check_response(&request, &response, expected)?;
        Ok(response)
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &Url,
        payload: &Payload,
        timeout: Option<Duration>,
    ) -> Result<(ApiRequest, ApiResponse)> {
        let mut builder = self
            .http
            .request(method.clone(), url.clone())
            .headers(self.headers.clone());

        let mut body = None;
        match payload {
            Payload::Body(fields) => {
                let json = serde_json::Value::Object(fields.clone());
                builder = builder.json(&json);
                body = Some(json);
            }
            Payload::Query(pairs) if !pairs.is_empty() => builder = builder.query(pairs),
            Payload::Query(_) => {}
        }
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let request = builder.build().map_err(SparkError::Transport)?;
        let snapshot = ApiRequest {
            method: method.clone(),
            url: request.url().clone(),
            body,
        };
        let response = self
            .http
            .execute(request)
            .await
            .map_err(SparkError::Transport)?;
        Ok((snapshot, ApiResponse::capture(response).await?))
    }
}

fn validate_base_url(base_url: &str) -> Result<Url> {
    let invalid = || {
        SparkError::Config(format!(
            "base_url must contain a valid scheme (protocol specifier) and network \
             location (hostname): '{base_url}'"
        ))
    };
    let mut url = Url::parse(base_url.trim()).map_err(|_| invalid())?;
    if url.cannot_be_a_base() || url.host_str().map_or(true, str::is_empty) {
        return Err(invalid());
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

    use super::{normalize_bearer_authorization, validate_base_url, Session};
    use crate::{SessionOptions, SparkError, BACKOFF_FLOOR};

    #[test]
    fn normalize_bearer_adds_prefix_when_missing() {
        assert_eq!(
            normalize_bearer_authorization("abc123"),
            "Bearer abc123".to_owned()
        );
    }

    #[test]
    fn normalize_bearer_keeps_existing_prefix() {
        assert_eq!(
            normalize_bearer_authorization("bEaReR abc123"),
            "bEaReR abc123".to_owned()
        );
    }

    #[test]
    fn debug_redacts_authorization_value() {
        let session = Session::new("secret-token").expect("default url is valid");
        let debug = format!("{session:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-token"));
    }

    #[test]
    fn base_url_needs_scheme_and_host() {
        for bad in ["api.ciscospark.com/v1/", "mailto:someone@example.com", "", "https://"] {
            assert!(
                matches!(validate_base_url(bad), Err(SparkError::Config(_))),
                "{bad:?} must be rejected"
            );
        }
        let url = validate_base_url("https://api.ciscospark.com/v1").expect("valid url");
        assert_eq!(url.as_str(), "https://api.ciscospark.com/v1/");
    }

    #[test]
    fn default_headers_and_urljoin() {
        let session = Session::new("tok").expect("default url is valid");
        let headers = session.headers();
        assert_eq!(headers[AUTHORIZATION], "Bearer tok");
        assert_eq!(headers[CONTENT_TYPE], "application/json;charset=utf-8");
        assert_eq!(session.backoff_step(), BACKOFF_FLOOR);
        assert_eq!(
            session.urljoin("rooms").expect("joins").as_str(),
            "https://api.ciscospark.com/v1/rooms"
        );
        assert_eq!(
            session
                .urljoin("https://other.example.test/v1/rooms?cursor=2")
                .expect("absolute passes through")
                .as_str(),
            "https://other.example.test/v1/rooms?cursor=2"
        );
    }

    #[test]
    fn update_headers_merges() {
        let mut session = Session::new("tok").expect("default url is valid");
        let mut extra = HeaderMap::new();
        extra.insert("x-trace", HeaderValue::from_static("abc"));
        session.update_headers(extra);
        let headers = session.headers();
        assert_eq!(headers["x-trace"], "abc");
        assert!(headers.contains_key(AUTHORIZATION));
    }

    #[test]
    fn timeout_must_be_positive() {
        let session = Session::new("tok").expect("default url is valid");
        let err = session
            .clone()
            .with_options(SessionOptions {
                timeout_ms: Some(0),
            })
            .expect_err("zero timeout");
        assert!(matches!(err, SparkError::Config(_)));

        let mut session = session
            .with_options(SessionOptions {
                timeout_ms: Some(1_500),
            })
            .expect("positive timeout");
        assert_eq!(session.timeout(), Some(Duration::from_millis(1_500)));
        assert!(session.set_timeout(Some(Duration::ZERO)).is_err());
        session.set_timeout(None).expect("clearing is allowed");
        assert_eq!(session.timeout(), None);
    }
}
