use reqwest::{header::HeaderMap, Method, StatusCode};
use url::Url;

use crate::{Result, SparkError};

/// Owned record of a request as it was sent.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    pub method: Method,
    /// Final URL, including the encoded query string.
    pub url: Url,
    /// JSON body for `POST`/`PUT` requests.
    pub body: Option<serde_json::Value>,
}

/// Owned snapshot of a response, taken after the body was read.
///
/// Later requests on the same session never alter a snapshot the caller holds.
#[derive(Clone, Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: String,
}

impl ApiResponse {
    pub(crate) async fn capture(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let url = response.url().clone();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(SparkError::Transport)?;
        Ok(Self {
            status,
            url,
            headers,
            body,
        })
    }

    /// Decodes the body as JSON. An empty body decodes to `null`.
    pub fn json(&self) -> Result<serde_json::Value> {
        if self.body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&self.body).map_err(|err| {
            SparkError::Decode(format!(
                "invalid JSON in {} response from {}: {err}",
                self.status, self.url
            ))
        })
    }

    /// The body's `message` field, or an empty string.
    pub fn message(&self) -> String {
        serde_json::from_str::<serde_json::Value>(&self.body)
            .ok()
            .and_then(|body| {
                body.get("message")
                    .and_then(|message| message.as_str())
                    .map(str::to_owned)
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use reqwest::{header::HeaderMap, StatusCode};
    use serde_json::json;
    use url::Url;

    use super::ApiResponse;

    fn response(body: &str) -> ApiResponse {
        ApiResponse {
            status: StatusCode::OK,
            url: Url::parse("https://api.example.test/v1/people/me").expect("static url"),
            headers: HeaderMap::new(),
            body: body.to_owned(),
        }
    }

    #[test]
    fn empty_body_is_null() {
        assert_eq!(response("").json().expect("empty body"), json!(null));
    }

    #[test]
    fn message_is_empty_when_missing_or_unparseable() {
        assert_eq!(response(r#"{"message":"nope"}"#).message(), "nope");
        assert_eq!(response(r#"{"errors":[]}"#).message(), "");
        assert_eq!(response("<html>").message(), "");
    }

    #[test]
    fn invalid_json_is_decode_error() {
        let err = response("<html>").json().expect_err("must not decode");
        assert!(matches!(err, crate::SparkError::Decode(_)));
    }
}
