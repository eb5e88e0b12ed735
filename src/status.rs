use reqwest::{Method, StatusCode};

use crate::{
    response::{ApiRequest, ApiResponse},
    ApiError, Result,
};

/// Status code Spark uses to signal throttling.
pub const THROTTLE_STATUS: StatusCode = StatusCode::TOO_MANY_REQUESTS;

/// Set of response codes a call accepts as success.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpectedCodes(Vec<u16>);

impl ExpectedCodes {
    /// Builds a set from status codes, ignoring duplicates.
    pub fn new<I>(codes: I) -> Self
    where
        I: IntoIterator<Item = u16>,
    {
        let mut set = Vec::new();
        for code in codes {
            if !set.contains(&code) {
                set.push(code);
            }
        }
        Self(set)
    }

    /// Default for a method: `204` for `DELETE`, `200` otherwise.
    pub fn for_method(method: &Method) -> Self {
        if *method == Method::DELETE {
            Self(vec![204])
        } else {
            Self(vec![200])
        }
    }

    pub fn contains(&self, status: StatusCode) -> bool {
        self.0.contains(&status.as_u16())
    }

    pub fn codes(&self) -> &[u16] {
        &self.0
    }

    /// The same set with the throttling code removed.
    pub(crate) fn without_throttle(&self) -> Self {
        Self(
            self.0
                .iter()
                .copied()
                .filter(|code| *code != THROTTLE_STATUS.as_u16())
                .collect(),
        )
    }
}

impl From<u16> for ExpectedCodes {
    fn from(code: u16) -> Self {
        Self(vec![code])
    }
}

impl From<Vec<u16>> for ExpectedCodes {
    fn from(codes: Vec<u16>) -> Self {
        Self::new(codes)
    }
}

impl<const N: usize> From<[u16; N]> for ExpectedCodes {
    fn from(codes: [u16; N]) -> Self {
        Self::new(codes)
    }
}

/// Fails with [`ApiError`] unless `response.status` is in `expected`.
pub(crate) fn check_response(
    request: &ApiRequest,
    response: &ApiResponse,
    expected: &ExpectedCodes,
) -> Result<()> {
    if expected.contains(response.status) {
        return Ok(());
    }
    Err(ApiError::new(request.clone(), response.clone()).into())
}
