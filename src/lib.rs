//! `sparkapi-http` is the async session layer of a Cisco Spark REST client.
//!
//! A [`Session`] sends authenticated requests and hands back decoded JSON:
//! - [`Session::get`], [`Session::post`], [`Session::put`], [`Session::delete`]
//! - [`Session::get_items`] walks `Link: rel="next"` pagination lazily
//!
//! Throttled (`429`) responses are retried only while a registered
//! [`RateLimitPolicy`] approves the computed wait.

mod backoff;
mod error;
mod link;
mod options;
mod pages;
mod params;
mod response;
mod session;
mod status;
mod value;

pub use backoff::{fib, retry_after_secs, RateLimitPolicy, BACKOFF_FLOOR};
pub use error::{describe_status, ApiError, SparkError};
pub use options::SessionOptions;
pub use pages::{Items, Pages};
pub use params::{Args, ERC_ARG, TIMEOUT_ARG};
pub use response::{ApiRequest, ApiResponse};
pub use session::{Session, ACCESS_TOKEN_ENV, BASE_URL_ENV, DEFAULT_API_URL};
pub use status::{ExpectedCodes, THROTTLE_STATUS};
pub use value::{format_timestamp, Value, TIMESTAMP_FORMAT};

pub type Result<T> = std::result::Result<T, SparkError>;
