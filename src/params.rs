use std::time::Duration;

use reqwest::Method;

use crate::{ExpectedCodes, Result, SparkError, Value};

/// Argument name recognized as a per-call timeout in seconds.
pub const TIMEOUT_ARG: &str = "timeout";
/// Argument name recognized as a per-call expected-code override.
pub const ERC_ARG: &str = "erc";

/// Keyword arguments for one API call.
///
/// Names listed in the endpoint's eligible fields travel in the request
/// payload. `timeout` and `erc` are transport options. Anything else is
/// rejected before the request is sent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Args {
    values: Vec<(String, Value)>,
    timeout: Option<Duration>,
    expected: Option<ExpectedCodes>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a named argument, replacing an earlier value of the same name.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.values.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
        self
    }

    /// Overrides the session timeout for this call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Overrides the method's default expected response codes.
    pub fn expect(mut self, codes: impl Into<ExpectedCodes>) -> Self {
        self.expected = Some(codes.into());
        self
    }
}

impl From<()> for Args {
    fn from(_: ()) -> Self {
        Self::default()
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Args
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs
            .into_iter()
            .fold(Self::new(), |args, (name, value)| args.set(name, value))
    }
}

impl<K, V> From<Vec<(K, V)>> for Args
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from(pairs: Vec<(K, V)>) -> Self {
        pairs
            .into_iter()
            .fold(Self::new(), |args, (name, value)| args.set(name, value))
    }
}

/// Where the eligible fields go on the wire.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Payload {
    /// JSON object body, for `POST` and `PUT`.
    Body(serde_json::Map<String, serde_json::Value>),
    /// Query-string pairs, for `GET` and `DELETE`.
    Query(Vec<(String, String)>),
}

/// Transport-ready arguments for one call.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Prepared {
    pub payload: Payload,
    pub timeout: Option<Duration>,
    pub expected: ExpectedCodes,
}

/// Splits `args` into the payload for `method` and transport options.
pub(crate) fn normalize(method: &Method, fields: &[&str], args: Args) -> Result<Prepared> {
    let Args {
        values,
        mut timeout,
        mut expected,
    } = args;

    let mut eligible = Vec::new();
    let mut unsupported = Vec::new();

    for (name, value) in values {
        if fields.contains(&name.as_str()) {
            eligible.push((name, value));
        } else if name == TIMEOUT_ARG {
            let parsed = parse_timeout(&value)?;
            timeout.get_or_insert(parsed);
        } else if name == ERC_ARG {
            let parsed = parse_expected(&value)?;
            expected.get_or_insert(parsed);
        } else {
            unsupported.push(name);
        }
    }

    if !unsupported.is_empty() {
        return Err(SparkError::UnsupportedArgument(unsupported.join(", ")));
    }
    if timeout.is_some_and(|timeout| timeout.is_zero()) {
        return Err(SparkError::UnsupportedArgument(
            "timeout must be greater than zero".to_owned(),
        ));
    }

    let payload = if *method == Method::POST || *method == Method::PUT {
        Payload::Body(
            eligible
                .into_iter()
                .map(|(name, value)| (name, value.to_json()))
                .collect(),
        )
    } else {
        Payload::Query(
            eligible
                .into_iter()
                .filter_map(|(name, value)| value.to_query_text().map(|text| (name, text)))
                .collect(),
        )
    };

    Ok(Prepared {
        payload,
        timeout,
        expected: expected.unwrap_or_else(|| ExpectedCodes::for_method(method)),
    })
}

fn parse_timeout(value: &Value) -> Result<Duration> {
    let seconds = match value {
        Value::Integer(seconds) if *seconds > 0 => *seconds as f64,
        Value::Float(seconds) if seconds.is_finite() && *seconds > 0.0 => *seconds,
        other => {
            return Err(SparkError::UnsupportedArgument(format!(
                "timeout must be a positive number of seconds, got {other:?}"
            )))
        }
    };
    Duration::try_from_secs_f64(seconds).map_err(|err| {
        SparkError::UnsupportedArgument(format!("timeout of {seconds} seconds is invalid: {err}"))
    })
}

fn parse_expected(value: &Value) -> Result<ExpectedCodes> {
    let to_code = |value: &Value| match value {
        Value::Integer(code) => u16::try_from(*code).ok(),
        _ => None,
    };
    let codes = match value {
        Value::List(values) => values.iter().map(to_code).collect::<Option<Vec<_>>>(),
        single => to_code(single).map(|code| vec![code]),
    };
    codes.map(ExpectedCodes::new).ok_or_else(|| {
        SparkError::UnsupportedArgument(format!(
            "erc must be a status code or a list of status codes, got {value:?}"
        ))
    })
}
