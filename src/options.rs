use std::time::Duration;

use crate::{Result, SparkError};

/// Configures session-wide transport behavior.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SessionOptions {
    /// Default per-request timeout in milliseconds. `None` waits indefinitely.
    pub timeout_ms: Option<u64>,
}

impl SessionOptions {
    /// Validated timeout. A zero timeout is a configuration error.
    pub fn timeout(&self) -> Result<Option<Duration>> {
        match self.timeout_ms {
            Some(0) => Err(SparkError::Config(
                "timeout must be greater than zero".to_owned(),
            )),
            Some(ms) => Ok(Some(Duration::from_millis(ms))),
            None => Ok(None),
        }
    }
}
