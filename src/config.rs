use std::time::Duration;

use serde::Deserialize;
use snafu::ResultExt;
use url::Url;

use crate::error::{ConfigSnafu, Error};

/// Longest long-poll wait the queue accepts.
const MAX_WAIT_TIME_SECONDS: i32 = 20;

/// Worker configuration, read once from the environment at startup.
///
/// `QUEUE_URL`, `TABLE_NAME` and `AWS_REGION` are required; everything else
/// has a default.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Queue to drain.
    pub queue_url: Url,
    /// Result table name.
    pub table_name: String,
    /// Region all AWS clients are bound to.
    pub aws_region: String,

    /// Long-poll wait per receive request.
    #[serde(default = "default_wait_time_seconds")]
    pub wait_time_seconds: i32,
    /// Pause after a receive-level failure before polling again.
    #[serde(default = "default_error_backoff_seconds")]
    pub error_backoff_seconds: u64,
    /// Language hint passed to sentiment analysis.
    #[serde(default = "default_language_code")]
    pub language_code: String,
    /// Maximum number of messages processed at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Receive count at which a transiently failing message is dropped.
    /// Unset leaves redelivery to the queue's redrive policy.
    pub max_receive_count: Option<u32>,
    /// Visibility timeout requested per receive; unset uses the queue's own.
    pub visibility_timeout: Option<i32>,
}

fn default_wait_time_seconds() -> i32 {
    10
}

fn default_error_backoff_seconds() -> u64 {
    10
}

fn default_language_code() -> String {
    "en".to_owned()
}

fn default_concurrency() -> usize {
    1
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        envy::from_env::<Self>().context(ConfigSnafu)?.validated()
    }

    /// Builds a configuration from explicit key/value pairs instead of the
    /// process environment.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        envy::from_iter::<_, Self>(vars.into_iter().map(|(k, v)| (k.into(), v.into())))
            .context(ConfigSnafu)?
            .validated()
    }

    fn validated(self) -> Result<Self, Error> {
        if self.table_name.trim().is_empty() {
            return Err(Error::invalid_config("TABLE_NAME", "must not be empty"));
        }
        if self.aws_region.trim().is_empty() {
            return Err(Error::invalid_config("AWS_REGION", "must not be empty"));
        }
        if !(0..=MAX_WAIT_TIME_SECONDS).contains(&self.wait_time_seconds) {
            return Err(Error::invalid_config(
                "WAIT_TIME_SECONDS",
                format!("must be between 0 and {MAX_WAIT_TIME_SECONDS}"),
            ));
        }
        if self.concurrency == 0 {
            return Err(Error::invalid_config("CONCURRENCY", "must be at least 1"));
        }
        if self.max_receive_count == Some(0) {
            return Err(Error::invalid_config(
                "MAX_RECEIVE_COUNT",
                "must be at least 1",
            ));
        }
        Ok(self)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_seconds)
    }
}
