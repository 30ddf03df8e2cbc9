use snafu::Snafu;

use crate::{notification::ObjectLocator, pipeline::Stage};

/// Reasons a queue message body cannot be turned into an [`ObjectLocator`].
///
/// Every variant is permanent: redelivering the same body reproduces it.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DecodeError {
    #[snafu(display("Message body is not a storage event notification: {source}"))]
    InvalidJson { source: serde_json::Error },

    #[snafu(display("Notification contains no records"))]
    NoRecords,

    #[snafu(display("Notification record is missing {field}"))]
    MissingField { field: &'static str },

    #[snafu(display("Object key {key:?} contains a malformed percent escape"))]
    MalformedEscape { key: String },

    #[snafu(display("Object key {key:?} does not decode to UTF-8"))]
    InvalidKey {
        key: String,
        source: std::string::FromUtf8Error,
    },
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Invalid configuration: {source}"))]
    Config { source: envy::Error },

    #[snafu(display("Invalid configuration value for {key}: {message}"))]
    InvalidConfig { key: &'static str, message: String },

    #[snafu(display("Failed to decode notification: {source}"))]
    Decode { source: DecodeError },

    #[snafu(display("Text extraction failed for {locator}: {source}"))]
    Extraction {
        locator: ObjectLocator,
        #[snafu(source(false))]
        source: eyre::Report,
    },

    #[snafu(display("Sentiment analysis failed: {source}"))]
    Sentiment {
        #[snafu(source(false))]
        source: eyre::Report,
    },

    #[snafu(display("Failed to persist result {job_id}: {source}"))]
    Persistence {
        job_id: String,
        #[snafu(source(false))]
        source: eyre::Report,
    },

    #[snafu(display("Received message has no {field}"))]
    IncompleteMessage { field: &'static str },

    #[snafu(display("Failed to receive from queue: {source}"))]
    Transport {
        #[snafu(source(false))]
        source: eyre::Report,
    },

    #[snafu(display("Failed to delete message {message_id}: {source}"))]
    Acknowledge {
        message_id: String,
        #[snafu(source(false))]
        source: eyre::Report,
    },
}

impl Error {
    /// Whether the failure may clear up on redelivery.
    ///
    /// Decode failures are the only permanent class; configuration errors never
    /// reach the poll loop.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Extraction { .. }
            | Self::Sentiment { .. }
            | Self::Persistence { .. }
            | Self::Transport { .. }
            | Self::Acknowledge { .. } => true,

            Self::Decode { .. }
            | Self::IncompleteMessage { .. }
            | Self::Config { .. }
            | Self::InvalidConfig { .. } => false,
        }
    }

    /// The pipeline stage this error prevented from being reached, if it came
    /// from one of the pipeline stages.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Decode { .. } => Some(Stage::Decoded),
            Self::Extraction { .. } => Some(Stage::Extracted),
            Self::Sentiment { .. } => Some(Stage::Scored),
            Self::Persistence { .. } => Some(Stage::Persisted),
            _ => None,
        }
    }

    pub fn invalid_config(key: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let decode = Error::Decode {
            source: DecodeError::NoRecords,
        };
        assert!(!decode.is_transient());
        assert_eq!(decode.stage(), Some(Stage::Decoded));

        let sentiment = Error::Sentiment {
            source: eyre::eyre!("throttled"),
        };
        assert!(sentiment.is_transient());
        assert_eq!(sentiment.stage(), Some(Stage::Scored));

        let persistence = Error::Persistence {
            job_id: "job-1".to_owned(),
            source: eyre::eyre!("capacity exceeded"),
        };
        assert!(persistence.is_transient());
        assert_eq!(persistence.stage(), Some(Stage::Persisted));

        let transport = Error::Transport {
            source: eyre::eyre!("connection refused"),
        };
        assert!(transport.is_transient());
        assert_eq!(transport.stage(), None);
    }

    #[test]
    fn test_display_includes_cause() {
        let err = Error::Extraction {
            locator: ObjectLocator::new("docs", "a.pdf"),
            source: eyre::eyre!("unsupported document format"),
        };
        assert_eq!(
            err.to_string(),
            "Text extraction failed for s3://docs/a.pdf: unsupported document format"
        );
    }
}
