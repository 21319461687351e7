use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use thiserror::Error;

/// Errors from publishing change events.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("message channel is disabled")]
    Disabled,

    #[error("kafka error: {0}")]
    Kafka(String),

    #[error("publish timed out")]
    Timeout,
}

impl ChannelError {
    /// Check if a later publish could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChannelError::Kafka(_) | ChannelError::Timeout)
    }
}

impl From<KafkaError> for ChannelError {
    fn from(err: KafkaError) -> Self {
        match err {
            KafkaError::MessageProduction(RDKafkaErrorCode::MessageTimedOut) => {
                ChannelError::Timeout
            }
            other => ChannelError::Kafka(other.to_string()),
        }
    }
}

pub type ChannelResult<T> = Result<T, ChannelError>;
