use thiserror::Error;

/// Errors that can occur in gtmcdc-core.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid journal record format: expected at least {expected} fields, got {actual}")]
    InvalidRecord { expected: usize, actual: usize },

    #[error("input is not horolog time format: {0:?}")]
    NotHorologFormat(String),

    #[error("date is prior to 1971/1/1: {0:?}")]
    DatePriorToEpoch(String),

    #[error("invalid node reference: {0:?}")]
    InvalidNode(String),

    #[error("unable to serialize journal record: {0}")]
    SerializationError(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for errors raised while decoding a line (the line is dropped).
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidRecord { .. } | Error::NotHorologFormat(_) | Error::DatePriorToEpoch(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
