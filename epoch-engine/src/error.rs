use stream_core::element::{EpochKey, FieldError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReassemblyError>;

/// Per-element and per-group failures. All of these are contained at the
/// engine boundary: the offending element or epoch is dropped and logged,
/// the rest of the stream continues.
#[derive(Debug, Error)]
pub enum ReassemblyError {
    #[error("epoch {key}: satellite count {count} out of range (1..=127)")]
    InvalidGroupSize { key: EpochKey, count: i64 },
    #[error("epoch {key}: group already holds all {expected} satellites")]
    GroupAlreadyFull { key: EpochKey, expected: u8 },
    #[error("epoch {key}: {source}")]
    Encoding {
        key: EpochKey,
        #[source]
        source: FieldError,
    },
}
