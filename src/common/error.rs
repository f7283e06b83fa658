use thiserror::Error;

use crate::actor::navigator::Direction;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The snapshot is not an object, a required array is missing, or a
    /// record has the wrong shape.
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// A regex-mode exclusion string failed to compile.
    #[error("invalid exclusion pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("space change step {step} ({direction}) failed: {reason}")]
    NavigationCommandFailure {
        step: usize,
        direction: Direction,
        reason: String,
    },
}

impl Error {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self { Error::MalformedSnapshot(msg.into()) }
}
