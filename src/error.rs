use thiserror::Error;

/// Rejected gauge configuration. Returned synchronously at construction;
/// no background task is started.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("metric key must have at least one segment")]
    EmptyKey,

    #[error("collection interval must be greater than zero")]
    ZeroInterval,

    #[error("label '{0}' is defined more than once")]
    DuplicateLabel(String),
}

/// Failure reported by a collection routine.
///
/// The process logs it, skips forwarding for that cycle and keeps going.
#[derive(Debug, Error)]
pub enum CollectionError {
    /// The routine chose to give up once its scope budget ran out.
    #[error("collection exceeded its time budget")]
    DeadlineExceeded,

    /// The routine panicked. The payload message is kept when it is a string.
    #[error("collection routine panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}
