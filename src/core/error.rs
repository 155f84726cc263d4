use thiserror::Error;

/// Errors surfaced by the task-tracking core.
///
/// Frequency parse failures and missing ids are user-correctable and get
/// surfaced verbatim as chat replies; the rest indicate a caller defect or a
/// storage-layer failure and are propagated as-is.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("could not parse frequency '{0}'; use e.g. '3d', '1w', '1m' or a number of days")]
    BadFrequency(String),

    #[error("no task with id {0}")]
    NotFound(i64),

    #[error("'{0}' is not an editable task field")]
    InvalidField(String),

    #[error("frequency must be at least one day")]
    ZeroFrequency,

    #[error("points must be at least 1")]
    ZeroPoints,

    #[error("no free task id after {0} attempts")]
    IdSpaceExhausted(u32),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}
