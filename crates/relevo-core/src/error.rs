use relevo_store::PolicyViolation;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy of the service core. `InvalidArgument` through
/// `UnsupportedMediaType` are client errors surfaced verbatim; `Storage`
/// and `Db` are backend failures the caller may retry — the core itself
/// never retries, so a flaky backend cannot double-insert a message.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("permission denied")]
    PermissionDenied,

    #[error("payload exceeds the {limit}-byte limit")]
    PayloadTooLarge { limit: usize },

    #[error("unsupported media type '{0}'")]
    UnsupportedMediaType(String),

    #[error("storage unavailable: {0:#}")]
    Storage(anyhow::Error),

    #[error("database error: {0:#}")]
    Db(anyhow::Error),
}

impl From<PolicyViolation> for Error {
    fn from(v: PolicyViolation) -> Self {
        match v {
            PolicyViolation::TooLarge { limit, .. } => Error::PayloadTooLarge { limit },
            PolicyViolation::UnsupportedType(t) => Error::UnsupportedMediaType(t),
        }
    }
}
