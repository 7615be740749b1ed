use thiserror::Error;

/// Errors that can occur while answering a harvesting request.
///
/// Every variant except [`OaiError::StorageFailure`] is a client error and is
/// terminal for the request.
#[derive(Debug, Error)]
pub enum OaiError {
    #[error("Malformed identifier: {0}")]
    MalformedIdentifier(String),

    #[error("No record with identifier {0}")]
    RecordNotFound(String),

    #[error("Record {0} does not belong to this repository")]
    OutOfScope(String),

    #[error("No such set: {0}")]
    BadSetSpec(String),

    #[error("The resumption token is invalid or has expired")]
    BadResumptionToken,

    #[error("Bad argument: {0}")]
    BadArgument(String),

    #[error("Storage error: {0}")]
    StorageFailure(#[from] anyhow::Error),
}

impl OaiError {
    /// The protocol error code, or `None` for server-side failures.
    pub fn oai_code(&self) -> Option<&'static str> {
        match self {
            OaiError::MalformedIdentifier(_) => Some("badArgument"),
            OaiError::RecordNotFound(_) | OaiError::OutOfScope(_) => Some("idDoesNotExist"),
            OaiError::BadSetSpec(_) => Some("badArgument"),
            OaiError::BadResumptionToken => Some("badResumptionToken"),
            OaiError::BadArgument(_) => Some("badArgument"),
            OaiError::StorageFailure(_) => None,
        }
    }

    /// Whether a harvester may re-issue the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OaiError::StorageFailure(_))
    }
}

pub type OaiResult<T> = Result<T, OaiError>;
