use thiserror::Error;

/// Why a highlight fetch ended without something to show.
///
/// The `Display` text is what the overlay shows in its error slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("missing credential")]
    MissingCredential,
    #[error("unexpected status {0}")]
    UnexpectedStatus(u16),
    #[error("expected JSON content type, got {0}")]
    UnexpectedContentType(String),
    #[error("{0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    MalformedBody(String),
    #[error("no items returned")]
    EmptyResult,
}

impl FetchError {
    /// The credential was absent. Everything else came from the request.
    pub fn is_config_error(&self) -> bool {
        matches!(self, FetchError::MissingCredential)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> Self {
        FetchError::Transport(crate::unpack_error(&error))
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(error: serde_json::Error) -> Self {
        FetchError::MalformedBody(error.to_string())
    }
}
