use thiserror::Error;

/// Failures reading or writing the user database file.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub const INVALID_CREDENTIALS: &str = "Invalid username or password";
pub const USER_NOT_FOUND: &str = "User not found";
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again";

/// Outcomes of the account operations that are not a success.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    /// Login for a username that is not registered.
    #[error("{}", INVALID_CREDENTIALS)]
    UnknownUser,
    /// Login with a wrong password for an existing user.
    #[error("{}", INVALID_CREDENTIALS)]
    InvalidCredentials,
    #[error("{}", USER_NOT_FOUND)]
    NotFound,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AccountError {
    /// HTTP status code for this error. `Internal` reports 500 here; the
    /// register route downgrades it to 400.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::UnknownUser => 400,
            Self::InvalidCredentials => 401,
            Self::NotFound => 404,
            Self::Conflict(_) => 409,
            Self::Internal(_) => 500,
        }
    }

    /// Message shown to callers. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => GENERIC_FAILURE.to_string(),
            other => other.to_string(),
        }
    }
}
