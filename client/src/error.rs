// Error taxonomy for the campaign and import workflows
//
// Validation errors are raised before any network call. API errors carry the raw server
// message so the UI can interpolate it into a localized notice.

use thiserror::Error;

use crate::ui::Action;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Non-success HTTP status. `message` is the raw body/message returned by the server.
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Unexpected response from server: {0}")]
    Decode(String),

    #[error("Invalid API URL: {0}")]
    Url(String),
}

impl ApiError {
    /// Transport failures are the only errors worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

impl From<url::ParseError> for ApiError {
    fn from(e: url::ParseError) -> Self {
        ApiError::Url(e.to_string())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Select recipients before sending")]
    NoRecipients,

    #[error("Unsupported campaign type: {0}")]
    UnsupportedCampaignType(String),

    #[error("A schedule date and time is required")]
    MissingScheduleTime,

    #[error("Invalid schedule date and time: {0}")]
    InvalidScheduleTime(String),

    #[error("Please confirm you have consent to email these contacts")]
    ConsentRequired,

    #[error("Please choose a CSV file to import")]
    NoFile,

    #[error("Only CSV files can be imported (got '{0}')")]
    InvalidFileType(String),

    #[error("The CSV file has no data")]
    EmptyCsv,

    #[error("Map at least one column to Email before importing")]
    EmailNotMapped,
}

/// Recipient count failures. Never fatal to the wizard; the count just becomes unknown.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CountError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Segment '{0}' no longer exists")]
    UnknownSegment(String),
}

#[derive(Debug, Error)]
pub enum WizardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Your plan does not allow this action ({0})")]
    Locked(Action),

    #[error("A submission is already in progress")]
    InFlight,

    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

impl WizardError {
    pub fn is_validation(&self) -> bool {
        matches!(self, WizardError::Validation(_))
    }
}

pub type WizardResult<T> = Result<T, WizardError>;
