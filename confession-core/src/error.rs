use reqwest::StatusCode;
use thiserror::Error;

pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    /// 401/403, or an admin call made without a stored credential.
    #[error("authentication required (status {status:?})")]
    Auth { status: Option<StatusCode> },
    #[error("api error {status}: {}", message.as_deref().unwrap_or(GENERIC_FAILURE))]
    Api {
        status: StatusCode,
        message: Option<String>,
    },
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ApiError {
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// Text for inline display: backend message verbatim when present.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api {
                message: Some(message),
                ..
            } => message.clone(),
            Self::Validation(err) => err.to_string(),
            Self::Auth { .. } => "Your session has expired. Please log in again.".to_string(),
            _ => GENERIC_FAILURE.to_string(),
        }
    }
}

/// Client-side rejections. These never reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("please write something before submitting")]
    EmptyContent,
    #[error("confession is {len} characters long, the limit is {max}")]
    ContentTooLong { len: usize, max: usize },
    #[error("at most {max} images are allowed (got {count})")]
    TooManyImages { count: usize, max: usize },
    #[error("{file_name} is not an image")]
    NotAnImage { file_name: String },
    #[error("{file_name} is {size} bytes, each image must be at most {max} bytes")]
    ImageTooLarge {
        file_name: String,
        size: usize,
        max: usize,
    },
    #[error("username and password are required")]
    MissingCredentials,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to locate the configuration directory")]
    NoConfigDir,
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("session encoding error: {0}")]
    Json(#[from] serde_json::Error),
}
