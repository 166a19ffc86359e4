//! Error types for groupstat-core

use thiserror::Error;

/// Main error type for the groupstat-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Image encode/decode error
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed time-of-day input
    #[error("invalid time of day: {0}")]
    InvalidTime(String),

    /// Not enough messages in the window to produce a report
    #[error("not enough messages: found {found}, need at least {required}")]
    InsufficientData { found: usize, required: usize },

    /// Chat history API error
    #[error("history error: {0}")]
    History(String),

    /// Window could not be covered before hitting the page-size ceiling
    #[error("history window needs more than {requested} messages")]
    WindowTooLarge { requested: usize },

    /// Member lookup error
    #[error("identity lookup error: {0}")]
    Identity(String),

    /// Avatar fetch error
    #[error("avatar error: {0}")]
    Avatar(String),

    /// Rendering gave up after retries
    #[error("render error: {0}")]
    Render(String),

    /// Notification delivery error
    #[error("notify error: {0}")]
    Notify(String),
}

impl Error {
    /// Text suitable for replying to the user who asked for a report.
    pub fn user_message(&self) -> String {
        match self {
            Error::InvalidTime(input) => {
                format!("Invalid time \"{input}\". Use HH:MM, for example 23:00.")
            }
            Error::InsufficientData { found, required } => format!(
                "Not enough messages to analyze ({found} found, at least {required} needed)."
            ),
            Error::History(_) | Error::WindowTooLarge { .. } => {
                format!("Could not load chat history: {self}")
            }
            Error::Render(_) => "Report rendering failed, please try again later.".to_string(),
            other => format!("Analysis failed: {other}"),
        }
    }

    /// Whether the failure is a user-facing data condition rather than a fault.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, Error::InsufficientData { .. })
    }
}

/// Result type alias for groupstat-core
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_for_bad_time() {
        let msg = Error::InvalidTime("25:99".to_string()).user_message();
        assert!(msg.contains("25:99"));
        assert!(msg.contains("HH:MM"));
    }

    #[test]
    fn test_user_message_for_insufficient_data() {
        let err = Error::InsufficientData {
            found: 3,
            required: 50,
        };
        assert!(err.is_insufficient_data());
        assert!(err.user_message().contains("3 found"));
    }
}
