//! Defines the general error type for the crate and various conversions into it
use reqwest::StatusCode;
use std::convert;
use std::fmt;

/// Maximum number of characters of a response body kept in an error message
const BODY_SNIPPET_LEN: usize = 200;

/// General error type for the crate
#[derive(Debug)]
pub enum Error {
    /// Input sequences were empty, of different lengths or held invalid coordinates
    InvalidInput(String),
    /// A batch request came back with a failure status or a body we could not make sense of
    ServerResponse {
        batch: usize,
        status: Option<StatusCode>,
        code: Option<String>,
        message: String,
    },
    /// Transport level failure straight from the HTTP client
    Network(reqwest::Error),
    InvalidConfigurationValue(String),
    UnknownServiceHandler(String),
    Io(std::io::Error),
    Json(serde_json::Error),
    Yaml(serde_yaml::Error),
}

impl Error {
    /// Build a ServerResponse error, trimming the message down to a short snippet
    pub fn server_response(
        batch: usize,
        status: Option<StatusCode>,
        code: Option<String>,
        message: &str,
    ) -> Self {
        Error::ServerResponse {
            batch,
            status,
            code,
            message: snippet(message),
        }
    }

    /// Index of the batch that failed, if the error is tied to one
    pub fn batch(&self) -> Option<usize> {
        match self {
            Error::ServerResponse { batch, .. } => Some(*batch),
            _ => None,
        }
    }
}

fn snippet(message: &str) -> String {
    let message = message.trim();
    match message.char_indices().nth(BODY_SNIPPET_LEN) {
        Some((idx, _)) => format!("{}...", &message[..idx]),
        None => message.to_string(),
    }
}

impl convert::From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Error {
        Error::Network(err)
    }
}

impl convert::From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl convert::From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::Json(err)
    }
}

impl convert::From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Error {
        Error::Yaml(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Error::ServerResponse {
                batch,
                status,
                code,
                message,
            } => {
                write!(f, "Match request for batch {} failed", batch)?;
                if let Some(status) = status {
                    write!(f, " with status: {}", status)?;
                }
                if let Some(code) = code {
                    write!(f, " (code: {})", code)?;
                }
                write!(f, " - {}", message)
            }
            Error::Network(e) => write!(f, "{}", e),
            Error::InvalidConfigurationValue(msg) => write!(f, "{}", msg),
            Error::UnknownServiceHandler(msg) => write!(f, "{}", msg),
            Error::Io(e) => write!(f, "{}", e),
            Error::Json(e) => write!(f, "{}", e),
            Error::Yaml(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Network(e) => Some(e),
            Error::Io(e) => Some(e),
            Error::Json(e) => Some(e),
            Error::Yaml(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_response_message_is_truncated() {
        let body = "x".repeat(500);
        let err = Error::server_response(3, Some(StatusCode::BAD_REQUEST), None, &body);
        match &err {
            Error::ServerResponse { message, .. } => {
                assert_eq!(message.len(), BODY_SNIPPET_LEN + 3);
                assert!(message.ends_with("..."));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.batch(), Some(3));
    }

    #[test]
    fn server_response_display_names_batch_status_and_code() {
        let err = Error::server_response(
            1,
            Some(StatusCode::BAD_REQUEST),
            Some("NoMatch".to_string()),
            "Could not match the trace.",
        );
        assert_eq!(
            err.to_string(),
            "Match request for batch 1 failed with status: 400 Bad Request (code: NoMatch) - Could not match the trace."
        );
    }
}
