//! Directory Error Types

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirectoryError {
    /// The directory rejected the request and explained why
    #[error("Directory API error {status} ({error_code}): {error_summary}")]
    Api {
        status: u16,
        error_code: String,
        error_summary: String,
        causes: Vec<String>,
    },

    /// Non-success response without a directory error body, e.g. from a proxy
    #[error("Directory returned status {status}")]
    UnexpectedStatus { status: u16 },

    #[error("Directory request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode directory response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid directory URL: {0}")]
    InvalidUrl(String),
}

impl DirectoryError {
    /// Build an error from a non-success response body.
    pub(crate) fn from_response(status: u16, body: &[u8]) -> Self {
        match serde_json::from_slice::<ApiErrorBody>(body) {
            Ok(parsed) if !parsed.error_summary.is_empty() => Self::Api {
                status,
                error_code: parsed.error_code,
                error_summary: parsed.error_summary,
                causes: parsed
                    .error_causes
                    .into_iter()
                    .map(|c| c.error_summary)
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            _ => Self::UnexpectedStatus { status },
        }
    }

    /// Human-readable summary supplied by the directory, if any.
    pub fn error_summary(&self) -> Option<&str> {
        match self {
            Self::Api { error_summary, .. } => Some(error_summary),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorBody {
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    error_summary: String,
    #[serde(default)]
    error_causes: Vec<ApiErrorCause>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorCause {
    #[serde(default)]
    error_summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_api_error_body() {
        let body = br#"{
            "errorCode": "E0000001",
            "errorSummary": "Api validation failed: login",
            "errorId": "oae123",
            "errorCauses": [{ "errorSummary": "login: An object with this field already exists" }]
        }"#;
        let err = DirectoryError::from_response(400, body);

        assert_eq!(err.error_summary(), Some("Api validation failed: login"));
        assert!(matches!(
            &err,
            DirectoryError::Api { causes, .. }
                if causes == &["login: An object with this field already exists"]
        ));
    }

    #[test]
    fn test_unparseable_body_has_no_summary() {
        let err = DirectoryError::from_response(502, b"<html>bad gateway</html>");
        assert_eq!(err.error_summary(), None);
        assert!(matches!(err, DirectoryError::UnexpectedStatus { status: 502 }));
    }

    #[test]
    fn test_body_without_summary_has_no_summary() {
        let err = DirectoryError::from_response(500, br#"{"errorCode":"E0000009"}"#);
        assert!(matches!(err, DirectoryError::UnexpectedStatus { status: 500 }));
    }
}
