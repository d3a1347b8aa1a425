//! Error types for the studio API client.
//!
//! # Design
//! Status codes the backend raises on purpose (401, 403, 404, 422) get their
//! own variants so callers can branch on them; every other unexpected status
//! lands in `HttpError`. The `detail` strings come from the backend's
//! `{"detail": "..."}` error body when it has one, else the raw body text.

use thiserror::Error;

use crate::http::HttpResponse;

/// Errors returned by `StudioClient` and the services built on it.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized: {detail}")]
    Unauthorized { detail: String },

    #[error("forbidden: {detail}")]
    Forbidden { detail: String },

    #[error("resource not found: {detail}")]
    NotFound { detail: String },

    #[error("validation failed: {detail}")]
    Validation { detail: String },

    /// Any other status the operation did not expect.
    #[error("HTTP {status}: {detail}")]
    HttpError { status: u16, detail: String },

    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),

    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The transport failed before any status was received.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("export failed: {message}")]
    ExportFailed { message: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("no usable file name for download: {0:?}")]
    InvalidFilename(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Classify a response whose status differs from the expected one.
    pub fn from_response(response: &HttpResponse) -> Self {
        let detail = extract_detail(response);
        match response.status {
            401 => ApiError::Unauthorized { detail },
            403 => ApiError::Forbidden { detail },
            404 => ApiError::NotFound { detail },
            422 => ApiError::Validation { detail },
            status => ApiError::HttpError { status, detail },
        }
    }

    /// HTTP status carried by the error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Forbidden { .. } => Some(403),
            ApiError::NotFound { .. } => Some(404),
            ApiError::Validation { .. } => Some(422),
            ApiError::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<ureq::Error> for ApiError {
    fn from(err: ureq::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

/// Pull the human-readable message out of an error body.
///
/// FastAPI answers `{"detail": "..."}` for raised errors and
/// `{"detail": [{"msg": ...}, ...]}` for request validation failures.
fn extract_detail(response: &HttpResponse) -> String {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(&response.body) else {
        return response.text();
    };
    match value.get("detail") {
        Some(serde_json::Value::String(detail)) => detail.clone(),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.get("msg")
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| item.to_string())
            })
            .collect::<Vec<_>>()
            .join("; "),
        Some(other) => other.to_string(),
        None => response.text(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn detail_string_is_extracted() {
        let err = ApiError::from_response(&response(400, r#"{"detail":"chapter not ready"}"#));
        match err {
            ApiError::HttpError { status, detail } => {
                assert_eq!(status, 400);
                assert_eq!(detail, "chapter not ready");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn validation_detail_list_is_joined() {
        let body = r#"{"detail":[{"loc":["query","page"],"msg":"must be >= 1"},{"msg":"bad size"}]}"#;
        let err = ApiError::from_response(&response(422, body));
        match err {
            ApiError::Validation { detail } => assert_eq!(detail, "must be >= 1; bad size"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_json_body_is_used_verbatim() {
        let err = ApiError::from_response(&response(502, "bad gateway"));
        assert!(matches!(err, ApiError::HttpError { status: 502, ref detail } if detail == "bad gateway"));
    }

    #[test]
    fn known_statuses_map_to_variants() {
        assert!(matches!(ApiError::from_response(&response(401, "")), ApiError::Unauthorized { .. }));
        assert!(matches!(ApiError::from_response(&response(403, "")), ApiError::Forbidden { .. }));
        assert!(matches!(ApiError::from_response(&response(404, "")), ApiError::NotFound { .. }));
        assert_eq!(ApiError::from_response(&response(500, "")).status(), Some(500));
    }
}
