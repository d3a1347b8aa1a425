//! Domain DTOs for the studio API.
//!
//! # Design
//! The backend owns every entity; the client only carries transient request
//! and response payloads. `Chapter` and `Paragraph` name the fields the
//! client relies on and keep everything else in `extra`, so a payload read
//! from the server can be sent back without losing fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A chapter record as listed by `GET /chapters/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chapter {
    pub id: String,
    pub project_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A paragraph record, both as listed and as sent in a batch update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Paragraph {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub content: String,
    pub order_index: u32,
    /// Edit action for batch updates; the backend uses `"keep"` for
    /// untouched paragraphs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Paragraph {
    pub fn new(content: impl Into<String>, order_index: u32) -> Self {
        Self {
            id: None,
            content: content.into(),
            order_index,
            action: None,
            extra: Map::new(),
        }
    }
}

/// Request payload for `PUT .../paragraphs/batch`. Order is significant.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ParagraphBatchUpdate {
    pub paragraphs: Vec<Paragraph>,
}

/// Result of `POST /export/jianying/{chapter_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JianYingExport {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub download_url: String,
    #[serde(default)]
    pub filename: String,
}

/// A decoded response that keeps its envelope.
///
/// Operations that hand back "the response" return this; operations that
/// unwrap the payload return `T` directly.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn into_data(self) -> T {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chapter_keeps_unknown_fields() {
        let raw = r#"{"id":"c1","project_id":"p1","title":"One","paragraph_count":4}"#;
        let chapter: Chapter = serde_json::from_str(raw).unwrap();
        assert_eq!(chapter.title, "One");
        assert!(chapter.status.is_none());
        assert_eq!(chapter.extra["paragraph_count"], 4);

        let back = serde_json::to_value(&chapter).unwrap();
        assert_eq!(back["paragraph_count"], 4);
        assert!(back.get("status").is_none());
    }

    #[test]
    fn new_paragraph_omits_optional_fields() {
        let json = serde_json::to_value(Paragraph::new("text", 1)).unwrap();
        assert_eq!(json, serde_json::json!({"content": "text", "order_index": 1}));
    }

    #[test]
    fn export_defaults_missing_strings() {
        let export: JianYingExport =
            serde_json::from_str(r#"{"success":false,"message":"not ready"}"#).unwrap();
        assert!(!export.success);
        assert_eq!(export.message, "not ready");
        assert!(export.download_url.is_empty());
        assert!(export.filename.is_empty());
    }

    #[test]
    fn export_rejects_missing_success() {
        let result: Result<JianYingExport, _> = serde_json::from_str(r#"{"message":"x"}"#);
        assert!(result.is_err());
    }
}
