use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

pub const API_PREFIX: &str = "/api/v1";

/// Chapter status the exporter requires before it will build a draft.
pub const MATERIALS_PREPARED: &str = "materials_prepared";

const DEFAULT_PAGE_SIZE: usize = 20;
const MAX_PAGE_SIZE: usize = 100;

/// End-of-central-directory record of an empty zip archive.
const EMPTY_ZIP: [u8; 22] = [
    0x50, 0x4b, 0x05, 0x06, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
];

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Chapter {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub chapter_number: u32,
    pub status: String,
}

impl Chapter {
    pub fn new(id: &str, project_id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            project_id: project_id.to_string(),
            title: title.to_string(),
            chapter_number: 1,
            status: "pending".to_string(),
        }
    }

    pub fn numbered(mut self, chapter_number: u32) -> Self {
        self.chapter_number = chapter_number;
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Paragraph {
    pub id: String,
    pub chapter_id: String,
    pub content: String,
    pub order_index: u32,
    pub action: String,
}

#[derive(Deserialize)]
pub struct ParagraphInput {
    pub id: Option<String>,
    pub content: String,
    pub order_index: u32,
    pub action: Option<String>,
}

#[derive(Deserialize)]
pub struct BatchUpdate {
    pub paragraphs: Vec<ParagraphInput>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChapterPage {
    pub items: Vec<Chapter>,
    pub total: usize,
    pub page: usize,
    pub size: usize,
    pub total_pages: usize,
}

/// In-memory backend state. Seed it with the builder methods before
/// handing it to `app_with`.
#[derive(Debug, Default)]
pub struct Store {
    token: Option<String>,
    chapters: Vec<Chapter>,
    paragraphs: HashMap<String, Vec<Paragraph>>,
    exports: HashMap<String, Vec<u8>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `authorization: Bearer <token>` on every request.
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn with_chapter(mut self, chapter: Chapter) -> Self {
        self.paragraphs.entry(chapter.id.clone()).or_default();
        self.chapters.push(chapter);
        self
    }

    pub fn with_paragraphs(mut self, chapter_id: &str, contents: &[&str]) -> Self {
        let paragraphs = contents
            .iter()
            .enumerate()
            .map(|(i, content)| Paragraph {
                id: Uuid::new_v4().to_string(),
                chapter_id: chapter_id.to_string(),
                content: content.to_string(),
                order_index: i as u32 + 1,
                action: "keep".to_string(),
            })
            .collect();
        self.paragraphs.insert(chapter_id.to_string(), paragraphs);
        self
    }
}

pub type Db = Arc<RwLock<Store>>;

/// FastAPI-style error: `{"detail": "..."}` with a status code.
#[derive(Debug)]
pub struct Detail(StatusCode, String);

impl IntoResponse for Detail {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "detail": self.1 }))).into_response()
    }
}

fn query_error(field: &str, msg: &str) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "detail": [{ "loc": ["query", field], "msg": msg }] })),
    )
        .into_response()
}

pub fn app() -> Router {
    app_with(Store::default())
}

pub fn app_with(store: Store) -> Router {
    let db: Db = Arc::new(RwLock::new(store));
    let api = Router::new()
        .route("/chapters/", get(list_chapters))
        .route("/paragraphs/chapters/{chapter_id}/paragraphs", get(list_paragraphs))
        .route(
            "/paragraphs/chapters/{chapter_id}/paragraphs/batch",
            put(batch_update_paragraphs),
        )
        .route("/export/jianying/{chapter_id}", post(export_jianying))
        .route("/export/jianying/download/{filename}", get(download_export))
        .with_state(db);
    Router::new().nest(API_PREFIX, api)
}

pub async fn run(listener: TcpListener, store: Store) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(store)).await
}

fn authorize(headers: &HeaderMap, store: &Store) -> Result<(), Detail> {
    let Some(token) = &store.token else {
        return Ok(());
    };
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match presented {
        Some(p) if p == token => Ok(()),
        _ => Err(Detail(StatusCode::UNAUTHORIZED, "Not authenticated".to_string())),
    }
}

fn parse_bounded(
    params: &HashMap<String, String>,
    key: &str,
    default: usize,
    max: usize,
) -> Result<usize, Response> {
    match params.get(key) {
        None => Ok(default),
        Some(raw) => match raw.parse::<usize>() {
            Ok(n) if (1..=max).contains(&n) => Ok(n),
            _ => Err(query_error(key, &format!("must be an integer between 1 and {max}"))),
        },
    }
}

async fn list_chapters(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let store = db.read().await;
    if let Err(err) = authorize(&headers, &store) {
        return err.into_response();
    }
    let Some(project_id) = params.get("project_id") else {
        return query_error("project_id", "field required");
    };
    let page = match parse_bounded(&params, "page", 1, usize::MAX) {
        Ok(n) => n,
        Err(resp) => return resp,
    };
    let size = match parse_bounded(&params, "size", DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE) {
        Ok(n) => n,
        Err(resp) => return resp,
    };

    let mut matching: Vec<Chapter> = store
        .chapters
        .iter()
        .filter(|c| &c.project_id == project_id)
        .filter(|c| params.get("status").map_or(true, |s| &c.status == s))
        .cloned()
        .collect();
    matching.sort_by_key(|c| c.chapter_number);

    let total = matching.len();
    let items = matching
        .into_iter()
        .skip((page - 1).saturating_mul(size))
        .take(size)
        .collect();
    Json(ChapterPage {
        items,
        total,
        page,
        size,
        total_pages: total.div_ceil(size),
    })
    .into_response()
}

async fn list_paragraphs(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(chapter_id): Path<String>,
) -> Result<Json<Vec<Paragraph>>, Detail> {
    let store = db.read().await;
    authorize(&headers, &store)?;
    store
        .paragraphs
        .get(&chapter_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| Detail(StatusCode::NOT_FOUND, "Chapter not found".to_string()))
}

async fn batch_update_paragraphs(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(chapter_id): Path<String>,
    Json(input): Json<BatchUpdate>,
) -> Result<Json<serde_json::Value>, Detail> {
    let mut store = db.write().await;
    authorize(&headers, &store)?;
    let Some(existing) = store.paragraphs.get_mut(&chapter_id) else {
        return Err(Detail(StatusCode::NOT_FOUND, "Chapter not found".to_string()));
    };

    let mut updated: Vec<Paragraph> = input
        .paragraphs
        .into_iter()
        .filter(|p| p.action.as_deref() != Some("delete"))
        .map(|p| Paragraph {
            id: p.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            chapter_id: chapter_id.clone(),
            content: p.content,
            order_index: p.order_index,
            action: p.action.unwrap_or_else(|| "keep".to_string()),
        })
        .collect();
    updated.sort_by_key(|p| p.order_index);
    let count = updated.len();
    *existing = updated;

    info!(%chapter_id, count, "paragraphs replaced");
    Ok(Json(json!({ "updated": count })))
}

async fn export_jianying(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(chapter_id): Path<String>,
) -> Result<Json<serde_json::Value>, Detail> {
    let mut store = db.write().await;
    authorize(&headers, &store)?;
    let Some(chapter) = store.chapters.iter().find(|c| c.id == chapter_id).cloned() else {
        return Err(Detail(StatusCode::NOT_FOUND, "Chapter not found".to_string()));
    };
    if chapter.status != MATERIALS_PREPARED {
        return Err(Detail(
            StatusCode::BAD_REQUEST,
            format!(
                "chapter status is {}, export requires {MATERIALS_PREPARED}",
                chapter.status
            ),
        ));
    }

    let suffix = Uuid::new_v4().simple().to_string();
    let filename = format!("{}_{}.zip", safe_title(&chapter.title), &suffix[..8]);
    store.exports.insert(filename.clone(), EMPTY_ZIP.to_vec());
    info!(%chapter_id, %filename, "export created");

    Ok(Json(json!({
        "success": true,
        "message": "export succeeded",
        "download_url": format!("{API_PREFIX}/export/jianying/download/{filename}"),
        "filename": filename,
    })))
}

async fn download_export(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(filename): Path<String>,
) -> Result<Response, Detail> {
    let store = db.read().await;
    authorize(&headers, &store)?;
    let bytes = store
        .exports
        .get(&filename)
        .cloned()
        .ok_or_else(|| Detail(StatusCode::NOT_FOUND, "File not found or expired".to_string()))?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Keep alphanumerics, spaces, `-` and `_`; fall back to `chapter`.
fn safe_title(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let trimmed = kept.trim();
    if trimmed.is_empty() {
        "chapter".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chapter_serializes_to_json() {
        let chapter = Chapter::new("c1", "p1", "Opening").numbered(3);
        let json = serde_json::to_value(&chapter).unwrap();
        assert_eq!(json["id"], "c1");
        assert_eq!(json["project_id"], "p1");
        assert_eq!(json["chapter_number"], 3);
        assert_eq!(json["status"], "pending");
    }

    #[test]
    fn paragraph_input_optional_fields() {
        let input: ParagraphInput =
            serde_json::from_str(r#"{"content":"text","order_index":2}"#).unwrap();
        assert!(input.id.is_none());
        assert!(input.action.is_none());
        assert_eq!(input.order_index, 2);
    }

    #[test]
    fn batch_update_rejects_missing_content() {
        let result: Result<BatchUpdate, _> =
            serde_json::from_str(r#"{"paragraphs":[{"order_index":1}]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn safe_title_strips_punctuation() {
        assert_eq!(safe_title("Chapter 1: The Start!"), "Chapter 1 The Start");
        assert_eq!(safe_title("第一章"), "第一章");
        assert_eq!(safe_title("?!/"), "chapter");
    }

    #[test]
    fn seeded_paragraphs_are_ordered_from_one() {
        let store = Store::new()
            .with_chapter(Chapter::new("c1", "p1", "One"))
            .with_paragraphs("c1", &["a", "b"]);
        let paragraphs = &store.paragraphs["c1"];
        assert_eq!(paragraphs[0].order_index, 1);
        assert_eq!(paragraphs[1].order_index, 2);
        assert!(paragraphs.iter().all(|p| p.action == "keep"));
    }

    #[test]
    fn empty_zip_has_end_of_central_directory_signature() {
        assert_eq!(&EMPTY_ZIP[..4], b"PK\x05\x06");
    }
}
