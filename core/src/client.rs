//! Stateless HTTP request builder and response parser for the studio API.
//!
//! # Design
//! `StudioClient` holds only a `base_url` and an optional bearer token and
//! carries no mutable state between calls. Each operation is split into a
//! `build_*` method that produces an `HttpRequest` and a `parse_*` method
//! that consumes an `HttpResponse`. A `Transport` executes the round-trip in
//! between, keeping this layer deterministic and free of I/O.

use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::error::ApiError;
use crate::http::{merge_query, HttpMethod, HttpRequest, HttpResponse};
use crate::types::{ApiResponse, JianYingExport};

/// Synchronous, stateless client for the studio API.
#[derive(Debug, Clone)]
pub struct StudioClient {
    base_url: Url,
    token: Option<String>,
}

impl StudioClient {
    /// Fails when `base_url` is not an absolute URL that can carry a path.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(base_url.trim_end_matches('/'))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(
                url::ParseError::RelativeUrlWithCannotBeABaseBase,
            ));
        }
        base_url.set_query(None);
        base_url.set_fragment(None);
        Ok(Self {
            base_url,
            token: None,
        })
    }

    /// Attach `authorization: Bearer <token>` to every built request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn build_get_chapters<I, K, V>(&self, project_id: &str, params: I) -> HttpRequest
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut req = self.request(HttpMethod::Get, self.endpoint(&["chapters", ""]));
        req.query.push(("project_id".to_string(), project_id.to_string()));
        merge_query(&mut req.query, params);
        req
    }

    pub fn build_get_paragraphs(&self, chapter_id: &str) -> HttpRequest {
        self.request(
            HttpMethod::Get,
            self.endpoint(&["paragraphs", "chapters", chapter_id, "paragraphs"]),
        )
    }

    pub fn build_batch_update_paragraphs<B: Serialize + ?Sized>(
        &self,
        chapter_id: &str,
        data: &B,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(data).map_err(ApiError::Serialization)?;
        let mut req = self.request(
            HttpMethod::Put,
            self.endpoint(&["paragraphs", "chapters", chapter_id, "paragraphs", "batch"]),
        );
        req.headers
            .push(("content-type".to_string(), "application/json".to_string()));
        req.body = Some(body);
        Ok(req)
    }

    pub fn build_export_to_jianying(&self, chapter_id: &str) -> HttpRequest {
        self.request(
            HttpMethod::Post,
            self.endpoint(&["export", "jianying", chapter_id]),
        )
    }

    pub fn build_download(&self, download_url: &str) -> Result<HttpRequest, ApiError> {
        Ok(self.request(HttpMethod::Get, self.resolve_url(download_url)?))
    }

    pub fn parse_get_chapters<T: DeserializeOwned>(
        &self,
        response: HttpResponse,
    ) -> Result<ApiResponse<T>, ApiError> {
        decode_envelope(response, 200)
    }

    pub fn parse_get_paragraphs<T: DeserializeOwned>(
        &self,
        response: HttpResponse,
    ) -> Result<ApiResponse<T>, ApiError> {
        decode_envelope(response, 200)
    }

    /// Returns only the payload; status and headers are dropped.
    pub fn parse_batch_update_paragraphs<T: DeserializeOwned>(
        &self,
        response: HttpResponse,
    ) -> Result<T, ApiError> {
        decode_envelope(response, 200).map(ApiResponse::into_data)
    }

    pub fn parse_export_to_jianying(
        &self,
        response: HttpResponse,
    ) -> Result<ApiResponse<JianYingExport>, ApiError> {
        decode_envelope(response, 200)
    }

    /// A successful download body has already been streamed to its sink by
    /// `Transport::execute_into`, so only the status is checked here.
    pub fn parse_download(&self, response: &HttpResponse) -> Result<(), ApiError> {
        check_status(response, 200)
    }

    /// Resolve a server-supplied URL against the base URL.
    ///
    /// Absolute URLs pass through, `/`-rooted paths take the base URL's
    /// origin, anything else is joined onto the base URL. Characters that
    /// are not allowed in a URL (spaces, non-ASCII) come back percent-encoded.
    pub fn resolve_url(&self, url: &str) -> Result<String, ApiError> {
        let mut base = self.base_url.clone();
        if let Ok(mut path) = base.path_segments_mut() {
            path.pop_if_empty().push("");
        }
        Ok(base.join(url)?.into())
    }

    /// Base URL with each of `segments` appended as one encoded path segment.
    fn endpoint(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.into()
    }

    fn request(&self, method: HttpMethod, url: String) -> HttpRequest {
        let mut req = HttpRequest::new(method, url);
        if let Some(token) = &self.token {
            req.headers
                .push(("authorization".to_string(), format!("Bearer {token}")));
        }
        req
    }
}

/// Map a status other than `expected` to the matching `ApiError` variant.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ApiError> {
    if response.status == expected {
        return Ok(());
    }
    Err(ApiError::from_response(response))
}

fn decode_envelope<T: DeserializeOwned>(
    response: HttpResponse,
    expected: u16,
) -> Result<ApiResponse<T>, ApiError> {
    check_status(&response, expected)?;
    let data = serde_json::from_slice(&response.body).map_err(ApiError::Deserialization)?;
    Ok(ApiResponse {
        status: response.status,
        headers: response.headers,
        data,
    })
}
