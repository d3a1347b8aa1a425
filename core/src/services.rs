//! Resource services: one per backend resource family.
//!
//! Each service owns a `StudioClient` and an injected `Transport` and runs
//! `build_* -> execute -> parse_*` for its operations. Errors are forwarded
//! as returned; nothing here retries or recovers.

use std::io::Write;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::client::StudioClient;
use crate::download;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;
use crate::types::{ApiResponse, JianYingExport};

fn send<T: Transport>(transport: &T, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
    debug!(method = %request.method, url = %request.url, "sending request");
    let response = transport.execute(request)?;
    log_failure(request, &response);
    Ok(response)
}

fn send_into<T: Transport>(
    transport: &T,
    request: &HttpRequest,
    sink: &mut dyn Write,
) -> Result<HttpResponse, ApiError> {
    debug!(method = %request.method, url = %request.url, "sending request");
    let response = transport.execute_into(request, sink)?;
    log_failure(request, &response);
    Ok(response)
}

fn log_failure(request: &HttpRequest, response: &HttpResponse) {
    if !response.is_success() {
        warn!(method = %request.method, url = %request.url, status = response.status, "request failed");
    }
}

#[derive(Debug, Clone)]
pub struct ChaptersService<T> {
    client: StudioClient,
    transport: T,
}

impl<T: Transport> ChaptersService<T> {
    pub fn new(client: StudioClient, transport: T) -> Self {
        Self { client, transport }
    }

    /// List a project's chapters. Caller `params` are spread over
    /// `project_id`, so a `project_id` key in `params` wins.
    pub fn get_chapters<R, I, K, V>(&self, project_id: &str, params: I) -> Result<ApiResponse<R>, ApiError>
    where
        R: DeserializeOwned,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let request = self.client.build_get_chapters(project_id, params);
        let response = send(&self.transport, &request)?;
        self.client.parse_get_chapters(response)
    }
}

#[derive(Debug, Clone)]
pub struct ParagraphsService<T> {
    client: StudioClient,
    transport: T,
}

impl<T: Transport> ParagraphsService<T> {
    pub fn new(client: StudioClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn get_paragraphs<R: DeserializeOwned>(&self, chapter_id: &str) -> Result<ApiResponse<R>, ApiError> {
        let request = self.client.build_get_paragraphs(chapter_id);
        let response = send(&self.transport, &request)?;
        self.client.parse_get_paragraphs(response)
    }

    /// Replace a chapter's paragraphs in one request. Returns the response
    /// payload only.
    pub fn batch_update_paragraphs<B, R>(&self, chapter_id: &str, data: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request = self.client.build_batch_update_paragraphs(chapter_id, data)?;
        let response = send(&self.transport, &request)?;
        self.client.parse_batch_update_paragraphs(response)
    }
}

#[derive(Debug, Clone)]
pub struct ExportService<T> {
    client: StudioClient,
    transport: T,
    download_dir: PathBuf,
}

impl<T: Transport> ExportService<T> {
    pub fn new(client: StudioClient, transport: T, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            transport,
            download_dir: download_dir.into(),
        }
    }

    pub fn export_to_jianying(&self, chapter_id: &str) -> Result<ApiResponse<JianYingExport>, ApiError> {
        let request = self.client.build_export_to_jianying(chapter_id);
        let response = send(&self.transport, &request)?;
        self.client.parse_export_to_jianying(response)
    }

    /// Fetch `download_url` and save it as `filename` in the download
    /// directory. The body is streamed to disk. Returns the saved path.
    pub fn download_file(&self, download_url: &str, filename: &str) -> Result<PathBuf, ApiError> {
        let file_name = download::target_file_name(filename, download_url)?;
        let request = self.client.build_download(download_url)?;
        download::save(&self.download_dir, &file_name, |sink| {
            let response = send_into(&self.transport, &request, sink)?;
            self.client.parse_download(&response)
        })
    }

    /// Export a chapter and save the resulting archive.
    pub fn export_and_download(&self, chapter_id: &str) -> Result<PathBuf, ApiError> {
        let export = self.export_to_jianying(chapter_id)?.into_data();
        if !export.success {
            return Err(ApiError::ExportFailed {
                message: export.message,
            });
        }
        self.download_file(&export.download_url, &export.filename)
    }
}
