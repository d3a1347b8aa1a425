//! Synchronous API client core for the content-studio backend.
//!
//! # Overview
//! Covers the chapter, paragraph and JianYing-export endpoints. Requests are
//! built and responses parsed without touching the network (host-does-IO
//! pattern); a `Transport` performs the round-trip in between.
//!
//! # Design
//! - `StudioClient` is stateless: it holds only `base_url` and an optional
//!   bearer token. Each operation is split into `build_*` and `parse_*`.
//! - `ChaptersService`, `ParagraphsService` and `ExportService` take their
//!   transport by injection, so tests substitute a recording fake.
//! - Errors are explicit `Result<_, ApiError>` values and are never
//!   recovered from inside this crate.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod download;
pub mod error;
pub mod http;
pub mod services;
pub mod transport;
pub mod types;

pub use client::StudioClient;
pub use config::{ClientConfig, ConfigError, ConfigLoader};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use services::{ChaptersService, ExportService, ParagraphsService};
pub use transport::{Transport, UreqTransport};
pub use types::{ApiResponse, Chapter, JianYingExport, Paragraph, ParagraphBatchUpdate};
