//! End-to-end tests against the live mock backend.
//!
//! # Design
//! Starts the mock server on a random port, then drives every service over
//! real HTTP through `UreqTransport`. Validates that request building,
//! transport and response parsing agree with the actual server.

use std::net::SocketAddr;

use mock_server::{Chapter, Store, MATERIALS_PREPARED};
use serde_json::Value;
use studio_core::{
    ApiError, ApiResponse, ChaptersService, ExportService, Paragraph, ParagraphBatchUpdate,
    ParagraphsService, StudioClient, UreqTransport,
};

/// Serve `store` on a random local port from a background thread.
fn start_server(store: Store) -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, store).await
        })
        .unwrap();
    });

    addr
}

fn seeded() -> Store {
    Store::new()
        .with_token("secret")
        .with_chapter(
            Chapter::new("c1", "p1", "Opening")
                .numbered(1)
                .with_status(MATERIALS_PREPARED),
        )
        .with_chapter(Chapter::new("c2", "p1", "Middle").numbered(2))
        .with_paragraphs("c1", &["one", "two"])
}

#[test]
fn content_studio_workflow() {
    let addr = start_server(seeded());
    let client = StudioClient::new(&format!("http://{addr}/api/v1"))
        .unwrap()
        .with_token("secret");
    let transport = UreqTransport::default();
    let downloads = tempfile::tempdir().unwrap();

    let chapters = ChaptersService::new(client.clone(), &transport);
    let paragraphs = ParagraphsService::new(client.clone(), &transport);
    let export = ExportService::new(client.clone(), &transport, downloads.path());

    // Step 1: list chapters with extra query params.
    let page: ApiResponse<Value> = chapters.get_chapters("p1", [("size", "1")]).unwrap();
    assert_eq!(page.status, 200);
    assert_eq!(page.data["total"], 2);
    assert_eq!(page.data["items"].as_array().unwrap().len(), 1);
    assert_eq!(page.data["items"][0]["id"], "c1");

    // Step 2: caller-supplied project_id wins over the positional one.
    let page: ApiResponse<Value> = chapters
        .get_chapters("p1", [("project_id", "unknown")])
        .unwrap();
    assert_eq!(page.data["total"], 0);

    // Step 3: list paragraphs as typed records.
    let listed: ApiResponse<Vec<Paragraph>> = paragraphs.get_paragraphs("c1").unwrap();
    let contents: Vec<_> = listed.data.iter().map(|p| p.content.as_str()).collect();
    assert_eq!(contents, vec!["one", "two"]);

    // Step 4: send the listed records back with one edited and one added.
    let mut batch = ParagraphBatchUpdate {
        paragraphs: listed.data.clone(),
    };
    batch.paragraphs[1].content = "two, revised".to_string();
    batch.paragraphs[1].action = Some("edit".to_string());
    batch.paragraphs.push(Paragraph::new("three", 3));
    let result: Value = paragraphs.batch_update_paragraphs("c1", &batch).unwrap();
    assert_eq!(result, serde_json::json!({"updated": 3}));

    let listed: ApiResponse<Vec<Paragraph>> = paragraphs.get_paragraphs("c1").unwrap();
    assert_eq!(listed.data.len(), 3);
    assert_eq!(listed.data[1].content, "two, revised");
    assert_eq!(listed.data[0].id, batch.paragraphs[0].id);

    // Step 5: export and download.
    let exported = export.export_to_jianying("c1").unwrap();
    assert!(exported.data.success);
    let path = export
        .download_file(&exported.data.download_url, &exported.data.filename)
        .unwrap();
    assert_eq!(path, downloads.path().join(&exported.data.filename));
    assert!(std::fs::read(&path).unwrap().starts_with(b"PK"));

    // Step 6: the one-shot helper does the same.
    let path = export.export_and_download("c1").unwrap();
    assert!(path.is_file());
    assert_eq!(std::fs::read_dir(downloads.path()).unwrap().count(), 2);
}

#[test]
fn server_errors_are_classified() {
    let addr = start_server(seeded());
    let base = format!("http://{addr}/api/v1");
    let transport = UreqTransport::default();

    // Missing token.
    let anonymous = ParagraphsService::new(StudioClient::new(&base).unwrap(), &transport);
    let err = anonymous.get_paragraphs::<Value>("c1").unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized { .. }));

    let client = StudioClient::new(&base).unwrap().with_token("secret");

    // Unknown chapter.
    let paragraphs = ParagraphsService::new(client.clone(), &transport);
    let err = paragraphs.get_paragraphs::<Value>("missing").unwrap_err();
    assert!(matches!(err, ApiError::NotFound { ref detail } if detail == "Chapter not found"));

    // Query validation.
    let chapters = ChaptersService::new(client.clone(), &transport);
    let err = chapters
        .get_chapters::<Value, _, _, _>("p1", [("size", "0")])
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation { .. }));

    // Chapter not ready for export.
    let downloads = tempfile::tempdir().unwrap();
    let export = ExportService::new(client, &transport, downloads.path());
    let err = export.export_and_download("c2").unwrap_err();
    assert!(matches!(err, ApiError::HttpError { status: 400, .. }));

    // Expired download leaves nothing behind.
    let err = export
        .download_file("/api/v1/export/jianying/download/expired.zip", "expired.zip")
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound { .. }));
    assert_eq!(std::fs::read_dir(downloads.path()).unwrap().count(), 0);
}

#[test]
fn unreachable_server_is_a_transport_error() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let service = ParagraphsService::new(
        StudioClient::new(&format!("http://{addr}/api/v1")).unwrap(),
        UreqTransport::default(),
    );
    let err = service.get_paragraphs::<Value>("c1").unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}

#[test]
fn titles_and_ids_with_reserved_characters() {
    let store = Store::new()
        .with_chapter(
            Chapter::new("ch 1", "p1", "The Journey")
                .numbered(1)
                .with_status(MATERIALS_PREPARED),
        )
        .with_chapter(Chapter::new("a?b", "p1", "Other").numbered(2))
        .with_paragraphs("ch 1", &["first"])
        .with_paragraphs("a?b", &["second"]);
    let addr = start_server(store);
    let client = StudioClient::new(&format!("http://{addr}/api/v1")).unwrap();
    let transport = UreqTransport::default();
    let downloads = tempfile::tempdir().unwrap();

    let paragraphs = ParagraphsService::new(client.clone(), &transport);
    let listed: ApiResponse<Vec<Paragraph>> = paragraphs.get_paragraphs("ch 1").unwrap();
    assert_eq!(listed.data[0].content, "first");
    let listed: ApiResponse<Vec<Paragraph>> = paragraphs.get_paragraphs("a?b").unwrap();
    assert_eq!(listed.data[0].content, "second");

    let export = ExportService::new(client, &transport, downloads.path());
    let path = export.export_and_download("ch 1").unwrap();
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("The Journey_"), "{name}");
    assert!(std::fs::read(&path).unwrap().starts_with(b"PK"));
}
