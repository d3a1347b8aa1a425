use mock_server::{Chapter, Store, MATERIALS_PREPARED};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "8000".to_string());
    let addr = format!("127.0.0.1:{port}");

    let mut store = Store::new()
        .with_chapter(Chapter::new("demo-chapter-1", "demo-project", "The Beginning").numbered(1))
        .with_chapter(
            Chapter::new("demo-chapter-2", "demo-project", "The Journey")
                .numbered(2)
                .with_status(MATERIALS_PREPARED),
        )
        .with_paragraphs("demo-chapter-1", &["It was a quiet morning.", "Nobody expected the storm."]);
    if let Ok(token) = std::env::var("MOCK_TOKEN") {
        store = store.with_token(&token);
    }

    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "mock studio backend listening");
    mock_server::run(listener, store).await
}
