//! `studio`: command-line host for the studio API client.
//!
//! Loads configuration, installs logging, and runs one service operation
//! per invocation through the blocking ureq transport. JSON results go to
//! stdout; logs and errors go to stderr.

mod logging;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use studio_core::{
    ApiError, ApiResponse, ChaptersService, ClientConfig, ConfigLoader, ExportService,
    ParagraphBatchUpdate, ParagraphsService, UreqTransport,
};
use tracing::{debug, warn};

#[derive(Parser, Debug)]
#[command(name = "studio", version, about = "Client for the content-studio API")]
struct Cli {
    /// TOML configuration file (defaults to ./studio.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API base URL, e.g. http://localhost:8000/api/v1
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Bearer token sent with every request
    #[arg(long, global = true)]
    token: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List a project's chapters
    Chapters {
        #[arg(long)]
        project: String,
        /// Extra query parameter, repeatable
        #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// Read or replace a chapter's paragraphs
    Paragraphs {
        #[command(subcommand)]
        action: ParagraphsCommand,
    },
    /// Export a chapter as a JianYing draft
    Export {
        #[arg(long)]
        chapter: String,
        /// Also download the produced archive
        #[arg(long)]
        download: bool,
        /// Download directory (overrides configuration)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Save a file from a download URL
    Download {
        #[arg(long)]
        url: String,
        #[arg(long)]
        filename: String,
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum ParagraphsCommand {
    /// List paragraphs in order
    List {
        #[arg(long)]
        chapter: String,
    },
    /// Replace paragraphs from a JSON file holding {"paragraphs": [...]}
    Update {
        #[arg(long)]
        chapter: String,
        #[arg(long)]
        file: PathBuf,
    },
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {raw:?}")),
    }
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_config_path(path);
    }
    let mut config = loader.load().context("failed to load configuration")?;
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(token) = &cli.token {
        config.token = Some(token.clone());
    }
    config.validate()?;
    Ok(config)
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    debug!(base_url = %config.base_url, "configuration loaded");
    let client = config.client().context("invalid base URL")?;
    let transport = UreqTransport::new(config.timeout());

    match cli.command {
        Command::Chapters { project, params } => {
            let service = ChaptersService::new(client, transport);
            let response: ApiResponse<Value> = service
                .get_chapters(&project, params)
                .with_context(|| format!("failed to list chapters of project {project}"))?;
            print_json(&response.data)
        }
        Command::Paragraphs { action } => {
            let service = ParagraphsService::new(client, transport);
            match action {
                ParagraphsCommand::List { chapter } => {
                    let response: ApiResponse<Value> = service
                        .get_paragraphs(&chapter)
                        .with_context(|| format!("failed to list paragraphs of chapter {chapter}"))?;
                    print_json(&response.data)
                }
                ParagraphsCommand::Update { chapter, file } => {
                    let raw = std::fs::read_to_string(&file)
                        .with_context(|| format!("failed to read {}", file.display()))?;
                    let batch: ParagraphBatchUpdate = serde_json::from_str(&raw)
                        .with_context(|| format!("{} is not a paragraph batch", file.display()))?;
                    let result: Value = service
                        .batch_update_paragraphs(&chapter, &batch)
                        .with_context(|| format!("failed to update paragraphs of chapter {chapter}"))?;
                    print_json(&result)
                }
            }
        }
        Command::Export {
            chapter,
            download,
            dir,
        } => {
            let service = ExportService::new(client, transport, dir.unwrap_or(config.download_dir));
            if download {
                let path = service
                    .export_and_download(&chapter)
                    .with_context(|| format!("failed to export and download chapter {chapter}"))?;
                println!("{}", path.display());
                return Ok(());
            }
            let response = service
                .export_to_jianying(&chapter)
                .with_context(|| format!("failed to export chapter {chapter}"))?;
            print_json(&serde_json::to_value(&response.data)?)
        }
        Command::Download { url, filename, dir } => {
            let service = ExportService::new(client, transport, dir.unwrap_or(config.download_dir));
            let path = service
                .download_file(&url, &filename)
                .with_context(|| format!("failed to download {url}"))?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let result = run(cli);
    if let Some(status) = result
        .as_ref()
        .err()
        .and_then(|err| err.downcast_ref::<ApiError>())
        .and_then(ApiError::status)
    {
        warn!(status, "server rejected the request");
    }
    result
}
