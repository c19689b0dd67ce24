//! CLI binary for docuscan.
//!
//! A thin shim over the library crate: maps flags onto `ServiceConfig` and
//! the store backends, then runs the server or a one-off conversion.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use docuscan::display::{format_file_size, history_line};
use docuscan::server::{self, AppState};
use docuscan::{
    docx_filename, export_docx, ConversionHandler, ConversionInvoker, ConversionStatus,
    ConversionView, InMemoryRecordStore, LocalObjectStore, ObjectStore, OcrBackend,
    Orchestrator, RecordStore, RemoteInvoker, RestConnection, RestObjectStore, RestRecordStore,
    ServiceConfig, UploadFile,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP service (local files + in-memory records)
  docuscan serve --bind 0.0.0.0:8080

  # Run against a hosted database and storage bucket
  docuscan --backend-url https://project.example --backend-key $KEY serve

  # Convert one PDF to Word
  docuscan convert scan.pdf -o scan.docx

  # Print the extracted text as well
  docuscan convert scan.pdf --text

  # Recent conversions and re-export of a stored result
  docuscan --backend-url https://project.example history
  docuscan --backend-url https://project.example export <id> -o out.docx

ENVIRONMENT VARIABLES:
  DOCUSCAN_AI_API_KEY       Bearer token for the AI gateway
  DOCUSCAN_AI_GATEWAY_URL   Gateway base URL (default https://ai.gateway.lovable.dev)
  DOCUSCAN_MODEL            OCR model (default google/gemini-2.5-flash)
  DOCUSCAN_PROVIDER         Use an edgequake-llm provider instead of the gateway
  DOCUSCAN_BACKEND_URL      Hosted REST backend for records and uploads
  DOCUSCAN_BACKEND_KEY      Service key for the REST backend
  DOCUSCAN_STORAGE_DIR      Local upload directory when no backend is set

  A .env file in the working directory is loaded first.
"#;

/// Scan PDFs to editable Word documents with AI OCR.
#[derive(Parser, Debug)]
#[command(
    name = "docuscan",
    version,
    about = "Scan PDFs to editable Word documents with AI OCR",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    service: ServiceArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOCUSCAN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DOCUSCAN_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the conversion endpoint, uploads and records over HTTP.
    Serve(ServeArgs),
    /// Upload, OCR and export one PDF.
    Convert(ConvertArgs),
    /// List recent conversions.
    History(HistoryArgs),
    /// Write the Word document for a stored conversion.
    Export(ExportArgs),
}

#[derive(Args, Debug)]
struct ServiceArgs {
    /// AI gateway API key.
    #[arg(long, global = true, env = "DOCUSCAN_AI_API_KEY", hide_env_values = true)]
    ai_api_key: Option<String>,

    /// AI gateway base URL.
    #[arg(long, global = true, env = "DOCUSCAN_AI_GATEWAY_URL")]
    ai_gateway_url: Option<String>,

    /// OCR model ID.
    #[arg(long, global = true, env = "DOCUSCAN_MODEL")]
    model: Option<String>,

    /// edgequake-llm provider name (openai, anthropic, gemini, ollama, ...).
    #[arg(long, global = true, env = "DOCUSCAN_PROVIDER")]
    provider: Option<String>,

    /// Max output tokens for the OCR completion.
    #[arg(long, global = true, env = "DOCUSCAN_MAX_TOKENS")]
    max_tokens: Option<usize>,

    /// Number of conversions in the history listing.
    #[arg(long, global = true, env = "DOCUSCAN_HISTORY_LIMIT")]
    history_limit: Option<usize>,

    /// PDF download timeout in seconds.
    #[arg(long, global = true, env = "DOCUSCAN_DOWNLOAD_TIMEOUT")]
    download_timeout: Option<u64>,

    /// OCR call timeout in seconds.
    #[arg(long, global = true, env = "DOCUSCAN_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// Hosted REST backend (PostgREST records + storage bucket).
    #[arg(long, global = true, env = "DOCUSCAN_BACKEND_URL")]
    backend_url: Option<String>,

    /// Service key for the REST backend.
    #[arg(long, global = true, env = "DOCUSCAN_BACKEND_KEY", hide_env_values = true)]
    backend_key: Option<String>,

    /// Record table name.
    #[arg(long, global = true, env = "DOCUSCAN_RECORDS_TABLE", default_value = "conversions")]
    records_table: String,

    /// Storage bucket for uploads.
    #[arg(long, global = true, env = "DOCUSCAN_STORAGE_BUCKET", default_value = "pdf-uploads")]
    storage_bucket: String,

    /// Upload directory used when no REST backend is configured.
    #[arg(long, global = true, env = "DOCUSCAN_STORAGE_DIR", default_value = "./data/objects")]
    storage_dir: PathBuf,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "DOCUSCAN_BIND", default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Externally reachable base URL for locally stored uploads.
    #[arg(long, env = "DOCUSCAN_PUBLIC_URL")]
    public_url: Option<String>,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// PDF file to convert.
    input: PathBuf,

    /// Write the Word document here (default: next to the input).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Call a deployed conversion endpoint instead of running OCR in-process.
    #[arg(long, env = "DOCUSCAN_ENDPOINT")]
    endpoint: Option<String>,

    /// Also print the extracted text to stdout.
    #[arg(long)]
    text: bool,
}

#[derive(Args, Debug)]
struct HistoryArgs {
    /// Number of records to show.
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Conversion ID.
    id: String,

    /// Output path (default: derived from the original filename).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The convert spinner already reports progress; keep INFO logs out of it.
    let show_spinner = !cli.quiet && matches!(cli.command, Command::Convert(_));
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if show_spinner {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Command::Serve(args) => run_serve(&cli, args).await,
        Command::Convert(args) => run_convert(&cli, args, show_spinner).await,
        Command::History(args) => run_history(&cli, args).await,
        Command::Export(args) => run_export(&cli, args).await,
    }
}

async fn run_serve(cli: &Cli, args: &ServeArgs) -> Result<()> {
    let config = build_config(&cli.service)?;
    let public_url = args
        .public_url
        .clone()
        .unwrap_or_else(|| format!("http://{}", args.bind));
    let (records, objects) = build_stores(&cli.service, &public_url)?;

    let handler = ConversionHandler::new(&config, records.clone())
        .context("Failed to initialise the OCR backend")?;
    let state = AppState::new(Arc::new(handler), records, objects, config.history_limit);

    server::serve(state, args.bind).await.context("Server failed")
}

async fn run_convert(cli: &Cli, args: &ConvertArgs, show_spinner: bool) -> Result<()> {
    let bytes = tokio::fs::read(&args.input)
        .await
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let name = args
        .input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document.pdf")
        .to_string();
    let size = bytes.len() as u64;

    let history_limit = cli.service.history_limit.unwrap_or(20);
    let (orchestrator, server_task) = match &args.endpoint {
        Some(endpoint) => {
            if cli.service.backend_url.is_none() {
                bail!("--endpoint needs --backend-url so the remote handler can fetch the upload");
            }
            let (records, objects) = build_stores(&cli.service, "")?;
            let invoker = Arc::new(RemoteInvoker::new(
                endpoint.clone(),
                cli.service.backend_key.clone(),
            ));
            (Orchestrator::new(objects, records, invoker, history_limit), None)
        }
        None => {
            let config = build_config(&cli.service)?;
            // Local uploads are fetched by the handler over HTTP, so serve
            // them from an ephemeral loopback listener.
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .context("Failed to bind loopback listener")?;
            let addr = listener.local_addr()?;
            let (records, objects) = build_stores(&cli.service, &format!("http://{addr}"))?;

            let handler = Arc::new(
                ConversionHandler::new(&config, records.clone())
                    .context("Failed to initialise the OCR backend")?,
            );
            let state = AppState::new(
                handler.clone(),
                records.clone(),
                objects.clone(),
                config.history_limit,
            );
            let task = tokio::spawn(async move {
                axum::serve(listener, server::create_router(state)).await
            });
            let invoker: Arc<dyn ConversionInvoker> = handler;
            (
                Orchestrator::new(objects, records, invoker, config.history_limit),
                Some(task),
            )
        }
    };

    let spinner = show_spinner.then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Converting");
        bar.set_message(format!("{name} ({})", format_file_size(size)));
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let start = Instant::now();
    let mut view = ConversionView::new();
    orchestrator
        .submit(UploadFile::new(name.clone(), bytes), &mut view)
        .await;

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    if let Some(task) = server_task {
        task.abort();
    }

    if view.status != Some(ConversionStatus::Completed) {
        let message = view
            .error_message
            .unwrap_or_else(|| "unknown error".to_string());
        if !cli.quiet {
            eprintln!("{} {}", red("✘"), red(&message));
        }
        bail!("Conversion failed: {message}");
    }

    let export = view
        .download()
        .context("Failed to build the Word document")?
        .context("Conversion produced no text")?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| sibling_path(&args.input, &export.filename));
    tokio::fs::write(&output, &export.bytes)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    if args.text {
        if let Some(text) = &view.extracted_text {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(text.as_bytes())
                .context("Failed to write to stdout")?;
            if !text.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
        }
    }

    if !cli.quiet {
        let chars = view.extracted_text.as_deref().map_or(0, |t| t.chars().count());
        eprintln!(
            "{}  {}  {}  →  {}",
            green("✔"),
            name,
            dim(&format!("{chars} chars, {:.1}s", start.elapsed().as_secs_f64())),
            bold(&output.display().to_string()),
        );
    }

    Ok(())
}

async fn run_history(cli: &Cli, args: &HistoryArgs) -> Result<()> {
    let records = rest_records(&cli.service, "history")?;
    let limit = args
        .limit
        .or(cli.service.history_limit)
        .unwrap_or(20);
    let history = records
        .list_recent(limit)
        .await
        .context("Failed to fetch conversions")?;

    if history.is_empty() {
        if !cli.quiet {
            eprintln!("No conversions yet.");
        }
        return Ok(());
    }
    for record in &history {
        println!("{}  {}", dim(&record.id), history_line(record));
    }
    Ok(())
}

async fn run_export(cli: &Cli, args: &ExportArgs) -> Result<()> {
    let records = rest_records(&cli.service, "export")?;
    let record = records
        .get(&args.id)
        .await
        .context("Failed to fetch conversion")?
        .with_context(|| format!("Conversion '{}' not found", args.id))?;

    let text = match (&record.status, &record.extracted_text) {
        (ConversionStatus::Completed, Some(text)) => text,
        _ => bail!(
            "Conversion '{}' has no extracted text (status: {})",
            record.id,
            record.status
        ),
    };

    let export = export_docx(text, &record.original_filename)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(docx_filename(&record.original_filename)));
    tokio::fs::write(&output, &export.bytes)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    if !cli.quiet {
        eprintln!(
            "{}  {}  →  {}",
            green("✔"),
            record.original_filename,
            bold(&output.display().to_string()),
        );
    }
    Ok(())
}

/// Map CLI args to `ServiceConfig`.
fn build_config(args: &ServiceArgs) -> Result<ServiceConfig> {
    let mut builder = ServiceConfig::builder();
    if let Some(ref url) = args.ai_gateway_url {
        builder = builder.ai_gateway_url(url);
    }
    if let Some(ref key) = args.ai_api_key {
        builder = builder.ai_api_key(key);
    }
    if let Some(ref model) = args.model {
        builder = builder.model(model);
    }
    if let Some(ref name) = args.provider {
        builder = builder.ocr_backend(OcrBackend::Provider { name: name.clone() });
    }
    if let Some(n) = args.max_tokens {
        builder = builder.max_tokens(n);
    }
    if let Some(n) = args.history_limit {
        builder = builder.history_limit(n);
    }
    if let Some(secs) = args.download_timeout {
        builder = builder.download_timeout_secs(secs);
    }
    if let Some(secs) = args.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    builder.build().context("Invalid configuration")
}

fn rest_connection(args: &ServiceArgs) -> Result<Option<RestConnection>> {
    match (&args.backend_url, &args.backend_key) {
        (Some(url), Some(key)) => Ok(Some(
            RestConnection::new(url, key).context("Invalid REST backend settings")?,
        )),
        (Some(_), None) => bail!("--backend-url needs --backend-key"),
        _ => Ok(None),
    }
}

/// REST stores when a backend is configured, local ones otherwise.
fn build_stores(
    args: &ServiceArgs,
    public_base_url: &str,
) -> Result<(Arc<dyn RecordStore>, Arc<dyn ObjectStore>)> {
    match rest_connection(args)? {
        Some(conn) => Ok((
            Arc::new(RestRecordStore::new(conn.clone(), &args.records_table)),
            Arc::new(RestObjectStore::new(conn, &args.storage_bucket)),
        )),
        None => Ok((
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(LocalObjectStore::new(args.storage_dir.clone(), public_base_url)),
        )),
    }
}

fn rest_records(args: &ServiceArgs, command: &str) -> Result<RestRecordStore> {
    match rest_connection(args)? {
        Some(conn) => Ok(RestRecordStore::new(conn, &args.records_table)),
        None => bail!("`{command}` reads stored records and needs --backend-url"),
    }
}

fn sibling_path(input: &Path, filename: &str) -> PathBuf {
    input
        .parent()
        .map(|dir| dir.join(filename))
        .unwrap_or_else(|| PathBuf::from(filename))
}
