use actix_web::web;
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use resumatch_api::{AppState, RestApi};
use resumatch_core::GeoTables;
use resumatch_engine::{Ingestor, Matcher, MatcherConfig, Settings};
use resumatch_services::{
    ChatStructurer, Embedder, FixedStructurer, HashEmbedder, HttpEmbedder, Structurer,
};
use resumatch_similarity::TopN;
use resumatch_storage::{MemoryStore, SnapshotStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Region-aware resume ranking
#[derive(Parser, Debug)]
#[command(name = "resumatch", version)]
#[command(about = "Rank resumes against job descriptions", long_about = None)]
struct Args {
    /// Path to a JSON settings file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the data directory (overrides the settings file)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log level, used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Use the hashing embedder and treat inputs as pre-structured JSON
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Ingest every .txt and .json resume in a directory
    Ingest { dir: PathBuf },
    /// Rank stored resumes against a job description
    Match {
        /// Job description text
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,
        /// File holding the job description
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long, default_value_t = 5)]
        top_n: usize,
        /// Return every eligible candidate
        #[arg(long)]
        all: bool,
    },
    /// Infer regions for stored resumes that have none
    Backfill,
}

struct Runtime {
    settings: Settings,
    tables: Arc<GeoTables>,
    store: Arc<MemoryStore>,
    snapshots: Arc<SnapshotStore>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting resumatch v{}", env!("CARGO_PKG_VERSION"));

    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::from_env()?,
    };
    if let Some(dir) = &args.data_dir {
        settings.data_dir = dir.clone();
    }
    info!("Data directory: {:?}", settings.data_dir);

    let tables = Arc::new(settings.geo_tables()?);
    let store = Arc::new(MemoryStore::new(settings.store_config()));
    let snapshots = Arc::new(SnapshotStore::new(settings.snapshot_dir())?);
    let restored = snapshots
        .load_into(&store)
        .context("loading candidate snapshot")?;
    info!("Candidate store ready: {} records", restored);

    let runtime = Runtime {
        settings,
        tables,
        store,
        snapshots,
    };

    if args.offline {
        info!("Offline mode: hashing embedder, JSON inputs");
        let embedder = HashEmbedder::new(runtime.settings.embedding.dimensions);
        run(args.command, runtime, Arc::new(embedder), Arc::new(FixedStructurer::new())).await
    } else {
        let embedder = HttpEmbedder::new(runtime.settings.embedding.clone())?;
        let structurer = ChatStructurer::new(runtime.settings.structuring.clone())?;
        run(args.command, runtime, Arc::new(embedder), Arc::new(structurer)).await
    }
}

async fn run<E, S>(
    command: Command,
    rt: Runtime,
    embedder: Arc<E>,
    structurer: Arc<S>,
) -> anyhow::Result<()>
where
    E: Embedder + 'static,
    S: Structurer + 'static,
{
    let matcher = Matcher::new(
        embedder.clone(),
        structurer.clone(),
        rt.store.clone(),
        rt.tables.clone(),
        rt.settings.matching.weights.clone(),
        MatcherConfig::from(&rt.settings),
    );
    let ingestor = Ingestor::new(
        embedder,
        structurer,
        rt.store.clone(),
        rt.tables.clone(),
        rt.settings.timeouts,
    );

    match command {
        Command::Serve { host, port } => {
            let host = host.unwrap_or_else(|| rt.settings.http_host.clone());
            let port = port.unwrap_or(rt.settings.http_port);

            let state = web::Data::new(AppState {
                matcher,
                ingestor,
                snapshots: Some(rt.snapshots.clone()),
                default_top_n: rt.settings.matching.default_top_n,
            });
            info!("HTTP API: http://{}:{}/", host, port);
            RestApi::start(state, &host, port).await?;

            info!("Shutting down...");
            rt.snapshots.save(&rt.store)?;
        }
        Command::Ingest { dir } => {
            let files = resume_files(&dir)?;
            info!("Ingesting {} files from {:?}", files.len(), dir);

            let summary = ingestor.ingest_files(&files).await;

            rt.snapshots.save(&rt.store)?;
            info!(
                inserted = summary.inserted,
                duplicates = summary.duplicates,
                failed = summary.failed,
                "ingest finished"
            );
        }
        Command::Match {
            text,
            file,
            top_n,
            all,
        } => {
            let query_text = match (text, file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                (None, None) => bail!("either --text or --file is required"),
            };
            if !all && top_n == 0 {
                bail!("--top-n must be at least 1");
            }
            let top_n = if all { TopN::All } else { TopN::Count(top_n) };

            let ranked = matcher.rank(&query_text, top_n).await?;
            if ranked.is_empty() {
                info!("No matching resumes found.");
            }
            println!("{}", serde_json::to_string_pretty(&ranked)?);
        }
        Command::Backfill => {
            let report = rt.store.backfill_regions(&rt.tables);
            rt.snapshots.save(&rt.store)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

/// `.txt` and `.json` files directly under `dir`, sorted by name
fn resume_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        let supported = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("txt") || e.eq_ignore_ascii_case("json"));
        if path.is_file() && supported {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
