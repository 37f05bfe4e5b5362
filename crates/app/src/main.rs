use aviary_rag_core::{EngineConfig, GenerationConfig, OllamaGenerator, RetrievalEngine};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "aviary-rag", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Folder with the source PDF, text and JSON documents
    #[arg(long, env = "AVIARY_SOURCE_DIR", default_value = "documents")]
    source_dir: PathBuf,

    /// Folder for chunk files; defaults to `<source-dir>/chunks`
    #[arg(long, env = "AVIARY_CHUNK_DIR")]
    chunk_dir: Option<PathBuf>,

    /// Ollama base URL
    #[arg(long, env = "OLLAMA_URL", default_value = "http://localhost:11434")]
    ollama_url: String,

    /// Ollama model name
    #[arg(long, env = "OLLAMA_MODEL", default_value = "llama3.2")]
    ollama_model: String,

    /// Generation request timeout in seconds
    #[arg(long, env = "OLLAMA_TIMEOUT_SECS", default_value = "60")]
    ollama_timeout_secs: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Print loaded documents, chunk count and last update.
    Status {
        /// Also ping the generation backend.
        #[arg(long, default_value_t = false)]
        check_backend: bool,
    },
    /// Re-ingest every source document and reload the index.
    Reprocess,
    /// Keyword search over the loaded chunks.
    Search {
        #[arg(long)]
        query: String,
        /// Maximum number of hits.
        #[arg(long, default_value = "8")]
        limit: usize,
    },
    /// Ask a question answered from the loaded documents.
    Chat {
        #[arg(long)]
        question: String,
        /// Answer only from document context.
        #[arg(long, default_value_t = false)]
        strict: bool,
        /// Maximum number of chunks used as context.
        #[arg(long, default_value = "8")]
        limit: usize,
    },
}

impl Command {
    /// `reprocess` runs its own pass, so startup only loads what is stored.
    fn auto_ingests(&self) -> bool {
        !matches!(self, Command::Reprocess)
    }
}

impl Cli {
    fn engine_config(&self) -> EngineConfig {
        let chunk_dir = self
            .chunk_dir
            .clone()
            .unwrap_or_else(|| self.source_dir.join("chunks"));

        let config =
            EngineConfig::new(self.source_dir.clone(), chunk_dir).with_generation(GenerationConfig {
                base_url: self.ollama_url.clone(),
                model: self.ollama_model.clone(),
                timeout_secs: self.ollama_timeout_secs,
            });

        match self.command {
            Command::Chat { limit, .. } => config.with_search_limit(limit),
            _ => config,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = cli.engine_config();

    let generator = OllamaGenerator::from_config(&config.generation)?;
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        source_dir = %config.source_dir.display(),
        model = generator.model(),
        "aviary-rag boot"
    );

    let engine = RetrievalEngine::new(config, generator);
    if cli.command.auto_ingests() {
        engine.initialize().await?;
    } else {
        engine.load_document_index().await?;
    }

    match cli.command {
        Command::Status { check_backend } => {
            let status = engine.status().await;
            println!("documents_loaded: {}", status.documents_loaded);
            println!("total_chunks: {}", status.total_chunks);
            println!("is_processing: {}", status.is_processing);
            println!(
                "last_updated: {}",
                status.last_updated.as_deref().unwrap_or("never")
            );

            if check_backend {
                match engine.generator().health_check().await {
                    Ok(()) => println!("backend: ok ({})", engine.generator().model()),
                    Err(error) => {
                        warn!(%error, "backend health check failed");
                        println!("backend: unavailable ({error})");
                    }
                }
            }
        }
        Command::Reprocess => {
            let outcome = engine.reprocess_all().await;
            println!("success: {}", outcome.success);
            println!("{}", outcome.message);
        }
        Command::Search { query, limit } => {
            let hits = engine.search(&query, limit).await;
            if hits.is_empty() {
                println!("no matches for {query:?}");
            }
            for hit in hits {
                println!(
                    "[{}#{}] score={} terms={}",
                    hit.document,
                    hit.chunk_ordinal,
                    hit.score,
                    hit.matched_terms.join(",")
                );
                println!("{}\n", hit.text);
            }
        }
        Command::Chat {
            question, strict, ..
        } => {
            let reply = engine.chat(&question, strict).await;
            println!("{}", reply.reply);
            println!();
            println!(
                "mode={} chunks_found={}",
                reply.mode_used.as_str(),
                reply.chunks_found
            );
            if !reply.source_filenames.is_empty() {
                println!("sources: {}", reply.source_filenames.join(", "));
            }
        }
    }

    Ok(())
}
