//! The owned retrieval engine handed to the surrounding application.
//!
//! Index state is published as an immutable [`IndexSnapshot`]. A reload builds
//! the next snapshot off to the side and swaps it in, so a reader always sees
//! one complete generation of documents, terms and cached answers. Reloads are
//! serialized; only a reload that follows an ingestion pass starts a fresh
//! answer cache.

use crate::cache::{MemoryResponseCache, ResponseCache};
use crate::config::EngineConfig;
use crate::error::IngestError;
use crate::index::{DocumentIndex, InvertedIndex};
use crate::ingest::{discover_source_files, process_document, run_ingestion_pass, IngestionReport};
use crate::models::{ChatMode, ChatReply, EngineStatus, ReprocessOutcome, SearchHit};
use crate::orchestrator::{AnswerOrchestrator, EMPTY_QUESTION_MESSAGE};
use crate::search::search;
use crate::store::ChunkStore;
use crate::traits::TextGenerator;
use chrono::Local;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

pub const BUSY_MESSAGE: &str = "Ya hay un procesamiento de documentos en curso.";
const LAST_UPDATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct IndexSnapshot<C> {
    documents: DocumentIndex,
    inverted: InvertedIndex,
    cache: Arc<C>,
    last_updated: Option<String>,
}

impl<C> IndexSnapshot<C>
where
    C: ResponseCache + Default,
{
    fn build(documents: DocumentIndex, cache: Arc<C>, last_updated: Option<String>) -> Self {
        let inverted = InvertedIndex::build(&documents);
        Self {
            documents,
            inverted,
            cache,
            last_updated,
        }
    }

    pub fn documents(&self) -> &DocumentIndex {
        &self.documents
    }

    pub fn inverted(&self) -> &InvertedIndex {
        &self.inverted
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn last_updated(&self) -> Option<&str> {
        self.last_updated.as_deref()
    }
}

enum ReloadKind {
    /// Chunk files re-read as they are; answers cached so far stay valid.
    Refresh,
    /// Chunk files rewritten by an ingestion pass finished at `finished_at`.
    Ingested { finished_at: String },
}

/// Held for the duration of one ingestion pass.
struct ProcessingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ProcessingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

async fn run_blocking<T, F>(task: F) -> Result<T, IngestError>
where
    F: FnOnce() -> Result<T, IngestError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|error| IngestError::Task(error.to_string()))?
}

fn build_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| format!("[{}]\n{}", hit.document, hit.text))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

fn source_filenames(hits: &[SearchHit]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for hit in hits {
        if !names.contains(&hit.document) {
            names.push(hit.document.clone());
        }
    }
    names
}

pub struct RetrievalEngine<G, C = MemoryResponseCache> {
    config: EngineConfig,
    store: ChunkStore,
    orchestrator: AnswerOrchestrator<G>,
    snapshot: RwLock<Arc<IndexSnapshot<C>>>,
    reload_lock: Mutex<()>,
    processing: AtomicBool,
}

impl<G> RetrievalEngine<G, MemoryResponseCache>
where
    G: TextGenerator,
{
    pub fn new(config: EngineConfig, generator: G) -> Self {
        Self::with_cache(config, generator)
    }
}

impl<G, C> RetrievalEngine<G, C>
where
    G: TextGenerator,
    C: ResponseCache + Default + 'static,
{
    /// Same as [`RetrievalEngine::new`] with a caller-chosen cache type.
    /// Nothing is read from disk until [`Self::initialize`] or
    /// [`Self::load_document_index`] runs.
    pub fn with_cache(config: EngineConfig, generator: G) -> Self {
        let store = ChunkStore::open(config.chunk_dir.clone());
        Self {
            config,
            store,
            orchestrator: AnswerOrchestrator::new(generator),
            snapshot: RwLock::new(Arc::new(IndexSnapshot::build(
                DocumentIndex::new(),
                Arc::new(C::default()),
                None,
            ))),
            reload_lock: Mutex::new(()),
            processing: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn generator(&self) -> &G {
        self.orchestrator.generator()
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    /// The snapshot currently served to readers.
    pub async fn snapshot(&self) -> Arc<IndexSnapshot<C>> {
        self.snapshot.read().await.clone()
    }

    /// Loads persisted chunks. When there are none but source documents are
    /// present, runs a full ingestion pass; existing chunks are never
    /// reprocessed here.
    pub async fn initialize(&self) -> Result<usize, IngestError> {
        let loaded = self.load_document_index().await?;
        if loaded > 0 {
            return Ok(loaded);
        }

        let source_dir = self.config.source_dir.clone();
        let sources = run_blocking(move || Ok(discover_source_files(&source_dir))).await?;
        if sources.is_empty() {
            info!(source_dir = %self.config.source_dir.display(), "no chunks and no source documents");
            return Ok(0);
        }

        info!(sources = sources.len(), "no stored chunks, running initial ingestion");
        self.process_all_documents().await?;
        Ok(self.snapshot().await.documents().total_chunks())
    }

    /// Rebuilds the document and inverted indexes from the chunk directory
    /// and publishes them. The answer cache and `last_updated` carry over.
    pub async fn load_document_index(&self) -> Result<usize, IngestError> {
        self.reload(ReloadKind::Refresh).await
    }

    async fn reload(&self, kind: ReloadKind) -> Result<usize, IngestError> {
        // held until the swap so an older read never replaces a newer one
        let _serialized = self.reload_lock.lock().await;
        let current = self.snapshot().await;

        let store = self.store.clone();
        let min_chunk_chars = self.config.ingestion.min_loaded_chunk_chars;
        let documents = run_blocking(move || store.load_all(min_chunk_chars)).await?;

        let (cache, last_updated, fresh_cache) = match kind {
            ReloadKind::Refresh => (
                Arc::clone(&current.cache),
                current.last_updated.clone(),
                false,
            ),
            ReloadKind::Ingested { finished_at } => {
                (Arc::new(C::default()), Some(finished_at), true)
            }
        };

        let next = Arc::new(IndexSnapshot::build(documents, cache, last_updated));
        let total_chunks = next.documents.total_chunks();
        info!(
            documents = next.documents.document_count(),
            chunks = total_chunks,
            terms = next.inverted.term_count(),
            fresh_cache,
            "document index loaded"
        );

        *self.snapshot.write().await = next;
        if fresh_cache {
            current.cache.clear();
        }

        Ok(total_chunks)
    }

    /// Processes a single source file into the chunk store. The served index
    /// is not reloaded.
    pub async fn process_document(&self, path: &Path) -> usize {
        let path = path.to_path_buf();
        let store = self.store.clone();
        let options = self.config.ingestion.clone();

        match run_blocking(move || Ok(process_document(&path, &store, &options))).await {
            Ok(count) => count,
            Err(error) => {
                warn!(%error, "document processing task failed");
                0
            }
        }
    }

    /// `Ok(None)` when another pass already holds the processing flag.
    async fn run_ingestion(&self) -> Result<Option<IngestionReport>, IngestError> {
        let Some(_guard) = ProcessingGuard::acquire(&self.processing) else {
            warn!("ingestion requested while another pass is running");
            return Ok(None);
        };

        let source_dir = self.config.source_dir.clone();
        let store = self.store.clone();
        let options = self.config.ingestion.clone();
        let report =
            run_blocking(move || run_ingestion_pass(&source_dir, &store, &options)).await?;

        let finished_at = Local::now().format(LAST_UPDATED_FORMAT).to_string();
        self.reload(ReloadKind::Ingested { finished_at }).await?;

        Ok(Some(report))
    }

    /// `Ok(false)` when busy or when no document produced chunks. Only
    /// directory creation and task failures are errors.
    pub async fn process_all_documents(&self) -> Result<bool, IngestError> {
        let report = self.run_ingestion().await?;
        Ok(report.is_some_and(|report| report.produced_chunks()))
    }

    pub async fn reprocess_all(&self) -> ReprocessOutcome {
        match self.run_ingestion().await {
            Ok(None) => ReprocessOutcome {
                success: false,
                message: BUSY_MESSAGE.to_string(),
            },
            Ok(Some(report)) if report.produced_chunks() => {
                let mut message = format!(
                    "Se procesaron {} documentos y se generaron {} fragmentos.",
                    report.documents_with_chunks, report.total_chunks
                );
                if !report.skipped.is_empty() {
                    message.push_str(&format!(" Omitidos: {}.", report.skipped.len()));
                }
                ReprocessOutcome {
                    success: true,
                    message,
                }
            }
            Ok(Some(report)) => ReprocessOutcome {
                success: false,
                message: format!(
                    "No se generaron fragmentos a partir de {} documentos encontrados.",
                    report.documents_seen
                ),
            },
            Err(error) => ReprocessOutcome {
                success: false,
                message: format!("Error al procesar los documentos: {error}"),
            },
        }
    }

    pub async fn status(&self) -> EngineStatus {
        let snapshot = self.snapshot().await;
        EngineStatus {
            documents_loaded: snapshot.documents.document_count(),
            total_chunks: snapshot.documents.total_chunks(),
            is_processing: self.is_processing(),
            last_updated: snapshot.last_updated.clone(),
        }
    }

    pub async fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let snapshot = self.snapshot().await;
        search(&snapshot.documents, &snapshot.inverted, query, limit)
    }

    pub async fn chat(&self, question: &str, strict: bool) -> ChatReply {
        let mode = ChatMode::from_strict(strict);
        if question.trim().is_empty() {
            return ChatReply {
                reply: EMPTY_QUESTION_MESSAGE.to_string(),
                mode_used: mode,
                chunks_found: 0,
                source_filenames: Vec::new(),
            };
        }

        let snapshot = self.snapshot().await;
        let hits = search(
            &snapshot.documents,
            &snapshot.inverted,
            question,
            self.config.search_limit,
        );
        let context = build_context(&hits);
        let reply = self
            .orchestrator
            .answer(question, &context, mode, snapshot.cache())
            .await;

        info!(mode = mode.as_str(), hits = hits.len(), "question answered");
        ChatReply {
            reply,
            mode_used: mode,
            chunks_found: hits.len(),
            source_filenames: source_filenames(&hits),
        }
    }
}
