pub mod backends;
pub mod cache;
pub mod chunking;
pub mod config;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod index;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod search;
pub mod store;
pub mod traits;

pub use backends::OllamaGenerator;
pub use cache::{CacheKey, MemoryResponseCache, ResponseCache};
pub use chunking::chunk_text;
pub use config::{EngineConfig, GenerationConfig};
pub use engine::{IndexSnapshot, RetrievalEngine};
pub use error::{GenerationError, IngestError};
pub use extractor::{extract_document, ExtractedText, PdfTextStrategy};
pub use index::{tokenize, DocumentIndex, InvertedIndex, Posting};
pub use ingest::{
    discover_source_files, process_document, run_ingestion_pass, IngestionReport, SkippedDocument,
};
pub use models::{
    ChatMode, ChatReply, ChunkFile, ChunkFileMetadata, DocumentFormat, EngineStatus,
    IngestionOptions, ReprocessOutcome, SamplingOptions, SearchHit,
};
pub use normalize::normalize_text;
pub use orchestrator::AnswerOrchestrator;
pub use store::ChunkStore;
pub use traits::TextGenerator;
