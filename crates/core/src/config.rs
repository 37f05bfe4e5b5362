use crate::models::IngestionOptions;
use crate::search::DEFAULT_SEARCH_LIMIT;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Folder scanned for `.pdf`, `.txt` and `.json` sources.
    pub source_dir: PathBuf,
    /// Folder holding one `<basename>_chunks.json` per processed source.
    pub chunk_dir: PathBuf,
    pub ingestion: IngestionOptions,
    pub search_limit: usize,
    pub generation: GenerationConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("documents"),
            chunk_dir: PathBuf::from("documents").join("chunks"),
            ingestion: IngestionOptions::default(),
            search_limit: DEFAULT_SEARCH_LIMIT,
            generation: GenerationConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn new(source_dir: impl Into<PathBuf>, chunk_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            chunk_dir: chunk_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }
}
