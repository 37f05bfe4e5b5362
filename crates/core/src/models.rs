use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Text,
    Structured,
    Pdf,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension().and_then(|ext| ext.to_str())?;
        match extension.to_ascii_lowercase().as_str() {
            "txt" => Some(Self::Text),
            "json" => Some(Self::Structured),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

/// Header of a persisted chunk file. Field names on disk follow the
/// surrounding application's JSON contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkFileMetadata {
    #[serde(rename = "nombreOriginal")]
    pub original_name: String,
    #[serde(rename = "fechaProcesamiento")]
    pub processed_at: DateTime<Utc>,
    #[serde(rename = "totalChunks")]
    pub total_chunks: usize,
    #[serde(rename = "totalCaracteres")]
    pub total_characters: usize,
    #[serde(rename = "metodo")]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkFile {
    pub metadata: ChunkFileMetadata,
    pub chunks: Vec<String>,
}

impl ChunkFile {
    pub fn new(
        original_name: impl Into<String>,
        method: impl Into<String>,
        checksum: Option<String>,
        chunks: Vec<String>,
    ) -> Self {
        let total_characters = chunks.iter().map(|chunk| chunk.chars().count()).sum();
        Self {
            metadata: ChunkFileMetadata {
                original_name: original_name.into(),
                processed_at: Utc::now(),
                total_chunks: chunks.len(),
                total_characters,
                method: method.into(),
                checksum,
            },
            chunks,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub max_chunk_chars: usize,
    pub chunk_overlap_chars: usize,
    /// Extracted text shorter than this is not chunked at all.
    pub min_text_chars: usize,
    pub min_chunk_chars: usize,
    /// Chunks read back from disk must be strictly longer than this.
    pub min_loaded_chunk_chars: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            max_chunk_chars: 1_000,
            chunk_overlap_chars: 200,
            min_text_chars: 100,
            min_chunk_chars: crate::chunking::MIN_CHUNK_CHARS,
            min_loaded_chunk_chars: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub document: String,
    pub chunk_ordinal: usize,
    pub text: String,
    pub score: usize,
    pub matched_terms: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    Strict,
    Investigative,
}

impl ChatMode {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            Self::Strict
        } else {
            Self::Investigative
        }
    }

    pub fn is_strict(self) -> bool {
        self == Self::Strict
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Investigative => "investigative",
        }
    }
}

/// Sampling parameters forwarded to the generation backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SamplingOptions {
    pub temperature: f32,
    pub num_predict: u32,
    pub top_k: u32,
    pub top_p: f32,
}

impl SamplingOptions {
    pub fn for_mode(mode: ChatMode) -> Self {
        let temperature = match mode {
            ChatMode::Strict => 0.1,
            ChatMode::Investigative => 0.7,
        };
        Self {
            temperature,
            num_predict: 512,
            top_k: 40,
            top_p: 0.9,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatReply {
    pub reply: String,
    pub mode_used: ChatMode,
    pub chunks_found: usize,
    pub source_filenames: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineStatus {
    pub documents_loaded: usize,
    pub total_chunks: usize,
    pub is_processing: bool,
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReprocessOutcome {
    pub success: bool,
    pub message: String,
}
