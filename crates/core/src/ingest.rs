use crate::chunking::chunk_text;
use crate::error::IngestError;
use crate::extractor::extract_document;
use crate::models::{ChunkFile, DocumentFormat, IngestionOptions};
use crate::normalize::{char_len, normalize_text};
use crate::store::{ensure_dir, ChunkStore};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Supported source files directly inside `folder`, sorted by path.
/// Subdirectories (including a chunk directory nested in the source folder)
/// are not scanned.
pub fn discover_source_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|item| item.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| DocumentFormat::from_path(path).is_some())
        .collect::<Vec<_>>();

    files.sort_unstable();
    files
}

fn file_name(path: &Path) -> Result<String, IngestError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))
}

/// Extract, normalize, chunk and persist one source. Returns the number of
/// chunks written.
pub fn try_process_document(
    path: &Path,
    store: &ChunkStore,
    options: &IngestionOptions,
) -> Result<usize, IngestError> {
    let name = file_name(path)?;
    let extracted = extract_document(path)?;
    let normalized = normalize_text(&extracted.text);

    let chars = char_len(&normalized);
    if chars < options.min_text_chars {
        return Err(IngestError::TextTooShort {
            path: path.display().to_string(),
            chars,
        });
    }

    let mut chunks = chunk_text(
        &normalized,
        options.max_chunk_chars,
        options.chunk_overlap_chars,
    );
    if chunks.len() > 1 {
        chunks.retain(|chunk| char_len(chunk) >= options.min_chunk_chars);
    }
    let file = ChunkFile::new(name, extracted.method, Some(extracted.checksum), chunks);
    store.write(&file)?;

    info!(
        path = %path.display(),
        method = %file.metadata.method,
        chunks = file.metadata.total_chunks,
        characters = file.metadata.total_characters,
        "document processed"
    );
    Ok(file.metadata.total_chunks)
}

/// Like [`try_process_document`] but never fails: problems are logged and
/// count as zero chunks.
pub fn process_document(path: &Path, store: &ChunkStore, options: &IngestionOptions) -> usize {
    match try_process_document(path, store, options) {
        Ok(count) => count,
        Err(error) => {
            warn!(path = %path.display(), %error, "document skipped");
            0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDocument {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestionReport {
    pub documents_seen: usize,
    pub documents_with_chunks: usize,
    pub total_chunks: usize,
    pub skipped: Vec<SkippedDocument>,
}

impl IngestionReport {
    pub fn produced_chunks(&self) -> bool {
        self.documents_with_chunks > 0
    }
}

/// Processes every supported file in `source_dir`, one at a time. Only
/// failing to create the source or chunk directory is an error; per-file
/// failures end up in [`IngestionReport::skipped`].
pub fn run_ingestion_pass(
    source_dir: &Path,
    store: &ChunkStore,
    options: &IngestionOptions,
) -> Result<IngestionReport, IngestError> {
    ensure_dir(source_dir)?;
    store.ensure_dir()?;

    let files = discover_source_files(source_dir);
    let mut report = IngestionReport {
        documents_seen: files.len(),
        ..IngestionReport::default()
    };

    for path in files {
        match try_process_document(&path, store, options) {
            Ok(0) => {}
            Ok(count) => {
                report.documents_with_chunks += 1;
                report.total_chunks += count;
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "document skipped");
                report.skipped.push(SkippedDocument {
                    path,
                    reason: error.to_string(),
                });
            }
        }
    }

    info!(
        source_dir = %source_dir.display(),
        documents = report.documents_seen,
        with_chunks = report.documents_with_chunks,
        chunks = report.total_chunks,
        skipped = report.skipped.len(),
        "ingestion pass finished"
    );
    Ok(report)
}
