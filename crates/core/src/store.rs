use crate::error::IngestError;
use crate::index::DocumentIndex;
use crate::models::ChunkFile;
use crate::normalize::char_len;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const CHUNK_FILE_SUFFIX: &str = "_chunks.json";

/// Directory of persisted [`ChunkFile`]s, one per source document.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    root: PathBuf,
}

impl ChunkStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_dir(&self) -> Result<(), IngestError> {
        ensure_dir(&self.root)
    }

    /// `guia_aves.pdf` is stored as `guia_aves_chunks.json`.
    pub fn chunk_file_path(&self, source_name: &str) -> PathBuf {
        let stem = Path::new(source_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(source_name);
        self.root.join(format!("{stem}{CHUNK_FILE_SUFFIX}"))
    }

    pub fn write(&self, file: &ChunkFile) -> Result<PathBuf, IngestError> {
        self.ensure_dir()?;
        let path = self.chunk_file_path(&file.metadata.original_name);
        let body = serde_json::to_string_pretty(file)?;
        fs::write(&path, body)?;
        debug!(path = %path.display(), chunks = file.chunks.len(), "chunk file written");
        Ok(path)
    }

    pub fn read(&self, path: &Path) -> Result<ChunkFile, IngestError> {
        let body = fs::read(path)?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub fn chunk_files(&self) -> Result<Vec<PathBuf>, IngestError> {
        let mut files = fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.ends_with(CHUNK_FILE_SUFFIX))
            })
            .collect::<Vec<_>>();
        files.sort_unstable();
        Ok(files)
    }

    /// Reads every chunk file into a fresh [`DocumentIndex`].
    ///
    /// A missing directory is created and yields an empty index. Files that
    /// fail to parse are skipped. Only chunks strictly longer than
    /// `min_chunk_chars` are kept, keyed by the recorded original filename.
    pub fn load_all(&self, min_chunk_chars: usize) -> Result<DocumentIndex, IngestError> {
        let mut documents = DocumentIndex::new();

        if !self.root.exists() {
            self.ensure_dir()?;
            return Ok(documents);
        }

        for path in self.chunk_files()? {
            let file = match self.read(&path) {
                Ok(file) => file,
                Err(error) => {
                    warn!(path = %path.display(), %error, "skipping unreadable chunk file");
                    continue;
                }
            };

            let chunks = file
                .chunks
                .into_iter()
                .filter(|chunk| char_len(chunk) > min_chunk_chars)
                .collect::<Vec<_>>();
            documents.insert(file.metadata.original_name, chunks);
        }

        Ok(documents)
    }
}

pub fn ensure_dir(path: &Path) -> Result<(), IngestError> {
    fs::create_dir_all(path).map_err(|source| IngestError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}
