//! In-memory document and term indexes.
//!
//! Both are rebuilt wholesale from the chunk store; nothing here is patched
//! incrementally.

use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

fn index_term() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\w{3,}").expect("index term pattern is valid"))
}

/// Lowercased word tokens of at least three characters, deduplicated and
/// kept in first-occurrence order.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut seen = HashSet::new();
    index_term()
        .find_iter(&lowered)
        .map(|found| found.as_str())
        .filter(|term| seen.insert(*term))
        .map(str::to_string)
        .collect()
}

/// Borrowed view of one stored chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub document: &'a str,
    pub ordinal: usize,
    pub text: &'a str,
}

/// Document name to its ordered chunk texts. Ordered by name so every walk
/// over it is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentIndex {
    documents: BTreeMap<String, Vec<String>>,
}

impl DocumentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces whatever was stored under `document`.
    pub fn insert(&mut self, document: impl Into<String>, chunks: Vec<String>) {
        self.documents.insert(document.into(), chunks);
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn total_chunks(&self) -> usize {
        self.documents.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn chunk(&self, document: &str, ordinal: usize) -> Option<&str> {
        self.documents
            .get(document)
            .and_then(|chunks| chunks.get(ordinal))
            .map(String::as_str)
    }

    pub fn document_names(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    pub fn chunks(&self) -> impl Iterator<Item = Chunk<'_>> {
        self.documents.iter().flat_map(|(document, chunks)| {
            chunks.iter().enumerate().map(move |(ordinal, text)| Chunk {
                document,
                ordinal,
                text,
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Posting {
    pub document: String,
    pub ordinal: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvertedIndex {
    postings: HashMap<String, Vec<Posting>>,
}

impl InvertedIndex {
    pub fn build(documents: &DocumentIndex) -> Self {
        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();

        for chunk in documents.chunks() {
            for term in tokenize(chunk.text) {
                postings.entry(term).or_default().push(Posting {
                    document: chunk.document.to_string(),
                    ordinal: chunk.ordinal,
                });
            }
        }

        Self { postings }
    }

    pub fn postings(&self, term: &str) -> &[Posting] {
        self.postings.get(term).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.postings.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn sample_documents() -> DocumentIndex {
        let mut documents = DocumentIndex::new();
        documents.insert(
            "colibries.txt",
            vec![
                "El colibrí esmeralda vive en bosques húmedos.".to_string(),
                "Colibrí y colibrí otra vez, con néctar.".to_string(),
            ],
        );
        documents.insert(
            "garzas.pdf",
            vec!["La garza real pesca en humedales de Caldas.".to_string()],
        );
        documents
    }

    #[test]
    fn tokenize_lowercases_dedupes_and_drops_short_words() {
        let tokens = tokenize("El Colibrí y el COLIBRÍ de la montaña, 12 años");
        assert_eq!(tokens, vec!["colibrí", "montaña", "años"]);
    }

    #[test]
    fn postings_are_deduplicated_within_a_chunk() {
        let index = InvertedIndex::build(&sample_documents());
        let postings = index.postings("colibrí");
        assert_eq!(
            postings,
            &[
                Posting {
                    document: "colibries.txt".to_string(),
                    ordinal: 0
                },
                Posting {
                    document: "colibries.txt".to_string(),
                    ordinal: 1
                },
            ]
        );
        assert!(index.postings("el").is_empty());
        assert!(index.postings("inexistente").is_empty());
    }

    #[test]
    fn rebuilding_yields_identical_postings() {
        let documents = sample_documents();
        let first = InvertedIndex::build(&documents);
        let second = InvertedIndex::build(&documents);

        assert_eq!(first.term_count(), second.term_count());
        for term in first.terms() {
            let left = first.postings(term).iter().cloned().collect::<BTreeSet<_>>();
            let right = second.postings(term).iter().cloned().collect::<BTreeSet<_>>();
            assert_eq!(left, right, "postings differ for {term}");
        }
    }

    #[test]
    fn document_index_counts_and_lookups() {
        let documents = sample_documents();
        assert_eq!(documents.document_count(), 2);
        assert_eq!(documents.total_chunks(), 3);
        assert_eq!(
            documents.chunk("garzas.pdf", 0),
            Some("La garza real pesca en humedales de Caldas.")
        );
        assert_eq!(documents.chunk("garzas.pdf", 1), None);
        assert_eq!(documents.chunks().count(), 3);
    }
}
