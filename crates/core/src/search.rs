use crate::index::{tokenize, DocumentIndex, InvertedIndex};
use crate::models::SearchHit;
use std::collections::HashMap;

pub const DEFAULT_SEARCH_LIMIT: usize = 8;
/// Returned hit text is clipped to this many characters.
pub const HIT_TEXT_CHARS: usize = 1_200;

#[derive(Debug)]
struct ScoredChunk<'a> {
    document: &'a str,
    ordinal: usize,
    occurrences: usize,
    matched_terms: Vec<String>,
}

impl ScoredChunk<'_> {
    fn score(&self) -> usize {
        self.occurrences * 10 + self.matched_terms.len()
    }
}

/// Keyword search over the inverted index.
///
/// Every posting of a query term adds one occurrence to its chunk. The final
/// score is `occurrences * 10 + distinct matched terms`; equal scores keep the
/// order in which chunks were first reached.
pub fn search(
    documents: &DocumentIndex,
    inverted: &InvertedIndex,
    query: &str,
    limit: usize,
) -> Vec<SearchHit> {
    let terms = tokenize(query);
    if terms.is_empty() || inverted.is_empty() {
        return Vec::new();
    }

    let mut positions = HashMap::<(&str, usize), usize>::new();
    let mut candidates: Vec<ScoredChunk<'_>> = Vec::new();

    for term in &terms {
        for posting in inverted.postings(term) {
            let key = (posting.document.as_str(), posting.ordinal);
            let position = *positions.entry(key).or_insert_with(|| {
                candidates.push(ScoredChunk {
                    document: key.0,
                    ordinal: key.1,
                    occurrences: 0,
                    matched_terms: Vec::new(),
                });
                candidates.len() - 1
            });

            let candidate = &mut candidates[position];
            candidate.occurrences += 1;
            if !candidate.matched_terms.contains(term) {
                candidate.matched_terms.push(term.clone());
            }
        }
    }

    // stable: ties keep first-seen order
    candidates.sort_by(|left, right| right.score().cmp(&left.score()));

    candidates
        .into_iter()
        .take(limit)
        .filter_map(|candidate| {
            let text = documents.chunk(candidate.document, candidate.ordinal)?;
            Some(SearchHit {
                document: candidate.document.to_string(),
                chunk_ordinal: candidate.ordinal,
                text: text.chars().take(HIT_TEXT_CHARS).collect(),
                score: candidate.score(),
                matched_terms: candidate.matched_terms,
            })
        })
        .collect()
}
