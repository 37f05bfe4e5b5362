use crate::normalize::char_len;
use regex::Regex;
use std::sync::OnceLock;

/// Chunks below this many characters are dropped after chunking.
pub const MIN_CHUNK_CHARS: usize = 50;

fn paragraph_break() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\n\s*\n").expect("paragraph break pattern is valid"))
}

fn sentence_end() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[.!?]\s+").expect("sentence end pattern is valid"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    Accumulating,
    FlushAndRestart,
}

/// How a candidate is glued onto the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joiner {
    Paragraph,
    Sentence,
}

impl Joiner {
    fn as_str(self) -> &'static str {
        match self {
            Joiner::Paragraph => "\n\n",
            Joiner::Sentence => " ",
        }
    }
}

/// Outcome of feeding one candidate into the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub state: ChunkState,
    pub buffer: String,
    pub emitted: Option<String>,
}

/// Smallest buffer (30% of `max_size`, rounded up) that is worth emitting
/// when it has to make room.
pub fn min_flush_chars(max_size: usize) -> usize {
    (max_size * 3 + 9) / 10
}

/// Pure transition of the chunk buffer.
///
/// If `candidate` fits next to `buffer` the two are joined. Otherwise the
/// buffer is emitted when it reaches [`min_flush_chars`], discarded when it
/// does not, and `candidate` starts a fresh buffer.
pub fn next(buffer: &str, candidate: &str, joiner: Joiner, max_size: usize) -> Step {
    let joined_len = if buffer.is_empty() {
        char_len(candidate)
    } else {
        char_len(buffer) + char_len(joiner.as_str()) + char_len(candidate)
    };

    if joined_len <= max_size {
        let buffer = if buffer.is_empty() {
            candidate.to_string()
        } else {
            format!("{buffer}{}{candidate}", joiner.as_str())
        };
        return Step {
            state: ChunkState::Accumulating,
            buffer,
            emitted: None,
        };
    }

    let emitted = (!buffer.is_empty() && char_len(buffer) >= min_flush_chars(max_size))
        .then(|| buffer.trim().to_string());

    Step {
        state: ChunkState::FlushAndRestart,
        buffer: candidate.to_string(),
        emitted,
    }
}

/// Last `words` whitespace-separated words of `chunk`.
fn overlap_tail(chunk: &str, words: usize) -> String {
    let all = chunk.split_whitespace().collect::<Vec<_>>();
    all[all.len().saturating_sub(words)..].join(" ")
}

struct Chunker {
    max_size: usize,
    overlap_words: usize,
    buffer: String,
    chunks: Vec<String>,
}

impl Chunker {
    fn new(max_size: usize, overlap: usize) -> Self {
        Self {
            max_size,
            overlap_words: overlap / 10,
            buffer: String::new(),
            chunks: Vec::new(),
        }
    }

    fn push(&mut self, candidate: &str, joiner: Joiner) {
        let step = next(&self.buffer, candidate, joiner, self.max_size);

        self.buffer = match (step.state, step.emitted) {
            (ChunkState::FlushAndRestart, Some(emitted)) => {
                let seeded = if joiner == Joiner::Sentence && self.overlap_words > 0 {
                    let tail = overlap_tail(&emitted, self.overlap_words);
                    format!("{tail} {candidate}")
                } else {
                    step.buffer
                };
                self.chunks.push(emitted);
                seeded
            }
            _ => step.buffer,
        };
    }

    fn finish(mut self) -> Vec<String> {
        if !self.buffer.is_empty() && char_len(&self.buffer) >= min_flush_chars(self.max_size) {
            self.chunks.push(self.buffer.trim().to_string());
        }

        self.chunks
            .into_iter()
            .filter(|chunk| char_len(chunk) >= MIN_CHUNK_CHARS)
            .collect()
    }
}

pub fn split_paragraphs(text: &str) -> Vec<&str> {
    paragraph_break()
        .split(text)
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .collect()
}

/// Splits after `.`, `!` or `?` when whitespace follows; the punctuation stays
/// with its sentence.
pub fn split_sentences(paragraph: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for found in sentence_end().find_iter(paragraph) {
        // the punctuation is a single ASCII byte
        let end = found.start() + 1;
        sentences.push(&paragraph[start..end]);
        start = found.end();
    }
    sentences.push(&paragraph[start..]);

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .collect()
}

/// Splits normalized text into size-bounded chunks along paragraph and
/// sentence boundaries. Sizes are in characters.
///
/// Text that already fits in `max_size` comes back as a single chunk without
/// any minimum-length filtering. A single sentence longer than `max_size`
/// yields a chunk above the limit. `overlap` is approximated as
/// `overlap / 10` trailing words carried into the next sentence-built chunk.
pub fn chunk_text(text: &str, max_size: usize, overlap: usize) -> Vec<String> {
    if char_len(text) <= max_size {
        return vec![text.to_string()];
    }

    let mut chunker = Chunker::new(max_size, overlap);

    for paragraph in split_paragraphs(text) {
        if char_len(paragraph) <= max_size {
            chunker.push(paragraph, Joiner::Paragraph);
        } else {
            for sentence in split_sentences(paragraph) {
                chunker.push(sentence, Joiner::Sentence);
            }
        }
    }

    chunker.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(index: usize) -> String {
        format!("Parrafo {index} sobre aves del bosque andino. ")
            .repeat(10)
            .trim()
            .to_string()
    }

    fn sentence(index: usize) -> String {
        format!("La especie numero {index} habita en el bosque humedo de montaña.")
    }

    #[test]
    fn short_text_is_returned_whole() {
        assert_eq!(chunk_text("corto", 1000, 200), vec!["corto".to_string()]);
    }

    #[test]
    fn transition_accumulates_when_candidate_fits() {
        let step = next("abc", "def", Joiner::Paragraph, 100);
        assert_eq!(step.state, ChunkState::Accumulating);
        assert_eq!(step.buffer, "abc\n\ndef");
        assert_eq!(step.emitted, None);
    }

    #[test]
    fn transition_flushes_large_enough_buffer() {
        let buffer = "x".repeat(40);
        let step = next(&buffer, &"y".repeat(70), Joiner::Sentence, 100);
        assert_eq!(step.state, ChunkState::FlushAndRestart);
        assert_eq!(step.emitted.as_deref(), Some(buffer.as_str()));
        assert_eq!(step.buffer, "y".repeat(70));
    }

    #[test]
    fn transition_discards_short_buffer_on_overflow() {
        let step = next(&"x".repeat(20), &"y".repeat(95), Joiner::Sentence, 100);
        assert_eq!(step.state, ChunkState::FlushAndRestart);
        assert_eq!(step.emitted, None);
        assert_eq!(step.buffer, "y".repeat(95));
    }

    #[test]
    fn paragraphs_are_covered_without_gaps() {
        let paragraphs = (0..6).map(paragraph).collect::<Vec<_>>();
        let text = paragraphs.join("\n\n");
        assert!(char_len(&text) > 1000);

        let chunks = chunk_text(&text, 1000, 200);
        assert!(chunks.len() >= 2);

        for chunk in &chunks {
            assert!(char_len(chunk) <= 1000);
            assert!(char_len(chunk) >= MIN_CHUNK_CHARS);
        }
        for paragraph in &paragraphs {
            assert!(
                chunks.iter().any(|chunk| chunk.contains(paragraph.as_str())),
                "paragraph missing from chunks: {paragraph}"
            );
        }
    }

    #[test]
    fn long_paragraph_is_split_by_sentence_with_word_overlap() {
        let sentences = (0..62).map(sentence).collect::<Vec<_>>();
        let text = sentences.join(" ");

        let chunks = chunk_text(&text, 1000, 200);
        assert!(chunks.len() >= 3);

        for sentence in &sentences {
            assert!(
                chunks.iter().any(|chunk| chunk.contains(sentence.as_str())),
                "sentence missing from chunks: {sentence}"
            );
        }
        for pair in chunks.windows(2) {
            let tail = overlap_tail(&pair[0], 20);
            assert!(pair[1].starts_with(&tail), "chunk does not start with overlap");
        }
    }

    #[test]
    fn chunks_below_minimum_are_dropped() {
        let paragraphs = ["a".repeat(45), "b".repeat(45), "c".repeat(45)];
        let text = paragraphs.join("\n\n");

        let chunks = chunk_text(&text, 100, 0);
        assert_eq!(chunks, vec![format!("{}\n\n{}", paragraphs[0], paragraphs[1])]);
    }

    #[test]
    fn oversized_sentence_becomes_its_own_chunk() {
        let long = format!("{}.", "palabra ".repeat(40).trim());
        let text = format!("{long} {}", sentence(1).repeat(2));
        let chunks = chunk_text(&text, 200, 0);
        assert!(chunks.iter().any(|chunk| char_len(chunk) > 200));
    }

    #[test]
    fn sentences_keep_their_punctuation() {
        let parts = split_sentences("Uno. Dos! Tres? Cuatro");
        assert_eq!(parts, vec!["Uno.", "Dos!", "Tres?", "Cuatro"]);
    }
}
