use crate::error::IngestError;
use crate::models::DocumentFormat;
use crate::normalize::{char_len, normalize_text, strip_disallowed};
use lopdf::Document;
use regex::Regex;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

/// A strategy must produce at least this much normalized text to be accepted.
pub const MIN_USABLE_PDF_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub method: String,
    /// Hex SHA-256 of the source bytes the text came from.
    pub checksum: String,
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// One step of the PDF fallback chain.
pub trait PdfTextStrategy {
    fn name(&self) -> &'static str;
    fn try_extract(&self, bytes: &[u8]) -> Option<String>;
}

/// Structured extraction through lopdf's per-page text API.
#[derive(Default)]
pub struct LopdfStrategy;

impl PdfTextStrategy for LopdfStrategy {
    fn name(&self) -> &'static str {
        "pdf-lopdf"
    }

    fn try_extract(&self, bytes: &[u8]) -> Option<String> {
        let document = match Document::load_mem(bytes) {
            Ok(document) => document,
            Err(error) => {
                debug!(%error, "lopdf could not load document");
                return None;
            }
        };

        let pages = document
            .get_pages()
            .into_keys()
            .filter_map(|page_no| document.extract_text(&[page_no]).ok())
            .filter(|text| !text.trim().is_empty())
            .collect::<Vec<_>>();

        if pages.is_empty() {
            None
        } else {
            Some(pages.join("\n\n"))
        }
    }
}

/// Keeps readable-looking lines from the raw file bytes.
#[derive(Default)]
pub struct RawLineStrategy;

fn pdf_syntax_token() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b(?:stream|endstream|obj|endobj|xref|trailer)\b")
            .expect("pdf syntax pattern is valid")
    })
}

fn latin_letter() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[A-Za-zÀ-ÖØ-öø-ÿ]").expect("latin letter pattern is valid")
    })
}

fn string_object() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\(([^()]*)\)|<([^<>]*)>").expect("pdf string object pattern is valid")
    })
}

fn looks_like_prose(line: &str) -> bool {
    char_len(line) > 10
        && !line.starts_with('%')
        && !pdf_syntax_token().is_match(line)
        && latin_letter().is_match(line)
        && line.split_whitespace().count() > 2
}

impl PdfTextStrategy for RawLineStrategy {
    fn name(&self) -> &'static str {
        "pdf-raw-lines"
    }

    fn try_extract(&self, bytes: &[u8]) -> Option<String> {
        let decoded = String::from_utf8_lossy(bytes);
        let lines = decoded
            .lines()
            .map(str::trim)
            .filter(|line| looks_like_prose(line))
            .map(|line| strip_disallowed(line).trim().to_string())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>();

        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}

/// Collects the bodies of `(...)` string and `<...>` hex objects.
#[derive(Default)]
pub struct StringObjectStrategy;

impl PdfTextStrategy for StringObjectStrategy {
    fn name(&self) -> &'static str {
        "pdf-string-objects"
    }

    fn try_extract(&self, bytes: &[u8]) -> Option<String> {
        let decoded = String::from_utf8_lossy(bytes);
        let pieces = string_object()
            .captures_iter(&decoded)
            .filter_map(|capture| capture.get(1).or_else(|| capture.get(2)))
            .map(|body| body.as_str())
            .filter(|body| char_len(body) > 10 && latin_letter().is_match(body))
            .collect::<Vec<_>>();

        if pieces.is_empty() {
            None
        } else {
            Some(pieces.join(" "))
        }
    }
}

pub fn default_pdf_strategies() -> Vec<Box<dyn PdfTextStrategy + Send + Sync>> {
    vec![
        Box::new(LopdfStrategy),
        Box::new(RawLineStrategy),
        Box::new(StringObjectStrategy),
    ]
}

/// Runs `strategies` in order and keeps the first output that is still at
/// least [`MIN_USABLE_PDF_CHARS`] long after normalization.
pub fn extract_pdf_text(
    bytes: &[u8],
    strategies: &[Box<dyn PdfTextStrategy + Send + Sync>],
) -> Option<ExtractedText> {
    strategies.iter().find_map(|strategy| {
        let text = strategy.try_extract(bytes)?;
        let usable = char_len(&normalize_text(&text));
        if usable >= MIN_USABLE_PDF_CHARS {
            Some(ExtractedText {
                text,
                method: strategy.name().to_string(),
                checksum: digest_bytes(bytes),
            })
        } else {
            debug!(strategy = strategy.name(), usable, "pdf strategy output too short");
            None
        }
    })
}

pub fn extract_json_text(bytes: &[u8]) -> Result<String, IngestError> {
    let value: Value = serde_json::from_slice(bytes)?;
    let text = match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        other => serde_json::to_string_pretty(&other)?,
    };
    Ok(text)
}

pub fn extract_document(path: &Path) -> Result<ExtractedText, IngestError> {
    let format = DocumentFormat::from_path(path)
        .ok_or_else(|| IngestError::UnsupportedFormat(path.display().to_string()))?;
    let bytes = std::fs::read(path)?;

    match format {
        DocumentFormat::Text => Ok(ExtractedText {
            text: String::from_utf8_lossy(&bytes).into_owned(),
            method: "plain-text".to_string(),
            checksum: digest_bytes(&bytes),
        }),
        DocumentFormat::Structured => Ok(ExtractedText {
            text: extract_json_text(&bytes)?,
            method: "json".to_string(),
            checksum: digest_bytes(&bytes),
        }),
        DocumentFormat::Pdf => extract_pdf_text(&bytes, &default_pdf_strategies())
            .ok_or_else(|| IngestError::EmptyExtraction(path.display().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const PROSE: &str = "El colibri esmeralda visita flores de bosque humedo en Caldas";

    fn fake_pdf_with_prose_lines() -> Vec<u8> {
        let mut raw = String::from("%PDF-1.4\n1 0 obj << /Length 44 >>\nstream\n");
        for _ in 0..4 {
            raw.push_str(PROSE);
            raw.push('\n');
        }
        raw.push_str("endstream\nendobj\nxref\ntrailer\n%%EOF\n");
        raw.into_bytes()
    }

    struct Fixed {
        name: &'static str,
        output: Option<String>,
    }

    impl Fixed {
        fn boxed(name: &'static str, output: Option<&str>) -> Box<dyn PdfTextStrategy + Send + Sync> {
            Box::new(Self {
                name,
                output: output.map(str::to_string),
            })
        }
    }

    impl PdfTextStrategy for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        fn try_extract(&self, _bytes: &[u8]) -> Option<String> {
            self.output.clone()
        }
    }

    #[test]
    fn raw_lines_keep_only_prose() {
        let text = RawLineStrategy
            .try_extract(&fake_pdf_with_prose_lines())
            .expect("prose lines should survive");

        assert_eq!(text.lines().count(), 4);
        assert!(text.lines().all(|line| line == PROSE));
    }

    #[test]
    fn raw_lines_reject_syntax_and_short_lines() {
        let raw = b"%PDF-1.7 header line here\n3 0 obj << /Type /Page >>\nab cd ef\n12 34 56 78 90 11\n";
        assert_eq!(RawLineStrategy.try_extract(raw), None);
    }

    #[test]
    fn string_objects_are_collected() {
        let raw = b"BT (Tangara multicolor endemica) Tj (short) Tj <Hex body with letters> ET";
        let text = StringObjectStrategy
            .try_extract(raw)
            .expect("string objects should be found");
        assert_eq!(text, "Tangara multicolor endemica Hex body with letters");
    }

    #[test]
    fn chain_skips_strategies_with_too_little_text() {
        let sentence = "Barranquero coronado observado en la reserva natural del rio Blanco durante la manana temprana.";
        assert!(char_len(sentence) < MIN_USABLE_PDF_CHARS);

        let strategies = vec![
            Fixed::boxed("first", None),
            Fixed::boxed("second", Some("demasiado corto")),
            Fixed::boxed("third", Some(sentence)),
        ];
        assert_eq!(extract_pdf_text(b"", &strategies), None);

        let doubled = format!("{sentence} {sentence}");
        let strategies = vec![
            Fixed::boxed("first", None),
            Fixed::boxed("second", Some("demasiado corto")),
            Fixed::boxed("third", Some(&doubled)),
        ];
        let extracted = extract_pdf_text(b"", &strategies).expect("third strategy should win");
        assert_eq!(extracted.method, "third");
        assert_eq!(extracted.text, doubled);
        assert_eq!(extracted.checksum, digest_bytes(b""));
    }

    #[test]
    fn broken_pdf_falls_back_to_raw_lines() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("guia.pdf");
        fs::write(&path, fake_pdf_with_prose_lines())?;

        let extracted = extract_document(&path)?;
        assert_eq!(extracted.method, "pdf-raw-lines");
        assert!(extracted.text.contains("colibri esmeralda"));
        Ok(())
    }

    #[test]
    fn checksum_comes_from_the_bytes_read_for_extraction() -> Result<(), Box<dyn std::error::Error>>
    {
        let dir = tempdir()?;
        let path = dir.path().join("notas.txt");
        fs::write(&path, b"abc")?;

        let first = extract_document(&path)?;
        let second = extract_document(&path)?;
        assert_eq!(first.checksum, second.checksum);
        assert_eq!(
            first.checksum,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );

        fs::write(&path, b"abd")?;
        assert_ne!(extract_document(&path)?.checksum, first.checksum);
        Ok(())
    }

    #[test]
    fn unreadable_pdf_is_an_empty_extraction() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("vacio.pdf");
        fs::write(&path, b"%PDF-1.4\n%broken")?;

        let result = extract_document(&path);
        assert!(matches!(result, Err(IngestError::EmptyExtraction(_))));
        Ok(())
    }

    #[test]
    fn json_arrays_are_joined_by_newline() -> Result<(), Box<dyn std::error::Error>> {
        let text = extract_json_text(br#"["Garza real", "Pava caucana", 3]"#)?;
        assert_eq!(text, "Garza real\nPava caucana\n3");

        let text = extract_json_text(br#"{"especie": "Tucan"}"#)?;
        assert_eq!(text, "{\n  \"especie\": \"Tucan\"\n}");
        Ok(())
    }

    #[test]
    fn malformed_json_is_a_parse_failure() {
        let result = extract_json_text(b"{ not json");
        assert!(matches!(result, Err(IngestError::Json(_))));
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let result = extract_document(Path::new("notas.docx"));
        assert!(matches!(result, Err(IngestError::UnsupportedFormat(_))));
    }
}
