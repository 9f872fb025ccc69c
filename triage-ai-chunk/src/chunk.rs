//! Splitting documents into titled, fingerprinted chunks.

use regex::Regex;
use serde::Serialize;
use std::path::Path;
use std::sync::LazyLock;

/// Lines beginning with one or two `#` markers open a new section.
static SECTION_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^##?\s").expect("section pattern is valid"));

/// Extracts the heading text of a section's first line, if it has one.
static HEADING_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^##?\s+(.+)").expect("heading pattern is valid"));

/// Number of leading characters hashed into the chunk fingerprint.
const FINGERPRINT_PREFIX_CHARS: usize = 200;

/// Error type for chunking operations.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    /// The chunking configuration cannot produce advancing windows.
    #[error("invalid chunk configuration: {message}")]
    InvalidConfig { message: String },
}

/// Configuration for splitting documents into chunks.
///
/// `max_chars` bounds the length of every emitted chunk; `overlap` is how
/// many characters consecutive windows share when a section has to be
/// split. Both are counted in characters, not bytes.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Maximum chunk length in characters.
    pub max_chars: usize,
    /// Overlap between consecutive windows, in characters.
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chars: 1500,
            overlap: 200,
        }
    }
}

impl ChunkConfig {
    pub fn new(max_chars: usize, overlap: usize) -> Self {
        Self { max_chars, overlap }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    pub fn with_overlap(mut self, overlap: usize) -> Self {
        self.overlap = overlap;
        self
    }

    /// Rejects configurations whose sliding window would not advance.
    pub fn validate(&self) -> Result<(), ChunkError> {
        if self.max_chars == 0 {
            return Err(ChunkError::InvalidConfig {
                message: "max_chars must be greater than zero".to_string(),
            });
        }
        if self.overlap >= self.max_chars {
            return Err(ChunkError::InvalidConfig {
                message: format!(
                    "overlap ({}) must be strictly less than max_chars ({})",
                    self.overlap, self.max_chars
                ),
            });
        }
        Ok(())
    }
}

/// A single passage of a knowledge-base document.
///
/// Chunks are immutable once produced. The `id` is a deterministic function
/// of the source name and the chunk content, so identical input yields
/// identical ids across rebuilds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KbChunk {
    /// Stable citation id: `<file-stem>_<fingerprint>[_p<part>]`.
    pub id: String,
    /// Nearest preceding heading, or the source name if the section has none.
    pub title: String,
    /// The passage content.
    pub text: String,
    /// Name of the owning document.
    pub source: String,
}

/// Splits document text into overlapping chunks with stable ids.
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkConfig,
}

impl Chunker {
    /// Creates a chunker, failing fast on an invalid configuration.
    pub fn new(config: ChunkConfig) -> Result<Self, ChunkError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Splits `text` into chunks attributed to `source_name`.
    ///
    /// The document is first split on markdown heading boundaries. Sections
    /// at or under `max_chars` become a single chunk; longer sections are
    /// windowed with `overlap` characters of context between windows, and
    /// each windowed chunk's title is annotated with its 1-based part
    /// number. Whitespace-only sections are dropped.
    pub fn chunk(&self, text: &str, source_name: &str) -> Vec<KbChunk> {
        let stem = file_stem(source_name);
        let mut chunks = Vec::new();

        for section in split_sections(text) {
            let section = section.trim();
            if section.is_empty() {
                continue;
            }

            let title = HEADING_TITLE
                .captures(section)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_else(|| source_name.to_string());

            let char_count = section.chars().count();
            if char_count <= self.config.max_chars {
                chunks.push(KbChunk {
                    id: format!("{stem}_{}", fingerprint(section)),
                    title,
                    text: section.to_string(),
                    source: source_name.to_string(),
                });
                continue;
            }

            // Sliding window over characters, snapped to char boundaries.
            let offsets: Vec<usize> = section.char_indices().map(|(i, _)| i).collect();
            let byte_at = |char_pos: usize| {
                offsets
                    .get(char_pos)
                    .copied()
                    .unwrap_or_else(|| section.len())
            };
            let step = self.config.max_chars - self.config.overlap;
            let mut start = 0;
            let mut part = 0;
            while start < char_count {
                let end = (start + self.config.max_chars).min(char_count);
                let snippet = &section[byte_at(start)..byte_at(end)];
                chunks.push(KbChunk {
                    id: format!("{stem}_{}_p{part}", fingerprint(snippet)),
                    title: format!("{title} (part {})", part + 1),
                    text: snippet.to_string(),
                    source: source_name.to_string(),
                });
                start += step;
                part += 1;
            }
        }

        chunks
    }
}

/// Splits text into sections at lines opening with `#` or `##`.
fn split_sections(text: &str) -> Vec<&str> {
    let mut boundaries: Vec<usize> = SECTION_START.find_iter(text).map(|m| m.start()).collect();
    if boundaries.first() != Some(&0) {
        boundaries.insert(0, 0);
    }
    boundaries.push(text.len());
    boundaries
        .windows(2)
        .map(|pair| &text[pair[0]..pair[1]])
        .collect()
}

/// Hashes the chunk's leading characters into a short stable fingerprint.
fn fingerprint(text: &str) -> String {
    let prefix_end = text
        .char_indices()
        .nth(FINGERPRINT_PREFIX_CHARS)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let digest = blake3::hash(text[..prefix_end].as_bytes());
    hex::encode(digest.as_bytes())[..10].to_string()
}

fn file_stem(source_name: &str) -> String {
    Path::new(source_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(source_name)
        .to_string()
}
