//! Document search tool
//!
//! Documents are split into paragraph-sized passages and ranked against
//! the question by term overlap weighted with inverse document
//! frequency. The whole index lives in memory; it is built once at
//! startup and only read afterwards.

use super::{parse_query_input, query_input_schema, InvocationError, Tool, ToolContext};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::LazyLock;

const DEFAULT_TOP_K: usize = 3;

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-z0-9]+").expect("token pattern is valid")
});

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "do", "does", "for", "from", "get", "how",
    "in", "is", "it", "its", "list", "of", "on", "or", "the", "to", "was", "what", "when",
    "where", "which", "who", "why", "with", "all", "about", "people", "there", "this", "that",
];

/// Lowercased content terms of `text`, stop words removed
fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TOKEN_RE
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|t| t.len() > 1 && !STOP_WORDS.contains(t))
        .map(String::from)
        .collect()
}

/// A source document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub text: String,
}

impl Document {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug)]
struct Passage {
    title: String,
    text: String,
    term_counts: HashMap<String, usize>,
}

/// A ranked passage
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub title: String,
    pub text: String,
    pub score: f64,
}

/// In-memory passage index
#[derive(Debug, Default)]
pub struct DocumentIndex {
    passages: Vec<Passage>,
    /// Number of passages containing each term
    doc_freq: HashMap<String, usize>,
}

impl DocumentIndex {
    pub fn from_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        let mut index = Self::default();
        for doc in documents {
            for paragraph in doc.text.split("\n\n") {
                let text = paragraph.trim();
                if text.is_empty() {
                    continue;
                }
                let mut term_counts = HashMap::new();
                for term in tokenize(text) {
                    *term_counts.entry(term).or_insert(0) += 1;
                }
                // The title counts as a passage term so "Miami" finds Miami's notes
                for term in tokenize(&doc.title) {
                    *term_counts.entry(term).or_insert(0) += 1;
                }
                for term in term_counts.keys() {
                    *index.doc_freq.entry(term.clone()).or_insert(0) += 1;
                }
                index.passages.push(Passage {
                    title: doc.title.clone(),
                    text: text.to_string(),
                    term_counts,
                });
            }
        }
        index
    }

    /// Load every `.md` and `.txt` file in `dir`, titled by file stem
    pub fn load_dir(dir: &Path) -> std::io::Result<Self> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_text = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("md") || e.eq_ignore_ascii_case("txt"));
            if path.is_file() && is_text {
                paths.push(path);
            }
        }
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let title = path
                .file_stem()
                .map(|s| s.to_string_lossy().replace(['_', '-'], " "))
                .unwrap_or_default();
            documents.push(Document::new(title, std::fs::read_to_string(&path)?));
        }
        tracing::info!(dir = %dir.display(), documents = documents.len(), "Loaded documents");
        Ok(Self::from_documents(documents))
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Best `k` passages for `query`, highest score first
    #[allow(clippy::cast_precision_loss)]
    pub fn search(&self, query: &str, k: usize) -> Vec<Hit> {
        let terms: HashSet<String> = tokenize(query).into_iter().collect();
        let total = self.passages.len() as f64;

        let mut scored: Vec<(usize, f64)> = self
            .passages
            .iter()
            .enumerate()
            .filter_map(|(idx, passage)| {
                let score: f64 = terms
                    .iter()
                    .filter_map(|term| {
                        let tf = *passage.term_counts.get(term)? as f64;
                        let df = self.doc_freq.get(term).copied().unwrap_or(1) as f64;
                        Some((1.0 + tf.ln()) * (1.0 + total / df).ln())
                    })
                    .sum();
                (score > 0.0).then_some((idx, score))
            })
            .collect();

        // Stable sort keeps document order among equal scores
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored
            .into_iter()
            .take(k)
            .map(|(idx, score)| Hit {
                title: self.passages[idx].title.clone(),
                text: self.passages[idx].text.clone(),
                score,
            })
            .collect()
    }
}

/// Question-answering tool backed by a [`DocumentIndex`]
pub struct DocumentSearchTool {
    name: String,
    description: String,
    index: DocumentIndex,
    top_k: usize,
}

impl DocumentSearchTool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        index: DocumentIndex,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            index,
            top_k: DEFAULT_TOP_K,
        }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }
}

#[async_trait]
impl Tool for DocumentSearchTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn input_schema(&self) -> Value {
        query_input_schema("Question to look up in the documents")
    }

    async fn invoke(&self, arguments: Value, ctx: ToolContext) -> Result<String, InvocationError> {
        let question = parse_query_input(arguments)?;
        let hits = self.index.search(&question, self.top_k);
        tracing::debug!(call_id = %ctx.call_id, hits = hits.len(), "Document search");

        if hits.is_empty() {
            return Ok(format!("No relevant passages found for: {question}"));
        }

        let mut out = String::new();
        for (rank, hit) in hits.iter().enumerate() {
            let _ = write!(out, "[{}] {}: {}\n\n", rank + 1, hit.title, hit.text);
        }
        Ok(out.trim_end().to_string())
    }
}
