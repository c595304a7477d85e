//! Knowledge Base Loader
//!
//! Turns the files under the knowledge directory into chunks:
//!
//! - `.txt` / `.md`: split with the recursive splitter; metadata `source`
//!   (file name), `file_path`, `category` (file stem)
//! - `cv.*` / `resume.*` text files: parsed into CV sections first, each
//!   section chunked with `{source: cv, section, type: profile}`
//! - `.yaml` / `.json`: a [`KnowledgeFile`] with a `documents` array
//!
//! Files are visited in name order so chunk ids are stable across restarts.

use serde::{Deserialize, Serialize};
use std::path::Path;

use folio_core::Chunk;

use crate::chunker::TextSplitter;
use crate::RagError;

/// CV section headers, matched case-insensitively anywhere in a line
pub const CV_SECTION_HEADERS: [&str; 6] = [
    "PROFESSIONAL SUMMARY",
    "KEY PROJECTS",
    "EDUCATION",
    "PROFESSIONAL EXPERIENCE",
    "TECHNICAL SKILLS",
    "CERTIFICATIONS",
];

/// Section assigned to CV text preceding the first header
const CV_PREAMBLE_SECTION: &str = "summary";

/// File stems parsed as a CV rather than plain text
const CV_STEMS: [&str; 2] = ["cv", "resume"];

/// Knowledge document format for YAML/JSON files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    /// Unique document ID
    pub id: String,
    /// Document title
    #[serde(default)]
    pub title: Option<String>,
    /// Document content (will be chunked and embedded)
    pub content: String,
    /// Profile section (e.g. "technical_skills", "contact")
    #[serde(default)]
    pub section: Option<String>,
    /// Category/type
    #[serde(default)]
    pub category: Option<String>,
}

/// Knowledge base file format
#[derive(Debug, Serialize, Deserialize)]
pub struct KnowledgeFile {
    /// Version for format compatibility
    #[serde(default)]
    pub version: Option<String>,
    /// List of documents
    pub documents: Vec<KnowledgeDocument>,
}

/// Document loader
pub struct KnowledgeLoader {
    splitter: TextSplitter,
}

impl KnowledgeLoader {
    pub fn new(splitter: TextSplitter) -> Self {
        Self { splitter }
    }

    /// Load every supported file in a directory
    ///
    /// A missing directory yields no chunks. A file that fails to load is
    /// logged and skipped.
    pub fn load_directory(&self, knowledge_dir: &Path) -> Result<Vec<Chunk>, RagError> {
        if !knowledge_dir.exists() {
            tracing::warn!(
                path = %knowledge_dir.display(),
                "Knowledge directory does not exist"
            );
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(knowledge_dir)
            .map_err(|e| RagError::Loader(format!("Failed to read directory: {}", e)))?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| RagError::Loader(format!("Failed to read entry: {}", e)))?;
            let path = entry.path();
            if path.is_file() && is_supported(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut chunks = Vec::new();
        for path in paths {
            match self.load_file(&path) {
                Ok(loaded) => {
                    tracing::info!(
                        file = %path.display(),
                        chunks = loaded.len(),
                        "Loaded knowledge file"
                    );
                    chunks.extend(loaded);
                },
                Err(e) => {
                    tracing::error!(
                        file = %path.display(),
                        error = %e,
                        "Failed to load knowledge file"
                    );
                },
            }
        }

        tracing::info!(
            directory = %knowledge_dir.display(),
            total_chunks = chunks.len(),
            "Knowledge base loading complete"
        );

        Ok(chunks)
    }

    /// Load a single knowledge file
    pub fn load_file(&self, path: &Path) -> Result<Vec<Chunk>, RagError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RagError::Loader(format!("Failed to read {}: {}", path.display(), e)))?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match extension {
            "txt" | "md" if CV_STEMS.contains(&stem.to_lowercase().as_str()) => {
                Ok(self.create_cv_chunks(&file_name, &content))
            },
            "txt" | "md" => {
                let file_path = path.display().to_string();
                Ok(self
                    .split_into_chunks(&file_name, &content)
                    .into_iter()
                    .map(|chunk| {
                        chunk
                            .with_metadata("source", file_name.clone())
                            .with_metadata("file_path", file_path.clone())
                            .with_metadata("category", stem.clone())
                    })
                    .collect())
            },
            "json" => {
                let knowledge: KnowledgeFile = serde_json::from_str(&content)
                    .map_err(|e| RagError::Loader(format!("JSON parse error: {}", e)))?;
                Ok(self.document_chunks(&file_name, knowledge))
            },
            "yaml" | "yml" => {
                let knowledge: KnowledgeFile = serde_yaml::from_str(&content)
                    .map_err(|e| RagError::Loader(format!("YAML parse error: {}", e)))?;
                Ok(self.document_chunks(&file_name, knowledge))
            },
            _ => Err(RagError::Loader(format!(
                "Unsupported file type: {}",
                extension
            ))),
        }
    }

    /// Create section-tagged chunks from CV text read from `file_name`
    pub fn create_cv_chunks(&self, file_name: &str, cv_text: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for (section, content) in parse_cv_sections(cv_text) {
            let prefix = format!("{}:{}", file_name, section);
            chunks.extend(self.split_into_chunks(&prefix, &content).into_iter().map(|chunk| {
                chunk
                    .with_metadata("source", "cv")
                    .with_metadata("section", section.clone())
                    .with_metadata("type", "profile")
            }));
        }

        tracing::debug!(chunks = chunks.len(), "Created CV chunks");
        chunks
    }

    fn document_chunks(&self, file_name: &str, knowledge: KnowledgeFile) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for doc in knowledge.documents {
            let prefix = format!("{}:{}", file_name, doc.id);
            for chunk in self.split_into_chunks(&prefix, &doc.content) {
                let mut chunk = chunk
                    .with_metadata("source", file_name.to_string())
                    .with_metadata("document_id", doc.id.clone());
                if let Some(title) = &doc.title {
                    chunk = chunk.with_metadata("title", title.clone());
                }
                if let Some(section) = &doc.section {
                    chunk = chunk.with_metadata("section", section.clone());
                }
                if let Some(category) = &doc.category {
                    chunk = chunk.with_metadata("category", category.clone());
                }
                chunks.push(chunk);
            }
        }

        chunks
    }

    /// Split text and assign ids `{prefix}#{n}`
    ///
    /// Every prefix starts with the file name, so ids from different files
    /// never collide.
    fn split_into_chunks(&self, prefix: &str, text: &str) -> Vec<Chunk> {
        self.splitter
            .split(text)
            .into_iter()
            .enumerate()
            .map(|(i, piece)| Chunk::with_id(format!("{}#{}", prefix, i), piece))
            .collect()
    }
}

impl Default for KnowledgeLoader {
    fn default() -> Self {
        Self::new(TextSplitter::default())
    }
}

fn is_supported(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("txt" | "md" | "yaml" | "yml" | "json")
    )
}

/// Split CV text into `(section, content)` pairs in order of first appearance
///
/// A repeated header replaces the earlier section's content.
pub fn parse_cv_sections(cv_text: &str) -> Vec<(String, String)> {
    let mut sections: Vec<(String, String)> = Vec::new();
    let mut current_section = CV_PREAMBLE_SECTION.to_string();
    let mut current_content: Vec<&str> = Vec::new();

    for line in cv_text.lines() {
        let line = line.trim();
        let upper = line.to_uppercase();

        if let Some(header) = CV_SECTION_HEADERS.iter().find(|h| upper.contains(*h)) {
            flush_section(&current_section, &mut current_content, &mut sections);
            current_section = header.to_lowercase().replace(' ', "_");
            continue;
        }

        if !line.is_empty() {
            current_content.push(line);
        }
    }
    flush_section(&current_section, &mut current_content, &mut sections);

    sections
}

fn flush_section(section: &str, content: &mut Vec<&str>, sections: &mut Vec<(String, String)>) {
    if content.is_empty() {
        return;
    }
    let joined = content.join("\n");
    content.clear();
    match sections.iter_mut().find(|(name, _)| name == section) {
        Some(existing) => existing.1 = joined,
        None => sections.push((section.to_string(), joined)),
    }
}
