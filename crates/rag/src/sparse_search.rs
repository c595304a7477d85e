//! Sparse Search using Tantivy (BM25)
//!
//! Keyword channel of the hybrid retriever. The index lives in RAM and is
//! built once over a chunk set; appending documents builds a new index
//! rather than mutating this one.

use parking_lot::Mutex;
use tantivy::{
    collector::TopDocs,
    query::QueryParser,
    schema::{Field, OwnedValue, Schema, TextFieldIndexing, TextOptions, STORED, STRING},
    tokenizer::{Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer, TextAnalyzer},
    Index, IndexReader, IndexWriter, TantivyDocument,
};

use folio_core::Chunk;

use crate::RagError;

const TOKENIZER_NAME: &str = "folio_en";

/// Writer heap budget (single indexing thread)
const WRITER_HEAP_BYTES: usize = 20_000_000;

/// Sparse search configuration
#[derive(Debug, Clone)]
pub struct SparseConfig {
    /// Enable English stemming
    pub stemming: bool,
    /// Tokens longer than this are dropped
    pub max_token_len: usize,
}

impl Default for SparseConfig {
    fn default() -> Self {
        Self {
            stemming: true,
            max_token_len: 40,
        }
    }
}

/// Sparse search result
#[derive(Debug, Clone)]
pub struct SparseResult {
    /// Chunk ID
    pub id: String,
    /// BM25 score
    pub score: f32,
}

/// Sparse index for BM25 search
pub struct SparseIndex {
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    id_field: Field,
    text_field: Field,
    section_field: Field,
}

impl SparseIndex {
    /// Create an empty in-memory index
    pub fn new(config: SparseConfig) -> Result<Self, RagError> {
        let mut schema_builder = Schema::builder();

        let text_options = TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(TOKENIZER_NAME)
                .set_index_option(tantivy::schema::IndexRecordOption::WithFreqsAndPositions),
        );

        let id_field = schema_builder.add_text_field("id", STRING | STORED);
        let text_field = schema_builder.add_text_field("text", text_options.clone());
        let section_field = schema_builder.add_text_field("section", text_options);

        let schema: Schema = schema_builder.build();
        let index = Index::create_in_ram(schema);
        index
            .tokenizers()
            .register(TOKENIZER_NAME, Self::build_tokenizer(&config));

        let reader = index.reader().map_err(|e| RagError::Index(e.to_string()))?;
        let writer = index
            .writer_with_num_threads(1, WRITER_HEAP_BYTES)
            .map_err(|e| RagError::Index(e.to_string()))?;

        Ok(Self {
            index,
            reader,
            writer: Mutex::new(writer),
            id_field,
            text_field,
            section_field,
        })
    }

    /// Build an index over a chunk set
    pub fn from_chunks(chunks: &[Chunk], config: SparseConfig) -> Result<Self, RagError> {
        let index = Self::new(config)?;
        index.index_chunks(chunks)?;
        Ok(index)
    }

    fn build_tokenizer(config: &SparseConfig) -> TextAnalyzer {
        let base = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(config.max_token_len))
            .filter(LowerCaser);

        if config.stemming {
            base.filter(Stemmer::new(Language::English)).build()
        } else {
            base.build()
        }
    }

    /// Index chunks and make them searchable
    pub fn index_chunks(&self, chunks: &[Chunk]) -> Result<(), RagError> {
        let mut writer = self.writer.lock();

        for chunk in chunks {
            let mut doc = TantivyDocument::default();
            doc.add_text(self.id_field, &chunk.id);
            doc.add_text(self.text_field, &chunk.text);
            if let Some(section) = chunk.metadata_str("section") {
                // "technical_skills" -> "technical skills"
                doc.add_text(self.section_field, section.replace('_', " "));
            }

            writer
                .add_document(doc)
                .map_err(|e| RagError::Index(e.to_string()))?;
        }

        writer
            .commit()
            .map_err(|e| RagError::Index(e.to_string()))?;

        self.reader
            .reload()
            .map_err(|e| RagError::Index(e.to_string()))?;

        Ok(())
    }

    /// Search using BM25
    ///
    /// Query syntax errors are tolerated: the parsable part of the query is
    /// searched, so free-form user text never fails here.
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<SparseResult>, RagError> {
        if query.trim().is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();
        let query_parser =
            QueryParser::for_index(&self.index, vec![self.text_field, self.section_field]);

        let (query, errors) = query_parser.parse_query_lenient(query);
        if !errors.is_empty() {
            tracing::debug!(errors = errors.len(), "Lenient query parse dropped terms");
        }

        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(top_k))
            .map_err(|e| RagError::Search(e.to_string()))?;

        let mut results = Vec::with_capacity(top_docs.len());

        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher
                .doc(doc_address)
                .map_err(|e| RagError::Search(e.to_string()))?;

            let id = match doc.get_first(self.id_field) {
                Some(OwnedValue::Str(s)) => s.to_string(),
                _ => continue,
            };

            results.push(SparseResult { id, score });
        }

        Ok(results)
    }

    /// Get document count
    pub fn doc_count(&self) -> u64 {
        self.reader.searcher().num_docs()
    }
}
