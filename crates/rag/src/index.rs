//! Knowledge Index
//!
//! Owns the document store and both indexes as one immutable [`IndexSet`].
//! Readers take a cheap `Arc` snapshot per query. Appending documents builds
//! a complete new set off to the side and swaps it in under a write lock, so
//! concurrent readers see either the old set or the new one, never a mix.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use folio_core::{Chunk, Embedder};

use crate::sparse_search::{SparseConfig, SparseIndex};
use crate::vector_store::SemanticIndex;
use crate::RagError;

/// Immutable snapshot of the document store and its indexes
pub struct IndexSet {
    chunks: Vec<Chunk>,
    positions: HashMap<String, usize>,
    sparse: SparseIndex,
    semantic: SemanticIndex,
}

impl IndexSet {
    /// Build both indexes over a chunk set
    pub async fn build(chunks: Vec<Chunk>, embedder: &dyn Embedder) -> Result<Self, RagError> {
        let semantic = SemanticIndex::build(&chunks, embedder).await?;
        Self::from_semantic(semantic)
    }

    /// Rebuild the keyword index and document store from a semantic index
    ///
    /// Chunk ids must be unique; a duplicate is an `Index` error.
    pub fn from_semantic(semantic: SemanticIndex) -> Result<Self, RagError> {
        let chunks: Vec<Chunk> = semantic.chunks().cloned().collect();

        let mut positions = HashMap::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            if positions.insert(chunk.id.clone(), i).is_some() {
                return Err(RagError::Index(format!("duplicate chunk id: {}", chunk.id)));
            }
        }

        let sparse = SparseIndex::from_chunks(&chunks, SparseConfig::default())?;

        Ok(Self {
            chunks,
            positions,
            sparse,
            semantic,
        })
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Look up a chunk by id
    pub fn chunk(&self, id: &str) -> Option<&Chunk> {
        self.positions.get(id).map(|&i| &self.chunks[i])
    }

    pub fn sparse(&self) -> &SparseIndex {
        &self.sparse
    }

    pub fn semantic(&self) -> &SemanticIndex {
        &self.semantic
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Shared handle to the current [`IndexSet`]
pub struct KnowledgeIndex {
    current: RwLock<Option<Arc<IndexSet>>>,
    append_lock: Mutex<()>,
    embedder: Arc<dyn Embedder>,
    persist_dir: Option<PathBuf>,
}

impl KnowledgeIndex {
    /// Create an unbuilt handle; reads fail with `IndexNotBuilt` until a build
    pub fn new(embedder: Arc<dyn Embedder>, persist_dir: Option<PathBuf>) -> Self {
        Self {
            current: RwLock::new(None),
            append_lock: Mutex::new(()),
            embedder,
            persist_dir,
        }
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Build from chunks, persist when configured, and install the result
    pub async fn build(&self, chunks: Vec<Chunk>) -> Result<(), RagError> {
        let _guard = self.append_lock.lock().await;
        let set = IndexSet::build(chunks, self.embedder.as_ref()).await?;
        self.persist(&set).await?;
        self.install(set);
        Ok(())
    }

    /// Load the persisted index, or build from `chunks` when none exists
    ///
    /// `chunks` is only invoked on the build path. Returns `true` when a
    /// persisted index was loaded.
    pub async fn load_or_build<F>(&self, chunks: F) -> Result<bool, RagError>
    where
        F: FnOnce() -> Result<Vec<Chunk>, RagError>,
    {
        if let Some(dir) = &self.persist_dir {
            if let Some(semantic) = SemanticIndex::load(dir, self.embedder.as_ref()).await? {
                let set = IndexSet::from_semantic(semantic)?;
                let _guard = self.append_lock.lock().await;
                self.install(set);
                return Ok(true);
            }
        }

        self.build(chunks()?).await?;
        Ok(false)
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Result<Arc<IndexSet>, RagError> {
        self.current
            .read()
            .clone()
            .ok_or_else(|| RagError::IndexNotBuilt("knowledge index".to_string()))
    }

    /// Append chunks: rebuild everything, persist, then swap
    ///
    /// Appends are serialized. Until the swap, readers keep using the
    /// previous snapshot. Returns the new document count.
    pub async fn append(&self, new_chunks: Vec<Chunk>) -> Result<usize, RagError> {
        let _guard = self.append_lock.lock().await;

        let previous = self.snapshot()?;
        let mut chunks = previous.chunks().to_vec();
        chunks.extend(new_chunks);

        let set = IndexSet::build(chunks, self.embedder.as_ref()).await?;
        self.persist(&set).await?;
        let count = set.len();
        self.install(set);
        Ok(count)
    }

    /// Number of chunks in the current snapshot (0 before the first build)
    pub fn document_count(&self) -> usize {
        self.current.read().as_ref().map_or(0, |set| set.len())
    }

    pub fn is_ready(&self) -> bool {
        self.current.read().is_some()
    }

    async fn persist(&self, set: &IndexSet) -> Result<(), RagError> {
        match &self.persist_dir {
            Some(dir) => set.semantic().persist(dir).await,
            None => Ok(()),
        }
    }

    fn install(&self, set: IndexSet) {
        let chunks = set.len();
        *self.current.write() = Some(Arc::new(set));
        tracing::info!(chunks, "Installed knowledge index");
    }
}
