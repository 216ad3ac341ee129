//! The `MetadataStore` (§4.5): persistent keyed mapping `doc_id ->
//! GeneratedDocument` plus an index `(type, program) -> doc_ids sorted by
//! created_at desc`. Durability contract: a `save` must survive process
//! restart (§4.5); the on-disk layout is one JSON record per document plus
//! one JSON index file, mirroring the teacher's own file-per-record memory
//! layout.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::document::{DocId, DocumentType, GeneratedDocument};
use crate::error::OrchestratorError;

#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn save(&self, doc: GeneratedDocument) -> Result<DocId, OrchestratorError>;
    async fn find_latest(&self, doc_type: DocumentType, program: &str) -> Option<GeneratedDocument>;
    async fn find_by_program(&self, program: &str) -> Vec<GeneratedDocument>;
    async fn lookup(&self, doc_id: &DocId) -> Option<GeneratedDocument>;
}

/// `(DocumentType, program) -> doc_ids`, most recent first.
type Index = BTreeMap<(DocumentType, String), Vec<DocId>>;

/// JSON-file-backed store: one `<doc_id>.json` record per document under
/// `base_dir`, plus an `index.json` mapping `(type, program)` to ordered
/// doc_id lists. A `Mutex` serializes writes within a process; the
/// orchestrator's batch-completion barrier means no two agents ever call
/// `save` concurrently in practice, but the lock makes that a guarantee
/// rather than an assumption.
pub struct JsonFileMetadataStore {
    base_dir: PathBuf,
    index: Mutex<Index>,
}

impl JsonFileMetadataStore {
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self, OrchestratorError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)
            .map_err(|e| OrchestratorError::MetadataStore(format!("create base dir: {e}")))?;
        let index = load_index(&base_dir)?;
        Ok(Self {
            base_dir,
            index: Mutex::new(index),
        })
    }

    fn record_path(&self, doc_id: &DocId) -> PathBuf {
        self.base_dir.join(format!("{}.json", doc_id.as_str()))
    }

    fn index_path(&self) -> PathBuf {
        self.base_dir.join("index.json")
    }

    fn persist_index(&self, index: &Index) -> Result<(), OrchestratorError> {
        let serializable: Vec<IndexEntry> = index
            .iter()
            .map(|((doc_type, program), ids)| IndexEntry {
                doc_type: *doc_type,
                program: program.clone(),
                doc_ids: ids.clone(),
            })
            .collect();
        let json = serde_json::to_string_pretty(&serializable)
            .map_err(|e| OrchestratorError::MetadataStore(format!("serialize index: {e}")))?;
        fs::write(self.index_path(), json)
            .map_err(|e| OrchestratorError::MetadataStore(format!("write index: {e}")))
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct IndexEntry {
    doc_type: DocumentType,
    program: String,
    doc_ids: Vec<DocId>,
}

fn load_index(base_dir: &Path) -> Result<Index, OrchestratorError> {
    let path = base_dir.join("index.json");
    if !path.exists() {
        return Ok(Index::new());
    }
    let raw = fs::read_to_string(&path)
        .map_err(|e| OrchestratorError::MetadataStore(format!("read index: {e}")))?;
    let entries: Vec<IndexEntry> = serde_json::from_str(&raw)
        .map_err(|e| OrchestratorError::MetadataStore(format!("parse index: {e}")))?;
    Ok(entries
        .into_iter()
        .map(|e| ((e.doc_type, e.program), e.doc_ids))
        .collect())
}

#[async_trait]
impl MetadataStore for JsonFileMetadataStore {
    async fn save(&self, mut doc: GeneratedDocument) -> Result<DocId, OrchestratorError> {
        if doc.created_at == Default::default() {
            doc.created_at = Utc::now();
        }
        let json = serde_json::to_string_pretty(&doc)
            .map_err(|e| OrchestratorError::MetadataStore(format!("serialize document: {e}")))?;
        fs::write(self.record_path(&doc.doc_id), json)
            .map_err(|e| OrchestratorError::MetadataStore(format!("write document: {e}")))?;

        let mut index = self.index.lock().expect("metadata store index lock poisoned");
        let key = (doc.doc_type, doc.program.clone());
        let ids = index.entry(key).or_default();
        ids.retain(|id| id != &doc.doc_id);
        ids.insert(0, doc.doc_id.clone());
        self.persist_index(&index)?;
        Ok(doc.doc_id)
    }

    async fn find_latest(&self, doc_type: DocumentType, program: &str) -> Option<GeneratedDocument> {
        let ids = {
            let index = self.index.lock().expect("metadata store index lock poisoned");
            index.get(&(doc_type, program.to_string())).cloned()?
        };
        let latest_id = ids.first()?;
        self.lookup(latest_id).await
    }

    async fn find_by_program(&self, program: &str) -> Vec<GeneratedDocument> {
        let ids: Vec<DocId> = {
            let index = self.index.lock().expect("metadata store index lock poisoned");
            index
                .iter()
                .filter(|((_, p), _)| p == program)
                .flat_map(|(_, ids)| ids.clone())
                .collect()
        };
        let mut docs = Vec::new();
        for id in ids {
            if let Some(doc) = self.lookup(&id).await {
                docs.push(doc);
            }
        }
        docs
    }

    async fn lookup(&self, doc_id: &DocId) -> Option<GeneratedDocument> {
        let raw = fs::read_to_string(self.record_path(doc_id)).ok()?;
        serde_json::from_str(&raw).ok()
    }
}

/// Non-durable, in-process store used by tests and the demo binary where a
/// temp directory would be unnecessary ceremony.
#[derive(Default)]
pub struct InMemoryMetadataStore {
    documents: Mutex<BTreeMap<DocId, GeneratedDocument>>,
    index: Mutex<Index>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn save(&self, mut doc: GeneratedDocument) -> Result<DocId, OrchestratorError> {
        if doc.created_at == Default::default() {
            doc.created_at = Utc::now();
        }
        let doc_id = doc.doc_id.clone();
        let key = (doc.doc_type, doc.program.clone());
        self.documents
            .lock()
            .expect("metadata store lock poisoned")
            .insert(doc_id.clone(), doc);
        let mut index = self.index.lock().expect("metadata store index lock poisoned");
        let ids = index.entry(key).or_default();
        ids.retain(|id| id != &doc_id);
        ids.insert(0, doc_id.clone());
        Ok(doc_id)
    }

    async fn find_latest(&self, doc_type: DocumentType, program: &str) -> Option<GeneratedDocument> {
        let latest_id = {
            let index = self.index.lock().expect("metadata store index lock poisoned");
            index.get(&(doc_type, program.to_string()))?.first()?.clone()
        };
        self.lookup(&latest_id).await
    }

    async fn find_by_program(&self, program: &str) -> Vec<GeneratedDocument> {
        let documents = self.documents.lock().expect("metadata store lock poisoned");
        documents
            .values()
            .filter(|d| d.program == program)
            .cloned()
            .collect()
    }

    async fn lookup(&self, doc_id: &DocId) -> Option<GeneratedDocument> {
        self.documents
            .lock()
            .expect("metadata store lock poisoned")
            .get(doc_id)
            .cloned()
    }
}
