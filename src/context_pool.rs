//! The `ContextPool` (§4.4): process-wide, per-job in-memory store of
//! freshly generated documents available to downstream agents. Not
//! thread-safe internally — the orchestrator guarantees single-job
//! ownership and only writes at batch boundaries (§4.4, §5).

use std::collections::BTreeMap;

use crate::document::{DocId, DocumentType, GeneratedDocument};

#[derive(Debug, Clone)]
pub struct CrossReference {
    pub from_type: DocumentType,
    pub to_type: DocumentType,
    pub label: String,
}

#[derive(Default)]
pub struct ContextPool {
    documents: BTreeMap<DocumentType, GeneratedDocument>,
    cross_references: Vec<CrossReference>,
}

impl ContextPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document; replaces any existing entry for the same type
    /// (invariant 3 in §3: at most one live `GeneratedDocument` per type per
    /// job).
    pub fn put(&mut self, doc: GeneratedDocument) {
        self.documents.insert(doc.doc_type, doc);
    }

    pub fn get(&self, doc_type: DocumentType) -> Option<&GeneratedDocument> {
        self.documents.get(&doc_type)
    }

    pub fn doc_id(&self, doc_type: DocumentType) -> Option<&DocId> {
        self.documents.get(&doc_type).map(|d| &d.doc_id)
    }

    /// Convenience bulk fetch: content of each dependency present in the
    /// pool, keyed by type. Dependencies absent from the pool are simply
    /// omitted — the caller (an agent) degrades gracefully.
    pub fn related(&self, dependency_list: &[DocumentType]) -> BTreeMap<DocumentType, String> {
        dependency_list
            .iter()
            .filter_map(|t| self.documents.get(t).map(|d| (*t, d.content.clone())))
            .collect()
    }

    pub fn record_reference(&mut self, from_type: DocumentType, to_type: DocumentType, label: impl Into<String>) {
        self.cross_references.push(CrossReference {
            from_type,
            to_type,
            label: label.into(),
        });
    }

    pub fn cross_references(&self) -> &[CrossReference] {
        &self.cross_references
    }

    pub fn clear(&mut self) {
        self.documents.clear();
        self.cross_references.clear();
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
