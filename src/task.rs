//! `GenerationTask` (§3): the unit of work an `Orchestrator` runs to
//! completion. One task corresponds to one document-package generation job
//! for one program.

use std::collections::{BTreeMap, BTreeSet};

use uuid::Uuid;

use crate::config::GenerationConfig;
use crate::document::{AssumptionSet, DocId, DocumentMetadata, DocumentType, ProjectInfo};
use crate::graph::GenerationBatchSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

/// `{generation_order: batches, dependencies, cross_references,
/// named_batches}` (§3).
#[derive(Debug, Clone, Default)]
pub struct CollaborationMetadata {
    pub generation_order: Vec<Vec<DocumentType>>,
    pub dependencies: BTreeMap<DocumentType, Vec<DocumentType>>,
    pub cross_references: Vec<(DocumentType, DocumentType, String)>,
    /// The DependencySpec's named generation batches (informative grouping,
    /// e.g. "Pre-Solicitation", "Solicitation Package"), narrowed to the
    /// subset of each batch's documents actually selected for this task.
    /// Batches with no overlap are omitted. The planner's own topological
    /// batches in `generation_order` remain authoritative for execution
    /// order; this is display metadata only.
    pub named_batches: Vec<(String, Vec<DocumentType>)>,
}

pub struct GenerationTask {
    /// Ambient addition: a stable identifier for correlating tracing spans
    /// and MetadataStore/ContextPool activity across one job's lifetime.
    pub job_id: Uuid,
    pub status: TaskStatus,
    /// Percentage in `[0, 100]`.
    pub progress: u8,
    pub selected_document_types: Vec<DocumentType>,
    pub project_info: ProjectInfo,
    pub config: GenerationConfig,
    pub assumptions: AssumptionSet,
    /// Explicit human-provided field overrides (tier 1 of the five-tier
    /// placeholder selection in §4.6). Keyed by placeholder name.
    pub field_overrides: BTreeMap<String, String>,
    pub sections: BTreeMap<DocumentType, String>,
    pub per_doc_metadata: BTreeMap<DocumentType, DocumentMetadata>,
    pub doc_ids: BTreeMap<DocumentType, DocId>,
    pub collaboration_metadata: CollaborationMetadata,
}

impl GenerationTask {
    pub fn new(
        project_info: ProjectInfo,
        selected_document_types: Vec<DocumentType>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            status: TaskStatus::Pending,
            progress: 0,
            selected_document_types,
            project_info,
            config,
            assumptions: AssumptionSet::new(),
            field_overrides: BTreeMap::new(),
            sections: BTreeMap::new(),
            per_doc_metadata: BTreeMap::new(),
            doc_ids: BTreeMap::new(),
            collaboration_metadata: CollaborationMetadata::default(),
        }
    }

    /// Scales `completed / total` into `[10, 90]` per the orchestrator's
    /// progress-reporting contract (§4.9 step 4): the first 10 points are
    /// "validated and started", the last 10 are "collaboration metadata
    /// built and status finalized".
    pub fn update_progress(&mut self, completed: usize, total: usize) {
        if total == 0 {
            self.progress = 90;
            return;
        }
        let fraction = completed as f32 / total as f32;
        self.progress = 10 + (fraction * 80.0).round() as u8;
    }

    pub fn mark_batches(&mut self, batches: &[Vec<DocumentType>]) {
        self.collaboration_metadata.generation_order = batches.to_vec();
    }

    /// Narrows each named batch down to the documents actually selected for
    /// this task, dropping batches left with no overlap, and records the
    /// result onto `collaboration_metadata` (§3, `named_batches`).
    pub fn record_named_batches(&mut self, named: &[GenerationBatchSpec]) {
        let selected: BTreeSet<DocumentType> = self.selected_document_types.iter().copied().collect();
        self.collaboration_metadata.named_batches = named
            .iter()
            .map(|batch| {
                let documents: Vec<DocumentType> = batch
                    .documents
                    .iter()
                    .copied()
                    .filter(|d| selected.contains(d))
                    .collect();
                (batch.name.clone(), documents)
            })
            .filter(|(_, documents)| !documents.is_empty())
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Map;
    use crate::document::ProjectValue;

    fn project_info() -> ProjectInfo {
        let mut fields = Map::new();
        fields.insert(
            ProjectInfo::PROGRAM_NAME_KEY.to_string(),
            ProjectValue::Text("ALMS".to_string()),
        );
        ProjectInfo::new(fields).unwrap()
    }

    #[test]
    fn progress_scales_into_10_to_90_range() {
        let mut task = GenerationTask::new(project_info(), vec![DocumentType::Igce], GenerationConfig::default());
        task.update_progress(0, 4);
        assert_eq!(task.progress, 10);
        task.update_progress(4, 4);
        assert_eq!(task.progress, 90);
        task.update_progress(2, 4);
        assert_eq!(task.progress, 50);
    }

    #[test]
    fn empty_selection_progresses_directly_to_90() {
        let mut task = GenerationTask::new(project_info(), vec![], GenerationConfig::default());
        task.update_progress(0, 0);
        assert_eq!(task.progress, 90);
    }

    #[test]
    fn record_named_batches_keeps_only_selected_documents_and_drops_empty_batches() {
        let mut task = GenerationTask::new(
            project_info(),
            vec![DocumentType::Igce, DocumentType::Pws],
            GenerationConfig::default(),
        );
        let named = vec![
            GenerationBatchSpec {
                name: "Pre-Solicitation".to_string(),
                priority: 10,
                documents: vec![DocumentType::Igce, DocumentType::AcquisitionPlan],
                can_parallelize: true,
            },
            GenerationBatchSpec {
                name: "Solicitation Package".to_string(),
                priority: 40,
                documents: vec![DocumentType::Pws],
                can_parallelize: true,
            },
            GenerationBatchSpec {
                name: "Source Selection".to_string(),
                priority: 50,
                documents: vec![DocumentType::SectionL],
                can_parallelize: false,
            },
        ];

        task.record_named_batches(&named);

        assert_eq!(
            task.collaboration_metadata.named_batches,
            vec![
                ("Pre-Solicitation".to_string(), vec![DocumentType::Igce]),
                ("Solicitation Package".to_string(), vec![DocumentType::Pws]),
            ]
        );
    }
}
