//! The `Orchestrator` (§4.9): the single entry point for a generation job.
//! Drives the dependency-ordered batch schedule, bounded per-batch
//! concurrency, failure isolation, retry-with-backoff, and cooperative
//! cancellation described in §4.9 and §5.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{info, info_span, warn, Instrument};

use crate::agent::{Agent, AgentOutcome, BaseAgent};
use crate::context_pool::ContextPool;
use crate::document::{DocumentStatus, DocumentType, GeneratedDocument};
use crate::error::OrchestratorError;
use crate::graph::DependencyGraph;
use crate::llm::LanguageModel;
use crate::metadata_store::MetadataStore;
use crate::retriever::Retriever;
use crate::task::{GenerationTask, TaskStatus};

const RETRY_BACKOFFS_SECS: &[u64] = &[1, 2, 4];
const PER_AGENT_TIMEOUT: Duration = Duration::from_secs(120);
const PER_BATCH_TIMEOUT: Duration = Duration::from_secs(600);

pub struct Orchestrator {
    pub graph: DependencyGraph,
    pub agents: std::collections::BTreeMap<DocumentType, BaseAgent>,
    pub retriever: Box<dyn Retriever>,
    pub model: Box<dyn LanguageModel>,
    pub store: Box<dyn MetadataStore>,
}

impl Orchestrator {
    pub fn new(
        graph: DependencyGraph,
        agents: std::collections::BTreeMap<DocumentType, BaseAgent>,
        retriever: Box<dyn Retriever>,
        model: Box<dyn LanguageModel>,
        store: Box<dyn MetadataStore>,
    ) -> Self {
        Self {
            graph,
            agents,
            retriever,
            model,
            store,
        }
    }

    /// Runs `task` to completion. `cancel` is honoured between batches only
    /// (§5's cooperative-cancellation contract); mid-batch, dispatched
    /// agents are allowed to finish their current LLM call.
    pub async fn run(&self, task: &mut GenerationTask, cancel: &Arc<AtomicBool>) -> Result<(), OrchestratorError> {
        let span = info_span!("orchestrator_run", job_id = %task.job_id, program = %task.project_info.program_name());
        async {
            self.run_inner(task, cancel).await
        }
        .instrument(span)
        .await
    }

    async fn run_inner(&self, task: &mut GenerationTask, cancel: &Arc<AtomicBool>) -> Result<(), OrchestratorError> {
        // 1. Validate, mark in progress.
        let program = task.project_info.program_name().to_string();
        task.status = TaskStatus::InProgress;
        let mut pool = ContextPool::new();

        let selected: BTreeSet<DocumentType> = task.selected_document_types.iter().copied().collect();

        // 2. Pre-populate ContextPool from the MetadataStore for every
        // transitive dependency of the selected set.
        let mut already_available = BTreeSet::new();
        for &doc_type in &selected {
            for dep in self.graph.dependencies(doc_type) {
                if selected.contains(&dep) {
                    continue;
                }
                if let Some(doc) = self.store.find_latest(dep, &program).await {
                    pool.put(doc);
                    already_available.insert(dep);
                }
            }
        }

        let validation = self.graph.validate(&selected, &already_available);
        for warning in &validation.warnings {
            warn!(%warning, "dependency validation warning");
        }

        // 3. Plan batches over the selected set.
        let batches = self.graph.plan(&selected).map_err(OrchestratorError::Config)?;
        task.mark_batches(&batches);
        task.record_named_batches(self.graph.named_batches());

        let semaphore = Arc::new(Semaphore::new(task.config.max_parallel_agents));
        let total = selected.len();
        let mut completed = 0usize;

        for (batch_index, batch) in batches.iter().enumerate() {
            if cancel.load(Ordering::SeqCst) {
                task.status = TaskStatus::Cancelled;
                pool.clear();
                return Err(OrchestratorError::Cancelled);
            }

            let batch_span = info_span!("batch", batch_index, size = batch.len());
            let outcomes = self
                .run_batch(batch, task, &pool, &semaphore)
                .instrument(batch_span)
                .await?;

            for outcome in outcomes {
                let doc_id = crate::document::DocId::new(outcome.doc_type, &task.project_info.program_slug(), chrono::Utc::now());
                let doc = GeneratedDocument {
                    doc_id: doc_id.clone(),
                    doc_type: outcome.doc_type,
                    program: program.clone(),
                    content: outcome.content.clone(),
                    extracted_data: outcome.extracted_data.clone(),
                    references: outcome.references.clone(),
                    metadata: outcome.metadata.clone(),
                    created_at: chrono::Utc::now(),
                };

                for (&from_dep, _) in &outcome.references {
                    pool.record_reference(outcome.doc_type, from_dep, "upstream context");
                    task.collaboration_metadata
                        .cross_references
                        .push((outcome.doc_type, from_dep, "upstream context".to_string()));
                }

                task.sections.insert(outcome.doc_type, outcome.content);
                task.per_doc_metadata.insert(outcome.doc_type, outcome.metadata);
                task.collaboration_metadata
                    .dependencies
                    .insert(outcome.doc_type, self.graph.entry(outcome.doc_type).map(|e| e.depends_on.clone()).unwrap_or_default());

                if doc.metadata.status == DocumentStatus::Completed {
                    match self.store.save(doc.clone()).await {
                        Ok(_) => {
                            let mut persisted_doc = doc;
                            persisted_doc.metadata.persisted = true;
                            pool.put(persisted_doc);
                        }
                        Err(e) => {
                            warn!(doc_type = ?outcome.doc_type, error = %e, "failed to persist document");
                            pool.put(doc);
                        }
                    }
                } else {
                    pool.put(doc);
                }

                completed += 1;
            }

            task.update_progress(completed, total);
            info!(progress = task.progress, "batch complete");
        }

        task.status = TaskStatus::Completed;
        task.progress = 100;
        Ok(())
    }

    async fn run_batch(
        &self,
        batch: &[DocumentType],
        task: &GenerationTask,
        pool: &ContextPool,
        semaphore: &Arc<Semaphore>,
    ) -> Result<Vec<AgentOutcome>, OrchestratorError> {
        let orchestrator = self;
        let futures = batch.iter().map(|&doc_type| {
            let semaphore = Arc::clone(semaphore);
            async move {
                let _permit = semaphore.acquire().await.expect("semaphore never closed");
                let span = info_span!("agent", doc_type = ?doc_type);
                orchestrator.run_agent_with_retry(doc_type, task, pool).instrument(span).await
            }
        });

        let results = tokio::time::timeout(PER_BATCH_TIMEOUT, futures::future::join_all(futures))
            .await
            .map_err(|_| OrchestratorError::Timeout {
                stage: "batch".to_string(),
                elapsed_secs: PER_BATCH_TIMEOUT.as_secs(),
            })?;

        Ok(results)
    }

    async fn run_agent_with_retry(&self, doc_type: DocumentType, task: &GenerationTask, pool: &ContextPool) -> AgentOutcome {
        let Some(agent) = self.agents.get(&doc_type) else {
            return failed_placeholder(doc_type, "no registered agent for this document type".to_string());
        };

        let mut last_outcome = None;
        for (attempt, backoff_secs) in std::iter::once(0).chain(RETRY_BACKOFFS_SECS.iter().copied()).enumerate() {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
            }
            let attempt_result = tokio::time::timeout(
                PER_AGENT_TIMEOUT,
                agent.execute(task, pool, self.store.as_ref(), self.retriever.as_ref(), self.model.as_ref()),
            )
            .await;

            let outcome = match attempt_result {
                Ok(outcome) => outcome,
                Err(_) => failed_placeholder(doc_type, format!("agent timed out (transient) after {}s", PER_AGENT_TIMEOUT.as_secs())),
            };

            // Only a transient model failure (§7: `ModelError (transient)`)
            // warrants another attempt; a terminal failure (auth, malformed
            // request, missing dependency) would just fail identically again.
            let retryable = outcome.metadata.status != DocumentStatus::Completed
                && outcome.metadata.warnings.iter().any(|w| w.contains("(transient)"));
            let done = outcome.metadata.status == DocumentStatus::Completed || !retryable;
            last_outcome = Some(outcome);
            if done {
                break;
            }
        }

        last_outcome.unwrap_or_else(|| failed_placeholder(doc_type, "agent failed with no recorded outcome".to_string()))
    }
}

fn failed_placeholder(doc_type: DocumentType, reason: String) -> AgentOutcome {
    AgentOutcome {
        doc_type,
        content: String::new(),
        extracted_data: Default::default(),
        metadata: crate::document::DocumentMetadata {
            agent_name: format!("{doc_type:?}Agent"),
            generation_strategy: "base_agent_template".to_string(),
            word_count: 0,
            tbd_count: 0,
            iterations_used: 0,
            final_score: 0.0,
            grade: crate::document::Grade::F,
            risk: crate::document::HallucinationRisk::High,
            status: DocumentStatus::Failed,
            warnings: vec![reason],
            persisted: false,
        },
        references: Default::default(),
    }
}
