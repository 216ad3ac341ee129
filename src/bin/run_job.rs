//! Demo binary: runs one document-generation job against stub collaborators
//! (no live LLM endpoint or vector index required) so the orchestrator's
//! wiring can be exercised end-to-end.

use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use dod_doc_orchestrator::agent::registry;
use dod_doc_orchestrator::agent::{AgentSpec, BaseAgent};
use dod_doc_orchestrator::config::GenerationConfig;
use dod_doc_orchestrator::document::{DocumentType, ProjectInfo, ProjectValue};
use dod_doc_orchestrator::graph::DependencyGraph;
use dod_doc_orchestrator::llm::StubLanguageModel;
use dod_doc_orchestrator::metadata_store::InMemoryMetadataStore;
use dod_doc_orchestrator::orchestrator::Orchestrator;
use dod_doc_orchestrator::retriever::StaticCorpusRetriever;
use dod_doc_orchestrator::task::GenerationTask;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let graph = DependencyGraph::load()?;
    let specs: BTreeMap<DocumentType, AgentSpec> = registry::build(&graph);
    let agents = specs.into_iter().map(|(t, s)| (t, BaseAgent::new(s))).collect();

    let orchestrator = Orchestrator::new(
        graph,
        agents,
        Box::new(StaticCorpusRetriever::empty()),
        Box::new(StubLanguageModel::default()),
        Box::new(InMemoryMetadataStore::new()),
    );

    let mut fields = BTreeMap::new();
    fields.insert(ProjectInfo::PROGRAM_NAME_KEY.to_string(), ProjectValue::Text("ALMS".to_string()));
    let project_info = ProjectInfo::new(fields)?;

    let selected = vec![
        DocumentType::SourcesSought,
        DocumentType::Rfi,
        DocumentType::MarketResearchReport,
        DocumentType::AcquisitionPlan,
        DocumentType::Igce,
        DocumentType::Pws,
    ];

    let mut task = GenerationTask::new(project_info, selected, GenerationConfig::default());
    let cancel = Arc::new(AtomicBool::new(false));

    orchestrator.run(&mut task, &cancel).await?;

    println!("job {} finished with status {:?}", task.job_id, task.status);
    for (doc_type, metadata) in &task.per_doc_metadata {
        println!(
            "  {doc_type:?}: grade={:?} score={:.1} tbd={} status={:?}",
            metadata.grade, metadata.final_score, metadata.tbd_count, metadata.status
        );
    }
    Ok(())
}
