//! The `Agent` abstraction (§4.6): a uniform `execute(task) -> result`
//! capability set. Concrete agents vary only by the data in their
//! `AgentSpec` (queries, template, dependencies, extractor fields,
//! smart-default generators) — never by control flow, which lives entirely
//! in `BaseAgent`.

pub mod registry;
pub mod smart_defaults;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::citation::CitationValidator;
use crate::context_pool::ContextPool;
use crate::document::{DocId, DocumentMetadata, DocumentStatus, DocumentType, ExtractedFields};
use crate::extractor;
use crate::llm::LanguageModel;
use crate::metadata_store::MetadataStore;
use crate::quality::QualityEvaluator;
use crate::retriever::Retriever;
use crate::task::GenerationTask;

use smart_defaults::{SmartDefaultContext, SmartDefaultFn};

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").unwrap());

/// Declarative description of one concrete agent. Built once per
/// `DocumentType` by `registry::build`.
#[derive(Clone)]
pub struct AgentSpec {
    pub doc_type: DocumentType,
    /// Query templates; `{program}` is substituted with the program name
    /// before the query is issued to the `Retriever`.
    pub queries: Vec<String>,
    pub template: String,
    pub dependencies: Vec<DocumentType>,
    /// Fields this agent's own output should be self-extracted for, so
    /// downstream agents can consume them via `extracted_data`.
    pub extractor_fields: Vec<String>,
    pub required_boilerplate: Vec<String>,
    pub smart_defaults: Vec<SmartDefaultFn>,
}

/// What one agent execution produces, before the orchestrator commits it to
/// the `ContextPool` / `MetadataStore` / `task`.
pub struct AgentOutcome {
    pub doc_type: DocumentType,
    pub content: String,
    pub extracted_data: ExtractedFields,
    pub metadata: DocumentMetadata,
    pub references: BTreeMap<DocumentType, DocId>,
}

#[async_trait]
pub trait Agent: Send + Sync {
    fn doc_type(&self) -> DocumentType;
    fn declare_dependencies(&self) -> &[DocumentType];
    fn declare_queries(&self) -> &[String];

    async fn execute(
        &self,
        task: &GenerationTask,
        pool: &ContextPool,
        store: &dyn MetadataStore,
        retriever: &dyn Retriever,
        model: &dyn LanguageModel,
    ) -> AgentOutcome;
}

pub struct BaseAgent {
    pub spec: AgentSpec,
}

impl BaseAgent {
    pub fn new(spec: AgentSpec) -> Self {
        Self { spec }
    }

    fn template_placeholder_names(&self) -> Vec<String> {
        PLACEHOLDER_RE
            .captures_iter(&self.spec.template)
            .map(|c| c[1].to_string())
            .collect()
    }

    fn total_placeholder_count(&self) -> usize {
        self.template_placeholder_names().len()
    }
}

#[async_trait]
impl Agent for BaseAgent {
    fn doc_type(&self) -> DocumentType {
        self.spec.doc_type
    }

    fn declare_dependencies(&self) -> &[DocumentType] {
        &self.spec.dependencies
    }

    fn declare_queries(&self) -> &[String] {
        &self.spec.queries
    }

    async fn execute(
        &self,
        task: &GenerationTask,
        pool: &ContextPool,
        store: &dyn MetadataStore,
        retriever: &dyn Retriever,
        model: &dyn LanguageModel,
    ) -> AgentOutcome {
        let program = task.project_info.program_name().to_string();
        let mut warnings = Vec::new();

        // 1. Resolve dependencies.
        let mut upstream_extracted: BTreeMap<String, String> = BTreeMap::new();
        let mut references = BTreeMap::new();
        for &dep in &self.spec.dependencies {
            let resolved = match pool.get(dep).cloned() {
                Some(doc) => Some(doc),
                None => store.find_latest(dep, &program).await,
            };
            match resolved {
                Some(doc) => {
                    references.insert(dep, doc.doc_id.clone());
                    for (k, v) in &doc.extracted_data {
                        upstream_extracted.insert(k.clone(), v.clone());
                    }
                }
                None => {
                    warnings.push(format!(
                        "dependency {dep} unavailable for {program}; proceeding without its context"
                    ));
                }
            }
        }

        // 2. Build RAG context.
        let mut rag_context: BTreeMap<String, String> = BTreeMap::new();
        let mut reference_texts: Vec<String> = Vec::new();
        for query_template in &self.spec.queries {
            let query = query_template.replace("{program}", &program);
            match retriever.retrieve(&query, task.config.retrieval_k).await {
                Ok(result) => {
                    let combined = result.combined_text();
                    if !combined.is_empty() {
                        reference_texts.push(combined.clone());
                        let extracted =
                            extractor::extract_fields(self.spec.doc_type, &combined, &field_names(&self.spec.extractor_fields));
                        for (k, v) in extracted {
                            rag_context.entry(k).or_insert(v);
                        }
                    }
                }
                Err(_) => {
                    warnings.push(format!("retrieval failed for query `{query}`; continuing with no context"));
                }
            }
        }
        let mut tokens_spent: u64 = 0;
        let system = format!(
            "You are a DoD contracting document generator for {:?}. Preserve every fact already present in the scaffold; only replace TBD placeholders with grounded values.",
            self.spec.doc_type
        );

        // 2b. LLM fallback extraction (§4.3): for any declared field still
        // missing after regex extraction over retrieved/upstream text, ask
        // the model once — a single call covering the whole gap set, not one
        // per field — rather than leaving it to fall through to a bare TBD.
        let missing_fields: Vec<&str> = self
            .spec
            .extractor_fields
            .iter()
            .map(String::as_str)
            .filter(|f| !rag_context.contains_key(*f) && !upstream_extracted.contains_key(*f))
            .collect();
        if !missing_fields.is_empty() {
            let fallback_prompt = format!(
                "For the {program} program, provide your best concrete estimate for each field below, \
                one per line formatted exactly as `field_name: value`. If a field cannot be reasonably \
                estimated, omit that line entirely rather than guessing wildly.\n\n{}",
                missing_fields.join("\n")
            );
            if let Ok(completion) = model.complete(&system, &fallback_prompt).await {
                tokens_spent += completion.tokens_used as u64;
                for line in completion.text.lines() {
                    if let Some((key, value)) = line.split_once(':') {
                        let key = key.trim();
                        if missing_fields.contains(&key) {
                            rag_context.entry(key.to_string()).or_insert_with(|| value.trim().to_string());
                        }
                    }
                }
            }
        }

        // 3. Ingest upstream extractions — already merged above; upstream
        // wins over rag_context on collision per §4.6 step 3.
        let mut merged_context = rag_context.clone();
        for (k, v) in &upstream_extracted {
            merged_context.insert(k.clone(), v.clone());
        }

        // 4. Populate template.
        let smart_ctx = SmartDefaultContext {
            user_count: merged_context.get("user_count").and_then(|s| s.replace(',', "").parse().ok()),
            period_of_performance_months: merged_context
                .get("period_of_performance")
                .and_then(|s| s.split_whitespace().next())
                .and_then(|s| s.parse().ok()),
            contract_type: merged_context.get("contract_type").cloned(),
        };
        let smart_defaults = self.resolve_smart_defaults(&smart_ctx);

        let total_placeholders = self.total_placeholder_count().max(1);
        let (populated, tbd_count) = populate_template(
            &self.spec.template,
            &task.field_overrides,
            &upstream_extracted,
            &rag_context,
            &smart_defaults,
            &program,
        );

        // 5. Invoke the language model.
        let prompt = format!(
            "## Scaffold\n{populated}\n\n## Retrieved context\n{}\n\n## Upstream document summaries\n{}",
            reference_texts.join("\n---\n"),
            upstream_summary(&references, pool),
        );
        let completion = match model.complete(&system, &prompt).await {
            Ok(c) => c,
            Err(e) => {
                return failed_outcome(self.spec.doc_type, warnings, format!("model call failed: {e}"));
            }
        };
        let mut content = completion.text;
        tokens_spent += completion.tokens_used as u64;

        // 6. Inject citations.
        let gaps = CitationValidator::claims_needing_citation(&content);
        if !gaps.is_empty() && tokens_spent < task.config.token_budget {
            let citation_prompt = format!(
                "Rewrite the following so every factual claim carries an appropriate FAR/DFARS/DoDI/program-document citation, preserving all other content:\n\n{content}"
            );
            if let Ok(revised) = model.complete(&system, &citation_prompt).await {
                tokens_spent += revised.tokens_used as u64;
                content = revised.text;
            }
        }

        // 8. Score.
        let reference_strs: Vec<&str> = reference_texts.iter().map(String::as_str).collect();
        let required_boilerplate: Vec<&str> = self.spec.required_boilerplate.iter().map(String::as_str).collect();
        // tbd_count from template population is superseded here by what the
        // model actually left unresolved in its completion.
        let _ = tbd_count;
        let mut tbd_count = count_tbd(&content);
        let mut report = QualityEvaluator::evaluate(&content, &reference_strs, &required_boilerplate, tbd_count, total_placeholders);
        let mut iterations_used = 0u32;

        // 9. Refine.
        while report.overall < task.config.refinement_threshold
            && iterations_used < task.config.max_iterations
            && task.config.enable_auto_refinement
            && tokens_spent < task.config.token_budget
        {
            let refine_prompt = format!(
                "The following document scored {:.1}/100. Address these issues without removing any already-grounded facts:\n{}\n\n## Document\n{content}",
                report.overall,
                report.suggestions.join("\n- ")
            );
            let Ok(revision) = model.complete(&system, &refine_prompt).await else {
                break;
            };
            tokens_spent += revision.tokens_used as u64;
            let candidate_tbd = count_tbd(&revision.text);
            let candidate_report = QualityEvaluator::evaluate(
                &revision.text,
                &reference_strs,
                &required_boilerplate,
                candidate_tbd,
                total_placeholders,
            );
            iterations_used += 1;
            if candidate_report.overall > report.overall && candidate_tbd <= tbd_count {
                content = revision.text;
                tbd_count = candidate_tbd;
                report = candidate_report;
            } else {
                break;
            }
        }

        // 7. Self-extract, on whatever content survived refinement.
        let extracted_data = extractor::extract_all(self.spec.doc_type, &content);
        let word_count = content.split_whitespace().count();

        AgentOutcome {
            doc_type: self.spec.doc_type,
            content,
            extracted_data,
            metadata: DocumentMetadata {
                agent_name: format!("{:?}Agent", self.spec.doc_type),
                generation_strategy: "base_agent_template".to_string(),
                word_count,
                tbd_count,
                iterations_used,
                final_score: report.overall,
                grade: report.grade,
                risk: report.risk,
                status: DocumentStatus::Completed,
                warnings,
                persisted: false,
            },
            references,
        }
    }
}

impl BaseAgent {
    fn resolve_smart_defaults(&self, ctx: &SmartDefaultContext) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for generator in &self.spec.smart_defaults {
            out.extend(generator(ctx));
        }
        out
    }
}

fn field_names(fields: &[String]) -> Vec<&str> {
    fields.iter().map(String::as_str).collect()
}

fn count_tbd(content: &str) -> usize {
    content.matches("TBD —").count() + content.matches("TBD -").count()
}

fn upstream_summary(references: &BTreeMap<DocumentType, DocId>, pool: &ContextPool) -> String {
    if references.is_empty() {
        return "(no upstream documents available)".to_string();
    }
    references
        .keys()
        .filter_map(|t| pool.get(*t))
        .map(|doc| format!("- {:?}: {}", doc.doc_type, doc.content.chars().take(240).collect::<String>()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn failed_outcome(doc_type: DocumentType, mut warnings: Vec<String>, reason: String) -> AgentOutcome {
    warnings.push(reason.clone());
    AgentOutcome {
        doc_type,
        content: String::new(),
        extracted_data: ExtractedFields::new(),
        metadata: DocumentMetadata {
            agent_name: format!("{doc_type:?}Agent"),
            generation_strategy: "base_agent_template".to_string(),
            word_count: 0,
            tbd_count: 0,
            iterations_used: 0,
            final_score: 0.0,
            grade: crate::document::Grade::F,
            risk: crate::document::HallucinationRisk::High,
            status: DocumentStatus::Failed,
            warnings,
            persisted: false,
        },
        references: BTreeMap::new(),
    }
}

/// Implements the five-tier placeholder value selection (§4.6):
/// 1. explicit `task.field_overrides`
/// 2. upstream `extracted_data`
/// 3. `rag_context`
/// 4. smart defaults
/// 5. a descriptive `TBD — <reason>` string
fn populate_template(
    template: &str,
    field_overrides: &BTreeMap<String, String>,
    upstream_extracted: &BTreeMap<String, String>,
    rag_context: &BTreeMap<String, String>,
    smart_defaults: &BTreeMap<String, String>,
    program: &str,
) -> (String, usize) {
    let mut tbd_count = 0;
    let populated = PLACEHOLDER_RE
        .replace_all(template, |caps: &regex::Captures| {
            let name = &caps[1];
            if name == "program_name" {
                return program.to_string();
            }
            if let Some(v) = field_overrides.get(name) {
                return v.clone();
            }
            if let Some(v) = upstream_extracted.get(name) {
                return v.clone();
            }
            if let Some(v) = rag_context.get(name) {
                return v.clone();
            }
            if let Some(v) = smart_defaults.get(name) {
                return v.clone();
            }
            tbd_count += 1;
            format!("TBD — no override, upstream, retrieved, or default value found for `{name}`")
        })
        .into_owned();
    (populated, tbd_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn populate_template_prefers_override_over_everything_else() {
        let mut overrides = BTreeMap::new();
        overrides.insert("total_cost".to_string(), "$1,000,000".to_string());
        let mut upstream = BTreeMap::new();
        upstream.insert("total_cost".to_string(), "$2,000,000".to_string());
        let (populated, tbd) = populate_template(
            "Cost: {{total_cost}}",
            &overrides,
            &upstream,
            &BTreeMap::new(),
            &BTreeMap::new(),
            "ALMS",
        );
        assert_eq!(populated, "Cost: $1,000,000");
        assert_eq!(tbd, 0);
    }

    #[test]
    fn populate_template_falls_back_to_descriptive_tbd() {
        let (populated, tbd) = populate_template(
            "IOC: {{ioc_date}}",
            &BTreeMap::new(),
            &BTreeMap::new(),
            &BTreeMap::new(),
            &BTreeMap::new(),
            "ALMS",
        );
        assert!(populated.contains("TBD — no override"));
        assert_eq!(tbd, 1);
    }

    #[test]
    fn populate_template_resolves_program_name_directly() {
        let (populated, _) = populate_template(
            "Program: {{program_name}}",
            &BTreeMap::new(),
            &BTreeMap::new(),
            &BTreeMap::new(),
            &BTreeMap::new(),
            "ALMS",
        );
        assert_eq!(populated, "Program: ALMS");
    }
}
