//! The `DependencyGraph` (§4.2): a declarative, load-once dependency spec
//! over `DocumentType`, a Kahn's-algorithm batch planner, and transitive
//! dependency/dependent queries.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::str::FromStr;

use serde::Deserialize;

use crate::document::DocumentType;
use crate::error::ConfigError;

/// The canonical dependency configuration. Multiple competing dependency
/// configurations exist in the historical source material; this is the one
/// the orchestrator loads at startup.
const CANONICAL_SPEC_JSON: &str = include_str!("dependency_spec.json");

#[derive(Debug, Clone, Deserialize)]
struct RawDependencyEntry {
    depends_on: Vec<String>,
    priority: u32,
    #[serde(default)]
    references: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawGenerationBatch {
    name: String,
    priority: u32,
    documents: Vec<String>,
    can_parallelize: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct RawDependencySpecFile {
    dependencies: BTreeMap<String, RawDependencyEntry>,
    #[serde(default)]
    generation_batches: Vec<RawGenerationBatch>,
}

#[derive(Debug, Clone)]
pub struct DependencyEntry {
    pub depends_on: Vec<DocumentType>,
    pub priority: u32,
    pub references: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct GenerationBatchSpec {
    pub name: String,
    pub priority: u32,
    pub documents: Vec<DocumentType>,
    pub can_parallelize: bool,
}

/// Result of `DependencyGraph::validate`: never mutates the graph, only
/// reports what a candidate selection is missing.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub complete: bool,
    pub missing_dependencies: BTreeSet<DocumentType>,
    pub warnings: Vec<String>,
}

pub struct DependencyGraph {
    entries: BTreeMap<DocumentType, DependencyEntry>,
    batches: Vec<GenerationBatchSpec>,
}

impl DependencyGraph {
    /// Loads the single canonical spec embedded at compile time.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_str(CANONICAL_SPEC_JSON)
    }

    /// Parses a caller-supplied spec string. Exposed for tests that need a
    /// smaller or deliberately malformed graph.
    pub fn load_from_str(raw: &str) -> Result<Self, ConfigError> {
        let raw_file: RawDependencySpecFile =
            serde_json::from_str(raw).map_err(|e| ConfigError::Malformed(e.to_string()))?;

        let mut entries = BTreeMap::new();
        for (key, raw_entry) in &raw_file.dependencies {
            let doc_type = DocumentType::from_str(key)?;
            if entries.contains_key(&doc_type) {
                return Err(ConfigError::DuplicateEntry(doc_type));
            }
            let depends_on = raw_entry
                .depends_on
                .iter()
                .map(|s| DocumentType::from_str(s))
                .collect::<Result<Vec<_>, _>>()?;
            entries.insert(
                doc_type,
                DependencyEntry {
                    depends_on,
                    priority: raw_entry.priority,
                    references: raw_entry.references.clone(),
                },
            );
        }

        let mut batches = Vec::with_capacity(raw_file.generation_batches.len());
        for raw_batch in &raw_file.generation_batches {
            let documents = raw_batch
                .documents
                .iter()
                .map(|s| DocumentType::from_str(s))
                .collect::<Result<Vec<_>, _>>()?;
            batches.push(GenerationBatchSpec {
                name: raw_batch.name.clone(),
                priority: raw_batch.priority,
                documents,
                can_parallelize: raw_batch.can_parallelize,
            });
        }

        let graph = Self { entries, batches };
        graph.check_acyclic(graph.entries.keys().copied().collect())?;
        Ok(graph)
    }

    pub fn entry(&self, doc_type: DocumentType) -> Option<&DependencyEntry> {
        self.entries.get(&doc_type)
    }

    pub fn named_batches(&self) -> &[GenerationBatchSpec] {
        &self.batches
    }

    fn direct_dependencies(&self, doc_type: DocumentType) -> &[DocumentType] {
        self.entries
            .get(&doc_type)
            .map(|e| e.depends_on.as_slice())
            .unwrap_or(&[])
    }

    /// Transitive closure of dependencies.
    pub fn dependencies(&self, doc_type: DocumentType) -> BTreeSet<DocumentType> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<DocumentType> =
            self.direct_dependencies(doc_type).iter().copied().collect();
        while let Some(next) = queue.pop_front() {
            if seen.insert(next) {
                queue.extend(self.direct_dependencies(next).iter().copied());
            }
        }
        seen
    }

    /// Transitive closure of dependents (types that transitively depend on
    /// `doc_type`).
    pub fn dependents(&self, doc_type: DocumentType) -> BTreeSet<DocumentType> {
        self.entries
            .keys()
            .copied()
            .filter(|&candidate| self.dependencies(candidate).contains(&doc_type))
            .collect()
    }

    /// Reports whether `selected`'s dependencies are all present in
    /// `selected ∪ already_available`. Never rejects a selection: an
    /// incomplete dependency set is allowed, it just runs with less context.
    pub fn validate(
        &self,
        selected: &BTreeSet<DocumentType>,
        already_available: &BTreeSet<DocumentType>,
    ) -> ValidationReport {
        let mut missing_dependencies = BTreeSet::new();
        let mut warnings = Vec::new();
        for &doc_type in selected {
            for dep in self.direct_dependencies(doc_type) {
                if !selected.contains(dep) && !already_available.contains(dep) {
                    missing_dependencies.insert(*dep);
                    warnings.push(format!(
                        "{doc_type} depends on {dep}, which is neither selected nor already generated; it will run without that context"
                    ));
                }
            }
        }
        ValidationReport {
            complete: missing_dependencies.is_empty(),
            missing_dependencies,
            warnings,
        }
    }

    /// Kahn's algorithm restricted to the induced subgraph over `available`
    /// (the set of document types eligible to run this job: the selection
    /// plus whatever is already resolvable from the store). Within a batch,
    /// ties are broken by `(priority, type name)` ascending for
    /// deterministic test runs.
    pub fn plan(&self, available: &BTreeSet<DocumentType>) -> Result<Vec<Vec<DocumentType>>, ConfigError> {
        let mut in_degree: BTreeMap<DocumentType, usize> = BTreeMap::new();
        let mut dependents_of: BTreeMap<DocumentType, Vec<DocumentType>> = BTreeMap::new();

        for &doc_type in available {
            let deps_in_set: Vec<DocumentType> = self
                .direct_dependencies(doc_type)
                .iter()
                .copied()
                .filter(|d| available.contains(d))
                .collect();
            in_degree.insert(doc_type, deps_in_set.len());
            for dep in deps_in_set {
                dependents_of.entry(dep).or_default().push(doc_type);
            }
        }

        let mut batches = Vec::new();
        let mut remaining = in_degree.clone();

        while !remaining.is_empty() {
            let mut ready: Vec<DocumentType> = remaining
                .iter()
                .filter(|(_, &deg)| deg == 0)
                .map(|(&t, _)| t)
                .collect();

            if ready.is_empty() {
                let stuck: Vec<DocumentType> = remaining.keys().copied().collect();
                return Err(ConfigError::Cycle(stuck));
            }

            ready.sort_by_key(|t| (self.entries.get(t).map(|e| e.priority).unwrap_or(u32::MAX), t.as_str()));

            for doc_type in &ready {
                remaining.remove(doc_type);
            }
            for doc_type in &ready {
                for dependent in dependents_of.get(doc_type).into_iter().flatten() {
                    if let Some(deg) = remaining.get_mut(dependent) {
                        *deg = deg.saturating_sub(1);
                    }
                }
            }

            batches.push(ready);
        }

        Ok(batches)
    }

    fn check_acyclic(&self, available: BTreeSet<DocumentType>) -> Result<(), ConfigError> {
        self.plan(&available).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_spec_loads_and_is_acyclic() {
        let graph = DependencyGraph::load().unwrap();
        let all: BTreeSet<DocumentType> = DocumentType::ALL.iter().copied().collect();
        let batches = graph.plan(&all).unwrap();
        let planned_count: usize = batches.iter().map(Vec::len).sum();
        assert_eq!(planned_count, DocumentType::ALL.len());
    }

    #[test]
    fn sources_sought_has_no_dependencies_and_runs_first_batch() {
        let graph = DependencyGraph::load().unwrap();
        let all: BTreeSet<DocumentType> = DocumentType::ALL.iter().copied().collect();
        let batches = graph.plan(&all).unwrap();
        assert!(batches[0].contains(&DocumentType::SourcesSought));
        assert!(batches[0].contains(&DocumentType::Rfi));
    }

    #[test]
    fn award_notification_depends_transitively_on_market_research() {
        let graph = DependencyGraph::load().unwrap();
        let deps = graph.dependencies(DocumentType::AwardNotification);
        assert!(deps.contains(&DocumentType::MarketResearchReport));
    }

    #[test]
    fn market_research_report_is_a_dependent_of_sources_sought() {
        let graph = DependencyGraph::load().unwrap();
        let dependents = graph.dependents(DocumentType::SourcesSought);
        assert!(dependents.contains(&DocumentType::MarketResearchReport));
    }

    #[test]
    fn detects_cycle_in_malformed_spec() {
        let cyclic = r#"{
            "dependencies": {
                "pws": { "depends_on": ["sow"], "priority": 1, "references": [] },
                "sow": { "depends_on": ["pws"], "priority": 1, "references": [] }
            },
            "generation_batches": []
        }"#;
        let err = DependencyGraph::load_from_str(cyclic).unwrap_err();
        assert!(matches!(err, ConfigError::Cycle(_)));
    }

    #[test]
    fn validate_warns_on_missing_dependency_without_rejecting() {
        let graph = DependencyGraph::load().unwrap();
        let selected: BTreeSet<DocumentType> = [DocumentType::Pws].into_iter().collect();
        let available = BTreeSet::new();
        let report = graph.validate(&selected, &available);
        assert!(!report.complete);
        assert!(report.missing_dependencies.contains(&DocumentType::AcquisitionPlan));
        assert!(!report.warnings.is_empty());
    }

    #[test]
    fn plan_tie_breaks_deterministically_within_a_batch() {
        let graph = DependencyGraph::load().unwrap();
        let available: BTreeSet<DocumentType> = [DocumentType::SourcesSought, DocumentType::Rfi]
            .into_iter()
            .collect();
        let batches = graph.plan(&available).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0], vec![DocumentType::Rfi, DocumentType::SourcesSought]);
    }

    proptest::proptest! {
        #[test]
        fn random_acyclic_subsets_always_plan_successfully(indices in proptest::collection::vec(0usize..DocumentType::ALL.len(), 0..DocumentType::ALL.len())) {
            let graph = DependencyGraph::load().unwrap();
            let available: BTreeSet<DocumentType> = indices.into_iter().map(|i| DocumentType::ALL[i]).collect();
            // The canonical spec is acyclic by construction; any induced
            // subgraph of an acyclic graph is also acyclic.
            let result = graph.plan(&available);
            proptest::prop_assert!(result.is_ok());
        }
    }
}
