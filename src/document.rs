//! Core data model shared by every component (§3 of the design).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConfigError;

/// The closed enumeration of procurement artifact kinds the system can
/// produce. Ordering here is insertion order, not significance; callers that
/// need a stable sort key use `priority` from the dependency spec instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    SourcesSought,
    Rfi,
    MarketResearchReport,
    AcquisitionPlan,
    Igce,
    JustificationAndApproval,
    Pws,
    Sow,
    Soo,
    Qasp,
    QualityAssurancePlan,
    ContractDataRequirementsList,
    SourceSelectionPlan,
    SectionL,
    SectionM,
    Sf33,
    Sf26,
    Ssp,
    Ssdd,
    SmallBusinessSubcontractingPlan,
    EvaluationScorecard,
    TechnicalEvaluationReport,
    CostPriceAnalysisMemo,
    PastPerformanceQuestionnaire,
    ContractingOfficerDeterminationMemo,
    AwardNotification,
    Amendment,
    Ppq,
    TransitionPlan,
}

impl DocumentType {
    pub const ALL: &'static [DocumentType] = &[
        DocumentType::SourcesSought,
        DocumentType::Rfi,
        DocumentType::MarketResearchReport,
        DocumentType::AcquisitionPlan,
        DocumentType::Igce,
        DocumentType::JustificationAndApproval,
        DocumentType::Pws,
        DocumentType::Sow,
        DocumentType::Soo,
        DocumentType::Qasp,
        DocumentType::QualityAssurancePlan,
        DocumentType::ContractDataRequirementsList,
        DocumentType::SourceSelectionPlan,
        DocumentType::SectionL,
        DocumentType::SectionM,
        DocumentType::Sf33,
        DocumentType::Sf26,
        DocumentType::Ssp,
        DocumentType::Ssdd,
        DocumentType::SmallBusinessSubcontractingPlan,
        DocumentType::EvaluationScorecard,
        DocumentType::TechnicalEvaluationReport,
        DocumentType::CostPriceAnalysisMemo,
        DocumentType::PastPerformanceQuestionnaire,
        DocumentType::ContractingOfficerDeterminationMemo,
        DocumentType::AwardNotification,
        DocumentType::Amendment,
        DocumentType::Ppq,
        DocumentType::TransitionPlan,
    ];

    /// Stable snake_case key, used as the on-disk/config identifier and as
    /// the `{type}` component of `DocId`.
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::SourcesSought => "sources_sought",
            DocumentType::Rfi => "rfi",
            DocumentType::MarketResearchReport => "market_research_report",
            DocumentType::AcquisitionPlan => "acquisition_plan",
            DocumentType::Igce => "igce",
            DocumentType::JustificationAndApproval => "justification_and_approval",
            DocumentType::Pws => "pws",
            DocumentType::Sow => "sow",
            DocumentType::Soo => "soo",
            DocumentType::Qasp => "qasp",
            DocumentType::QualityAssurancePlan => "quality_assurance_plan",
            DocumentType::ContractDataRequirementsList => "cdrl",
            DocumentType::SourceSelectionPlan => "source_selection_plan",
            DocumentType::SectionL => "section_l",
            DocumentType::SectionM => "section_m",
            DocumentType::Sf33 => "sf33",
            DocumentType::Sf26 => "sf26",
            DocumentType::Ssp => "ssp",
            DocumentType::Ssdd => "ssdd",
            DocumentType::SmallBusinessSubcontractingPlan => "small_business_subcontracting_plan",
            DocumentType::EvaluationScorecard => "evaluation_scorecard",
            DocumentType::TechnicalEvaluationReport => "technical_evaluation_report",
            DocumentType::CostPriceAnalysisMemo => "cost_price_analysis_memo",
            DocumentType::PastPerformanceQuestionnaire => "past_performance_questionnaire",
            DocumentType::ContractingOfficerDeterminationMemo => "co_determination_memo",
            DocumentType::AwardNotification => "award_notification",
            DocumentType::Amendment => "amendment",
            DocumentType::Ppq => "ppq",
            DocumentType::TransitionPlan => "transition_plan",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownType(s.to_string()))
    }
}

/// Similarity score in `[0, 1]`. A newtype so a malformed retriever
/// implementation can't smuggle an out-of-range value past construction.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Similarity(f32);

impl Similarity {
    pub fn new(value: f32) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

/// A retrieved snippet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub source: String,
    pub score: Similarity,
}

impl Chunk {
    pub fn new(content: impl Into<String>, source: impl Into<String>, score: f32) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
            score: Similarity::new(score),
        }
    }
}

/// Ordered sequence of `Chunk`, descending by similarity, length bounded by
/// the caller's requested `k`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub chunks: Vec<Chunk>,
}

impl RetrievalResult {
    pub fn combined_text(&self) -> String {
        self.chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

pub type AssumptionId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assumption {
    pub text: String,
    pub category: String,
    pub linked_document_types: Vec<DocumentType>,
}

/// Mapping from `assumption_id` to `Assumption`. A `BTreeMap` because
/// insertion order is explicitly irrelevant and deterministic iteration is
/// required for reproducible prompts.
pub type AssumptionSet = BTreeMap<AssumptionId, Assumption>;

/// A program-identifying scalar. The distilled spec describes
/// `ProjectInfo` as a free-form `key -> value` map of scalars or strings;
/// this closed enum gives downstream code a typed getter instead of a
/// free-form probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProjectValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl ProjectValue {
    pub fn as_text(&self) -> String {
        match self {
            ProjectValue::Text(s) => s.clone(),
            ProjectValue::Number(n) => n.to_string(),
            ProjectValue::Date(d) => d.format("%B %Y").to_string(),
        }
    }
}

/// Program-identifying data. At minimum `program_name` is required;
/// enforced in `ProjectInfo::new`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInfo {
    fields: BTreeMap<String, ProjectValue>,
}

impl ProjectInfo {
    pub const PROGRAM_NAME_KEY: &'static str = "program_name";

    pub fn new(fields: BTreeMap<String, ProjectValue>) -> Result<Self, ConfigError> {
        match fields.get(Self::PROGRAM_NAME_KEY) {
            Some(ProjectValue::Text(s)) if !s.trim().is_empty() => Ok(Self { fields }),
            _ => Err(ConfigError::MissingProjectField(
                Self::PROGRAM_NAME_KEY.to_string(),
            )),
        }
    }

    pub fn program_name(&self) -> &str {
        match self.fields.get(Self::PROGRAM_NAME_KEY) {
            Some(ProjectValue::Text(s)) => s.as_str(),
            _ => unreachable!("validated at construction"),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ProjectValue> {
        self.fields.get(key)
    }

    pub fn program_slug(&self) -> String {
        self.program_name()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '-'
                }
            })
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }
}

/// Globally unique, stable document identifier:
/// `{type}_{program_slug}_{iso_date}_{nonce}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(String);

impl DocId {
    pub fn new(doc_type: DocumentType, program_slug: &str, created_at: DateTime<Utc>) -> Self {
        let nonce = Uuid::new_v4().simple().to_string();
        let nonce = &nonce[..8];
        Self(format!(
            "{}_{}_{}_{}",
            doc_type.as_str(),
            program_slug,
            created_at.format("%Y-%m-%d"),
            nonce
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub type ExtractedFields = BTreeMap<String, String>;

/// `{agent_name, generation_strategy, word_count, tbd_count, iterations_used,
/// final_score, grade, risk}` plus failure bookkeeping the orchestrator needs
/// to render `status=failed` sections (§7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub agent_name: String,
    pub generation_strategy: String,
    pub word_count: usize,
    pub tbd_count: usize,
    pub iterations_used: u32,
    pub final_score: f32,
    pub grade: Grade,
    pub risk: HallucinationRisk,
    pub status: DocumentStatus,
    pub warnings: Vec<String>,
    pub persisted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_score(score: f32) -> Self {
        if score >= 90.0 {
            Grade::A
        } else if score >= 75.0 {
            Grade::B
        } else if score >= 60.0 {
            Grade::C
        } else if score >= 40.0 {
            Grade::D
        } else {
            Grade::F
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HallucinationRisk {
    Low,
    Moderate,
    High,
}

impl HallucinationRisk {
    pub fn from_hallucination_axis(score: f32) -> Self {
        if score >= 85.0 {
            HallucinationRisk::Low
        } else if score >= 60.0 {
            HallucinationRisk::Moderate
        } else {
            HallucinationRisk::High
        }
    }
}

/// A fully-formed generated document, as persisted to the `MetadataStore`
/// and cached in the `ContextPool`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedDocument {
    pub doc_id: DocId,
    pub doc_type: DocumentType,
    pub program: String,
    pub content: String,
    pub extracted_data: ExtractedFields,
    pub references: BTreeMap<DocumentType, DocId>,
    pub metadata: DocumentMetadata,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_type_round_trips_through_str() {
        for t in DocumentType::ALL {
            assert_eq!(DocumentType::from_str(t.as_str()).unwrap(), *t);
        }
    }

    #[test]
    fn unknown_document_type_is_rejected() {
        assert!(DocumentType::from_str("not_a_real_type").is_err());
    }

    #[test]
    fn similarity_clamps_out_of_range_values() {
        assert_eq!(Similarity::new(1.5).get(), 1.0);
        assert_eq!(Similarity::new(-0.2).get(), 0.0);
    }

    #[test]
    fn project_info_requires_program_name() {
        let mut fields = BTreeMap::new();
        fields.insert("foo".to_string(), ProjectValue::Text("bar".to_string()));
        assert!(ProjectInfo::new(fields).is_err());
    }

    #[test]
    fn program_slug_normalizes_punctuation() {
        let mut fields = BTreeMap::new();
        fields.insert(
            ProjectInfo::PROGRAM_NAME_KEY.to_string(),
            ProjectValue::Text("Advanced Logistics Mgmt System (ALMS)".to_string()),
        );
        let info = ProjectInfo::new(fields).unwrap();
        assert_eq!(info.program_slug(), "advanced-logistics-mgmt-system-alms");
    }

    #[test]
    fn grade_buckets_match_spec_thresholds() {
        assert_eq!(Grade::from_score(95.0), Grade::A);
        assert_eq!(Grade::from_score(80.0), Grade::B);
        assert_eq!(Grade::from_score(65.0), Grade::C);
        assert_eq!(Grade::from_score(45.0), Grade::D);
        assert_eq!(Grade::from_score(10.0), Grade::F);
    }

    #[test]
    fn hallucination_risk_buckets() {
        assert_eq!(
            HallucinationRisk::from_hallucination_axis(90.0),
            HallucinationRisk::Low
        );
        assert_eq!(
            HallucinationRisk::from_hallucination_axis(70.0),
            HallucinationRisk::Moderate
        );
        assert_eq!(
            HallucinationRisk::from_hallucination_axis(10.0),
            HallucinationRisk::High
        );
    }
}
