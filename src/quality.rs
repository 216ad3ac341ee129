//! The `QualityEvaluator` (§4.8): scores a generated document across five
//! axes and combines them into an overall score, grade, and hallucination
//! risk bucket.

use std::sync::LazyLock;

use regex::Regex;

use crate::citation::CitationValidator;
use crate::document::{Grade, HallucinationRisk};

/// Axis weights (open question in the design notes, resolved in
/// SPEC_FULL.md §5.9): hallucination and citation/compliance dominate
/// because an uncited or fabricated claim in a DoD acquisition document is
/// the costliest failure mode.
pub const WEIGHT_HALLUCINATION: f32 = 0.30;
pub const WEIGHT_VAGUENESS: f32 = 0.15;
pub const WEIGHT_CITATIONS: f32 = 0.20;
pub const WEIGHT_COMPLIANCE: f32 = 0.20;
pub const WEIGHT_COMPLETENESS: f32 = 0.15;

const HEDGE_WORDS: &[&str] = &[
    "appropriate",
    "various",
    "as needed",
    "reasonable",
    "adequate",
    "sufficient",
    "robust",
    "best effort",
    "as applicable",
    "to be determined by the parties",
];

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+").unwrap());

#[derive(Debug, Clone)]
pub struct QualityReport {
    pub hallucination: f32,
    pub vagueness: f32,
    pub citations: f32,
    pub compliance: f32,
    pub completeness: f32,
    pub overall: f32,
    pub grade: Grade,
    pub risk: HallucinationRisk,
    pub suggestions: Vec<String>,
}

pub struct QualityEvaluator;

impl QualityEvaluator {
    /// `reference_texts` is the combined content of retrieved chunks and any
    /// upstream documents this agent conditioned on — used as the
    /// hallucination check's grounding corpus.
    pub fn evaluate(
        content: &str,
        reference_texts: &[&str],
        required_boilerplate: &[&str],
        tbd_count: usize,
        total_placeholders: usize,
    ) -> QualityReport {
        let hallucination = Self::hallucination_score(content, reference_texts);
        let vagueness = Self::vagueness_score(content);
        let citation_report = CitationValidator::score(content);
        let citations = citation_report.score;
        let compliance = Self::compliance_score(content, required_boilerplate);
        let completeness = Self::completeness_score(tbd_count, total_placeholders);

        let overall = hallucination * WEIGHT_HALLUCINATION
            + vagueness * WEIGHT_VAGUENESS
            + citations * WEIGHT_CITATIONS
            + compliance * WEIGHT_COMPLIANCE
            + completeness * WEIGHT_COMPLETENESS;

        let mut suggestions = Vec::new();
        if hallucination < 85.0 {
            suggestions.push(
                "Cross-check unsupported claims against retrieved chunks or upstream documents."
                    .to_string(),
            );
        }
        if vagueness < 75.0 {
            suggestions.push("Replace hedging language with concrete, sourced values.".to_string());
        }
        suggestions.extend(citation_report.issues.iter().cloned());
        if compliance < 75.0 {
            suggestions.push("Add the required boilerplate/regulatory references for this document type.".to_string());
        }
        if completeness < 90.0 {
            suggestions.push(format!(
                "{tbd_count} of {total_placeholders} placeholders remain TBD; resolve with upstream data or smart defaults."
            ));
        }

        QualityReport {
            hallucination,
            vagueness,
            citations,
            compliance,
            completeness,
            overall,
            grade: Grade::from_score(overall),
            risk: HallucinationRisk::from_hallucination_axis(hallucination),
            suggestions,
        }
    }

    /// Samples factual-looking sentences from `content` and checks whether
    /// their key terms appear anywhere in the reference corpus. Sentences
    /// with no overlap at all are treated as unsupported.
    fn hallucination_score(content: &str, reference_texts: &[&str]) -> f32 {
        let reference_blob = reference_texts.join(" ").to_lowercase();
        let sentences: Vec<&str> = content
            .split(['.', '\n'])
            .map(str::trim)
            .filter(|s| s.len() > 20)
            .collect();
        if sentences.is_empty() {
            return 100.0;
        }
        if reference_blob.trim().is_empty() {
            // No grounding corpus at all: cannot evaluate hallucination risk
            // directly, so fall back to a neutral-low score rather than a
            // false "fully grounded" claim.
            return 60.0;
        }
        let mut supported = 0usize;
        for sentence in &sentences {
            let tokens: Vec<&str> = sentence
                .split_whitespace()
                .filter(|w| w.len() > 4)
                .collect();
            if tokens.is_empty() {
                supported += 1;
                continue;
            }
            let hits = tokens
                .iter()
                .filter(|t| reference_blob.contains(&t.to_lowercase()))
                .count();
            if hits as f32 / tokens.len() as f32 >= 0.2 {
                supported += 1;
            }
        }
        100.0 * supported as f32 / sentences.len() as f32
    }

    fn vagueness_score(content: &str) -> f32 {
        let lower = content.to_lowercase();
        let word_count = WORD_RE.find_iter(content).count().max(1);
        let hedge_hits: usize = HEDGE_WORDS
            .iter()
            .map(|w| lower.matches(w).count())
            .sum();
        let density_per_1000 = hedge_hits as f32 * 1000.0 / word_count as f32;
        (100.0 - density_per_1000 * 8.0).clamp(0.0, 100.0)
    }

    fn compliance_score(content: &str, required_boilerplate: &[&str]) -> f32 {
        if required_boilerplate.is_empty() {
            return 100.0;
        }
        let lower = content.to_lowercase();
        let present = required_boilerplate
            .iter()
            .filter(|b| lower.contains(&b.to_lowercase()))
            .count();
        100.0 * present as f32 / required_boilerplate.len() as f32
    }

    fn completeness_score(tbd_count: usize, total_placeholders: usize) -> f32 {
        if total_placeholders == 0 {
            return 100.0;
        }
        (1.0 - tbd_count as f32 / total_placeholders as f32).clamp(0.0, 1.0) * 100.0
    }
}
