//! The `CitationValidator` (§4.7): validates DoD-approved citation formats
//! and scores citation compliance in `[0, 100]`.

use regex::Regex;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CitationKind {
    Far,
    Dfars,
    DoDInstruction,
    Usc,
    ProgramDoc,
}

#[derive(Debug, Clone)]
pub struct FoundCitation {
    pub kind: CitationKind,
    pub text: String,
    pub position: usize,
}

static FAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"FAR\s+\d+(\.\d+)+(-\d+)?").unwrap());
static DFARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"DFARS\s+\d+(\.\d+)+(-\d+)?").unwrap());
static DODI_WITH_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"DoDI\s+[\d\.]+,\s*[^(),]+\s*\(([A-Za-z]+\s+\d{1,2},\s*\d{4})\)").unwrap()
});
/// Matches any DoDI citation, with or without a trailing date. `regex` has
/// no lookaround support, so whether the date is actually present is
/// checked separately against the text immediately following each match
/// (`DODI_DATE_SUFFIX_RE`, in `score`).
static DODI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"DoDI\s+[\d\.]+(?:,\s*[^(),\n]+)?").unwrap());
static DODI_DATE_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\([A-Za-z]+\s+\d{1,2},\s*\d{4}\)").unwrap());
static USC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+\s+U\.S\.C\.\s*§\s*\d+").unwrap());
static PROGRAM_DOC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([A-Z][A-Za-z0-9 ]+,\s*[A-Za-z0-9 ]+)\)").unwrap());

/// Claims that look "factual" and therefore require a nearby citation: a
/// monetary figure, a date, a bare count, or a regulatory assertion
/// ("shall", "is required").
static FACTUAL_CLAIM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\$[\d,\.]+[MmKk]?|\b\d{4}\b|\bshall\b|\bis required\b|\bmust comply\b)")
        .unwrap()
});

const CITATION_PROXIMITY_WINDOW: usize = 160;

#[derive(Debug, Clone)]
pub struct CitationReport {
    pub score: f32,
    pub citations: Vec<FoundCitation>,
    pub issues: Vec<String>,
}

pub struct CitationValidator;

impl CitationValidator {
    pub fn find_citations(text: &str) -> Vec<FoundCitation> {
        let mut found = Vec::new();
        for m in FAR_RE.find_iter(text) {
            found.push(FoundCitation {
                kind: CitationKind::Far,
                text: m.as_str().to_string(),
                position: m.start(),
            });
        }
        for m in DFARS_RE.find_iter(text) {
            found.push(FoundCitation {
                kind: CitationKind::Dfars,
                text: m.as_str().to_string(),
                position: m.start(),
            });
        }
        for m in DODI_WITH_DATE_RE.find_iter(text) {
            found.push(FoundCitation {
                kind: CitationKind::DoDInstruction,
                text: m.as_str().to_string(),
                position: m.start(),
            });
        }
        for m in USC_RE.find_iter(text) {
            found.push(FoundCitation {
                kind: CitationKind::Usc,
                text: m.as_str().to_string(),
                position: m.start(),
            });
        }
        for m in PROGRAM_DOC_RE.find_iter(text) {
            found.push(FoundCitation {
                kind: CitationKind::ProgramDoc,
                text: m.as_str().to_string(),
                position: m.start(),
            });
        }
        found.sort_by_key(|c| c.position);
        found
    }

    /// Scores `text`'s citation compliance in `[0, 100]`, penalizing missing
    /// citations on factual claims, malformed DoDI citations missing a
    /// date, and citations placed far from the claim they support.
    pub fn score(text: &str) -> CitationReport {
        let citations = Self::find_citations(text);
        let mut issues = Vec::new();
        let mut penalty = 0.0f32;

        let dodi_missing_date = DODI_RE
            .find_iter(text)
            .filter(|m| !DODI_DATE_SUFFIX_RE.is_match(&text[m.end()..]))
            .count();
        if dodi_missing_date > 0 {
            penalty += 10.0 * dodi_missing_date as f32;
            issues.push(format!(
                "{dodi_missing_date} DoDI citation(s) missing a required (Month Day, Year) date"
            ));
        }

        let claims: Vec<_> = FACTUAL_CLAIM_RE.find_iter(text).collect();
        let mut uncited_claims = 0usize;
        let mut distant_claims = 0usize;
        for claim in &claims {
            let nearest = citations
                .iter()
                .map(|c| c.position.abs_diff(claim.start()))
                .min();
            match nearest {
                None => uncited_claims += 1,
                Some(dist) if dist > CITATION_PROXIMITY_WINDOW => distant_claims += 1,
                Some(_) => {}
            }
        }
        if uncited_claims > 0 {
            penalty += 15.0 * uncited_claims as f32;
            issues.push(format!("{uncited_claims} factual claim(s) have no nearby citation"));
        }
        if distant_claims > 0 {
            penalty += 5.0 * distant_claims as f32;
            issues.push(format!(
                "{distant_claims} factual claim(s) cite a source placed far from the claim"
            ));
        }

        let score = (100.0 - penalty).clamp(0.0, 100.0);
        CitationReport {
            score,
            citations,
            issues,
        }
    }

    /// "Inject" mode (§4.6 step 6): returns the byte ranges of factual
    /// claims that currently lack a nearby citation, for the caller to
    /// rewrite via one further model call.
    pub fn claims_needing_citation(text: &str) -> Vec<(usize, usize)> {
        let citations = Self::find_citations(text);
        FACTUAL_CLAIM_RE
            .find_iter(text)
            .filter(|claim| {
                citations
                    .iter()
                    .all(|c| c.position.abs_diff(claim.start()) > CITATION_PROXIMITY_WINDOW)
            })
            .map(|m| (m.start(), m.end()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_far_and_dfars_citations() {
        let text = "Per FAR 10.001 and DFARS 252.225-7001, the contractor shall comply.";
        let citations = CitationValidator::find_citations(text);
        assert!(citations.iter().any(|c| c.kind == CitationKind::Far));
        assert!(citations.iter().any(|c| c.kind == CitationKind::Dfars));
    }

    #[test]
    fn finds_usc_citation() {
        let text = "Authorized under 10 U.S.C. § 3201.";
        let citations = CitationValidator::find_citations(text);
        assert!(citations.iter().any(|c| c.kind == CitationKind::Usc));
    }

    #[test]
    fn dodi_without_date_is_penalized() {
        let with_date = "Per DoDI 5000.85, Major Capability Acquisition (August 6, 2020), the PM shall report.";
        let without_date = "Per DoDI 5000.85, Major Capability Acquisition, the PM shall report.";
        let scored_with = CitationValidator::score(with_date);
        let scored_without = CitationValidator::score(without_date);
        assert!(scored_without.score < scored_with.score);
    }

    #[test]
    fn uncited_factual_claim_lowers_score() {
        let cited = "The total cost is $2,500,000 (Budget Specification, FY2025).";
        let uncited = "The total cost is $2,500,000 with no source given anywhere nearby at all.";
        assert!(CitationValidator::score(uncited).score < CitationValidator::score(cited).score);
    }

    #[test]
    fn well_cited_document_scores_highly() {
        let text = "Per FAR 10.001, market research is required. The total cost is $2,500,000 (Budget Specification, FY2025).";
        let report = CitationValidator::score(text);
        assert!(report.score >= 70.0, "score was {}", report.score);
    }

    #[test]
    fn claims_needing_citation_finds_gaps() {
        let text = "Unrelated preamble text that goes on for quite a long while to push distance past the proximity window threshold easily. The cost is $500,000.";
        let gaps = CitationValidator::claims_needing_citation(text);
        assert!(!gaps.is_empty());
    }
}
