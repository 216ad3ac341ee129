//! Per-`DocumentType` field rule tables (§4.3). Not every document type
//! needs bespoke extraction rules — types with no entry here simply yield
//! an empty extraction map, which is valid per the "extraction failure
//! yields a present-but-empty map" invariant.

use super::{FieldRule, IDENTITY, normalize_date, normalize_money, normalize_percentage};
use crate::document::DocumentType;

const IGCE_RULES: &[FieldRule] = &[
    FieldRule {
        field: "total_cost",
        patterns: &[
            r"(?i)total\s+(?:estimated\s+)?cost[:\s]+\$?([\d,\.]+[MmKk]?)",
            r"\$\s?([\d,\.]+[MmKk])\b",
        ],
        normalize: normalize_money,
    },
    FieldRule {
        field: "ioc_date",
        patterns: &[
            r"(?i)(?:ioc|initial\s+operating\s+capability)\s*(?:date)?[:\s]+([A-Za-z]+\.?\s+\d{1,2},?\s+\d{4}|[A-Za-z]+\s+\d{4})",
        ],
        normalize: normalize_date,
    },
    FieldRule {
        field: "labor_rates",
        patterns: &[r"(?i)labor\s+rate[s]?[:\s]+(.+)"],
        normalize: IDENTITY,
    },
    FieldRule {
        field: "contract_type",
        patterns: &[r"(?i)contract\s+type[:\s]+([A-Za-z0-9+\-/\s]+?)(?:\.|\n|$)"],
        normalize: IDENTITY,
    },
];

const PWS_RULES: &[FieldRule] = &[
    FieldRule {
        field: "performance_requirements",
        patterns: &[r"(?i)performance\s+requirement[s]?[:\s]+(.+)"],
        normalize: IDENTITY,
    },
    FieldRule {
        field: "period_of_performance",
        patterns: &[
            r"(?i)period\s+of\s+performance[:\s]+(\d+\s*(?:month|year)s?)",
        ],
        normalize: IDENTITY,
    },
];

const SOURCES_SOUGHT_RULES: &[FieldRule] = &[
    FieldRule {
        field: "naics_code",
        patterns: &[r"(?i)naics\s*(?:code)?[:\s]+(\d{6})"],
        normalize: IDENTITY,
    },
    FieldRule {
        field: "response_deadline",
        patterns: &[
            r"(?i)response(?:s)?\s+(?:are\s+)?due[:\s]+([A-Za-z]+\s+\d{1,2},?\s+\d{4})",
        ],
        normalize: normalize_date,
    },
];

const ACQUISITION_PLAN_RULES: &[FieldRule] = &[
    FieldRule {
        field: "total_cost",
        patterns: &[r"(?i)total\s+(?:estimated\s+)?cost[:\s]+\$?([\d,\.]+[MmKk]?)"],
        normalize: normalize_money,
    },
    FieldRule {
        field: "acquisition_strategy",
        patterns: &[r"(?i)acquisition\s+strategy[:\s]+(.+)"],
        normalize: IDENTITY,
    },
];

const RFI_RULES: &[FieldRule] = &[
    FieldRule {
        field: "user_count",
        patterns: &[r"(?i)(\d[\d,]*)\s+users?\b"],
        normalize: IDENTITY,
    },
    FieldRule {
        field: "naics_code",
        patterns: &[r"(?i)naics\s*(?:code)?[:\s]+(\d{6})"],
        normalize: IDENTITY,
    },
    FieldRule {
        field: "response_deadline",
        patterns: &[
            r"(?i)response(?:s)?\s+(?:are\s+)?due[:\s]+([A-Za-z]+\s+\d{1,2},?\s+\d{4})",
        ],
        normalize: normalize_date,
    },
];

const SECTION_L_RULES: &[FieldRule] = &[FieldRule {
    field: "proposal_volume_count",
    patterns: &[r"(?i)(\d+)\s+volume[s]?\b"],
    normalize: IDENTITY,
}];

const SECTION_M_RULES: &[FieldRule] = &[FieldRule {
    field: "evaluation_factor_weight",
    patterns: &[r"(?i)weight(?:ed)?[:\s]+(\d{1,3}%)"],
    normalize: normalize_percentage,
}];

const EVALUATION_SCORECARD_RULES: &[FieldRule] = &[FieldRule {
    field: "overall_rating",
    patterns: &[r"(?i)overall\s+rating[:\s]+([A-Za-z]+)"],
    normalize: IDENTITY,
}];

const AWARD_NOTIFICATION_RULES: &[FieldRule] = &[
    FieldRule {
        field: "awardee",
        patterns: &[r"(?i)award(?:ed)?\s+to[:\s]+(.+)"],
        normalize: IDENTITY,
    },
    FieldRule {
        field: "award_amount",
        patterns: &[r"(?i)award\s+amount[:\s]+\$?([\d,\.]+[MmKk]?)"],
        normalize: normalize_money,
    },
];

/// Returns the rule table declared for `doc_type`, or an empty slice for
/// types without bespoke extraction rules.
pub fn rules_for(doc_type: DocumentType) -> &'static [FieldRule] {
    match doc_type {
        DocumentType::Igce => IGCE_RULES,
        DocumentType::Pws | DocumentType::Sow | DocumentType::Soo => PWS_RULES,
        DocumentType::SourcesSought => SOURCES_SOUGHT_RULES,
        DocumentType::Rfi => RFI_RULES,
        DocumentType::AcquisitionPlan => ACQUISITION_PLAN_RULES,
        DocumentType::SectionL => SECTION_L_RULES,
        DocumentType::SectionM => SECTION_M_RULES,
        DocumentType::EvaluationScorecard | DocumentType::TechnicalEvaluationReport => {
            EVALUATION_SCORECARD_RULES
        }
        DocumentType::AwardNotification => AWARD_NOTIFICATION_RULES,
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfi_rules_extract_user_count() {
        let text = "This program supports 1,250 users across three bases.";
        let out = super::super::extract_fields(DocumentType::Rfi, text, &["user_count"]);
        assert_eq!(out.get("user_count").map(String::as_str), Some("1,250"));
    }

    #[test]
    fn types_without_rules_yield_empty_extraction() {
        assert!(rules_for(DocumentType::Ssdd).is_empty());
    }
}
