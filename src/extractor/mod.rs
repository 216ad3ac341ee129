//! The `ExtractorLibrary` (§4.3): per-document-type regex extractors that
//! pull structured fields out of free text. Extraction never raises — a
//! missing field is simply absent from the returned map (§4.3 failure
//! semantics, invariant 6 in §3).

mod normalize;
pub mod patterns;

pub use normalize::{normalize_date, normalize_money, normalize_percentage};

use crate::document::{DocumentType, ExtractedFields};

/// A single field's extraction rule: an ordered list of regex patterns
/// tried in priority order, first match wins. `normalize` is applied to
/// whatever capture group 1 produced.
pub struct FieldRule {
    pub field: &'static str,
    pub patterns: &'static [&'static str],
    pub normalize: fn(&str) -> String,
}

fn identity(s: &str) -> String {
    s.trim().to_string()
}

/// Extracts the fields declared for `doc_type` out of `text`, trying each
/// field's patterns in priority order. Fields with no match are simply
/// absent — this function never returns an `Err`.
pub fn extract_fields(doc_type: DocumentType, text: &str, fields: &[&str]) -> ExtractedFields {
    let rules = patterns::rules_for(doc_type);
    let mut out = ExtractedFields::new();
    for &wanted in fields {
        let Some(rule) = rules.iter().find(|r| r.field == wanted) else {
            continue;
        };
        if let Some(value) = try_extract_one(rule, text) {
            out.insert(rule.field.to_string(), value);
        }
    }
    out
}

/// Extracts every field `doc_type` declares a rule for, regardless of an
/// explicit field list. Used for an agent's self-extraction pass (§4.6 step
/// 7), where the full schema for the document's own type applies.
pub fn extract_all(doc_type: DocumentType, text: &str) -> ExtractedFields {
    let rules = patterns::rules_for(doc_type);
    let mut out = ExtractedFields::new();
    for rule in rules {
        if let Some(value) = try_extract_one(rule, text) {
            out.insert(rule.field.to_string(), value);
        }
    }
    out
}

fn try_extract_one(rule: &FieldRule, text: &str) -> Option<String> {
    for pattern in rule.patterns {
        let re = regex::Regex::new(pattern).expect("field patterns are compile-time constants");
        if let Some(caps) = re.captures(text) {
            let raw = caps.get(1).or_else(|| caps.get(0))?.as_str();
            return Some((rule.normalize)(raw));
        }
    }
    None
}

pub(crate) const IDENTITY: fn(&str) -> String = identity;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_fields_only_returns_requested_fields() {
        let text = "Total estimated cost: $2.5M. Period of performance: 12 months.";
        let out = extract_fields(DocumentType::Igce, text, &["total_cost"]);
        assert_eq!(out.get("total_cost").map(String::as_str), Some("$2,500,000"));
        assert!(!out.contains_key("period_of_performance"));
    }

    #[test]
    fn extract_fields_skips_unmatched_required_field() {
        let text = "No numbers here at all.";
        let out = extract_fields(DocumentType::Igce, text, &["total_cost"]);
        assert!(out.get("total_cost").is_none());
    }

    #[test]
    fn extract_all_pulls_every_declared_field_present() {
        let text = "Total estimated cost: $1.2M. IOC date: March 2026.";
        let out = extract_all(DocumentType::Igce, text);
        assert_eq!(out.get("total_cost").map(String::as_str), Some("$1,200,000"));
        assert_eq!(out.get("ioc_date").map(String::as_str), Some("March 2026"));
    }
}
