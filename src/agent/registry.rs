//! Builds the ~30 concrete `AgentSpec`s (§4.6 "Concrete agent variants").
//! Dependencies and baseline retrieval queries are derived from the
//! `DependencyGraph`'s own dependency entries so the two data sources never
//! drift apart; templates, extractor field lists, required boilerplate, and
//! smart-default generators are declared per type.

use std::collections::BTreeMap;

use crate::document::DocumentType;
use crate::extractor::patterns;
use crate::graph::DependencyGraph;

use super::smart_defaults::{self, SmartDefaultFn};
use super::AgentSpec;

/// Builds one query per declared upstream reference label, plus a generic
/// fallback query so every agent issues at least 3 (§4.6: "3–5 pre-declared
/// semantic queries").
fn queries_for(doc_type: DocumentType, references: &[String]) -> Vec<String> {
    let mut queries: Vec<String> = references
        .iter()
        .map(|r| format!("{{program}} {r}"))
        .collect();
    queries.push(format!("{{program}} {} regulatory requirements", doc_type.as_str().replace('_', " ")));
    queries.push(format!("{{program}} {} prior program examples", doc_type.as_str().replace('_', " ")));
    queries.truncate(5);
    while queries.len() < 3 {
        queries.push(format!("{{program}} {} background", doc_type.as_str().replace('_', " ")));
    }
    queries
}

fn extractor_fields_for(doc_type: DocumentType) -> Vec<String> {
    patterns::rules_for(doc_type)
        .iter()
        .map(|r| r.field.to_string())
        .collect()
}

fn generic_template(doc_type: DocumentType, fields: &[String]) -> String {
    let title = doc_type.as_str().replace('_', " ");
    let mut body = format!(
        "# {title} — {{{{program_name}}}}\n\n\
        ## Purpose\n\
        This {title} supports the {{{{program_name}}}} acquisition.\n\n\
        ## Key Details\n"
    );
    if fields.is_empty() {
        body.push_str("_No structured fields are extracted for this document type; content is narrative._\n");
    } else {
        for field in fields {
            body.push_str(&format!("- **{field}**: {{{{{field}}}}}\n"));
        }
    }
    body
}

fn igce_template() -> String {
    "# Independent Government Cost Estimate — {{program_name}}\n\n\
    ## Summary\n\
    Total estimated cost: {{total_cost}}. Initial operating capability: {{ioc_date}}. Contract type: {{contract_type}}.\n\n\
    ## Labor Rates\n{{labor_rates}}\n\n\
    ## Labor Category Table\n{{labor_category_table}}\n\n\
    ## WBS Labor Table\n{{wbs_labor_table}}\n\n\
    ## Hardware\n{{hardware_table}}\n\n\
    ## Software Licensing\n{{software_license_table}}\n\n\
    ## Cloud Infrastructure\n{{cloud_infra_table}}\n\n\
    ## Travel\n{{travel_table}}\n\n\
    ## Training\n{{training_table}}\n\n\
    ## Risk Assessment\n{{risk_assessment_table}}\n"
        .to_string()
}

fn pws_template() -> String {
    "# Performance Work Statement — {{program_name}}\n\n\
    ## Performance Requirements\n{{performance_requirements}}\n\n\
    ## Period of Performance\n{{period_of_performance}}\n\n\
    ## Applicable Regulations\n\
    This PWS incorporates FAR 52.212-4 and DFARS 252.204-7012 by reference.\n"
        .to_string()
}

fn sources_sought_template() -> String {
    "# Sources Sought Notice — {{program_name}}\n\n\
    ## Background\n\
    The Government is conducting market research for {{program_name}} per FAR 10.001.\n\n\
    ## Response Instructions\n\
    Interested vendors shall respond per the instructions in this notice.\n"
        .to_string()
}

fn section_l_template() -> String {
    "# Section L — Instructions to Offerors — {{program_name}}\n\n\
    ## Proposal Volumes\n{{proposal_volume_count}}\n\n\
    ## Submission Instructions\n\
    Offerors shall submit proposals per FAR 15.204-5.\n"
        .to_string()
}

fn section_m_template() -> String {
    "# Section M — Evaluation Factors for Award — {{program_name}}\n\n\
    ## Evaluation Factor Weighting\n{{evaluation_factor_weight}}\n\n\
    ## Basis for Award\n\
    Award will be made per FAR 15.101 on a best-value tradeoff basis.\n"
        .to_string()
}

fn ssdd_template() -> String {
    "# Source Selection Decision Document — {{program_name}}\n\n\
    ## Selection Rationale\n\
    The Source Selection Authority's decision is documented per FAR 15.308.\n\n\
    ## Overall Rating Summary\n{{overall_rating}}\n"
        .to_string()
}

fn award_notification_template() -> String {
    "# Award Notification — {{program_name}}\n\n\
    ## Award Summary\n\
    Awarded to: {{awardee}}. Award amount: {{award_amount}}.\n\n\
    ## Notification of Unsuccessful Offerors\n\
    Unsuccessful offerors will be notified per FAR 15.503.\n"
        .to_string()
}

fn required_boilerplate_for(doc_type: DocumentType) -> Vec<String> {
    match doc_type {
        DocumentType::Pws | DocumentType::Sow | DocumentType::Soo => {
            vec!["FAR 52.212-4".to_string(), "DFARS 252.204-7012".to_string()]
        }
        DocumentType::SourcesSought | DocumentType::Rfi => vec!["FAR 10.001".to_string()],
        DocumentType::SectionL => vec!["FAR 15.204-5".to_string()],
        DocumentType::SectionM => vec!["FAR 15.101".to_string()],
        DocumentType::Ssdd => vec!["FAR 15.308".to_string()],
        DocumentType::AwardNotification => vec!["FAR 15.503".to_string()],
        DocumentType::Igce => vec!["GSA CALC Schedule".to_string()],
        _ => Vec::new(),
    }
}

fn smart_defaults_for(doc_type: DocumentType) -> Vec<SmartDefaultFn> {
    match doc_type {
        DocumentType::Igce => smart_defaults::igce_generators(),
        _ => Vec::new(),
    }
}

fn template_for(doc_type: DocumentType, fields: &[String]) -> String {
    match doc_type {
        DocumentType::Igce => igce_template(),
        DocumentType::Pws | DocumentType::Sow | DocumentType::Soo => pws_template(),
        DocumentType::SourcesSought => sources_sought_template(),
        DocumentType::SectionL => section_l_template(),
        DocumentType::SectionM => section_m_template(),
        DocumentType::Ssdd => ssdd_template(),
        DocumentType::AwardNotification => award_notification_template(),
        _ => generic_template(doc_type, fields),
    }
}

/// Builds the full registry, one `AgentSpec` per `DocumentType::ALL`.
pub fn build(graph: &DependencyGraph) -> BTreeMap<DocumentType, AgentSpec> {
    DocumentType::ALL
        .iter()
        .map(|&doc_type| {
            let entry = graph.entry(doc_type);
            let dependencies = entry.map(|e| e.depends_on.clone()).unwrap_or_default();
            let references = entry.map(|e| e.references.clone()).unwrap_or_default();
            let extractor_fields = extractor_fields_for(doc_type);
            let spec = AgentSpec {
                doc_type,
                queries: queries_for(doc_type, &references),
                template: template_for(doc_type, &extractor_fields),
                dependencies,
                extractor_fields,
                required_boilerplate: required_boilerplate_for(doc_type),
                smart_defaults: smart_defaults_for(doc_type),
            };
            (doc_type, spec)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_one_spec_per_document_type() {
        let graph = DependencyGraph::load().unwrap();
        let registry = build(&graph);
        assert_eq!(registry.len(), DocumentType::ALL.len());
    }

    #[test]
    fn igce_spec_carries_all_eight_smart_default_generators() {
        let graph = DependencyGraph::load().unwrap();
        let registry = build(&graph);
        let igce = &registry[&DocumentType::Igce];
        assert_eq!(igce.smart_defaults.len(), 8);
        assert!(igce.template.contains("{{labor_category_table}}"));
    }

    #[test]
    fn every_spec_issues_at_least_three_queries() {
        let graph = DependencyGraph::load().unwrap();
        let registry = build(&graph);
        for spec in registry.values() {
            assert!(spec.queries.len() >= 3, "{:?} has too few queries", spec.doc_type);
        }
    }

    #[test]
    fn dependencies_match_the_dependency_graph() {
        let graph = DependencyGraph::load().unwrap();
        let registry = build(&graph);
        let pws_spec = &registry[&DocumentType::Pws];
        assert_eq!(pws_spec.dependencies, graph.entry(DocumentType::Pws).unwrap().depends_on);
    }
}
