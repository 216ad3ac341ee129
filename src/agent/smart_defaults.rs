//! Type-specific smart-default generators (§4.6 tier 4). Each produces a
//! markdown table clearly labelled as a default, parameterized by whatever
//! of `user_count` / `period_of_performance` / `contract_type` the agent
//! managed to resolve for this document.
//!
//! Only the IGCE agent uses these today — it is the one concrete type the
//! distilled spec calls out by name (labor, WBS, hardware, software, cloud,
//! travel, training, risk tables).

use std::collections::BTreeMap;

/// Whatever upstream/rag-extracted scalars a smart-default generator can
/// draw on. Absent fields fall back to a clearly-labelled assumption.
#[derive(Debug, Clone, Default)]
pub struct SmartDefaultContext {
    pub user_count: Option<u32>,
    pub period_of_performance_months: Option<u32>,
    pub contract_type: Option<String>,
}

impl SmartDefaultContext {
    fn user_count_or_default(&self) -> u32 {
        self.user_count.unwrap_or(500)
    }

    fn period_or_default(&self) -> u32 {
        self.period_of_performance_months.unwrap_or(12)
    }

    fn contract_type_or_default(&self) -> &str {
        self.contract_type.as_deref().unwrap_or("Firm-Fixed-Price")
    }
}

pub type SmartDefaultFn = fn(&SmartDefaultContext) -> BTreeMap<String, String>;

pub fn labor_category_table(ctx: &SmartDefaultContext) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    out.insert(
        "labor_category_table".to_string(),
        format!(
            "_Smart default — GSA CALC-derived labor rates, not negotiated rates._\n\n\
            | Labor Category | Education | Years Exp | Rate ($/hr) | Source |\n\
            |---|---|---|---|---|\n\
            | Program Manager | MS | 12+ | $195 | GSA CALC Schedule |\n\
            | Senior Systems Engineer | MS+10yr | 10+ | $175 | GSA CALC Schedule |\n\
            | Software Engineer | BS | 5+ | $140 | GSA CALC Schedule |\n\
            | Quality Assurance Analyst | BS | 3+ | $110 | GSA CALC Schedule |\n\
            | Contract type assumed: {} |||||",
            ctx.contract_type_or_default()
        ),
    );
    out
}

pub fn wbs_labor_table(ctx: &SmartDefaultContext) -> BTreeMap<String, String> {
    let months = ctx.period_or_default();
    let mut out = BTreeMap::new();
    out.insert(
        "wbs_labor_table".to_string(),
        format!(
            "_Smart default — WBS labor hours assume a {months}-month period of performance._\n\n\
            | WBS Element | Labor Category | Hours |\n\
            |---|---|---|\n\
            | 1.1 Program Management | Program Manager | {} |\n\
            | 1.2 Systems Engineering | Senior Systems Engineer | {} |\n\
            | 1.3 Software Development | Software Engineer | {} |",
            months * 40,
            months * 80,
            months * 160,
        ),
    );
    out
}

pub fn hardware_table(ctx: &SmartDefaultContext) -> BTreeMap<String, String> {
    let users = ctx.user_count_or_default();
    let workstations = users.div_ceil(3);
    let mut out = BTreeMap::new();
    out.insert(
        "hardware_table".to_string(),
        format!(
            "_Smart default — hardware counts scaled to an assumed {users} users._\n\n\
            | Item | Quantity | Unit Cost | Extended Cost |\n\
            |---|---|---|---|\n\
            | Workstation | {workstations} | $1,200 | ${} |\n\
            | Network Switch | {} | $3,500 | ${} |",
            workstations * 1200,
            workstations.div_ceil(50).max(1),
            workstations.div_ceil(50).max(1) * 3500,
        ),
    );
    out
}

pub fn software_license_table(ctx: &SmartDefaultContext) -> BTreeMap<String, String> {
    let users = ctx.user_count_or_default();
    let mut out = BTreeMap::new();
    out.insert(
        "software_license_table".to_string(),
        format!(
            "_Smart default — per-seat licensing assumed for {users} users._\n\n\
            | Product | Licenses | Unit Cost/yr | Extended Cost/yr |\n\
            |---|---|---|---|\n\
            | Office Productivity Suite | {users} | $150 | ${} |\n\
            | Development Toolchain | {} | $600 | ${} |",
            users as u64 * 150,
            users.div_ceil(4),
            (users.div_ceil(4)) as u64 * 600,
        ),
    );
    out
}

pub fn cloud_infra_table(ctx: &SmartDefaultContext) -> BTreeMap<String, String> {
    let months = ctx.period_or_default();
    let mut out = BTreeMap::new();
    out.insert(
        "cloud_infra_table".to_string(),
        format!(
            "_Smart default — cloud run rate over {months} months, government community cloud pricing._\n\n\
            | Service | Monthly Cost | Total |\n\
            |---|---|---|\n\
            | Compute (GovCloud) | $8,500 | ${} |\n\
            | Storage & Backup | $1,200 | ${} |",
            8500u64 * months as u64,
            1200u64 * months as u64,
        ),
    );
    out
}

pub fn travel_table(ctx: &SmartDefaultContext) -> BTreeMap<String, String> {
    let months = ctx.period_or_default();
    let trips = (months / 3).max(1);
    let mut out = BTreeMap::new();
    out.insert(
        "travel_table".to_string(),
        format!(
            "_Smart default — one program-review trip per quarter assumed._\n\n\
            | Purpose | Trips | Cost/Trip | Total |\n\
            |---|---|---|---|\n\
            | Program Review | {trips} | $2,200 | ${} |",
            trips as u64 * 2200,
        ),
    );
    out
}

pub fn training_table(_ctx: &SmartDefaultContext) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    out.insert(
        "training_table".to_string(),
        "_Smart default — baseline onboarding training assumed._\n\n\
        | Course | Seats | Cost/Seat | Total |\n\
        |---|---|---|---|\n\
        | Program Onboarding | 10 | $400 | $4,000 |"
            .to_string(),
    );
    out
}

pub fn risk_assessment_table(ctx: &SmartDefaultContext) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    out.insert(
        "risk_assessment_table".to_string(),
        format!(
            "_Smart default — standard risk register for a {} effort; not a negotiated risk assessment._\n\n\
            | Risk | Likelihood | Impact | Mitigation |\n\
            |---|---|---|---|\n\
            | Schedule slip | Medium | Medium | Monthly IPRs |\n\
            | Key personnel turnover | Low | High | Cross-training, knowledge transfer plan |\n\
            | Requirements volatility | Medium | Medium | Configuration control board |",
            ctx.contract_type_or_default()
        ),
    );
    out
}

pub fn igce_generators() -> Vec<SmartDefaultFn> {
    vec![
        labor_category_table,
        wbs_labor_table,
        hardware_table,
        software_license_table,
        cloud_infra_table,
        travel_table,
        training_table,
        risk_assessment_table,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labor_category_table_is_labelled_as_a_default() {
        let out = labor_category_table(&SmartDefaultContext::default());
        assert!(out["labor_category_table"].contains("Smart default"));
    }

    #[test]
    fn hardware_table_scales_with_user_count() {
        let small = hardware_table(&SmartDefaultContext {
            user_count: Some(30),
            ..Default::default()
        });
        let large = hardware_table(&SmartDefaultContext {
            user_count: Some(3000),
            ..Default::default()
        });
        assert_ne!(small["hardware_table"], large["hardware_table"]);
    }

    #[test]
    fn igce_generators_returns_all_eight() {
        assert_eq!(igce_generators().len(), 8);
    }
}
