//! View renderer: pure projections from run records to display structures.
//!
//! No network calls, no mutation. Every mapping is total: unrecognized
//! statuses and risks degrade to a visible default instead of failing, so a
//! backend-added status never breaks rendering.

use crate::model::{Risk, Run, RunStatus};
use crate::store::DashboardMetrics;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

const SUMMARY_WIDTH: usize = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeTone {
    Good,
    Warn,
    Bad,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub label: String,
    pub tone: BadgeTone,
}

/// Classify a status for display. Substring matching keeps the mapping total
/// over the open status set; anything unrecognized gets a neutral badge with
/// its raw label.
pub fn status_badge(status: &RunStatus) -> Badge {
    let raw = status.as_str();
    let label = if raw.trim().is_empty() {
        "unknown".to_string()
    } else {
        raw.to_string()
    };
    let lowered = raw.to_lowercase();
    let tone = if lowered.contains("succeed") || lowered.contains("dry_run") {
        BadgeTone::Good
    } else if lowered.contains("pending") {
        BadgeTone::Warn
    } else if lowered.contains("fail") || lowered.contains("reject") {
        BadgeTone::Bad
    } else {
        BadgeTone::Neutral
    };
    Badge { label, tone }
}

pub fn risk_badge(risk: &Risk) -> Badge {
    match risk {
        Risk::High => Badge {
            label: "HIGH".to_string(),
            tone: BadgeTone::Bad,
        },
        Risk::Medium => Badge {
            label: "MEDIUM".to_string(),
            tone: BadgeTone::Warn,
        },
        _ => Badge {
            label: "LOW".to_string(),
            tone: BadgeTone::Good,
        },
    }
}

/// Reformat an RFC3339 timestamp for display; the raw string is shown
/// unchanged when it does not parse.
pub fn format_created(raw: &str) -> String {
    let fmt = time::macros::format_description!("[year]-[month]-[day] [hour]:[minute]");
    OffsetDateTime::parse(raw, &Rfc3339)
        .ok()
        .and_then(|dt| dt.format(&fmt).ok())
        .unwrap_or_else(|| raw.to_string())
}

fn truncate_summary(summary: &str) -> String {
    if summary.chars().count() > SUMMARY_WIDTH {
        let head: String = summary.chars().take(SUMMARY_WIDTH).collect();
        format!("{head}…")
    } else {
        summary.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct RunRow {
    pub run_id: String,
    pub environment: String,
    pub created: String,
    pub skill: String,
    pub summary: String,
    pub requested_by: String,
    pub role: String,
    pub status: Badge,
}

pub fn run_rows(runs: &[Run]) -> Vec<RunRow> {
    runs.iter()
        .map(|r| RunRow {
            run_id: r.run_id.clone(),
            environment: r.environment.clone(),
            created: format_created(&r.created_at),
            skill: r.plan.intent.skill.clone(),
            summary: truncate_summary(&r.plan.intent.summary),
            requested_by: r.requested_by.clone(),
            role: r.role.clone(),
            status: status_badge(&r.status),
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct StepView {
    pub id: String,
    pub title: String,
    pub action: String,
    pub tool: String,
    pub safe: bool,
}

#[derive(Debug, Clone)]
pub struct PlanView {
    pub skill: String,
    pub summary: String,
    pub approval_note: String,
    pub requested_by: String,
    pub environment: String,
    pub status: Badge,
    pub risk: Badge,
    pub steps: Vec<StepView>,
}

pub fn plan_view(run: &Run) -> PlanView {
    let approval_note = if run.approval_required {
        "Approval required before execution.".to_string()
    } else {
        "No approval required. Dry-run executes automatically.".to_string()
    };
    PlanView {
        skill: run.plan.intent.skill.clone(),
        summary: run.plan.intent.summary.clone(),
        approval_note,
        requested_by: run.requested_by.clone(),
        environment: run.environment.clone(),
        status: status_badge(&run.status),
        risk: risk_badge(&run.plan.intent.risk),
        steps: run
            .plan
            .steps
            .iter()
            .map(|s| StepView {
                id: s.id.clone(),
                title: s.title.clone(),
                action: s.action.clone(),
                tool: s.tool.clone(),
                safe: s.safe,
            })
            .collect(),
    }
}

/// Key/value panel for the run-detail view.
pub fn detail_view(run: &Run) -> Vec<(String, String)> {
    vec![
        ("Run".to_string(), run.run_id.clone()),
        ("Skill".to_string(), run.plan.intent.skill.clone()),
        ("Summary".to_string(), run.plan.intent.summary.clone()),
        (
            "Risk".to_string(),
            run.plan.intent.risk.as_str().to_string(),
        ),
        (
            "Approval".to_string(),
            if run.approval_required {
                "required".to_string()
            } else {
                "not required".to_string()
            },
        ),
        (
            "Requested by".to_string(),
            format!("{} ({})", run.requested_by, run.role),
        ),
        ("Environment".to_string(), run.environment.clone()),
        ("Created".to_string(), format_created(&run.created_at)),
        ("Status".to_string(), status_badge(&run.status).label),
    ]
}

pub fn evidence_json(run: &Run) -> String {
    serde_json::to_string_pretty(&run.evidence).unwrap_or_else(|_| "[]".to_string())
}

#[derive(Debug, Clone)]
pub struct ApprovalCard {
    pub run_id: String,
    pub skill: String,
    pub summary: String,
    pub risk: Badge,
    pub requested_by: String,
    pub role: String,
    pub environment: String,
    pub status: Badge,
}

pub fn approval_cards(pending: &[Run]) -> Vec<ApprovalCard> {
    pending
        .iter()
        .map(|r| ApprovalCard {
            run_id: r.run_id.clone(),
            skill: r.plan.intent.skill.clone(),
            summary: r.plan.intent.summary.clone(),
            risk: risk_badge(&r.plan.intent.risk),
            requested_by: r.requested_by.clone(),
            role: r.role.clone(),
            environment: r.environment.clone(),
            status: status_badge(&r.status),
        })
        .collect()
}

// Text-mode line builders for the scripting CLI.

pub fn metrics_lines(m: &DashboardMetrics) -> Vec<String> {
    vec![
        format!("Total runs:        {}", m.total_runs),
        format!("Pending approvals: {}", m.pending_approvals),
        format!(
            "Last status:       {}",
            m.last_status
                .as_ref()
                .map(|s| status_badge(s).label)
                .unwrap_or_else(|| "—".to_string())
        ),
    ]
}

pub fn run_list_lines(runs: &[Run]) -> Vec<String> {
    if runs.is_empty() {
        return vec!["No runs yet.".to_string()];
    }
    let mut lines = vec![format!(
        "{:<14} {:<6} {:<17} {:<22} {:<18} {}",
        "RUN", "ENV", "CREATED", "SKILL", "STATUS", "SUMMARY"
    )];
    for row in run_rows(runs) {
        lines.push(format!(
            "{:<14} {:<6} {:<17} {:<22} {:<18} {}",
            row.run_id, row.environment, row.created, row.skill, row.status.label, row.summary
        ));
    }
    lines
}

pub fn plan_lines(run: &Run) -> Vec<String> {
    let view = plan_view(run);
    let mut lines = vec![
        format!("{} • {}", view.skill, view.summary),
        format!(
            "risk {} • env {} • status {} • requested by {}",
            view.risk.label, view.environment, view.status.label, view.requested_by
        ),
        view.approval_note,
        String::new(),
    ];
    for step in &view.steps {
        lines.push(format!("{} • {}", step.id, step.title));
        lines.push(format!("  {}", step.action));
        lines.push(format!(
            "  tool: {} • safe: {}",
            step.tool,
            if step.safe { "yes" } else { "no" }
        ));
    }
    lines
}

pub fn detail_lines(run: &Run) -> Vec<String> {
    let mut lines: Vec<String> = detail_view(run)
        .into_iter()
        .map(|(k, v)| format!("{k:<13} {v}"))
        .collect();
    lines.push(String::new());
    lines.push("Evidence:".to_string());
    lines.extend(evidence_json(run).lines().map(str::to_string));
    lines
}

pub fn approval_lines(pending: &[Run]) -> Vec<String> {
    if pending.is_empty() {
        return vec!["No pending approvals.".to_string()];
    }
    let mut lines = Vec::new();
    for card in approval_cards(pending) {
        lines.push(format!("{} • {}", card.skill, card.run_id));
        lines.push(format!("  {} — {} risk", card.summary, card.risk.label));
        lines.push(format!(
            "  Requested by {} ({}) • env {} • {}",
            card.requested_by, card.role, card.environment, card.status.label
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_fixtures::run;

    #[test]
    fn status_badge_is_total() {
        for raw in [
            "pending_approval",
            "running",
            "dry_run",
            "succeeded",
            "rejected",
            "failed",
            "quantum_pending",
            "",
            "SUCCEEDED-ish",
        ] {
            let badge = status_badge(&RunStatus::from(raw.to_string()));
            assert!(!badge.label.is_empty(), "empty label for {raw:?}");
        }

        assert_eq!(
            status_badge(&RunStatus::Succeeded).tone,
            BadgeTone::Good
        );
        assert_eq!(status_badge(&RunStatus::DryRun).tone, BadgeTone::Good);
        assert_eq!(
            status_badge(&RunStatus::PendingApproval).tone,
            BadgeTone::Warn
        );
        assert_eq!(status_badge(&RunStatus::Failed).tone, BadgeTone::Bad);
        assert_eq!(status_badge(&RunStatus::Rejected).tone, BadgeTone::Bad);
        assert_eq!(status_badge(&RunStatus::Running).tone, BadgeTone::Neutral);

        // Unknown values that embed a known word still classify.
        let odd = status_badge(&RunStatus::from("quantum_pending".to_string()));
        assert_eq!(odd.tone, BadgeTone::Warn);
        assert_eq!(odd.label, "quantum_pending");

        let blank = status_badge(&RunStatus::from(String::new()));
        assert_eq!(blank.label, "unknown");
        assert_eq!(blank.tone, BadgeTone::Neutral);
    }

    #[test]
    fn risk_badge_defaults_to_low() {
        assert_eq!(risk_badge(&Risk::High).label, "HIGH");
        assert_eq!(risk_badge(&Risk::Medium).tone, BadgeTone::Warn);
        let unknown = risk_badge(&Risk::Other("radioactive".to_string()));
        assert_eq!(unknown.label, "LOW");
        assert_eq!(unknown.tone, BadgeTone::Good);
    }

    #[test]
    fn summary_is_truncated_on_a_char_boundary() {
        let long = "é".repeat(60);
        let out = truncate_summary(&long);
        assert_eq!(out.chars().count(), SUMMARY_WIDTH + 1);
        assert!(out.ends_with('…'));

        let short = "fits fine";
        assert_eq!(truncate_summary(short), short);
    }

    #[test]
    fn created_falls_back_to_the_raw_string() {
        assert_eq!(format_created("not a date"), "not a date");
        assert_eq!(format_created("2026-02-01T09:30:00Z"), "2026-02-01 09:30");
    }

    #[test]
    fn detail_view_covers_the_key_fields() {
        let r = run("r1", RunStatus::PendingApproval);
        let kv = detail_view(&r);
        let keys: Vec<&str> = kv.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            [
                "Run",
                "Skill",
                "Summary",
                "Risk",
                "Approval",
                "Requested by",
                "Environment",
                "Created",
                "Status"
            ]
        );
        assert!(kv.iter().any(|(_, v)| v == "required"));
    }

    #[test]
    fn plan_lines_keep_step_order() {
        let r = run("r1", RunStatus::PendingApproval);
        let lines = plan_lines(&r).join("\n");
        let first = lines.find("s1").unwrap();
        let second = lines.find("s2").unwrap();
        assert!(first < second);
    }
}
