//! In-memory run cache: the single source of truth for rendering.
//!
//! Slices are replaced wholesale, never merged, so a view can never show a
//! mix of two fetch snapshots.

use crate::model::{Run, RunStatus};

/// Metrics derived from the current run-list snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardMetrics {
    pub total_runs: usize,
    pub pending_approvals: usize,
    pub last_status: Option<RunStatus>,
}

#[derive(Default)]
pub struct RunStore {
    runs: Vec<Run>,
    pending: Vec<Run>,
    selected: Option<Run>,
}

impl RunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached run list with a fresh snapshot.
    pub fn set_all(&mut self, runs: Vec<Run>) {
        self.runs = runs;
    }

    /// Replace the approval-queue snapshot.
    pub fn set_pending(&mut self, runs: Vec<Run>) {
        self.pending = runs;
    }

    pub fn all(&self) -> &[Run] {
        &self.runs
    }

    pub fn pending(&self) -> &[Run] {
        &self.pending
    }

    pub fn get(&self, run_id: &str) -> Option<&Run> {
        self.runs.iter().find(|r| r.run_id == run_id)
    }

    /// Select a run from the cached list. No-op when the id is not in the
    /// last snapshot; the caller fetches the run individually and installs
    /// it via [`set_selected`] instead.
    pub fn select(&mut self, run_id: &str) {
        if let Some(run) = self.get(run_id) {
            self.selected = Some(run.clone());
        }
    }

    /// Install a freshly fetched run as the selection.
    pub fn set_selected(&mut self, run: Run) {
        self.selected = Some(run);
    }

    pub fn selected(&self) -> Option<&Run> {
        self.selected.as_ref()
    }

    /// Quick search: first run whose id, skill, or original message contains
    /// the query, case-insensitively.
    pub fn find(&self, query: &str) -> Option<&Run> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return None;
        }
        self.runs.iter().find(|r| {
            r.run_id.to_lowercase().contains(&q)
                || r.plan.intent.skill.to_lowercase().contains(&q)
                || r.message.to_lowercase().contains(&q)
        })
    }

    /// Pure projection over the list snapshot. The backend orders runs
    /// newest-first, so the head element is the most recent status.
    pub fn metrics(&self) -> DashboardMetrics {
        DashboardMetrics {
            total_runs: self.runs.len(),
            pending_approvals: self
                .runs
                .iter()
                .filter(|r| r.status.is_pending_approval())
                .count(),
            last_status: self.runs.first().map(|r| r.status.clone()),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_fixtures::run;
    use super::*;

    #[test]
    fn set_all_replaces_never_merges() {
        let mut store = RunStore::new();
        store.set_all(vec![
            run("a", RunStatus::PendingApproval),
            run("b", RunStatus::Succeeded),
        ]);
        store.set_all(vec![run("c", RunStatus::DryRun)]);

        let ids: Vec<&str> = store.all().iter().map(|r| r.run_id.as_str()).collect();
        assert_eq!(ids, ["c"]);
        assert!(store.get("a").is_none());
        assert!(store.get("b").is_none());

        // No trace of the old snapshot in derived metrics either.
        let m = store.metrics();
        assert_eq!(m.total_runs, 1);
        assert_eq!(m.pending_approvals, 0);
        assert_eq!(m.last_status, Some(RunStatus::DryRun));
    }

    #[test]
    fn metrics_are_stable_for_an_unchanged_snapshot() {
        let mut store = RunStore::new();
        let snapshot = vec![
            run("r1", RunStatus::PendingApproval),
            run("r2", RunStatus::Failed),
        ];
        store.set_all(snapshot.clone());
        let first = store.metrics();
        store.set_all(snapshot);
        assert_eq!(store.metrics(), first);
    }

    #[test]
    fn select_is_a_noop_for_unknown_ids() {
        let mut store = RunStore::new();
        store.set_all(vec![run("a", RunStatus::PendingApproval)]);
        store.select("a");
        assert_eq!(store.selected().map(|r| r.run_id.as_str()), Some("a"));

        store.select("missing");
        assert_eq!(store.selected().map(|r| r.run_id.as_str()), Some("a"));
    }

    #[test]
    fn find_matches_id_skill_and_message() {
        let mut store = RunStore::new();
        store.set_all(vec![run("abc123", RunStatus::DryRun)]);
        assert!(store.find("ABC").is_some());
        assert!(store.find("patching").is_some());
        assert!(store.find("patch window").is_some());
        assert!(store.find("nothing-here").is_none());
        assert!(store.find("   ").is_none());
    }

    #[test]
    fn empty_store_metrics() {
        let store = RunStore::new();
        let m = store.metrics();
        assert_eq!(m.total_runs, 0);
        assert_eq!(m.pending_approvals, 0);
        assert_eq!(m.last_status, None);
    }
}
