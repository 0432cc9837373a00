//! Workflow controller: one operation per user-triggered transition.
//!
//! Each operation is atomic from the caller's perspective: either the run
//! store reflects the backend's acknowledged state or the error propagates
//! and the store is left at last-known-good. The client never computes a
//! status transition locally; it re-fetches or uses the state the decision
//! endpoint returns.

use crate::gateway::{Backend, GatewayError};
use crate::model::{
    ChatReply, Decision, DecisionRequest, Environment, ExternalEvent, HealthInfo, PlanRequest, Run,
};
use crate::store::{DashboardMetrics, RunStore};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Caught locally, before any network call.
    #[error("message must not be empty")]
    EmptyMessage,

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

pub struct WorkflowController {
    backend: Arc<dyn Backend>,
    store: Mutex<RunStore>,
}

impl WorkflowController {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            store: Mutex::new(RunStore::new()),
        }
    }

    // The store lock is only ever taken after a network call resolves and is
    // never held across an await.
    fn store(&self) -> MutexGuard<'_, RunStore> {
        match self.store.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn runs(&self) -> Vec<Run> {
        self.store().all().to_vec()
    }

    pub fn pending(&self) -> Vec<Run> {
        self.store().pending().to_vec()
    }

    pub fn selected(&self) -> Option<Run> {
        self.store().selected().cloned()
    }

    pub fn find(&self, query: &str) -> Option<Run> {
        self.store().find(query).cloned()
    }

    pub fn metrics(&self) -> DashboardMetrics {
        self.store().metrics()
    }

    /// Connectivity/feature indicator. Failure degrades the indicator at the
    /// presentation layer and never blocks anything else.
    pub async fn health(&self) -> Result<HealthInfo, WorkflowError> {
        Ok(self.backend.health().await?)
    }

    /// Submit a natural-language intent. The backend answers with a fresh
    /// run carrying the generated plan; the run is stored, selected, and the
    /// list refreshed so list-derived metrics include it.
    pub async fn submit_intent(
        &self,
        message: &str,
        skill_hint: Option<String>,
        environment: Environment,
        change_id: Option<String>,
    ) -> Result<ChatReply, WorkflowError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(WorkflowError::EmptyMessage);
        }
        let req = PlanRequest {
            message: message.to_string(),
            skill_hint,
            environment,
            change_id: change_id.and_then(|c| {
                let c = c.trim().to_string();
                (!c.is_empty()).then_some(c)
            }),
            extra: serde_json::json!({}),
        };
        let reply = self.backend.generate_plan(&req).await?;
        self.store().set_selected(reply.run.clone());
        self.refresh_run_list().await?;
        self.store().select(&reply.run.run_id);
        Ok(reply)
    }

    /// Approve or reject a pending run, then refresh the list, the approval
    /// queue, and the run itself so its new status is reflected everywhere.
    pub async fn decide(
        &self,
        run_id: &str,
        decision: Decision,
        comment: Option<String>,
    ) -> Result<Run, WorkflowError> {
        let req = DecisionRequest { decision, comment };
        self.backend.decide(run_id, &req).await?;
        self.refresh_run_list().await?;
        self.refresh_pending().await?;
        let run = self.refresh_run(run_id).await?;
        Ok(run)
    }

    /// Upload an evidence file. The run identity is unknown until the ack
    /// returns one; the run is then fetched and selected.
    pub async fn upload_evidence(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<Run, WorkflowError> {
        let ack = self.backend.upload_evidence(filename, bytes).await?;
        self.refresh_run_list().await?;
        let run = self.refresh_run(&ack.run_id).await?;
        Ok(run)
    }

    /// Post a synthetic monitoring event; the webhook synchronously opens a
    /// run.
    pub async fn simulate_external_event(
        &self,
        event: &ExternalEvent,
    ) -> Result<Run, WorkflowError> {
        let ack = self.backend.post_event(event).await?;
        self.refresh_run_list().await?;
        let run = self.refresh_run(&ack.run_id).await?;
        Ok(run)
    }

    /// Idempotent full replacement of the run-list slice.
    pub async fn refresh_run_list(&self) -> Result<DashboardMetrics, WorkflowError> {
        let runs = self.backend.list_runs().await?;
        let mut store = self.store();
        store.set_all(runs);
        Ok(store.metrics())
    }

    /// Idempotent full replacement of the approval-queue slice. The backend
    /// has no dedicated pending endpoint; the queue is filtered out of a
    /// fresh list snapshot.
    pub async fn refresh_pending(&self) -> Result<Vec<Run>, WorkflowError> {
        let runs = self.backend.list_runs().await?;
        let pending: Vec<Run> = runs
            .into_iter()
            .filter(|r| r.status.is_pending_approval())
            .collect();
        self.store().set_pending(pending.clone());
        Ok(pending)
    }

    /// Fetch one run (with evidence) and install it as the selection.
    pub async fn refresh_run(&self, run_id: &str) -> Result<Run, WorkflowError> {
        let run = self.backend.fetch_run(run_id).await?;
        self.store().set_selected(run.clone());
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayError;
    use crate::model::{EventAck, RunStatus, UploadAck};
    use crate::store::test_fixtures::run;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeState {
        runs: Vec<Run>,
        fail_decide: bool,
        fail_list: bool,
    }

    /// In-memory backend with the same observable behavior as the real
    /// service: newest runs first, decisions flip status server-side.
    #[derive(Default)]
    struct FakeBackend {
        state: Mutex<FakeState>,
        calls: AtomicUsize,
    }

    impl FakeBackend {
        fn with_runs(runs: Vec<Run>) -> Self {
            Self {
                state: Mutex::new(FakeState {
                    runs,
                    ..Default::default()
                }),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn set_fail_decide(&self, fail: bool) {
            self.state.lock().unwrap().fail_decide = fail;
        }

        fn refused() -> GatewayError {
            GatewayError::Backend {
                status: 500,
                message: "backend unavailable".to_string(),
            }
        }
    }

    #[async_trait]
    impl Backend for FakeBackend {
        async fn health(&self) -> Result<HealthInfo, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HealthInfo {
                gemini_configured: false,
                model: "stub".to_string(),
            })
        }

        async fn list_runs(&self) -> Result<Vec<Run>, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let state = self.state.lock().unwrap();
            if state.fail_list {
                return Err(Self::refused());
            }
            Ok(state.runs.clone())
        }

        async fn fetch_run(&self, run_id: &str) -> Result<Run, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let state = self.state.lock().unwrap();
            state
                .runs
                .iter()
                .find(|r| r.run_id == run_id)
                .cloned()
                .ok_or(GatewayError::Backend {
                    status: 404,
                    message: "Run not found".to_string(),
                })
        }

        async fn generate_plan(&self, req: &PlanRequest) -> Result<ChatReply, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut new_run = run("run-new", RunStatus::PendingApproval);
            new_run.message = req.message.clone();
            new_run.environment = req.environment.to_string();
            if let Some(hint) = &req.skill_hint {
                new_run.plan.intent.skill = hint.clone();
            }
            let mut state = self.state.lock().unwrap();
            state.runs.insert(0, new_run.clone());
            Ok(ChatReply {
                run: new_run,
                assistant_message: "Approval is required before execution.".to_string(),
            })
        }

        async fn decide(
            &self,
            run_id: &str,
            req: &DecisionRequest,
        ) -> Result<Run, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut state = self.state.lock().unwrap();
            if state.fail_decide {
                return Err(Self::refused());
            }
            let target = state
                .runs
                .iter_mut()
                .find(|r| r.run_id == run_id)
                .ok_or(GatewayError::Backend {
                    status: 404,
                    message: "Run not found".to_string(),
                })?;
            target.status = match req.decision {
                Decision::Approved => RunStatus::DryRun,
                Decision::Rejected => RunStatus::Rejected,
            };
            target.evidence.push(serde_json::json!({
                "type": "approval",
                "decision": req.decision.as_str(),
                "comment": req.comment,
            }));
            Ok(target.clone())
        }

        async fn upload_evidence(
            &self,
            filename: &str,
            _bytes: Vec<u8>,
        ) -> Result<UploadAck, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut new_run = run("run-upload", RunStatus::PendingApproval);
            new_run.plan.intent.skill = "vuln_triage".to_string();
            new_run.evidence = vec![serde_json::json!({"type": "upload", "filename": filename})];
            let mut state = self.state.lock().unwrap();
            state.runs.insert(0, new_run);
            Ok(UploadAck {
                run_id: "run-upload".to_string(),
                rows: 3,
                approval_required: true,
            })
        }

        async fn post_event(&self, event: &ExternalEvent) -> Result<EventAck, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut new_run = run("run-event", RunStatus::PendingApproval);
            new_run.plan.intent.skill = "solarwinds_event".to_string();
            new_run.evidence = vec![serde_json::json!({"type": "webhook", "site": event.site})];
            let mut state = self.state.lock().unwrap();
            state.runs.insert(0, new_run);
            Ok(EventAck {
                run_id: "run-event".to_string(),
                approval_required: true,
            })
        }
    }

    fn controller(backend: Arc<FakeBackend>) -> WorkflowController {
        WorkflowController::new(backend)
    }

    #[tokio::test]
    async fn empty_message_issues_zero_network_calls() {
        let backend = Arc::new(FakeBackend::default());
        let ctl = controller(backend.clone());

        let err = ctl
            .submit_intent("   ", None, Environment::Prod, None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::EmptyMessage));
        assert_eq!(backend.call_count(), 0);
        assert!(ctl.runs().is_empty());
        assert!(ctl.selected().is_none());
    }

    #[tokio::test]
    async fn submit_happy_path_selects_run_and_fills_approval_queue() {
        let backend = Arc::new(FakeBackend::default());
        let ctl = controller(backend.clone());

        let reply = ctl
            .submit_intent(
                "Exclude servers web-01, web-02 from the Feb patch window.",
                Some("patching_exclusion".to_string()),
                Environment::Prod,
                Some("CHG123456".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(reply.run.status, RunStatus::PendingApproval);
        assert!(reply.run.approval_required);
        assert_eq!(reply.run.plan.steps.len(), 2);
        assert_eq!(ctl.selected().unwrap().run_id, reply.run.run_id);

        let m = ctl.metrics();
        assert_eq!(m.total_runs, 1);
        assert_eq!(m.pending_approvals, 1);

        let pending = ctl.refresh_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].run_id, reply.run.run_id);
        assert_eq!(pending[0].plan.intent.skill, "patching_exclusion");
        assert_eq!(pending[0].plan.intent.risk, reply.run.plan.intent.risk);
    }

    #[tokio::test]
    async fn rejected_run_leaves_the_pending_projection() {
        let backend = Arc::new(FakeBackend::with_runs(vec![run(
            "r1",
            RunStatus::PendingApproval,
        )]));
        let ctl = controller(backend);
        ctl.refresh_run_list().await.unwrap();
        ctl.refresh_pending().await.unwrap();
        assert_eq!(ctl.pending().len(), 1);

        let updated = ctl
            .decide("r1", Decision::Rejected, Some("not authorized".to_string()))
            .await
            .unwrap();
        assert_eq!(updated.status, RunStatus::Rejected);

        assert!(ctl.pending().is_empty());
        let listed = ctl.runs();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, RunStatus::Rejected);
        assert_eq!(ctl.selected().unwrap().status, RunStatus::Rejected);
    }

    #[tokio::test]
    async fn failed_decision_leaves_the_store_untouched() {
        let backend = Arc::new(FakeBackend::with_runs(vec![run(
            "r1",
            RunStatus::PendingApproval,
        )]));
        let ctl = controller(backend.clone());
        ctl.refresh_run_list().await.unwrap();
        ctl.refresh_pending().await.unwrap();
        let before = ctl.runs();
        let before_pending = ctl.pending();

        backend.set_fail_decide(true);
        let err = ctl.decide("r1", Decision::Approved, None).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Gateway(_)));

        assert_eq!(ctl.runs(), before);
        assert_eq!(ctl.pending(), before_pending);
        let cached = ctl.runs();
        assert_eq!(cached[0].status, RunStatus::PendingApproval);
        assert!(cached[0].evidence.is_empty());
    }

    #[tokio::test]
    async fn refresh_is_idempotent_for_an_unchanged_backend() {
        let backend = Arc::new(FakeBackend::with_runs(vec![
            run("r2", RunStatus::PendingApproval),
            run("r1", RunStatus::Succeeded),
        ]));
        let ctl = controller(backend);

        let first = ctl.refresh_run_list().await.unwrap();
        let first_ids: Vec<String> = ctl.runs().iter().map(|r| r.run_id.clone()).collect();
        let second = ctl.refresh_run_list().await.unwrap();
        let second_ids: Vec<String> = ctl.runs().iter().map(|r| r.run_id.clone()).collect();

        assert_eq!(first, second);
        assert_eq!(first_ids, second_ids);
        assert_eq!(first.last_status, Some(RunStatus::PendingApproval));
    }

    #[tokio::test]
    async fn upload_selects_the_backend_assigned_run() {
        let backend = Arc::new(FakeBackend::default());
        let ctl = controller(backend);

        let run = ctl
            .upload_evidence("scan.csv", b"host,cve\nweb-01,CVE-1".to_vec())
            .await
            .unwrap();
        assert_eq!(run.run_id, "run-upload");
        assert_eq!(run.plan.intent.skill, "vuln_triage");
        assert_eq!(ctl.selected().unwrap().run_id, "run-upload");
        assert_eq!(ctl.metrics().total_runs, 1);
    }

    #[tokio::test]
    async fn simulated_event_opens_and_selects_a_run() {
        let backend = Arc::new(FakeBackend::default());
        let ctl = controller(backend);

        let run = ctl
            .simulate_external_event(&ExternalEvent::demo())
            .await
            .unwrap();
        assert_eq!(run.run_id, "run-event");
        assert_eq!(run.plan.intent.skill, "solarwinds_event");
        assert_eq!(ctl.selected().unwrap().run_id, "run-event");
    }

    #[tokio::test]
    async fn failed_list_refresh_keeps_last_known_good() {
        let backend = Arc::new(FakeBackend::with_runs(vec![run(
            "r1",
            RunStatus::DryRun,
        )]));
        let ctl = controller(backend.clone());
        ctl.refresh_run_list().await.unwrap();

        backend.state.lock().unwrap().fail_list = true;
        assert!(ctl.refresh_run_list().await.is_err());
        assert_eq!(ctl.runs().len(), 1);
        assert_eq!(ctl.metrics().total_runs, 1);
    }
}
