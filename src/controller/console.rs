//! Console command loop.
//!
//! Receives commands from the UI thread, runs each workflow operation as its
//! own short task, and emits events back for presentation. Commands are not
//! de-duplicated: a second action may start before the first completes, and
//! the last response to land wins in the store.

use crate::controller::workflow::WorkflowController;
use crate::model::{Decision, ExternalEvent, HealthInfo, Run};
use crate::store::DashboardMetrics;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Refresh,
    OpenRun(String),
    Decide { run_id: String, decision: Decision },
    SimulateEvent,
    Quit,
}

/// Events consumed by UI layers.
#[derive(Debug)]
pub(crate) enum UiEvent {
    HealthChecked(Option<HealthInfo>),
    RunsLoaded {
        runs: Vec<Run>,
        metrics: DashboardMetrics,
    },
    PendingLoaded(Vec<Run>),
    RunOpened(Box<Run>),
    Notice(String),
    Failed(String),
}

fn spawn_health(ctl: Arc<WorkflowController>, tx: UnboundedSender<UiEvent>) {
    tokio::spawn(async move {
        // A failed health probe degrades the indicator, nothing else.
        let health = ctl.health().await.ok();
        let _ = tx.send(UiEvent::HealthChecked(health));
    });
}

fn spawn_refresh(ctl: Arc<WorkflowController>, tx: UnboundedSender<UiEvent>) {
    tokio::spawn(async move {
        // The two refreshes are independent full-snapshot replacements, so
        // their completion order does not matter.
        let (list, pending) =
            futures::future::join(ctl.refresh_run_list(), ctl.refresh_pending()).await;
        match list {
            Ok(metrics) => {
                let _ = tx.send(UiEvent::RunsLoaded {
                    runs: ctl.runs(),
                    metrics,
                });
            }
            Err(e) => {
                let _ = tx.send(UiEvent::Failed(e.to_string()));
            }
        }
        match pending {
            Ok(pending) => {
                let _ = tx.send(UiEvent::PendingLoaded(pending));
            }
            Err(e) => {
                let _ = tx.send(UiEvent::Failed(e.to_string()));
            }
        }
    });
}

/// Drive workflow operations from UI commands until `Quit` or the command
/// channel closes.
pub(crate) async fn run_console(
    controller: Arc<WorkflowController>,
    event_tx: UnboundedSender<UiEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    spawn_health(controller.clone(), event_tx.clone());
    spawn_refresh(controller.clone(), event_tx.clone());

    loop {
        let Some(cmd) = cmd_rx.recv().await else {
            break;
        };
        match cmd {
            UiCommand::Refresh => {
                spawn_health(controller.clone(), event_tx.clone());
                spawn_refresh(controller.clone(), event_tx.clone());
            }
            UiCommand::OpenRun(run_id) => {
                let ctl = controller.clone();
                let tx = event_tx.clone();
                tokio::spawn(async move {
                    match ctl.refresh_run(&run_id).await {
                        Ok(run) => {
                            let _ = tx.send(UiEvent::RunOpened(Box::new(run)));
                        }
                        Err(e) => {
                            let _ = tx.send(UiEvent::Failed(e.to_string()));
                        }
                    }
                });
            }
            UiCommand::Decide { run_id, decision } => {
                let ctl = controller.clone();
                let tx = event_tx.clone();
                tokio::spawn(async move {
                    match ctl.decide(&run_id, decision, None).await {
                        Ok(run) => {
                            let _ = tx.send(UiEvent::Notice(format!(
                                "Run {} {}",
                                run.run_id,
                                run.status.as_str()
                            )));
                            let _ = tx.send(UiEvent::RunsLoaded {
                                runs: ctl.runs(),
                                metrics: ctl.metrics(),
                            });
                            let _ = tx.send(UiEvent::PendingLoaded(ctl.pending()));
                            let _ = tx.send(UiEvent::RunOpened(Box::new(run)));
                        }
                        Err(e) => {
                            let _ = tx.send(UiEvent::Failed(e.to_string()));
                        }
                    }
                });
            }
            UiCommand::SimulateEvent => {
                let ctl = controller.clone();
                let tx = event_tx.clone();
                tokio::spawn(async move {
                    match ctl.simulate_external_event(&ExternalEvent::demo()).await {
                        Ok(run) => {
                            let _ = tx.send(UiEvent::Notice(format!(
                                "Webhook opened run {}",
                                run.run_id
                            )));
                            let _ = tx.send(UiEvent::RunsLoaded {
                                runs: ctl.runs(),
                                metrics: ctl.metrics(),
                            });
                            let _ = tx.send(UiEvent::PendingLoaded(ctl.pending()));
                            let _ = tx.send(UiEvent::RunOpened(Box::new(run)));
                        }
                        Err(e) => {
                            let _ = tx.send(UiEvent::Failed(e.to_string()));
                        }
                    }
                });
            }
            UiCommand::Quit => break,
        }
    }

    Ok(())
}
