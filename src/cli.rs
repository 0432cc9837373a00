use crate::controller::WorkflowController;
use crate::gateway::HttpGateway;
use crate::model::{Decision, Environment, ExternalEvent};
use crate::render;
use crate::session::{resolve_identity, SessionContext, Settings};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "opspilot",
    version,
    about = "Operator console for the OpsPilot runbook-automation backend"
)]
pub struct Cli {
    /// Backend base URL (falls back to the saved settings)
    #[arg(long)]
    pub api_base: Option<String>,

    /// User name sent as the X-User identity header
    #[arg(long)]
    pub user: Option<String>,

    /// Role sent as the X-Role identity header (operator|approver|admin|viewer)
    #[arg(long)]
    pub role: Option<String>,

    /// Request timeout
    #[arg(long, default_value = "10s")]
    pub timeout: humantime::Duration,

    /// Print JSON instead of text output
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Interactive console (default)
    Console,

    /// Submit a natural-language intent and preview the generated plan
    Submit {
        /// The request, e.g. "Exclude servers web-01, web-02 from the Feb patch window."
        message: Option<String>,
        /// Skill hint for intent classification
        #[arg(long)]
        skill: Option<String>,
        /// Target environment
        #[arg(long, default_value = "dev")]
        env: Environment,
        /// Change ticket id, e.g. CHG123456
        #[arg(long)]
        change_id: Option<String>,
        /// Use the built-in example request for the chosen skill
        #[arg(long)]
        example: bool,
    },

    /// List recent runs
    Runs {
        /// Show the first run matching the query (id, skill, or message)
        #[arg(long)]
        find: Option<String>,
    },

    /// Show one run, including its evidence
    Run { run_id: String },

    /// List runs waiting for approval
    Approvals,

    /// Approve a pending run
    Approve {
        run_id: String,
        #[arg(long)]
        comment: Option<String>,
    },

    /// Reject a pending run
    Reject {
        run_id: String,
        #[arg(long)]
        comment: Option<String>,
    },

    /// Upload an evidence file; the backend opens a run for it
    Upload { file: PathBuf },

    /// Post a synthetic monitoring event to the webhook endpoint
    SimulateEvent {
        #[arg(long, default_value = "Pune-DC")]
        site: String,
        #[arg(long, default_value = "core-sw-01")]
        device: String,
        #[arg(long, default_value = "PRIMARY_DOWN")]
        state: String,
        #[arg(long, default_value = "ISP-A")]
        circuit: String,
        #[arg(long)]
        change_id: Option<String>,
    },

    /// Show or persist console settings (endpoint + identity)
    Config {
        #[arg(long)]
        api_base: Option<String>,
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        role: Option<String>,
    },

    /// Backend connectivity and model indicator
    Health,
}

/// Built-in example requests, one per skill.
fn sample_message(skill: &str) -> Option<&'static str> {
    match skill {
        "patching_exclusion" => Some(
            "Exclude servers web-01, web-02 from the Feb patch window. Reason: app release freeze. Change ID: CHG123456",
        ),
        "storage_ops" => Some(
            "Mount volume vol-1a2b at /data on host app-01. Verify filesystem and app health before and after. In prod requires approval.",
        ),
        "manageengine_downtime" => Some(
            "Schedule downtime for monitors PAYMENTS-API and PAYMENTS-DB from 2026-02-10 01:00 to 03:00 IST. Reason: maintenance. CHG123456",
        ),
        "vuln_triage" => Some(
            "Segment latest Tenable export by team (Wintel/Linux/App) and prioritize critical exploitable findings. Propose ticket titles and owners.",
        ),
        "solarwinds_event" => Some(
            "IP SLA indicates primary circuit DOWN at Pune-DC for device core-sw-01. Trigger AWX failover check and notify site DL.",
        ),
        _ => None,
    }
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn handle_config(
    settings: Settings,
    api_base: Option<String>,
    user: Option<String>,
    role: Option<String>,
) -> Result<()> {
    let mut settings = settings;
    let changed = api_base.is_some() || user.is_some() || role.is_some();
    if let Some(api_base) = api_base {
        settings.api_base = api_base.trim().trim_end_matches('/').to_string();
    }
    if let Some(user) = user {
        settings.user = user.trim().to_string();
    }
    if let Some(role) = role {
        // Reject typos before they end up persisted.
        role.parse::<crate::model::Role>()?;
        settings.role = role.trim().to_lowercase();
    }
    if changed {
        let path = settings.save()?;
        println!("Saved: {}", path.display());
    }
    let shown = |s: &str| if s.is_empty() { "—".to_string() } else { s.to_string() };
    println!("api_base: {}", shown(&settings.api_base));
    println!("user:     {}", shown(&settings.user));
    println!("role:     {}", shown(&settings.role));
    Ok(())
}

#[cfg(feature = "tui")]
async fn run_console_mode(controller: Arc<WorkflowController>) -> Result<()> {
    crate::tui::run(controller).await
}

/// Fallback when built without TUI support.
#[cfg(not(feature = "tui"))]
async fn run_console_mode(controller: Arc<WorkflowController>) -> Result<()> {
    let metrics = controller.refresh_run_list().await?;
    print_lines(&render::metrics_lines(&metrics));
    println!();
    print_lines(&render::run_list_lines(&controller.runs()));
    Ok(())
}

pub async fn run(args: Cli) -> Result<()> {
    let settings = Settings::load();

    // Settings management needs no backend.
    if let Some(Command::Config {
        api_base,
        user,
        role,
    }) = args.command.clone()
    {
        return handle_config(settings, api_base, user, role);
    }

    let api_base = args
        .api_base
        .clone()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| (!settings.api_base.is_empty()).then(|| settings.api_base.clone()))
        .context(
            "no backend endpoint configured; pass --api-base or save one with `opspilot config --api-base <URL>`",
        )?;
    let user = args
        .user
        .as_deref()
        .or((!settings.user.is_empty()).then_some(settings.user.as_str()));
    let role = args
        .role
        .as_deref()
        .or((!settings.role.is_empty()).then_some(settings.role.as_str()));
    let identity = resolve_identity(user, role)?;

    let session = Arc::new(SessionContext::new(&api_base, identity));
    let gateway = HttpGateway::new(session, args.timeout.into())?;
    let controller = Arc::new(WorkflowController::new(Arc::new(gateway)));

    match args.command.clone().unwrap_or(Command::Console) {
        Command::Console => run_console_mode(controller).await,
        Command::Submit {
            message,
            skill,
            env,
            change_id,
            example,
        } => {
            let message = match (message, example) {
                (Some(m), _) => m,
                (None, true) => {
                    let skill = skill.as_deref().unwrap_or("patching_exclusion");
                    sample_message(skill)
                        .with_context(|| format!("no built-in example for skill {skill}"))?
                        .to_string()
                }
                (None, false) => {
                    anyhow::bail!("MESSAGE is required unless --example is given")
                }
            };
            let reply = controller
                .submit_intent(&message, skill, env, change_id)
                .await?;
            if args.json {
                return print_json(&reply);
            }
            print_lines(&render::plan_lines(&reply.run));
            if !reply.assistant_message.is_empty() {
                println!();
                println!("{}", reply.assistant_message);
            }
            Ok(())
        }
        Command::Runs { find } => {
            controller.refresh_run_list().await?;
            match find {
                Some(query) => match controller.find(&query) {
                    Some(run) => {
                        if args.json {
                            return print_json(&run);
                        }
                        print_lines(&render::detail_lines(&run));
                        Ok(())
                    }
                    None => {
                        if args.json {
                            return print_json(&serde_json::Value::Null);
                        }
                        println!("No run matches {query:?}.");
                        Ok(())
                    }
                },
                None => {
                    if args.json {
                        return print_json(&controller.runs());
                    }
                    print_lines(&render::metrics_lines(&controller.metrics()));
                    println!();
                    print_lines(&render::run_list_lines(&controller.runs()));
                    Ok(())
                }
            }
        }
        Command::Run { run_id } => {
            let run = controller.refresh_run(&run_id).await?;
            if args.json {
                return print_json(&run);
            }
            print_lines(&render::detail_lines(&run));
            Ok(())
        }
        Command::Approvals => {
            let pending = controller.refresh_pending().await?;
            if args.json {
                return print_json(&pending);
            }
            print_lines(&render::approval_lines(&pending));
            Ok(())
        }
        Command::Approve { run_id, comment } => {
            let run = controller
                .decide(&run_id, Decision::Approved, comment)
                .await?;
            if args.json {
                return print_json(&run);
            }
            print_lines(&render::detail_lines(&run));
            Ok(())
        }
        Command::Reject { run_id, comment } => {
            let run = controller
                .decide(&run_id, Decision::Rejected, comment)
                .await?;
            if args.json {
                return print_json(&run);
            }
            print_lines(&render::detail_lines(&run));
            Ok(())
        }
        Command::Upload { file } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("read {}", file.display()))?;
            let filename = file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("evidence.bin");
            let run = controller.upload_evidence(filename, bytes).await?;
            if args.json {
                return print_json(&run);
            }
            print_lines(&render::detail_lines(&run));
            Ok(())
        }
        Command::SimulateEvent {
            site,
            device,
            state,
            circuit,
            change_id,
        } => {
            let event = ExternalEvent {
                site,
                device,
                state,
                circuit,
                change_id,
            };
            let run = controller.simulate_external_event(&event).await?;
            if args.json {
                return print_json(&run);
            }
            print_lines(&render::detail_lines(&run));
            Ok(())
        }
        Command::Config { .. } => unreachable!("handled before session setup"),
        Command::Health => {
            match controller.health().await {
                Ok(health) => {
                    if args.json {
                        return print_json(&health);
                    }
                    if health.gemini_configured {
                        println!("Gemini: ON");
                    } else {
                        println!("Gemini: OFF (stub)");
                    }
                    println!(
                        "Model: {}",
                        if health.model.is_empty() {
                            "—"
                        } else {
                            health.model.as_str()
                        }
                    );
                }
                Err(e) => {
                    // Degraded indicator, not a hard failure.
                    if args.json {
                        return print_json(&serde_json::json!({ "backend": "off", "error": e.to_string() }));
                    }
                    println!("Backend: OFF ({e})");
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_skill_sample_exists() {
        for skill in [
            "patching_exclusion",
            "storage_ops",
            "manageengine_downtime",
            "vuln_triage",
            "solarwinds_event",
        ] {
            assert!(sample_message(skill).is_some(), "missing sample for {skill}");
        }
        assert!(sample_message("unknown_skill").is_none());
    }

    #[test]
    fn cli_parses_a_submit_invocation() {
        let cli = Cli::parse_from([
            "opspilot",
            "--api-base",
            "http://localhost:8000",
            "submit",
            "Exclude web-01 from patching",
            "--skill",
            "patching_exclusion",
            "--env",
            "prod",
            "--change-id",
            "CHG123456",
        ]);
        match cli.command {
            Some(Command::Submit {
                message,
                skill,
                env,
                change_id,
                example,
            }) => {
                assert_eq!(message.as_deref(), Some("Exclude web-01 from patching"));
                assert_eq!(skill.as_deref(), Some("patching_exclusion"));
                assert_eq!(env, Environment::Prod);
                assert_eq!(change_id.as_deref(), Some("CHG123456"));
                assert!(!example);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_defaults_to_the_console() {
        let cli = Cli::parse_from(["opspilot"]);
        assert!(cli.command.is_none());
        assert!(!cli.json);
    }
}
