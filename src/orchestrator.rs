//! Run sequencing and the credential gate.
//!
//! A run walks `Idle → PreconditionChecked → SnapshotTaken → Diagnosed →
//! Remediated → Advised → Reported → Done`. The only other exit is
//! `Idle → Aborted`, taken when no access token is configured; in that case
//! no directory is created, no transport is built, and no request is sent.
//! Once past the gate every stage runs exactly once, whatever its calls
//! returned. A gateway that cannot be built degrades the run: every call is
//! absent, but the snapshot and report stages still run.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::advisor::{self, Suggestion};
use crate::config::AgentConfig;
use crate::credentials::{AccessToken, ACCESS_TOKEN_VAR};
use crate::diagnostics;
use crate::gateway::{GatewayClient, HttpTransport, RetryPolicy, Transport, UnavailableTransport};
use crate::remediation::{self, RemediationOutcome};
use crate::report;
use crate::snapshot::{self, Snapshot};

/// Position of a run in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Not started.
    Idle,
    /// Access token present.
    PreconditionChecked,
    /// Snapshot stage finished.
    SnapshotTaken,
    /// Diagnostic collection finished.
    Diagnosed,
    /// Corrective actions applied.
    Remediated,
    /// Advice logged.
    Advised,
    /// Report stage finished.
    Reported,
    /// Run complete.
    Done,
    /// Stopped at the credential gate.
    Aborted,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::PreconditionChecked => "precondition_checked",
            Self::SnapshotTaken => "snapshot_taken",
            Self::Diagnosed => "diagnosed",
            Self::Remediated => "remediated",
            Self::Advised => "advised",
            Self::Reported => "reported",
            Self::Done => "done",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// What a run did.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Final stage: `Done` or `Aborted`.
    pub stage: Stage,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Snapshot artifact, if one was written.
    pub snapshot: Option<Snapshot>,
    /// Devices counted during diagnosis.
    pub device_count: usize,
    /// Entities seen during diagnosis.
    pub entity_count: usize,
    /// Automations seen during diagnosis.
    pub automation_count: usize,
    /// Integration entries seen during diagnosis.
    pub entry_count: usize,
    /// Remediation counts.
    pub remediation: RemediationOutcome,
    /// Advisor output.
    pub suggestions: Vec<Suggestion>,
    /// Report artifact, if one was written.
    pub report: Option<PathBuf>,
}

impl RunSummary {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            stage: Stage::Idle,
            started_at,
            snapshot: None,
            device_count: 0,
            entity_count: 0,
            automation_count: 0,
            entry_count: 0,
            remediation: RemediationOutcome::default(),
            suggestions: Vec::new(),
            report: None,
        }
    }

    /// Whether the run stopped at the credential gate.
    pub fn is_aborted(&self) -> bool {
        self.stage == Stage::Aborted
    }
}

/// Sequences one run of the agent.
#[derive(Debug)]
pub struct Orchestrator<'a> {
    config: &'a AgentConfig,
    summary: RunSummary,
}

impl<'a> Orchestrator<'a> {
    /// Prepare a run.
    pub fn new(config: &'a AgentConfig) -> Self {
        Self {
            config,
            summary: RunSummary::new(Utc::now()),
        }
    }

    fn advance(&mut self, next: Stage) {
        debug!(from = %self.summary.stage, to = %next, "stage transition");
        self.summary.stage = next;
    }

    /// Execute the run.
    ///
    /// `connect` builds the gateway and is called only once the access token
    /// has been confirmed. If it fails, the stages run against a gateway on
    /// which every call is absent.
    pub async fn run<T, F>(mut self, connect: F) -> RunSummary
    where
        T: Transport,
        F: FnOnce(&AccessToken) -> anyhow::Result<GatewayClient<T>>,
    {
        let config = self.config;
        let Some(token) = config.access_token.as_ref() else {
            error!("{ACCESS_TOKEN_VAR} is not configured; aborting run");
            self.advance(Stage::Aborted);
            return self.summary;
        };
        self.advance(Stage::PreconditionChecked);

        if let Err(e) = config.paths.ensure_layout() {
            warn!(error = %e, "artifact directories unavailable");
        }

        match connect(token) {
            Ok(gateway) => self.run_stages(&gateway).await,
            Err(e) => {
                let reason = format!("{e:#}");
                warn!(error = %reason, "gateway unavailable; every call will be absent");
                let gateway = GatewayClient::new(
                    UnavailableTransport::new(reason),
                    RetryPolicy::single_attempt(),
                );
                self.run_stages(&gateway).await;
            }
        }

        self.summary
    }

    async fn run_stages<U: Transport>(&mut self, gateway: &GatewayClient<U>) {
        let config = self.config;
        let paths = &config.paths;

        info!(base_url = %config.api.base_url, "agent run started");

        self.summary.snapshot = snapshot::capture(gateway, &paths.snapshots_dir).await;
        self.advance(Stage::SnapshotTaken);

        let diagnosis = diagnostics::collect(gateway).await;
        self.summary.device_count = diagnosis.device_count;
        self.summary.entity_count = diagnosis.entity_count;
        self.summary.automation_count = diagnosis.automations.len();
        self.summary.entry_count = diagnosis.entry_count;
        self.advance(Stage::Diagnosed);

        self.summary.remediation =
            remediation::remediate(gateway, &diagnosis.automations, &diagnosis.entries).await;
        self.advance(Stage::Remediated);

        self.summary.suggestions = advisor::advise(
            &diagnosis.states,
            config.advisor.scan_interval_threshold_secs,
        );
        advisor::dashboard_hints();
        self.advance(Stage::Advised);

        self.summary.report = match report::write_report(&paths.reports_dir, Utc::now()).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, "report not written");
                None
            }
        };
        self.advance(Stage::Reported);

        info!(
            automations_fixed = self.summary.remediation.automations_fixed,
            entries_reloaded = self.summary.remediation.entries_reloaded,
            suggestions = self.summary.suggestions.len(),
            "agent run finished"
        );
        self.advance(Stage::Done);
    }
}

/// Perform one full run against the configured platform over HTTP.
pub async fn run_once(config: &AgentConfig) -> RunSummary {
    Orchestrator::new(config)
        .run(|token| {
            let transport = HttpTransport::new(&config.api, token.clone())?;
            Ok(GatewayClient::new(
                transport,
                RetryPolicy::from_config(&config.api.retry),
            ))
        })
        .await
}
