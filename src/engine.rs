//! Runs operations end to end
//!
//! [`Engine::execute`] plans an operation, spawns the tool, classifies the
//! outcome, parses stdout when the classification allows it and returns the
//! assembled [`ResultEnvelope`]. Only problems detected before anything is
//! spawned (invalid parameters, unusable credentials) come back as `Err`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::Instrument;
use uuid::Uuid;

use crate::classify::{self, Classification};
use crate::config::EngineConfig;
use crate::credentials::{
    credential_env_for_url, ConfiguredCredentials, CredentialError, CredentialProvider,
};
use crate::envelope::{InvocationMeta, ResultEnvelope};
use crate::error::Result;
use crate::operations::git::remote_url_lookup;
use crate::operations::{Operation, OperationPlan, RemoteTarget};
use crate::parsers::lines::{parse_lines, values};
use crate::subprocess::{ProcessCommand, ProcessCommandBuilder, SubprocessManager};

/// Upper bound for the read-only helper commands run around an operation
const LOOKUP_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct Engine {
    subprocess: SubprocessManager,
    config: EngineConfig,
    credentials: Arc<dyn CredentialProvider>,
    working_dir: Option<PathBuf>,
}

impl Engine {
    pub fn new(subprocess: SubprocessManager, config: EngineConfig) -> Self {
        let credentials = Arc::new(ConfiguredCredentials::new(&config.credentials));
        Self {
            subprocess,
            config,
            credentials,
            working_dir: None,
        }
    }

    pub fn production(config: EngineConfig) -> Self {
        Self::new(SubprocessManager::production(), config)
    }

    pub fn with_credentials(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = provider;
        self
    }

    /// Directory used when an operation names no repository, and the base
    /// for relative repository paths
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn execute(&self, operation: &Operation) -> Result<ResultEnvelope> {
        let plan = operation.plan()?;
        self.execute_plan(plan).await
    }

    pub async fn execute_plan(&self, plan: OperationPlan) -> Result<ResultEnvelope> {
        let invocation_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "operation",
            operation = plan.operation,
            invocation_id = %invocation_id
        );
        self.run_plan(plan, invocation_id).instrument(span).await
    }

    async fn run_plan(&self, plan: OperationPlan, invocation_id: Uuid) -> Result<ResultEnvelope> {
        let working_dir = self.resolve_dir(plan.working_dir.as_deref());
        let deadline = self.config.deadline_for(plan.operation, plan.deadline);
        let credential_env = self
            .credential_env(plan.remote.as_ref(), working_dir.as_deref(), &plan.env)
            .await?;

        let mut builder = ProcessCommandBuilder::new(plan.program)
            .args(&plan.args)
            .envs(plan.env.iter().map(|(k, v)| (k, v)))
            .envs(credential_env)
            .timeout(deadline)
            .max_output_bytes(self.config.max_output_bytes);
        if let Some(dir) = &working_dir {
            builder = builder.current_dir(dir);
        }
        if let Some(stdin) = plan.stdin {
            builder = builder.stdin(stdin);
        }
        let command = builder.build();

        let meta = InvocationMeta::new(plan.operation, &command).with_invocation_id(invocation_id);
        tracing::debug!(
            "Running {} (deadline {:?}, policy {}, dialect {})",
            meta.command_line,
            deadline,
            plan.policy.name(),
            plan.dialect.name()
        );

        let runner = self.subprocess.runner();
        let started = Instant::now();
        let output = match runner.run(command.clone()).await {
            Ok(output) => output,
            Err(e) if e.is_spawn_error() => {
                tracing::error!("Could not start {}: {}", plan.program, e);
                return Ok(ResultEnvelope::spawn_failure(meta, &e));
            }
            Err(e) => {
                tracing::error!("Running {} failed: {}", plan.program, e);
                let classification = Classification::Failure {
                    diagnostic: e.to_string(),
                };
                return Ok(ResultEnvelope::assemble(
                    meta,
                    classification,
                    Vec::new(),
                    started.elapsed(),
                ));
            }
        };

        let unmerged = if classify::needs_conflict_lookup(&output, &plan.policy) {
            self.unmerged_paths(&command).await
        } else {
            Vec::new()
        };

        let classification = classify::classify(&output, &plan.policy, &unmerged);
        let records = if classification.carries_records() {
            plan.dialect.parse(&output.stdout_text())
        } else {
            Vec::new()
        };

        match &classification {
            Classification::TimedOut => {
                tracing::warn!("{} timed out after {:?}", plan.operation, deadline)
            }
            Classification::Failure { diagnostic } => {
                tracing::debug!("{} failed: {}", plan.operation, diagnostic)
            }
            other => tracing::debug!(
                "{} finished: {} with {} record(s) in {:?}",
                plan.operation,
                other.name(),
                records.len(),
                output.duration
            ),
        }

        Ok(ResultEnvelope::assemble(
            meta,
            classification,
            records,
            output.duration,
        ))
    }

    fn resolve_dir(&self, requested: Option<&Path>) -> Option<PathBuf> {
        match (requested, &self.working_dir) {
            (Some(dir), Some(base)) if dir.is_relative() => Some(base.join(dir)),
            (Some(dir), _) => Some(dir.to_path_buf()),
            (None, base) => base.clone(),
        }
    }

    /// Environment that authenticates the operation's remote, if it has one
    async fn credential_env(
        &self,
        remote: Option<&RemoteTarget>,
        working_dir: Option<&Path>,
        plan_env: &[(String, String)],
    ) -> Result<Vec<(String, String)>> {
        let url = match remote {
            None => return Ok(Vec::new()),
            Some(RemoteTarget::Url(url)) => url.clone(),
            Some(RemoteTarget::Named(name)) => {
                match self.remote_url(name, working_dir, plan_env).await {
                    Some(url) => url,
                    None => return Ok(Vec::new()),
                }
            }
        };

        match credential_env_for_url(self.credentials.as_ref(), &url) {
            Ok(env) => Ok(env),
            Err(CredentialError::UnknownHost(_)) => {
                tracing::trace!("Remote {} has no host; no credentials injected", url);
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// URL configured for a named remote. `None` when git cannot tell, in
    /// which case the operation itself reports the problem.
    async fn remote_url(
        &self,
        name: &str,
        working_dir: Option<&Path>,
        plan_env: &[(String, String)],
    ) -> Option<String> {
        let mut builder = ProcessCommandBuilder::new("git")
            .args(remote_url_lookup(name))
            .envs(plan_env.iter().map(|(k, v)| (k, v)))
            .timeout(LOOKUP_DEADLINE)
            .max_output_bytes(self.config.max_output_bytes);
        if let Some(dir) = working_dir {
            builder = builder.current_dir(dir);
        }

        match self.subprocess.runner().run(builder.build()).await {
            Ok(output) if output.status.success() => {
                let url = output.stdout_text().trim().to_string();
                (!url.is_empty()).then_some(url)
            }
            Ok(output) => {
                tracing::debug!(
                    "Could not resolve remote '{}': {}",
                    name,
                    output.stderr_text().trim()
                );
                None
            }
            Err(e) => {
                tracing::debug!("Could not resolve remote '{}': {}", name, e);
                None
            }
        }
    }

    /// Unmerged paths after a multi-step operation stopped on a conflict
    async fn unmerged_paths(&self, original: &ProcessCommand) -> Vec<String> {
        let lookup = classify::conflict_lookup(original);
        match self.subprocess.runner().run(lookup).await {
            Ok(output) if output.status.success() => values(&parse_lines(&output.stdout_text())),
            Ok(output) => {
                tracing::warn!(
                    "Conflict lookup exited with {:?}; using the tool's own report",
                    output.status
                );
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("Conflict lookup failed: {}", e);
                Vec::new()
            }
        }
    }
}
