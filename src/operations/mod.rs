//! Logical operations and their translation into tool invocations
//!
//! Every operation is a typed parameter struct implementing
//! [`PlanOperation`]. Planning validates the parameters and produces an
//! [`OperationPlan`]: the argument vector in its fixed flag order plus the
//! classification policy and output dialect that apply to the result.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod docker;
pub mod git;
pub mod kubernetes;
pub mod openssl;
pub mod validation;

pub use validation::ValidationError;

use crate::classify::ClassificationPolicy;
use crate::error::{BridgeError, ErrorCode};
use crate::parsers::OutputDialect;

use docker::*;
use git::*;
use kubernetes::*;
use openssl::*;

/// Where a remote-contacting operation sends its traffic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteTarget {
    /// A URL given directly (clone)
    Url(String),
    /// A configured remote name, resolved with `git remote get-url`
    Named(String),
}

/// A validated invocation ready for the engine
#[derive(Debug, Clone)]
pub struct OperationPlan {
    pub operation: &'static str,
    pub program: &'static str,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub stdin: Option<String>,
    /// Built-in deadline, before configuration overrides
    pub deadline: Duration,
    pub policy: ClassificationPolicy,
    pub dialect: OutputDialect,
    /// Set when credentials for a remote host must be injected
    pub remote: Option<RemoteTarget>,
}

impl OperationPlan {
    pub fn new(operation: &'static str, program: &'static str, deadline: Duration) -> Self {
        Self {
            operation,
            program,
            args: Vec::new(),
            working_dir: None,
            env: Vec::new(),
            stdin: None,
            deadline,
            policy: ClassificationPolicy::Default,
            dialect: OutputDialect::Discard,
            remote: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    /// Append `flag` when `enabled`
    pub fn flag(self, enabled: bool, flag: &str) -> Self {
        if enabled {
            self.arg(flag)
        } else {
            self
        }
    }

    /// Append `flag value` as two arguments when a value is present
    pub fn option<V: ToString>(self, flag: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.arg(flag).arg(value.to_string()),
            None => self,
        }
    }

    /// Append `flag=value` as one argument when a value is present
    pub fn option_eq<V: ToString>(self, flag: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.arg(format!("{flag}={}", value.to_string())),
            None => self,
        }
    }

    /// Append a positional value when present
    pub fn maybe_arg<V: AsRef<str>>(self, value: Option<V>) -> Self {
        match value {
            Some(value) => self.arg(value.as_ref()),
            None => self,
        }
    }

    pub fn in_dir(mut self, dir: Option<&Path>) -> Self {
        self.working_dir = dir.map(Path::to_path_buf);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    /// Data written to the tool's standard input
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn policy(mut self, policy: ClassificationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn dialect(mut self, dialect: OutputDialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn remote(mut self, remote: RemoteTarget) -> Self {
        self.remote = Some(remote);
        self
    }
}

/// Implemented by every operation's parameter struct
pub trait PlanOperation {
    /// Operation name as used in requests and configuration
    const NAME: &'static str;
    /// Built-in deadline
    const DEADLINE: Duration;
    const DESCRIPTION: &'static str;

    fn plan(&self) -> Result<OperationPlan, ValidationError>;

    /// Empty plan carrying this operation's name and deadline
    fn base_plan(program: &'static str) -> OperationPlan {
        OperationPlan::new(Self::NAME, program, Self::DEADLINE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationInfo {
    pub name: &'static str,
    pub deadline: Duration,
    pub description: &'static str,
}

macro_rules! operations {
    ($($variant:ident($params:ty)),* $(,)?) => {
        /// A request: operation name plus its parameters
        ///
        /// Serialized as `{"operation": "git_grep", "params": {...}}`.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "operation", content = "params", rename_all = "snake_case")]
        pub enum Operation {
            $($variant($params)),*
        }

        impl Operation {
            pub fn name(&self) -> &'static str {
                match self {
                    $(Operation::$variant(_) => <$params as PlanOperation>::NAME),*
                }
            }

            pub fn plan(&self) -> Result<OperationPlan, ValidationError> {
                match self {
                    $(Operation::$variant(params) => params.plan()),*
                }
            }
        }

        /// Every supported operation
        pub const CATALOGUE: &[OperationInfo] = &[
            $(OperationInfo {
                name: <$params as PlanOperation>::NAME,
                deadline: <$params as PlanOperation>::DEADLINE,
                description: <$params as PlanOperation>::DESCRIPTION,
            }),*
        ];
    };
}

operations! {
    GitStatus(GitStatusParams),
    GitLog(GitLogParams),
    GitShow(GitShowParams),
    GitBlame(GitBlameParams),
    GitGrep(GitGrepParams),
    GitConfig(GitConfigParams),
    GitDiff(GitDiffParams),
    GitConflictedFiles(GitConflictedFilesParams),
    GitMerge(GitMergeParams),
    GitCherryPick(GitCherryPickParams),
    GitRebase(GitRebaseParams),
    GitPull(GitPullParams),
    GitFetch(GitFetchParams),
    GitPush(GitPushParams),
    GitClone(GitCloneParams),
    GitAdd(GitAddParams),
    GitCommit(GitCommitParams),
    GitBranchList(GitBranchListParams),
    GitTagList(GitTagListParams),
    GitStashList(GitStashListParams),
    GitRemoteList(GitRemoteListParams),
    GitCurrentBranch(GitCurrentBranchParams),
    GitWorktreeList(GitWorktreeListParams),
    GitCheckout(GitCheckoutParams),
    GitReset(GitResetParams),
    GitInit(GitInitParams),
    GitClean(GitCleanParams),
    GitStash(GitStashParams),
    GitTag(GitTagParams),
    GitBranch(GitBranchParams),
    GitRemote(GitRemoteParams),
    DockerPs(DockerPsParams),
    DockerImages(DockerImagesParams),
    DockerSearch(DockerSearchParams),
    DockerVolumeLs(DockerVolumeLsParams),
    DockerNetworkLs(DockerNetworkLsParams),
    DockerInspect(DockerInspectParams),
    DockerLogs(DockerLogsParams),
    DockerPull(DockerPullParams),
    DockerStart(DockerStartParams),
    DockerStop(DockerStopParams),
    DockerRestart(DockerRestartParams),
    DockerRm(DockerRmParams),
    DockerExec(DockerExecParams),
    K8sPods(K8sPodsParams),
    K8sNamespaces(K8sNamespacesParams),
    K8sLogs(K8sLogsParams),
    SslCertView(SslCertViewParams),
    SslCertVerify(SslCertVerifyParams),
}

impl Operation {
    /// Build from a name and a JSON parameter object
    pub fn from_parts(name: &str, params: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(serde_json::json!({
            "operation": name,
            "params": params,
        }))
    }

    /// Like [`Operation::from_parts`], reporting problems as validation errors
    pub fn from_request(name: &str, params: serde_json::Value) -> Result<Self, BridgeError> {
        if find_operation(name).is_none() {
            return Err(BridgeError::validation_with_code(
                ErrorCode::VALIDATION_UNKNOWN_OPERATION,
                format!("unknown operation '{name}'"),
                None,
            ));
        }
        if !params.is_object() {
            return Err(BridgeError::validation_with_code(
                ErrorCode::VALIDATION_INVALID_FORMAT,
                format!("parameters for '{name}' must be a JSON object"),
                None,
            ));
        }
        Self::from_parts(name, params).map_err(|e| {
            BridgeError::validation_with_code(
                ErrorCode::VALIDATION_INVALID_FORMAT,
                format!("invalid parameters for '{name}': {e}"),
                None,
            )
            .with_source(e)
        })
    }
}

pub fn find_operation(name: &str) -> Option<&'static OperationInfo> {
    CATALOGUE.iter().find(|info| info.name == name)
}
