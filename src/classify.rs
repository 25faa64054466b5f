//! Exit classification
//!
//! Each operation declares one [`ClassificationPolicy`]. [`classify`] is a
//! pure function of the process outcome, the policy and (for multi-step
//! operations) the unmerged paths reported by the follow-up lookup.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::subprocess::{ExitStatus, ProcessCommand, ProcessCommandBuilder, ProcessOutput};

/// Deadline for the read-only lookup that lists unmerged paths
const LOOKUP_DEADLINE: Duration = Duration::from_secs(30);

static CONFLICT_PATHS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"Merge conflict in (.+?)\s*$",
        r"CONFLICT \([^)]*\): (\S+) deleted in ",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("Valid regex pattern"))
    .collect()
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Classification {
    Success,
    NoMatchFound,
    ConflictDetected { resources: Vec<String> },
    Failure { diagnostic: String },
    TimedOut,
}

impl Classification {
    pub fn name(&self) -> &'static str {
        match self {
            Classification::Success => "success",
            Classification::NoMatchFound => "no_match_found",
            Classification::ConflictDetected { .. } => "conflict_detected",
            Classification::Failure { .. } => "failure",
            Classification::TimedOut => "timed_out",
        }
    }

    /// Whether stdout should be handed to the operation's parser
    pub fn carries_records(&self) -> bool {
        matches!(self, Classification::Success)
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Classification::Failure { .. } | Classification::TimedOut
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationPolicy {
    /// 0 is success, anything else is failure
    Default,
    /// grep-like tools: exit 1 with no output means nothing matched
    PatternSearch,
    /// merge, cherry-pick, rebase, pull: a marker in the output turns a
    /// non-zero exit into a conflict report
    MultiStep { marker: &'static str },
}

impl ClassificationPolicy {
    pub const GIT_CONFLICT: ClassificationPolicy = ClassificationPolicy::MultiStep {
        marker: "CONFLICT",
    };

    pub fn name(&self) -> &'static str {
        match self {
            ClassificationPolicy::Default => "default",
            ClassificationPolicy::PatternSearch => "pattern_search",
            ClassificationPolicy::MultiStep { .. } => "multi_step",
        }
    }
}

/// True when a multi-step operation stopped on a conflict and the unmerged
/// paths should be looked up before classifying.
pub fn needs_conflict_lookup(output: &ProcessOutput, policy: &ClassificationPolicy) -> bool {
    match policy {
        ClassificationPolicy::MultiStep { marker } => {
            !output.timed_out()
                && !output.output_overflow
                && matches!(output.status, ExitStatus::Error(_))
                && !marker_lines(output, marker).is_empty()
        }
        _ => false,
    }
}

/// `git diff --name-only --diff-filter=U` in the same repository and
/// environment as the command that reported the conflict
pub fn conflict_lookup(original: &ProcessCommand) -> ProcessCommand {
    let mut builder = ProcessCommandBuilder::new("git")
        .args(["diff", "--name-only", "--diff-filter=U"])
        .envs(original.env.iter())
        .timeout(original.timeout.min(LOOKUP_DEADLINE))
        .max_output_bytes(original.max_output_bytes);
    if let Some(dir) = &original.working_dir {
        builder = builder.current_dir(dir);
    }
    builder.build()
}

pub fn classify(
    output: &ProcessOutput,
    policy: &ClassificationPolicy,
    unmerged: &[String],
) -> Classification {
    if output.timed_out() {
        return Classification::TimedOut;
    }

    if output.output_overflow {
        return Classification::Failure {
            diagnostic: "output exceeded the capture limit".to_string(),
        };
    }

    let code = match output.status {
        ExitStatus::Success => return Classification::Success,
        ExitStatus::Error(code) => code,
        ExitStatus::Signal(signal) => {
            return Classification::Failure {
                diagnostic: with_stderr(output, format!("terminated by signal {signal}")),
            }
        }
        ExitStatus::Timeout => return Classification::TimedOut,
    };

    match policy {
        ClassificationPolicy::PatternSearch
            if code == 1 && output.stdout.iter().all(u8::is_ascii_whitespace) =>
        {
            Classification::NoMatchFound
        }
        ClassificationPolicy::MultiStep { marker } => {
            let resources = conflicted_resources(output, marker, unmerged);
            if resources.is_empty() {
                failure(output, code)
            } else {
                Classification::ConflictDetected { resources }
            }
        }
        _ => failure(output, code),
    }
}

fn failure(output: &ProcessOutput, code: i32) -> Classification {
    Classification::Failure {
        diagnostic: with_stderr(output, format!("exited with code {code}")),
    }
}

fn with_stderr(output: &ProcessOutput, status: String) -> String {
    let stderr = output.stderr_text();
    let stderr = stderr.trim();
    if stderr.is_empty() {
        status
    } else {
        format!("{status}: {stderr}")
    }
}

fn marker_lines(output: &ProcessOutput, marker: &str) -> Vec<String> {
    let stdout = output.stdout_text();
    let stderr = output.stderr_text();
    stdout
        .lines()
        .chain(stderr.lines())
        .filter(|line| line.contains(marker))
        .map(str::to_string)
        .collect()
}

/// Unmerged paths from the lookup merged with the paths named on the marker
/// lines. A marker line with no recognisable path is kept whole, so the list
/// is never empty when the marker is present.
pub fn conflicted_resources(
    output: &ProcessOutput,
    marker: &str,
    unmerged: &[String],
) -> Vec<String> {
    let mut resources: Vec<String> = Vec::new();
    let mut push = |item: &str| {
        let item = item.trim();
        if !item.is_empty() && !resources.iter().any(|r| r == item) {
            resources.push(item.to_string());
        }
    };

    for path in unmerged {
        push(path);
    }

    for line in marker_lines(output, marker) {
        match extract_conflict_path(&line) {
            Some(path) => push(&path),
            None => push(&line),
        }
    }

    resources
}

/// Path named by a line such as `CONFLICT (content): Merge conflict in src/lib.rs`
pub fn extract_conflict_path(line: &str) -> Option<String> {
    CONFLICT_PATHS.iter().find_map(|pattern| {
        pattern
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|path| !path.is_empty())
    })
}
