use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::validation::{
    check_not_flag, optional_resource, require, require_resource, require_resources,
    ValidationError,
};
use super::{OperationPlan, PlanOperation};
use crate::parsers::tabular::docker_search_table;
use crate::parsers::OutputDialect;

const DOCKER: &str = "docker";
const JSON_FORMAT: &str = "{{json .}}";

/// `--filter key=value` pairs in the order given
fn filters(mut plan: OperationPlan, filters: &[(&str, Option<&str>)]) -> OperationPlan {
    for (key, value) in filters {
        if let Some(value) = value {
            plan = plan.arg("--filter").arg(format!("{key}={value}"));
        }
    }
    plan
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DockerPsParams {
    /// Include stopped containers
    pub all: bool,
    pub size: bool,
    pub no_trunc: bool,
    pub status: Option<String>,
    pub ancestor: Option<String>,
    pub name: Option<String>,
    pub label: Option<String>,
}

impl PlanOperation for DockerPsParams {
    const NAME: &'static str = "docker_ps";
    const DEADLINE: Duration = Duration::from_secs(30);
    const DESCRIPTION: &'static str = "List containers";

    fn plan(&self) -> Result<OperationPlan, ValidationError> {
        let plan = Self::base_plan(DOCKER)
            .arg("ps")
            .flag(self.all, "--all")
            .flag(self.size, "--size")
            .flag(self.no_trunc, "--no-trunc");
        Ok(filters(
            plan,
            &[
                ("status", self.status.as_deref()),
                ("ancestor", self.ancestor.as_deref()),
                ("name", self.name.as_deref()),
                ("label", self.label.as_deref()),
            ],
        )
        .args(["--format", JSON_FORMAT])
        .dialect(OutputDialect::JsonLines))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DockerImagesParams {
    /// Repository, optionally with tag
    pub reference: Option<String>,
    pub all: bool,
    pub dangling: Option<bool>,
    pub no_trunc: bool,
}

impl PlanOperation for DockerImagesParams {
    const NAME: &'static str = "docker_images";
    const DEADLINE: Duration = Duration::from_secs(30);
    const DESCRIPTION: &'static str = "List local images";

    fn plan(&self) -> Result<OperationPlan, ValidationError> {
        optional_resource("reference", self.reference.as_deref())?;
        let dangling = self.dangling.map(|d| d.to_string());
        let plan = Self::base_plan(DOCKER)
            .arg("images")
            .flag(self.all, "--all")
            .flag(self.no_trunc, "--no-trunc");
        Ok(filters(plan, &[("dangling", dangling.as_deref())])
            .args(["--format", JSON_FORMAT])
            .maybe_arg(self.reference.as_deref())
            .dialect(OutputDialect::JsonLines))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DockerSearchParams {
    pub term: Option<String>,
    pub limit: Option<u32>,
    pub min_stars: Option<u32>,
    pub official_only: bool,
}

impl PlanOperation for DockerSearchParams {
    const NAME: &'static str = "docker_search";
    const DEADLINE: Duration = Duration::from_secs(60);
    const DESCRIPTION: &'static str = "Search Docker Hub through the docker CLI";

    fn plan(&self) -> Result<OperationPlan, ValidationError> {
        let term = require_resource("term", self.term.as_deref())?;
        if let Some(limit) = self.limit {
            if !(1..=100).contains(&limit) {
                return Err(ValidationError::InvalidValue {
                    field: "limit",
                    message: format!("{limit} is outside 1..=100"),
                });
            }
        }

        Ok(Self::base_plan(DOCKER)
            .args(["search", "--no-trunc"])
            .flag(self.official_only, "--filter=is-official=true")
            .option_eq("--filter=stars", self.min_stars)
            .option_eq("--limit", self.limit)
            .arg(term)
            .dialect(OutputDialect::Tabular(docker_search_table())))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DockerVolumeLsParams {
    pub dangling: Option<bool>,
    pub driver: Option<String>,
    pub name: Option<String>,
}

impl PlanOperation for DockerVolumeLsParams {
    const NAME: &'static str = "docker_volume_ls";
    const DEADLINE: Duration = Duration::from_secs(30);
    const DESCRIPTION: &'static str = "List volumes";

    fn plan(&self) -> Result<OperationPlan, ValidationError> {
        let dangling = self.dangling.map(|d| d.to_string());
        let plan = Self::base_plan(DOCKER).args(["volume", "ls"]);
        Ok(filters(
            plan,
            &[
                ("dangling", dangling.as_deref()),
                ("driver", self.driver.as_deref()),
                ("name", self.name.as_deref()),
            ],
        )
        .args(["--format", JSON_FORMAT])
        .dialect(OutputDialect::JsonLines))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DockerNetworkLsParams {
    pub driver: Option<String>,
    pub name: Option<String>,
    pub no_trunc: bool,
}

impl PlanOperation for DockerNetworkLsParams {
    const NAME: &'static str = "docker_network_ls";
    const DEADLINE: Duration = Duration::from_secs(30);
    const DESCRIPTION: &'static str = "List networks";

    fn plan(&self) -> Result<OperationPlan, ValidationError> {
        let plan = Self::base_plan(DOCKER)
            .args(["network", "ls"])
            .flag(self.no_trunc, "--no-trunc");
        Ok(filters(
            plan,
            &[
                ("driver", self.driver.as_deref()),
                ("name", self.name.as_deref()),
            ],
        )
        .args(["--format", JSON_FORMAT])
        .dialect(OutputDialect::JsonLines))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Container,
    Image,
    Volume,
    Network,
}

impl ObjectType {
    fn as_str(self) -> &'static str {
        match self {
            ObjectType::Container => "container",
            ObjectType::Image => "image",
            ObjectType::Volume => "volume",
            ObjectType::Network => "network",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DockerInspectParams {
    pub targets: Vec<String>,
    #[serde(rename = "type")]
    pub object_type: Option<ObjectType>,
    /// Container size fields
    pub size: bool,
}

impl PlanOperation for DockerInspectParams {
    const NAME: &'static str = "docker_inspect";
    const DEADLINE: Duration = Duration::from_secs(30);
    const DESCRIPTION: &'static str = "Low-level details of docker objects";

    fn plan(&self) -> Result<OperationPlan, ValidationError> {
        require_resources("targets", &self.targets)?;
        Ok(Self::base_plan(DOCKER)
            .arg("inspect")
            .option("--type", self.object_type.map(ObjectType::as_str))
            .flag(self.size, "--size")
            .args(&self.targets)
            .dialect(OutputDialect::JsonDocument { items_key: None }))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DockerLogsParams {
    pub container: Option<String>,
    /// Number of lines from the end
    pub tail: Option<u32>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub timestamps: bool,
}

impl PlanOperation for DockerLogsParams {
    const NAME: &'static str = "docker_logs";
    const DEADLINE: Duration = Duration::from_secs(60);
    const DESCRIPTION: &'static str = "Container log lines";

    fn plan(&self) -> Result<OperationPlan, ValidationError> {
        let container = require_resource("container", self.container.as_deref())?;
        Ok(Self::base_plan(DOCKER)
            .arg("logs")
            .option("--tail", self.tail)
            .option("--since", self.since.as_deref())
            .option("--until", self.until.as_deref())
            .flag(self.timestamps, "--timestamps")
            .arg(container)
            .dialect(OutputDialect::Lines))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DockerPullParams {
    pub image: Option<String>,
    pub tag: Option<String>,
    pub platform: Option<String>,
    pub all_tags: bool,
}

impl PlanOperation for DockerPullParams {
    const NAME: &'static str = "docker_pull";
    const DEADLINE: Duration = Duration::from_secs(300);
    const DESCRIPTION: &'static str = "Pull an image from a registry";

    fn plan(&self) -> Result<OperationPlan, ValidationError> {
        let image = require_resource("image", self.image.as_deref())?;
        if self.all_tags && self.tag.is_some() {
            return Err(ValidationError::Conflicting(
                "tag and all_tags are mutually exclusive".to_string(),
            ));
        }
        let reference = match self.tag.as_deref() {
            Some(tag) => format!("{image}:{}", require("tag", Some(tag))?),
            None => image.to_string(),
        };

        Ok(Self::base_plan(DOCKER)
            .args(["pull", "--quiet"])
            .option("--platform", self.platform.as_deref())
            .flag(self.all_tags, "--all-tags")
            .arg(reference)
            .dialect(OutputDialect::Lines))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DockerStartParams {
    pub containers: Vec<String>,
}

impl PlanOperation for DockerStartParams {
    const NAME: &'static str = "docker_start";
    const DEADLINE: Duration = Duration::from_secs(60);
    const DESCRIPTION: &'static str = "Start stopped containers";

    fn plan(&self) -> Result<OperationPlan, ValidationError> {
        require_resources("containers", &self.containers)?;
        Ok(Self::base_plan(DOCKER)
            .arg("start")
            .args(&self.containers)
            .dialect(OutputDialect::Lines))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DockerStopParams {
    pub containers: Vec<String>,
    /// Seconds to wait before killing
    pub time: Option<u32>,
}

impl PlanOperation for DockerStopParams {
    const NAME: &'static str = "docker_stop";
    const DEADLINE: Duration = Duration::from_secs(60);
    const DESCRIPTION: &'static str = "Stop running containers";

    fn plan(&self) -> Result<OperationPlan, ValidationError> {
        require_resources("containers", &self.containers)?;
        Ok(Self::base_plan(DOCKER)
            .arg("stop")
            .option("--time", self.time)
            .args(&self.containers)
            .dialect(OutputDialect::Lines))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DockerRestartParams {
    pub containers: Vec<String>,
    /// Seconds to wait for the stop before killing
    pub time: Option<u32>,
}

impl PlanOperation for DockerRestartParams {
    const NAME: &'static str = "docker_restart";
    const DEADLINE: Duration = Duration::from_secs(90);
    const DESCRIPTION: &'static str = "Restart containers";

    fn plan(&self) -> Result<OperationPlan, ValidationError> {
        require_resources("containers", &self.containers)?;
        Ok(Self::base_plan(DOCKER)
            .arg("restart")
            .option("--time", self.time)
            .args(&self.containers)
            .dialect(OutputDialect::Lines))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DockerRmParams {
    pub containers: Vec<String>,
    pub force: bool,
    /// Remove anonymous volumes too
    pub volumes: bool,
}

impl PlanOperation for DockerRmParams {
    const NAME: &'static str = "docker_rm";
    const DEADLINE: Duration = Duration::from_secs(60);
    const DESCRIPTION: &'static str = "Remove containers";

    fn plan(&self) -> Result<OperationPlan, ValidationError> {
        require_resources("containers", &self.containers)?;
        Ok(Self::base_plan(DOCKER)
            .arg("rm")
            .flag(self.force, "--force")
            .flag(self.volumes, "--volumes")
            .args(&self.containers)
            .dialect(OutputDialect::Lines))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DockerExecParams {
    pub container: Option<String>,
    /// Program and its arguments, passed through unchanged
    pub command: Vec<String>,
    pub user: Option<String>,
    pub workdir: Option<String>,
    /// `KEY=VALUE` entries
    pub env: Vec<String>,
}

impl PlanOperation for DockerExecParams {
    const NAME: &'static str = "docker_exec";
    const DEADLINE: Duration = Duration::from_secs(120);
    const DESCRIPTION: &'static str = "Run a command inside a running container";

    fn plan(&self) -> Result<OperationPlan, ValidationError> {
        let container = require_resource("container", self.container.as_deref())?;
        match self.command.first() {
            Some(program) => check_not_flag("command", program)?,
            None => return Err(ValidationError::MissingField { field: "command" }),
        }

        let mut plan = Self::base_plan(DOCKER)
            .arg("exec")
            .option("--user", self.user.as_deref())
            .option("--workdir", self.workdir.as_deref());
        for entry in &self.env {
            let valid = entry
                .split_once('=')
                .is_some_and(|(key, _)| !key.is_empty());
            if !valid {
                return Err(ValidationError::InvalidValue {
                    field: "env",
                    message: format!("expected KEY=VALUE, got '{entry}'"),
                });
            }
            plan = plan.arg("--env").arg(entry);
        }

        Ok(plan
            .arg(container)
            .args(&self.command)
            .dialect(OutputDialect::Lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(plan: &OperationPlan) -> Vec<&str> {
        plan.args.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_ps_filters_precede_format() {
        let params = DockerPsParams {
            all: true,
            status: Some("exited".to_string()),
            name: Some("web".to_string()),
            ..Default::default()
        };
        assert_eq!(
            args(&params.plan().unwrap()),
            vec![
                "ps",
                "--all",
                "--filter",
                "status=exited",
                "--filter",
                "name=web",
                "--format",
                "{{json .}}"
            ]
        );
    }

    #[test]
    fn test_search_plan() {
        let params = DockerSearchParams {
            term: Some("nginx".to_string()),
            limit: Some(10),
            min_stars: Some(100),
            official_only: true,
        };
        let plan = params.plan().unwrap();
        assert_eq!(
            args(&plan),
            vec![
                "search",
                "--no-trunc",
                "--filter=is-official=true",
                "--filter=stars=100",
                "--limit=10",
                "nginx"
            ]
        );
        assert!(matches!(plan.dialect, OutputDialect::Tabular(_)));
    }

    #[test]
    fn test_search_limit_bounds() {
        let params = DockerSearchParams {
            term: Some("nginx".to_string()),
            limit: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            params.plan(),
            Err(ValidationError::InvalidValue { field: "limit", .. })
        ));
    }

    #[test]
    fn test_inspect_requires_targets() {
        assert_eq!(
            DockerInspectParams::default().plan().unwrap_err(),
            ValidationError::MissingField { field: "targets" }
        );

        let params = DockerInspectParams {
            targets: vec!["web".to_string()],
            object_type: Some(ObjectType::Container),
            size: true,
        };
        assert_eq!(
            args(&params.plan().unwrap()),
            vec!["inspect", "--type", "container", "--size", "web"]
        );
    }

    #[test]
    fn test_pull_reference() {
        let params = DockerPullParams {
            image: Some("alpine".to_string()),
            tag: Some("3.20".to_string()),
            ..Default::default()
        };
        assert_eq!(
            args(&params.plan().unwrap()),
            vec!["pull", "--quiet", "alpine:3.20"]
        );
    }

    #[test]
    fn test_exec_plan() {
        let params = DockerExecParams {
            container: Some("k3s-server".to_string()),
            command: vec!["ls".to_string(), "-la".to_string()],
            workdir: Some("/tmp".to_string()),
            env: vec!["A=1".to_string()],
            ..Default::default()
        };
        assert_eq!(
            args(&params.plan().unwrap()),
            vec!["exec", "--workdir", "/tmp", "--env", "A=1", "k3s-server", "ls", "-la"]
        );
    }

    #[test]
    fn test_exec_validation() {
        let no_command = DockerExecParams {
            container: Some("web".to_string()),
            ..Default::default()
        };
        assert_eq!(
            no_command.plan().unwrap_err(),
            ValidationError::MissingField { field: "command" }
        );

        let bad_env = DockerExecParams {
            container: Some("web".to_string()),
            command: vec!["env".to_string()],
            env: vec!["=oops".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            bad_env.plan(),
            Err(ValidationError::InvalidValue { field: "env", .. })
        ));
    }

    #[test]
    fn test_flag_like_container_is_rejected() {
        let params = DockerRmParams {
            containers: vec!["--help".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            params.plan(),
            Err(ValidationError::FlagLike { .. })
        ));
    }

    #[test]
    fn test_restart_plan() {
        let params = DockerRestartParams {
            containers: vec!["web".to_string(), "worker".to_string()],
            time: Some(5),
        };
        assert_eq!(
            args(&params.plan().unwrap()),
            vec!["restart", "--time", "5", "web", "worker"]
        );
        assert!(matches!(
            DockerRestartParams::default().plan(),
            Err(ValidationError::MissingField { field: "containers" })
        ));
    }
}
