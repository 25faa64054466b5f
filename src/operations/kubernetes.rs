//! kubectl operations, run inside the cluster's node container
//!
//! The cluster is a k3s node running in docker, so every call is
//! `docker exec <node> kubectl ...` and needs no kubeconfig on the host.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::validation::{optional_resource, require_resource, ValidationError};
use super::{OperationPlan, PlanOperation};
use crate::parsers::tabular::namespace_table;
use crate::parsers::OutputDialect;

pub const DEFAULT_NODE_CONTAINER: &str = "k3s-server";

fn kubectl<P: PlanOperation>(node: Option<&str>) -> Result<OperationPlan, ValidationError> {
    let node = require_resource("node", Some(node.unwrap_or(DEFAULT_NODE_CONTAINER)))?;
    Ok(P::base_plan("docker").arg("exec").arg(node).arg("kubectl"))
}

fn namespace_scope(
    plan: OperationPlan,
    namespace: Option<&str>,
    all_namespaces: bool,
) -> Result<OperationPlan, ValidationError> {
    if all_namespaces && namespace.is_some() {
        return Err(ValidationError::Conflicting(
            "namespace and all_namespaces are mutually exclusive".to_string(),
        ));
    }
    optional_resource("namespace", namespace)?;
    Ok(plan
        .option("--namespace", namespace)
        .flag(all_namespaces, "--all-namespaces"))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct K8sPodsParams {
    /// Node container name
    pub node: Option<String>,
    pub namespace: Option<String>,
    pub all_namespaces: bool,
    pub selector: Option<String>,
}

impl PlanOperation for K8sPodsParams {
    const NAME: &'static str = "k8s_pods";
    const DEADLINE: Duration = Duration::from_secs(60);
    const DESCRIPTION: &'static str = "Pods as kubectl JSON objects";

    fn plan(&self) -> Result<OperationPlan, ValidationError> {
        let plan = kubectl::<Self>(self.node.as_deref())?.args(["get", "pods"]);
        Ok(
            namespace_scope(plan, self.namespace.as_deref(), self.all_namespaces)?
                .option("--selector", self.selector.as_deref())
                .args(["--output", "json"])
                .dialect(OutputDialect::JsonDocument {
                    items_key: Some("items"),
                }),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct K8sNamespacesParams {
    pub node: Option<String>,
}

impl PlanOperation for K8sNamespacesParams {
    const NAME: &'static str = "k8s_namespaces";
    const DEADLINE: Duration = Duration::from_secs(30);
    const DESCRIPTION: &'static str = "Namespaces with status and age";

    fn plan(&self) -> Result<OperationPlan, ValidationError> {
        Ok(kubectl::<Self>(self.node.as_deref())?
            .args(["get", "namespaces"])
            .dialect(OutputDialect::Tabular(namespace_table())))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct K8sLogsParams {
    pub node: Option<String>,
    pub pod: Option<String>,
    pub namespace: Option<String>,
    pub container: Option<String>,
    pub tail: Option<u32>,
    /// Logs of the previous container instance
    pub previous: bool,
    pub timestamps: bool,
}

impl PlanOperation for K8sLogsParams {
    const NAME: &'static str = "k8s_logs";
    const DEADLINE: Duration = Duration::from_secs(60);
    const DESCRIPTION: &'static str = "Pod log lines";

    fn plan(&self) -> Result<OperationPlan, ValidationError> {
        let pod = require_resource("pod", self.pod.as_deref())?;
        optional_resource("container", self.container.as_deref())?;
        let plan = kubectl::<Self>(self.node.as_deref())?.arg("logs");
        Ok(namespace_scope(plan, self.namespace.as_deref(), false)?
            .option("--container", self.container.as_deref())
            .option_eq("--tail", self.tail)
            .flag(self.previous, "--previous")
            .flag(self.timestamps, "--timestamps")
            .arg(pod)
            .dialect(OutputDialect::Lines))
    }
}
