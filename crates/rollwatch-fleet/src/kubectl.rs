//! kubectl-backed fleet.
//!
//! Runs `kubectl get pods -l <selector> -o json` and decodes the PodList.
//! Only the fields the snapshot needs are decoded; everything else in the
//! document is ignored.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use rollwatch_core::FleetConfig;

use crate::error::{FleetError, FleetResult};
use crate::query::{FleetFuture, FleetQuery};
use crate::record::{ContainerState, ContainerStatus, ProcessRecord};

/// Fleet queried through the kubectl binary.
#[derive(Debug, Clone)]
pub struct KubectlFleet {
    program: String,
    namespace: Option<String>,
    context: Option<String>,
}

impl KubectlFleet {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            namespace: None,
            context: None,
        }
    }

    pub fn from_config(config: &FleetConfig) -> Self {
        Self {
            program: config.kubectl.clone(),
            namespace: config.namespace.clone(),
            context: config.context.clone(),
        }
    }

    /// Restrict queries to one namespace. All namespaces otherwise.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    fn args(&self, selector: &str) -> Vec<String> {
        let mut args = vec![
            "get".to_string(),
            "pods".to_string(),
            "-l".to_string(),
            selector.to_string(),
            "-o".to_string(),
            "json".to_string(),
        ];
        match &self.namespace {
            Some(ns) => args.extend(["-n".to_string(), ns.clone()]),
            None => args.push("--all-namespaces".to_string()),
        }
        if let Some(ctx) = &self.context {
            args.extend(["--context".to_string(), ctx.clone()]);
        }
        args
    }

    async fn list(&self, selector: &str) -> FleetResult<Vec<ProcessRecord>> {
        let args = self.args(selector);
        debug!(program = %self.program, ?args, "querying pods");

        let output = Command::new(&self.program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| FleetError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(FleetError::Command {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        decode_pod_list(&output.stdout, self.namespace.is_none())
    }
}

impl FleetQuery for KubectlFleet {
    fn list_processes<'a>(&'a self, selector: &'a str) -> FleetFuture<'a> {
        Box::pin(self.list(selector))
    }
}

/// Decode a `PodList` JSON document.
///
/// With `qualify` set, identities are `namespace/name` so that pods with
/// the same name in different namespaces stay distinct.
pub fn decode_pod_list(json: &[u8], qualify: bool) -> FleetResult<Vec<ProcessRecord>> {
    let list: PodList = serde_json::from_slice(json)?;
    Ok(list
        .items
        .into_iter()
        .map(|pod| pod.into_record(qualify))
        .collect())
}

#[derive(Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<Pod>,
}

#[derive(Deserialize)]
struct Pod {
    metadata: PodMeta,
    #[serde(default)]
    status: Option<PodStatus>,
}

#[derive(Deserialize)]
struct PodMeta {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodStatus {
    #[serde(default)]
    container_statuses: Option<Vec<RawContainerStatus>>,
}

#[derive(Deserialize)]
struct RawContainerStatus {
    name: String,
    #[serde(default)]
    state: RawState,
}

#[derive(Deserialize, Default)]
struct RawState {
    running: Option<RawRunning>,
    waiting: Option<RawWaiting>,
    terminated: Option<RawTerminated>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRunning {
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct RawWaiting {
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTerminated {
    #[serde(default)]
    exit_code: i32,
    #[serde(default)]
    reason: Option<String>,
}

impl Pod {
    fn into_record(self, qualify: bool) -> ProcessRecord {
        let identity = match (qualify, self.metadata.namespace) {
            (true, Some(ns)) => format!("{ns}/{}", self.metadata.name),
            _ => self.metadata.name,
        };
        let containers = self
            .status
            .and_then(|s| s.container_statuses)
            .unwrap_or_default()
            .into_iter()
            .map(RawContainerStatus::into_status)
            .collect();
        ProcessRecord::new(identity, containers)
    }
}

impl RawContainerStatus {
    fn into_status(self) -> ContainerStatus {
        let state = match self.state {
            RawState {
                running: Some(r), ..
            } => ContainerState::Running {
                started_at: r.started_at,
            },
            RawState {
                terminated: Some(t),
                ..
            } => ContainerState::Terminated {
                exit_code: t.exit_code,
                reason: t.reason,
            },
            RawState {
                waiting: Some(w), ..
            } => ContainerState::Waiting { reason: w.reason },
            // An empty state object means the kubelet has nothing yet.
            RawState { .. } => ContainerState::Waiting { reason: None },
        };
        ContainerStatus {
            name: self.name,
            state,
        }
    }
}
