//! Wire types for the supervisor management (mutation) endpoint.
//!
//! A request names the server, the process and what to do with it. The
//! response comes back in one of two shapes depending on the action:
//! `{ operationResult: { ok, isFault, error } }` for single-process
//! operations, `{ changedProcesses: { ok, error } }` for actions that
//! rewrite the process table (clone, remove).

use serde::{Deserialize, Serialize};

use crate::model::{Process, SupervisorServer};

/// Mutating action sent in the `type` field of a request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManageAction {
    ClearProcessLog,
    CloneProcess,
    RemoveProcess,
}

impl ManageAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClearProcessLog => "clear_process_log",
            Self::CloneProcess => "clone_process",
            Self::RemoveProcess => "remove_process",
        }
    }

    /// Success message shown once the server confirms the action
    pub fn success_message(&self, server: &str, process: &str) -> String {
        match self {
            Self::ClearProcessLog => {
                format!("Process {} log cleared on server {}", process, server)
            }
            Self::CloneProcess => format!("Process {} cloned on server {}", process, server),
            Self::RemoveProcess => format!("Process {} removed on server {}", process, server),
        }
    }
}

impl std::fmt::Display for ManageAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManageRequest {
    pub server: String,
    #[serde(rename = "type")]
    pub action: ManageAction,
    pub group: String,
    pub process: String,
}

impl ManageRequest {
    pub fn new(action: ManageAction, server: &SupervisorServer, process: &Process) -> Self {
        Self {
            server: server.name.clone(),
            action,
            group: process.group.clone(),
            process: process.name.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub is_fault: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangedProcesses {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManageResult {
    #[serde(default)]
    pub operation_result: Option<OperationResult>,
    #[serde(default)]
    pub changed_processes: Option<ChangedProcesses>,
}

/// How a management response should be reported
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub success: bool,
    /// Error notification to raise, if any
    pub error: Option<String>,
}

impl ManageResult {
    /// Classify the response. `operationResult` takes precedence over
    /// `changedProcesses`; a response carrying neither is a failure with no
    /// message of its own. A fault is never a success, even if `ok` is set.
    pub fn verdict(&self) -> Verdict {
        if let Some(op) = &self.operation_result {
            let error = op.is_fault.then(|| {
                format!(
                    "Operation got fault: {}",
                    op.error.as_deref().unwrap_or_default()
                )
            });
            return Verdict {
                success: op.ok && !op.is_fault,
                error,
            };
        }

        if let Some(changed) = &self.changed_processes {
            let error = (!changed.ok).then(|| {
                format!(
                    "Got error while changing processes: {}",
                    changed.error.as_deref().unwrap_or_default()
                )
            });
            return Verdict {
                success: changed.ok,
                error,
            };
        }

        Verdict {
            success: false,
            error: None,
        }
    }
}
