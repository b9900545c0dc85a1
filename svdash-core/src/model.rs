use serde::{Deserialize, Serialize};

pub type ServerName = String;

/// Process state as reported by supervisord
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessState {
    Stopped,
    Starting,
    Running,
    Backoff,
    Stopping,
    Exited,
    Fatal,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ProcessState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Backoff => "backoff",
            Self::Stopping => "stopping",
            Self::Exited => "exited",
            Self::Fatal => "fatal",
            Self::Unknown => "unknown",
        }
    }

    /// States supervisord considers failed
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Backoff | Self::Fatal)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorServer {
    pub name: ServerName,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// Set by the API when the supervisor could not be reached
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Process {
    pub name: String,
    pub group: String,
    #[serde(default)]
    pub state: ProcessState,
    #[serde(default)]
    pub pid: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Process {
    /// supervisorctl-style `group:name`
    pub fn full_name(&self) -> String {
        format!("{}:{}", self.group, self.name)
    }
}

/// One managed host and the processes it monitors
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supervisor {
    pub server: SupervisorServer,
    #[serde(default)]
    pub processes: Vec<Process>,
}

impl Supervisor {
    pub fn running_count(&self) -> usize {
        self.processes
            .iter()
            .filter(|p| p.state == ProcessState::Running)
            .count()
    }
}

pub fn total_processes(supervisors: &[Supervisor]) -> usize {
    supervisors.iter().map(|s| s.processes.len()).sum()
}
