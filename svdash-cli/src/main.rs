mod client;
mod logging;
mod notifier;
mod ui;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};

use svdash_core::config::DashConfig;
use svdash_core::manage::ManageAction;
use svdash_core::model::{Process, ProcessState, Supervisor, SupervisorServer};
use svdash_core::notify::{MemoryNotificator, Notificator};
use svdash_core::prefs::{FilePreferenceStore, PreferenceStore};
use svdash_core::state::Loadable;
use svdash_core::store::DashboardStore;

use client::HttpSupervisorApi;
use notifier::ConsoleNotificator;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "svdash")]
#[command(about = "Watch and manage remote supervisors", long_about = None)]
struct Cli {
    /// Config file (otherwise SVDASH_CONFIG or svdash.yaml is searched)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the API base URL from the config file
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Live dashboard (default)
    Tui,
    /// Fetch once and print every process
    Status,
    /// Clear a process log
    ClearLog(Target),
    /// Clone a process
    Clone(Target),
    /// Remove a process
    Remove(Target),
    /// Turn auto-refresh on or off
    AutoRefresh {
        #[arg(value_enum)]
        state: Switch,
    },
    /// Toggle whether mutating commands are allowed
    AllowMutators,
    /// Save the API token, or clear it
    Token {
        #[arg(required_unless_present = "clear")]
        token: Option<String>,
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Args)]
struct Target {
    #[arg(long)]
    server: String,
    #[arg(long)]
    group: String,
    #[arg(long)]
    process: String,
}

impl Target {
    /// Requests only carry names, so the rest of the record stays empty
    fn into_records(self) -> (SupervisorServer, Process) {
        (
            SupervisorServer {
                name: self.server,
                url: None,
                version: None,
                error: None,
            },
            Process {
                name: self.process,
                group: self.group,
                state: ProcessState::Unknown,
                pid: None,
                description: None,
            },
        )
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

fn load_config(cli: &Cli) -> CliResult<DashConfig> {
    let mut config = match &cli.config {
        Some(path) => DashConfig::load(path)?,
        None => {
            let cwd = std::env::current_dir()?;
            match DashConfig::discover(&cwd)? {
                Some((path, config)) => {
                    tracing::debug!(event = "config.loaded", path = %path.display());
                    config
                }
                None => DashConfig::default(),
            }
        }
    };

    if let Some(url) = &cli.api_url {
        config.api_url = url.clone();
    }
    config.validate()?;
    Ok(config)
}

fn preferences_path(config: &DashConfig) -> PathBuf {
    config.preferences_path.clone().unwrap_or_else(|| {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("svdash")
            .join("preferences.json")
    })
}

fn log_path() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join("svdash")
        .join("svdash.log")
}

fn build_store(
    config: &DashConfig,
    prefs: Arc<FilePreferenceStore>,
    notificator: Arc<dyn Notificator>,
) -> CliResult<Arc<DashboardStore>> {
    let api = HttpSupervisorApi::new(&config.api_url, config.request_timeout(), prefs.token())?;
    Ok(Arc::new(DashboardStore::new(Arc::new(api), prefs, notificator)))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let is_tui = matches!(cli.command, None | Some(Commands::Tui));

    if is_tui {
        if let Err(e) = logging::init_file_logging(&log_path()) {
            eprintln!("Warning: file logging disabled: {}", e);
        }
    } else {
        logging::init_stderr_logging();
    }

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether the command succeeded
async fn run(cli: Cli) -> CliResult<bool> {
    let config = load_config(&cli)?;
    let prefs = Arc::new(FilePreferenceStore::open(preferences_path(&config))?);

    match cli.command {
        None | Some(Commands::Tui) => {
            let notes = Arc::new(MemoryNotificator::new());
            let store = build_store(&config, prefs, notes.clone())?;
            ui::run_tui(store, notes, config.intervals()).await?;
            Ok(true)
        }
        Some(Commands::Status) => {
            let store = build_store(&config, prefs, Arc::new(ConsoleNotificator))?;
            run_status(&store).await
        }
        Some(Commands::ClearLog(target)) => {
            run_command(&config, prefs, ManageAction::ClearProcessLog, target).await
        }
        Some(Commands::Clone(target)) => {
            run_command(&config, prefs, ManageAction::CloneProcess, target).await
        }
        Some(Commands::Remove(target)) => {
            run_command(&config, prefs, ManageAction::RemoveProcess, target).await
        }
        Some(Commands::AutoRefresh { state }) => {
            let store = build_store(&config, prefs, Arc::new(ConsoleNotificator))?;
            store.update_auto_refresh(matches!(state, Switch::On)).await;
            Ok(true)
        }
        Some(Commands::AllowMutators) => {
            let store = build_store(&config, prefs, Arc::new(ConsoleNotificator))?;
            store.switch_allow_mutators().await;
            Ok(true)
        }
        Some(Commands::Token { token, clear }) => {
            let token = if clear { None } else { token };
            let saved = token.is_some();
            prefs.save_token(token)?;
            println!(
                "{} in {}",
                if saved { "Token saved" } else { "Token cleared" },
                prefs.path().display()
            );
            Ok(true)
        }
    }
}

async fn run_status(store: &DashboardStore) -> CliResult<bool> {
    store.invalidate_supervisors().await;

    match store.actual_data().await {
        Some(Loadable::Fulfilled(supervisors)) => {
            print_status(&supervisors);
            Ok(true)
        }
        Some(Loadable::Rejected(message)) => Err(message.into()),
        _ => Ok(false),
    }
}

fn print_status(supervisors: &[Supervisor]) {
    if supervisors.is_empty() {
        println!("No supervisors reported.");
        return;
    }

    for sv in supervisors {
        println!(
            "{} ({}/{} running){}",
            sv.server.name,
            sv.running_count(),
            sv.processes.len(),
            sv.server
                .error
                .as_deref()
                .map(|e| format!("  [{}]", e))
                .unwrap_or_default()
        );
        for p in &sv.processes {
            println!(
                "  {:<32} {:<9} {}",
                p.full_name(),
                p.state.label(),
                p.pid.map(|pid| pid.to_string()).unwrap_or_default()
            );
        }
    }
}

async fn run_command(
    config: &DashConfig,
    prefs: Arc<FilePreferenceStore>,
    action: ManageAction,
    target: Target,
) -> CliResult<bool> {
    if !prefs.is_allow_mutators_enabled() {
        return Err(format!(
            "{} is a mutating command; run `svdash allow-mutators` first ({})",
            action,
            prefs.path().display()
        )
        .into());
    }

    let store = build_store(config, prefs, Arc::new(ConsoleNotificator))?;
    let (server, process) = target.into_records();
    Ok(store.run_command(action, &server, &process).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_mutation_target() {
        let cli = Cli::parse_from([
            "svdash", "clone", "--server", "web-1", "--group", "web", "--process", "api",
        ]);
        let Some(Commands::Clone(target)) = cli.command else {
            panic!("expected clone command");
        };
        let (server, process) = target.into_records();
        assert_eq!(server.name, "web-1");
        assert_eq!(process.full_name(), "web:api");
    }

    #[test]
    fn test_cli_defaults_to_tui() {
        let cli = Cli::parse_from(["svdash", "--api-url", "http://10.0.0.1/api"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.api_url.as_deref(), Some("http://10.0.0.1/api"));
    }

    #[test]
    fn test_token_requires_value_or_clear() {
        assert!(Cli::try_parse_from(["svdash", "token"]).is_err());
        assert!(Cli::try_parse_from(["svdash", "token", "--clear"]).is_ok());
    }

    #[test]
    fn test_api_url_override_is_validated() {
        let cli = Cli::parse_from([
            "svdash",
            "--config",
            "/definitely/missing/svdash.yaml",
            "status",
        ]);
        assert!(load_config(&cli).is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svdash.yaml");
        std::fs::write(&path, "refresh_interval_ms: 2000\n").unwrap();
        let cli = Cli::parse_from([
            "svdash",
            "--config",
            path.to_str().unwrap(),
            "--api-url",
            "not-a-url",
            "status",
        ]);
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn test_preferences_path_prefers_config() {
        let config = DashConfig {
            preferences_path: Some(PathBuf::from("/tmp/prefs.json")),
            ..DashConfig::default()
        };
        assert_eq!(preferences_path(&config), PathBuf::from("/tmp/prefs.json"));
    }
}
