//! The dashboard state container.
//!
//! `DashboardStore` owns the observable [`DashboardState`] and is the only
//! thing that changes it. Every change is an [`EventEnvelope`] run through
//! [`reduce`] and then broadcast, so a view can either poll [`snapshot`] or
//! follow [`subscribe`].
//!
//! The store talks to three collaborators: the supervisor API, the
//! preference store and a notification sink. Commands never return errors;
//! whatever happens ends up as a notification, and the data is refreshed
//! afterwards either way.
//!
//! [`snapshot`]: DashboardStore::snapshot
//! [`subscribe`]: DashboardStore::subscribe

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;

use crate::api::{ApiError, SupervisorApi};
use crate::manage::{ManageAction, ManageRequest, ManageResult};
use crate::model::{Process, SupervisorServer};
use crate::notify::Notificator;
use crate::prefs::PreferenceStore;
use crate::reducer::{EventEnvelope, StoreEvent, reduce};
use crate::state::{DashboardState, Snapshot};

const EVENT_CHANNEL_CAPACITY: usize = 256;

pub struct DashboardStore {
    api: Arc<dyn SupervisorApi>,
    prefs: Arc<dyn PreferenceStore>,
    notificator: Arc<dyn Notificator>,
    state: RwLock<DashboardState>,
    event_tx: broadcast::Sender<EventEnvelope>,
    next_id: AtomicU64,
}

impl DashboardStore {
    /// Create a store. Both flags are read from the preference store and
    /// the staleness counter starts at zero. No data is fetched yet.
    pub fn new(
        api: Arc<dyn SupervisorApi>,
        prefs: Arc<dyn PreferenceStore>,
        notificator: Arc<dyn Notificator>,
    ) -> Self {
        let state = DashboardState::new(prefs.is_auto_refresh(), prefs.is_allow_mutators_enabled());
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        tracing::debug!(
            event = "dashboard.store.created",
            api = api.name(),
            auto_refresh = state.auto_refresh_is_active,
            allow_mutators = state.is_allow_mutators_active,
        );

        Self {
            api,
            prefs,
            notificator,
            state: RwLock::new(state),
            event_tx,
            next_id: AtomicU64::new(1),
        }
    }

    /// Follow every state change from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.event_tx.subscribe()
    }

    pub async fn snapshot(&self) -> DashboardState {
        self.state.read().await.clone()
    }

    /// Build an event from the current state, apply it and broadcast it
    /// under one write lock, so read-modify-write changes can't interleave
    /// and subscribers receive ids in order. Returns the envelope id.
    async fn apply(&self, make: impl FnOnce(&DashboardState) -> StoreEvent) -> u64 {
        let mut state = self.state.write().await;
        let env = EventEnvelope {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            at: SystemTime::now(),
            event: make(&*state),
        };
        reduce(&mut state, &env);
        let id = env.id;
        // No subscribers is fine
        let _ = self.event_tx.send(env);
        id
    }

    async fn emit(&self, event: StoreEvent) -> u64 {
        self.apply(|_| event).await
    }

    // ========== Preferences ==========

    pub async fn auto_refresh_is_active(&self) -> bool {
        self.state.read().await.auto_refresh_is_active
    }

    pub async fn is_allow_mutators_active(&self) -> bool {
        self.state.read().await.is_allow_mutators_active
    }

    pub async fn update_auto_refresh(&self, active: bool) {
        if active {
            self.emit(StoreEvent::AutoRefreshChanged { active: true })
                .await;
            self.prefs.set_auto_refresh();
            self.notificator.success("Auto refresh enabled");
        } else {
            self.emit(StoreEvent::AutoRefreshChanged { active: false })
                .await;
            self.prefs.unset_auto_refresh();
            self.notificator.success("Auto refresh disabled");
        }
    }

    /// Flip the allow-mutators flag. The preference store, not the mirror,
    /// decides the current value.
    pub async fn switch_allow_mutators(&self) {
        if self.prefs.is_allow_mutators_enabled() {
            self.prefs.unset_allow_mutators_enabled();
            self.emit(StoreEvent::AllowMutatorsChanged { active: false })
                .await;
            self.notificator.success("Allow mutators disabled");
        } else {
            self.prefs.set_allow_mutators_enabled();
            self.emit(StoreEvent::AllowMutatorsChanged { active: true })
                .await;
            self.notificator.success("Allow mutators enabled");
        }
    }

    // ========== Staleness counter ==========

    pub async fn server_time_diff(&self) -> u64 {
        self.state.read().await.server_time_diff
    }

    pub async fn set_server_time_diff(&self, seconds: u64) {
        self.emit(StoreEvent::ServerTimeDiffChanged { seconds }).await;
    }

    /// Advance the counter by one second
    pub async fn tick_server_time_diff(&self) {
        self.apply(|state| StoreEvent::ServerTimeDiffChanged {
            seconds: state.server_time_diff.saturating_add(1),
        })
        .await;
    }

    pub async fn reset_diff_when_actual_data_is_fetched(&self) {
        self.set_server_time_diff(0).await;
    }

    // ========== Data ==========

    pub async fn actual_data(&self) -> Option<Snapshot> {
        self.state.read().await.data.actual.clone()
    }

    pub async fn prev_data(&self) -> Option<Snapshot> {
        self.state.read().await.data.prev.clone()
    }

    /// Drop the current data and fetch it again. Returns whether the fetch
    /// succeeded; a failure is kept in `actual_data` as `Rejected`.
    ///
    /// Overlapping calls are allowed. A result that arrives after a newer
    /// fetch has settled is discarded.
    pub async fn invalidate_supervisors(&self) -> bool {
        let generation = self.emit(StoreEvent::FetchStarted).await;
        tracing::debug!(event = "dashboard.refresh.started", generation);

        match self.api.fetch_supervisors().await {
            Ok(supervisors) => {
                tracing::debug!(
                    event = "dashboard.refresh.completed",
                    generation,
                    supervisors = supervisors.len(),
                );
                let landed = self
                    .settle_fetch(
                        generation,
                        StoreEvent::FetchSucceeded {
                            generation,
                            supervisors,
                        },
                    )
                    .await;
                if landed {
                    self.reset_diff_when_actual_data_is_fetched().await;
                }
                true
            }
            Err(e) => {
                tracing::warn!(
                    event = "dashboard.refresh.failed",
                    generation,
                    error = %e,
                    "Failed to fetch supervisors"
                );
                self.settle_fetch(
                    generation,
                    StoreEvent::FetchFailed {
                        generation,
                        message: e.to_string(),
                    },
                )
                .await;
                false
            }
        }
    }

    /// Apply a fetch result and report whether it landed
    async fn settle_fetch(&self, generation: u64, event: StoreEvent) -> bool {
        let mut landed = false;
        self.apply(|state| {
            landed = generation > state.data.generation;
            event
        })
        .await;

        if !landed {
            tracing::debug!(event = "dashboard.refresh.superseded", generation);
        }
        landed
    }

    /// One firing of the auto-refresh timer. Does nothing unless the
    /// preference store has auto-refresh switched on.
    pub async fn auto_refresh_tick(&self) {
        if self.prefs.is_auto_refresh() {
            self.invalidate_supervisors().await;
            self.notificator.success("Data auto-refreshed");
        }
    }

    // ========== Commands ==========

    /// Report a rejected request to the user
    pub fn notify_err(&self, err: &ApiError) {
        self.notificator.error(&err.notification_text());
    }

    /// Decide whether a management response means success, raising an
    /// error notification for faults and failed process changes.
    pub fn check_valid_result_success(&self, result: &ManageResult) -> bool {
        let verdict = result.verdict();
        if let Some(message) = &verdict.error {
            self.notificator.error(message);
        }
        verdict.success
    }

    pub async fn clear_process_log(&self, server: &SupervisorServer, process: &Process) -> bool {
        self.run_command(ManageAction::ClearProcessLog, server, process)
            .await
    }

    pub async fn clone_process(&self, server: &SupervisorServer, process: &Process) -> bool {
        self.run_command(ManageAction::CloneProcess, server, process)
            .await
    }

    pub async fn remove_process(&self, server: &SupervisorServer, process: &Process) -> bool {
        self.run_command(ManageAction::RemoveProcess, server, process)
            .await
    }

    /// Send one management request and report the outcome. The data is
    /// always refreshed afterwards, whether the request succeeded or not.
    pub async fn run_command(
        &self,
        action: ManageAction,
        server: &SupervisorServer,
        process: &Process,
    ) -> bool {
        let request = ManageRequest::new(action, server, process);
        tracing::info!(
            event = "dashboard.command.sent",
            action = %action,
            server = %request.server,
            group = %request.group,
            process = %request.process,
        );

        let success = match self.api.manage(request).await {
            Ok(result) => {
                let success = self.check_valid_result_success(&result);
                if success {
                    self.notificator
                        .success(&action.success_message(&server.name, &process.name));
                }
                success
            }
            Err(e) => {
                tracing::warn!(
                    event = "dashboard.command.failed",
                    action = %action,
                    server = %server.name,
                    process = %process.name,
                    error = %e,
                );
                self.notify_err(&e);
                false
            }
        };

        self.invalidate_supervisors().await;
        success
    }

    /// Run a command in the background. Overlapping commands are allowed,
    /// even for the same process.
    pub fn spawn_command(
        self: &Arc<Self>,
        action: ManageAction,
        server: SupervisorServer,
        process: Process,
    ) -> JoinHandle<bool> {
        let store = Arc::clone(self);
        tokio::spawn(async move { store.run_command(action, &server, &process).await })
    }
}
