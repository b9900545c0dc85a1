use std::time::SystemTime;

use crate::model::Supervisor;
use crate::state::{DashboardState, Loadable};

#[derive(Clone, Debug)]
pub enum StoreEvent {
    AutoRefreshChanged {
        active: bool,
    },
    AllowMutatorsChanged {
        active: bool,
    },
    ServerTimeDiffChanged {
        seconds: u64,
    },
    FetchStarted,
    /// `generation` is the id of the matching `FetchStarted` envelope
    FetchSucceeded {
        generation: u64,
        supervisors: Vec<Supervisor>,
    },
    FetchFailed {
        generation: u64,
        message: String,
    },
}

#[derive(Clone, Debug)]
pub struct EventEnvelope {
    pub id: u64,
    pub at: SystemTime,
    pub event: StoreEvent,
}

pub fn reduce(state: &mut DashboardState, env: &EventEnvelope) {
    state.last_event_id = env.id;

    match &env.event {
        StoreEvent::AutoRefreshChanged { active } => {
            state.auto_refresh_is_active = *active;
        }
        StoreEvent::AllowMutatorsChanged { active } => {
            state.is_allow_mutators_active = *active;
        }
        StoreEvent::ServerTimeDiffChanged { seconds } => {
            state.server_time_diff = *seconds;
        }
        StoreEvent::FetchStarted => state.data.begin(),
        StoreEvent::FetchSucceeded {
            generation,
            supervisors,
        } => {
            state
                .data
                .settle(*generation, Loadable::Fulfilled(supervisors.clone()));
        }
        StoreEvent::FetchFailed {
            generation,
            message,
        } => {
            state
                .data
                .settle(*generation, Loadable::Rejected(message.clone()));
        }
    }
}
