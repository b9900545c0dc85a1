use crate::model::Supervisor;

/// A value that is being fetched, has arrived, or failed to arrive
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Loadable<T> {
    Pending,
    Fulfilled(T),
    Rejected(String),
}

impl<T> Loadable<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Fulfilled(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Rejected(message) => Some(message),
            _ => None,
        }
    }
}

pub type Snapshot = Loadable<Vec<Supervisor>>;

/// The two most recent fetches.
///
/// Fetches may overlap. Each one is identified by a generation number that
/// grows with every fetch started, and a result only lands if it is newer
/// than the one already shown. `prev` always holds a settled snapshot.
#[derive(Clone, Debug, Default)]
pub struct DataCache {
    pub actual: Option<Snapshot>,
    pub prev: Option<Snapshot>,
    /// Generation of the fetch that produced the settled `actual`
    pub generation: u64,
}

impl DataCache {
    /// Start a new fetch: a settled snapshot becomes the previous one. When
    /// another fetch is still in flight nothing rotates.
    pub fn begin(&mut self) {
        if self.actual.as_ref().is_some_and(|s| !s.is_pending()) {
            self.prev = self.actual.take();
        }
        self.actual = Some(Loadable::Pending);
    }

    /// Land the outcome of fetch `generation`. Returns false, leaving the
    /// cache untouched, when a newer fetch has already settled.
    pub fn settle(&mut self, generation: u64, outcome: Snapshot) -> bool {
        if generation <= self.generation {
            return false;
        }
        // An overlapping fetch settled after this one started
        if self.actual.as_ref().is_some_and(|s| !s.is_pending()) {
            self.prev = self.actual.take();
        }
        self.actual = Some(outcome);
        self.generation = generation;
        true
    }

    /// Newest data available. While a fetch is in flight (or has failed)
    /// the previous snapshot is used so views don't blank out.
    pub fn latest_fulfilled(&self) -> Option<&Vec<Supervisor>> {
        self.actual
            .as_ref()
            .and_then(Loadable::value)
            .or_else(|| self.prev.as_ref().and_then(Loadable::value))
    }
}

/// Everything a dashboard view renders
#[derive(Clone, Debug, Default)]
pub struct DashboardState {
    pub auto_refresh_is_active: bool,
    pub is_allow_mutators_active: bool,
    /// Seconds since the last successful fetch
    pub server_time_diff: u64,
    pub data: DataCache,
    pub last_event_id: u64,
}

impl DashboardState {
    pub fn new(auto_refresh: bool, allow_mutators: bool) -> Self {
        Self {
            auto_refresh_is_active: auto_refresh,
            is_allow_mutators_active: allow_mutators,
            ..Self::default()
        }
    }

    pub fn actual_data(&self) -> Option<&Snapshot> {
        self.data.actual.as_ref()
    }

    pub fn prev_data(&self) -> Option<&Snapshot> {
        self.data.prev.as_ref()
    }
}
