pub mod config;
pub mod model;
pub mod reducer;
pub mod state;

// Collaborators the dashboard is wired to
pub mod api;
pub mod notify;
pub mod prefs;

// Process management requests
pub mod manage;

// State container and its timers
pub mod schedule;
pub mod store;
