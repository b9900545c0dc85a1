mod app;
pub mod theme;

pub use app::run_tui;
