//! UI Theme Module - Consistent color palette and style helpers
//!
//! Palette tokens plus small helpers for the states the dashboard shows:
//! process states, on/off flags, staleness and notifications.

use ratatui::style::{Color, Modifier, Style};

use svdash_core::model::ProcessState;
use svdash_core::notify::NotificationLevel;

/// Color palette tokens for the theme
#[derive(Clone, Debug)]
pub struct Palette {
    /// Panel border color
    pub panel_border: Color,
    /// Primary text color
    pub text: Color,
    /// Dimmed text (secondary info)
    pub text_dim: Color,
    /// Muted text (tertiary info, disabled)
    pub text_muted: Color,
    /// Accent color (highlights, focus)
    pub accent: Color,
    /// Success state (running, enabled)
    pub success: Color,
    /// Warning state (starting, stale data)
    pub warn: Color,
    /// Error state (fatal, faults)
    pub error: Color,
    /// Selection background
    pub selection_bg: Color,
    /// Selection foreground
    pub selection_fg: Color,
    /// Key hint text
    pub key_hint: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self::dark()
    }
}

impl Palette {
    /// VS Code-esque dark theme
    pub fn dark() -> Self {
        Self {
            panel_border: Color::Rgb(60, 60, 60),
            text: Color::Rgb(212, 212, 212),
            text_dim: Color::Rgb(150, 150, 150),
            text_muted: Color::Rgb(100, 100, 100),
            accent: Color::Rgb(79, 193, 255), // Light blue
            success: Color::Rgb(78, 201, 176),     // Teal green
            warn: Color::Rgb(220, 180, 100),       // Amber
            error: Color::Rgb(244, 135, 113),      // Coral red
            selection_bg: Color::Rgb(38, 79, 120), // Dark blue
            selection_fg: Color::White,
            key_hint: Color::Rgb(206, 145, 120), // Soft orange
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Theme {
    pub palette: Palette,
}

/// Data older than this many seconds is shown as stale
const STALE_AFTER_SECS: u64 = 30;

impl Theme {
    pub fn state_style(&self, state: ProcessState) -> Style {
        let color = match state {
            ProcessState::Running => self.palette.success,
            ProcessState::Starting | ProcessState::Stopping => self.palette.warn,
            ProcessState::Backoff | ProcessState::Fatal => self.palette.error,
            ProcessState::Exited => self.palette.text_dim,
            ProcessState::Stopped | ProcessState::Unknown => self.palette.text_muted,
        };
        Style::default().fg(color)
    }

    pub fn state_icon(&self, state: ProcessState) -> &'static str {
        match state {
            ProcessState::Running => "●",
            ProcessState::Starting => "◐",
            ProcessState::Stopping => "◑",
            ProcessState::Backoff => "⟲",
            ProcessState::Fatal => "✗",
            ProcessState::Exited => "◌",
            ProcessState::Stopped => "○",
            ProcessState::Unknown => "?",
        }
    }

    /// Style for an on/off preference flag
    pub fn flag_style(&self, on: bool) -> Style {
        if on {
            Style::default()
                .fg(self.palette.success)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.palette.text_muted)
        }
    }

    /// Style for the "updated Ns ago" indicator
    pub fn staleness_style(&self, seconds: u64) -> Style {
        if seconds >= STALE_AFTER_SECS {
            Style::default().fg(self.palette.warn)
        } else {
            Style::default().fg(self.palette.text_dim)
        }
    }

    pub fn notification_style(&self, level: NotificationLevel) -> Style {
        match level {
            NotificationLevel::Success => Style::default().fg(self.palette.success),
            NotificationLevel::Error => Style::default().fg(self.palette.error),
        }
    }

    pub fn key_hint_style(&self) -> Style {
        Style::default().fg(self.palette.key_hint)
    }

    pub fn border_style(&self) -> Style {
        Style::default().fg(self.palette.panel_border)
    }

    pub fn selection_style(&self) -> Style {
        Style::default()
            .bg(self.palette.selection_bg)
            .fg(self.palette.selection_fg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn text_style(&self) -> Style {
        Style::default().fg(self.palette.text)
    }

    pub fn text_dim_style(&self) -> Style {
        Style::default().fg(self.palette.text_dim)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.palette.error)
    }

    pub fn title_style(&self) -> Style {
        Style::default()
            .fg(self.palette.accent)
            .add_modifier(Modifier::BOLD)
    }
}

static DEFAULT_THEME: std::sync::OnceLock<Theme> = std::sync::OnceLock::new();

pub fn theme() -> &'static Theme {
    DEFAULT_THEME.get_or_init(Theme::default)
}
