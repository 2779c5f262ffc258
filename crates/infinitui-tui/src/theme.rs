//! Color palette and semantic styling for the panel.

use ratatui::style::{Color, Modifier, Style};

// ── Core palette ─────────────────────────────────────────────────────

pub const HEAT_ORANGE: Color = Color::Rgb(255, 149, 80); // #ff9550
pub const COOL_BLUE: Color = Color::Rgb(139, 233, 253); // #8be9fd
pub const SUCCESS_GREEN: Color = Color::Rgb(80, 250, 123); // #50fa7b
pub const WARN_YELLOW: Color = Color::Rgb(241, 250, 140); // #f1fa8c
pub const ERROR_RED: Color = Color::Rgb(255, 99, 99); // #ff6363

pub const DIM_WHITE: Color = Color::Rgb(189, 193, 207); // #bdc1cf
pub const BORDER_GRAY: Color = Color::Rgb(98, 114, 164); // #6272a4
pub const BG_DARK: Color = Color::Rgb(30, 31, 41); // #1e1f29
pub const ACCENT: Color = Color::Rgb(128, 255, 234); // #80ffea

// ── Semantic styles ──────────────────────────────────────────────────

/// Title text for blocks/panels.
pub fn title_style() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

/// Border for the selected zone card.
pub fn border_selected() -> Style {
    Style::default().fg(ACCENT)
}

/// Border for an unselected panel.
pub fn border_default() -> Style {
    Style::default().fg(BORDER_GRAY)
}

/// Normal value text.
pub fn value_style() -> Style {
    Style::default().fg(DIM_WHITE)
}

/// Label text next to a value.
pub fn label_style() -> Style {
    Style::default().fg(BORDER_GRAY)
}

/// The big current-temperature readout.
pub fn temp_style() -> Style {
    Style::default()
        .fg(DIM_WHITE)
        .add_modifier(Modifier::BOLD)
}

/// Heating setpoint / heating activity.
pub fn heat_style() -> Style {
    Style::default().fg(HEAT_ORANGE)
}

/// Cooling setpoint / cooling activity.
pub fn cool_style() -> Style {
    Style::default().fg(COOL_BLUE)
}

/// Key hint in the status bar.
pub fn key_hint() -> Style {
    Style::default().fg(BORDER_GRAY)
}

/// The key itself in a key hint.
pub fn key_hint_key() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}
