//! Operator output styles

use owo_colors::Style;

/// Centralized stylesheet for console output.
#[derive(Default, Clone, Copy)]
pub struct Styles {
    /// Prompt and connect notifications (green)
    pub success: Style,
    /// Errors and disconnect notifications (red)
    pub error: Style,
    /// Command states and expiry notices (yellow)
    pub warning: Style,
    /// Listings and help text (blue/cyan)
    pub info: Style,
}

impl Styles {
    /// The colored stylesheet used on an interactive terminal.
    pub fn colored() -> Self {
        Self {
            success: Style::new().bright_green().bold(),
            error: Style::new().bright_red().bold(),
            warning: Style::new().bright_yellow(),
            info: Style::new().bright_blue(),
        }
    }
}
