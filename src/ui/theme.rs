//! Prompt theme

use cliclack::ThemeState;
use console::Style;

/// Magenta accents for prompts and spinners
#[derive(Debug, Clone, Default)]
pub struct StorefrontTheme;

impl cliclack::Theme for StorefrontTheme {
    fn bar_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Active => Style::new().magenta(),
            ThemeState::Error(_) => Style::new().red(),
            ThemeState::Cancel => Style::new().dim(),
            ThemeState::Submit => Style::new().magenta().dim(),
        }
    }

    fn state_symbol_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Active => Style::new().magenta(),
            ThemeState::Error(_) => Style::new().red(),
            ThemeState::Cancel => Style::new().dim(),
            ThemeState::Submit => Style::new().green(),
        }
    }
}

/// Install the theme for every cliclack widget in this process
pub fn init_theme() {
    cliclack::set_theme(StorefrontTheme);
}
