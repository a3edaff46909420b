//! Light/dark theme preference.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::storage::KeyValueStore;

/// Key under which the theme is stored.
pub const THEME_KEY: &str = "theme";

/// UI color theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light background.
    #[default]
    Light,
    /// Dark background.
    Dark,
}

impl Theme {
    /// Stored representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// Interpret a stored value. Only `"dark"` selects the dark theme.
    #[must_use]
    pub fn from_stored(value: Option<&str>) -> Self {
        if value == Some("dark") {
            Self::Dark
        } else {
            Self::Light
        }
    }

    /// The other theme.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current theme, backed by a durable store.
///
/// Read once when loaded, written on every change.
#[derive(Debug)]
pub struct ThemeToggle<S> {
    store: S,
    current: Theme,
}

impl<S: KeyValueStore> ThemeToggle<S> {
    /// Load the saved theme.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn load(store: S) -> Result<Self> {
        let current = Theme::from_stored(store.get(THEME_KEY)?.as_deref());
        Ok(Self { store, current })
    }

    /// The active theme.
    #[must_use]
    pub fn current(&self) -> Theme {
        self.current
    }

    /// Switch to the other theme and persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn toggle(&mut self) -> Result<Theme> {
        self.set(self.current.toggled())
    }

    /// Select a theme and persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn set(&mut self, theme: Theme) -> Result<Theme> {
        self.store.set(THEME_KEY, theme.as_str())?;
        self.current = theme;
        info!(theme = %theme, "Theme changed");
        Ok(theme)
    }
}
