//! ============================================================================
//! Theme Settings
//! ============================================================================
//! A settings object handed to the UI, not ambient state. Startup reads the
//! stored theme; if none is stored the default (dark) is written back.
//! Toggling flips the theme and persists it immediately.
//! ============================================================================

use std::sync::{Arc, Mutex};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("Unknown theme '{}'. Valid values: light, dark", other)),
        }
    }
}

/// Persisted UI preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub theme: Theme,
    pub updated_at: i64,
}

/// Where preferences survive between runs
pub trait PreferenceStore: Send + Sync {
    fn load_preferences(&self) -> Result<Option<Preferences>>;
    fn save_preferences(&self, preferences: &Preferences) -> Result<()>;
}

/// Process-lifetime store, used when no database is available
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    inner: Mutex<Option<Preferences>>,
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load_preferences(&self) -> Result<Option<Preferences>> {
        Ok(self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save_preferences(&self, preferences: &Preferences) -> Result<()> {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner()) = Some(preferences.clone());
        Ok(())
    }
}

pub struct ThemeSettings {
    store: Arc<dyn PreferenceStore>,
    theme: Theme,
}

impl ThemeSettings {
    /// Load the stored theme, persisting the default on first run
    pub fn init(store: Arc<dyn PreferenceStore>) -> Result<Self> {
        let theme = match store.load_preferences()? {
            Some(prefs) => {
                debug!("Stored theme: {}", prefs.theme);
                prefs.theme
            }
            None => {
                let theme = Theme::default();
                info!("No stored theme, defaulting to {}", theme);
                store.save_preferences(&Preferences {
                    theme,
                    updated_at: chrono::Utc::now().timestamp(),
                })?;
                theme
            }
        };
        Ok(Self { store, theme })
    }

    pub fn current(&self) -> Theme {
        self.theme
    }

    pub fn set(&mut self, theme: Theme) -> Result<()> {
        self.store.save_preferences(&Preferences {
            theme,
            updated_at: chrono::Utc::now().timestamp(),
        })?;
        self.theme = theme;
        Ok(())
    }

    pub fn toggle(&mut self) -> Result<Theme> {
        let next = self.theme.toggled();
        self.set(next)?;
        info!("Theme switched to {}", next);
        Ok(next)
    }
}
