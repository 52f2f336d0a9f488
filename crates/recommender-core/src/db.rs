// ============================================================================
// PreferenceDb: Embedded Database (redb)
// ============================================================================
// Persistent local storage for UI preferences.
// Default path: ~/.ai-recommend/preferences.redb (override via RECOMMENDER_DB_PATH)
// ============================================================================

use anyhow::{anyhow, Result};
use redb::{Database, TableDefinition};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::preferences_path;
use crate::theme::{PreferenceStore, Preferences};

const PREFERENCES: TableDefinition<&str, &[u8]> = TableDefinition::new("preferences");

const UI_KEY: &str = "preferences:ui";

/// Embedded preference database
pub struct PreferenceDb {
    db: Database,
    path: PathBuf,
}

impl PreferenceDb {
    /// Open (or create) the database. `None` falls back to
    /// RECOMMENDER_DB_PATH, then the home directory default.
    pub fn open(path: Option<&str>) -> Result<Self> {
        let db_path = preferences_path(path)?;
        info!("Opening preference database at: {}", db_path.display());

        let db = Database::create(&db_path).map_err(|e| anyhow!("Failed to open database: {}", e))?;

        let write_txn = db
            .begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let _ = write_txn
                .open_table(PREFERENCES)
                .map_err(|e| anyhow!("Failed to create preferences table: {}", e))?;
        }
        write_txn.commit().map_err(|e| anyhow!("Failed to commit init: {}", e))?;

        Ok(Self { db, path: db_path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn store_preferences(&self, preferences: &Preferences) -> Result<()> {
        let value = bincode::serialize(preferences)
            .map_err(|e| anyhow!("Failed to serialize preferences: {}", e))?;

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let mut table = write_txn
                .open_table(PREFERENCES)
                .map_err(|e| anyhow!("Failed to open preferences table: {}", e))?;
            table
                .insert(UI_KEY, value.as_slice())
                .map_err(|e| anyhow!("Failed to insert preferences: {}", e))?;
        }
        write_txn.commit().map_err(|e| anyhow!("Failed to commit: {}", e))?;

        debug!("Stored preferences (theme {})", preferences.theme);
        Ok(())
    }

    pub fn get_preferences(&self) -> Result<Option<Preferences>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let table = read_txn
            .open_table(PREFERENCES)
            .map_err(|e| anyhow!("Failed to open preferences table: {}", e))?;

        match table
            .get(UI_KEY)
            .map_err(|e| anyhow!("Failed to get preferences: {}", e))?
        {
            Some(value) => {
                let prefs: Preferences = bincode::deserialize(value.value())
                    .map_err(|e| anyhow!("Failed to deserialize preferences: {}", e))?;
                Ok(Some(prefs))
            }
            None => Ok(None),
        }
    }
}

impl PreferenceStore for PreferenceDb {
    fn load_preferences(&self) -> Result<Option<Preferences>> {
        self.get_preferences()
    }

    fn save_preferences(&self, preferences: &Preferences) -> Result<()> {
        self.store_preferences(preferences)
    }
}
