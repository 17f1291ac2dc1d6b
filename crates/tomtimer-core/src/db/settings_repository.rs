//! Settings repository implementation

use crate::error::Result;
use crate::models::Settings;
use rusqlite::{params, Connection, OptionalExtension};

const DEFAULT_ESTIMATE_KEY: &str = "default_estimate_minutes";
const LAST_SYNCED_KEY: &str = "last_synced_at";

/// Trait for settings storage operations
pub trait SettingsRepository {
    /// Load settings from the database
    fn load(&self) -> Result<Settings>;

    /// Save settings to the database
    fn save(&self, settings: &Settings) -> Result<()>;
}

/// `SQLite` implementation of `SettingsRepository`
pub struct SqliteSettingsRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteSettingsRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl SettingsRepository for SqliteSettingsRepository<'_> {
    fn load(&self) -> Result<Settings> {
        let mut settings = Settings::default();

        if let Some(value) = self.get_setting(DEFAULT_ESTIMATE_KEY)? {
            if let Ok(minutes) = value.trim().parse() {
                settings.default_estimate_minutes = minutes;
            }
        }

        if let Some(value) = self.get_setting(LAST_SYNCED_KEY)? {
            settings.last_synced_at = value.trim().parse().ok();
        }

        Ok(settings)
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        self.set_setting(
            DEFAULT_ESTIMATE_KEY,
            &settings.default_estimate_minutes.to_string(),
        )?;
        match settings.last_synced_at {
            Some(at) => self.set_setting(LAST_SYNCED_KEY, &at.to_string())?,
            None => {
                self.conn
                    .execute("DELETE FROM settings WHERE key = ?", params![LAST_SYNCED_KEY])?;
            }
        }
        Ok(())
    }
}
