//! Local application settings model

use serde::{Deserialize, Serialize};

use super::task::DEFAULT_ESTIMATE_MINUTES;

/// Settings stored alongside tasks in the local database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Estimate given to new tasks when none is supplied
    pub default_estimate_minutes: u32,
    /// Completion time of the last sync pass (Unix ms)
    pub last_synced_at: Option<i64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_estimate_minutes: DEFAULT_ESTIMATE_MINUTES,
            last_synced_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert_eq!(settings.default_estimate_minutes, 25);
        assert!(settings.last_synced_at.is_none());
    }
}
