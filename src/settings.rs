use std::sync::RwLock;

use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::error::ValidationError;

/// Process-wide recording preferences. `pause_threshold` is milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_auto_mode")]
    pub auto_mode: bool,
    #[serde(default = "default_pause_threshold")]
    pub pause_threshold: u64,
    #[serde(default = "default_sensitivity")]
    pub equation_scroll_x_sensitivity: u32,
    #[serde(default = "default_sensitivity")]
    pub equation_scroll_y_sensitivity: u32,
}

fn default_auto_mode() -> bool {
    true
}

fn default_pause_threshold() -> u64 {
    1000
}

fn default_sensitivity() -> u32 {
    20
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_mode: default_auto_mode(),
            pause_threshold: default_pause_threshold(),
            equation_scroll_x_sensitivity: default_sensitivity(),
            equation_scroll_y_sensitivity: default_sensitivity(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(50..=10_000).contains(&self.pause_threshold) {
            return Err(ValidationError::OutOfRange {
                field: "pause_threshold",
                value: self.pause_threshold as i64,
            });
        }

        for (field, value) in [
            ("equation_scroll_x_sensitivity", self.equation_scroll_x_sensitivity),
            ("equation_scroll_y_sensitivity", self.equation_scroll_y_sensitivity),
        ] {
            if !(1..=100).contains(&value) {
                return Err(ValidationError::OutOfRange {
                    field,
                    value: value as i64,
                });
            }
        }

        Ok(())
    }

    pub fn pause_duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.pause_threshold)
    }
}

/// Settings cached in memory and written through to the database.
pub struct SettingsStore {
    db: Database,
    data: RwLock<Settings>,
}

impl SettingsStore {
    pub async fn load(db: Database) -> Result<Self> {
        let data = db.load_settings().await?;
        info!(
            "Settings loaded (auto_mode={}, pause_threshold={}ms)",
            data.auto_mode, data.pause_threshold
        );

        Ok(Self {
            db,
            data: RwLock::new(data),
        })
    }

    pub fn current(&self) -> Settings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub async fn update(&self, settings: Settings) -> Result<Settings> {
        self.db.save_settings(&settings).await?;
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = settings.clone();
        Ok(settings)
    }
}
