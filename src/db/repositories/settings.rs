use anyhow::{Context, Result};
use rusqlite::params;

use crate::db::{
    connection::Database,
    helpers::{to_i64, to_u32, to_u64},
};
use crate::settings::Settings;

impl Database {
    pub async fn load_settings(&self) -> Result<Settings> {
        self.execute(|conn| {
            let raw = conn
                .query_row(
                    "SELECT auto_mode, pause_threshold, equation_scroll_x_sensitivity, equation_scroll_y_sensitivity
                     FROM settings
                     WHERE id = 1",
                    [],
                    |row| {
                        Ok((
                            row.get::<_, bool>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, i64>(3)?,
                        ))
                    },
                )
                .context("failed to read settings row")?;

            Ok(Settings {
                auto_mode: raw.0,
                pause_threshold: to_u64(raw.1, "pause_threshold")?,
                equation_scroll_x_sensitivity: to_u32(raw.2, "equation_scroll_x_sensitivity")?,
                equation_scroll_y_sensitivity: to_u32(raw.3, "equation_scroll_y_sensitivity")?,
            })
        })
        .await
    }

    pub async fn save_settings(&self, settings: &Settings) -> Result<()> {
        let record = settings.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO settings (id, auto_mode, pause_threshold, equation_scroll_x_sensitivity, equation_scroll_y_sensitivity)
                 VALUES (1, ?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                     auto_mode = excluded.auto_mode,
                     pause_threshold = excluded.pause_threshold,
                     equation_scroll_x_sensitivity = excluded.equation_scroll_x_sensitivity,
                     equation_scroll_y_sensitivity = excluded.equation_scroll_y_sensitivity",
                params![
                    record.auto_mode,
                    to_i64(record.pause_threshold)?,
                    record.equation_scroll_x_sensitivity,
                    record.equation_scroll_y_sensitivity,
                ],
            )
            .with_context(|| "failed to save settings")?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;
    use crate::settings::Settings;

    #[tokio::test]
    async fn settings_default_then_update() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("app.db")).unwrap();

        assert_eq!(db.load_settings().await.unwrap(), Settings::default());

        let updated = Settings {
            auto_mode: false,
            pause_threshold: 750,
            ..Settings::default()
        };
        db.save_settings(&updated).await.unwrap();
        assert_eq!(db.load_settings().await.unwrap(), updated);
    }
}
