use anyhow::{Context, Result};
use chrono::SecondsFormat;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::parse_datetime,
    models::{Drawing, LabelCount},
};
use crate::models::Stroke;

fn row_to_drawing(row: &Row) -> Result<Drawing> {
    let created_at: String = row.get("created_at")?;
    let strokes: String = row.get("strokes")?;
    let strokes: Vec<Stroke> =
        serde_json::from_str(&strokes).context("failed to decode stored strokes")?;

    Ok(Drawing {
        id: row.get("id")?,
        label: row.get("label")?,
        strokes,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    pub async fn insert_drawing(&self, drawing: &Drawing) -> Result<()> {
        let record = drawing.clone();
        self.execute(move |conn| {
            let strokes = serde_json::to_string(&record.strokes)?;
            conn.execute(
                "INSERT INTO drawings (id, label, strokes, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.id,
                    record.label,
                    strokes,
                    record.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
                ],
            )
            .with_context(|| "failed to insert drawing")?;
            Ok(())
        })
        .await
    }

    /// Every stored drawing, oldest first, for rebuilding the exemplar store.
    pub async fn all_drawings(&self) -> Result<Vec<Drawing>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, label, strokes, created_at
                 FROM drawings
                 ORDER BY created_at ASC, rowid ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut drawings = Vec::new();
            while let Some(row) = rows.next()? {
                drawings.push(row_to_drawing(row)?);
            }
            Ok(drawings)
        })
        .await
    }

    /// Newest drawings first, optionally restricted to one label.
    pub async fn list_drawings(&self, label: Option<String>, limit: u32) -> Result<Vec<Drawing>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, label, strokes, created_at
                 FROM drawings
                 WHERE ?1 IS NULL OR label = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )?;

            let mut rows = stmt.query(params![label, limit])?;
            let mut drawings = Vec::new();
            while let Some(row) = rows.next()? {
                drawings.push(row_to_drawing(row)?);
            }
            Ok(drawings)
        })
        .await
    }

    pub async fn get_drawing(&self, id: &str) -> Result<Option<Drawing>> {
        let id = id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, label, strokes, created_at
                 FROM drawings
                 WHERE id = ?1",
            )?;

            let mut rows = stmt.query(params![id])?;
            let drawing = rows.next()?.map(row_to_drawing).transpose()?;
            Ok(drawing)
        })
        .await
    }

    /// Returns whether a row was deleted.
    pub async fn delete_drawing(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn
                .execute("DELETE FROM drawings WHERE id = ?1", params![id])
                .with_context(|| "failed to delete drawing")?;
            Ok(rows_affected > 0)
        })
        .await
    }

    /// Returns how many rows were removed.
    pub async fn delete_all_drawings(&self) -> Result<usize> {
        self.execute(|conn| {
            conn.execute("DELETE FROM drawings", [])
                .with_context(|| "failed to delete drawings")
        })
        .await
    }

    pub async fn label_counts(&self) -> Result<Vec<LabelCount>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT label, COUNT(*) FROM drawings GROUP BY label ORDER BY label ASC",
            )?;

            let counts = stmt
                .query_map([], |row| {
                    Ok(LabelCount {
                        label: row.get(0)?,
                        count: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(counts)
        })
        .await
    }
}
