//! Read-only access to the student-records SQLite database.

use async_trait::async_trait;
use edupolicy_core::backend::StructuredBackend;
use edupolicy_core::error::ToolError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, SqlitePool, ValueRef};
use std::path::Path;
use tracing::{debug, info, warn};

/// Sample rows shown per table in the schema description.
const SAMPLE_ROWS: usize = 3;

/// A student-records database opened read-only.
pub struct StudentDb {
    pool: SqlitePool,
}

impl StudentDb {
    /// Open the database at `path`.
    ///
    /// Returns `Ok(None)` when the file does not exist, so the SQL tool can
    /// report that the database is not configured.
    pub async fn open(path: &Path) -> Result<Option<Self>, ToolError> {
        if !path.exists() {
            warn!(path = %path.display(), "Student database missing; sql_tool disabled");
            return Ok(None);
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .create_if_missing(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| ToolError::BackendUnavailable(format!("failed to open student database: {e}")))?;

        info!(path = %path.display(), "Student database opened read-only");
        Ok(Some(Self { pool }))
    }

    /// Wrap an existing pool (useful for testing).
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn table_ddl(&self) -> Result<Vec<(String, String)>, ToolError> {
        let rows = sqlx::query(
            "SELECT name, sql FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ToolError::BackendUnavailable(format!("failed to read schema: {e}")))?;

        rows.iter()
            .map(|row| {
                let name: String = row
                    .try_get("name")
                    .map_err(|e| ToolError::BackendUnavailable(format!("name column: {e}")))?;
                let sql: Option<String> = row
                    .try_get("sql")
                    .map_err(|e| ToolError::BackendUnavailable(format!("sql column: {e}")))?;
                Ok((name, sql.unwrap_or_default()))
            })
            .collect()
    }
}

/// Render one cell as text, whatever its storage class.
fn cell_to_string(row: &SqliteRow, idx: usize) -> String {
    match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return "None".into(),
        Err(_) => return String::new(),
        _ => {}
    }
    if let Ok(v) = row.try_get::<i64, _>(idx) {
        return v.to_string();
    }
    if let Ok(v) = row.try_get::<f64, _>(idx) {
        return format!("{v:?}");
    }
    if let Ok(v) = row.try_get::<String, _>(idx) {
        return v;
    }
    if let Ok(v) = row.try_get::<Vec<u8>, _>(idx) {
        return String::from_utf8_lossy(&v).into_owned();
    }
    String::new()
}

fn row_to_strings(row: &SqliteRow) -> Vec<String> {
    (0..row.columns().len()).map(|i| cell_to_string(row, i)).collect()
}

#[async_trait]
impl StructuredBackend for StudentDb {
    async fn schema(&self) -> Result<String, ToolError> {
        let mut sections = Vec::new();

        for (name, ddl) in self.table_ddl().await? {
            let mut section = ddl.trim().to_string();

            let sample_sql = format!(
                "SELECT * FROM \"{}\" LIMIT {SAMPLE_ROWS}",
                name.replace('"', "\"\"")
            );
            let rows = sqlx::query(&sample_sql)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| ToolError::BackendUnavailable(format!("failed to sample {name}: {e}")))?;

            if let Some(first) = rows.first() {
                let header: Vec<&str> = first.columns().iter().map(|c| c.name()).collect();
                section.push_str(&format!(
                    "\n\n/*\n{} rows from {name} table:\n{}",
                    rows.len(),
                    header.join("\t")
                ));
                for row in &rows {
                    section.push('\n');
                    section.push_str(&row_to_strings(row).join("\t"));
                }
                section.push_str("\n*/");
            }

            sections.push(section);
        }

        Ok(sections.join("\n\n\n"))
    }

    async fn execute(&self, sql: &str) -> Result<Vec<Vec<String>>, ToolError> {
        debug!(sql, "Executing student query");
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "sql_tool".into(),
                reason: e.to_string(),
            })?;
        Ok(rows.iter().map(row_to_strings).collect())
    }
}
