/*!
 * SQLite implementation of the localized record store.
 *
 * Each (model, host record, locale) triple is one row of the `translations`
 * table. Field values and automatic flags are stored as JSON objects, and
 * writes are guarded by the `lock_version` column.
 */

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::connection::DatabaseConnection;
use crate::errors::StoreError;
use crate::policy::Locale;
use crate::store::{LocalizedRecordStore, RecordKey, TranslationRow};

const SELECT_COLUMNS: &str =
    "model, host_id, locale, fields, automatic_flags, lock_version, updated_at";

/// Store persisting translation rows in SQLite
#[derive(Clone, Debug)]
pub struct SqliteStore {
    /// Database connection
    db: DatabaseConnection,
}

impl SqliteStore {
    /// Create a new store with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a store with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a store with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Underlying connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Host ids of every stored record of a model
    pub async fn list_host_ids(&self, model: &str) -> Result<Vec<String>, StoreError> {
        let model = model.to_string();
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT DISTINCT host_id FROM translations WHERE model = ?1 ORDER BY host_id",
                )?;
                let ids = stmt
                    .query_map(params![model], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<String>>>()?;
                Ok(ids)
            })
            .await
            .map_err(into_store_error)
    }
}

fn into_store_error(error: anyhow::Error) -> StoreError {
    match error.downcast::<StoreError>() {
        Ok(store_error) => store_error,
        Err(other) => match other.downcast::<rusqlite::Error>() {
            Ok(db_error) => StoreError::from(db_error),
            Err(other) => StoreError::Task(other.to_string()),
        },
    }
}

fn row_from_sql(row: &Row<'_>) -> rusqlite::Result<(TranslationRow, String, String)> {
    let fields: String = row.get(3)?;
    let flags: String = row.get(4)?;
    let locale: String = row.get(2)?;
    Ok((
        TranslationRow {
            model: row.get(0)?,
            host_id: row.get(1)?,
            locale: Locale::new(locale),
            fields: BTreeMap::new(),
            automatic_flags: BTreeMap::new(),
            lock_version: row.get(5)?,
            updated_at: row.get(6)?,
        },
        fields,
        flags,
    ))
}

fn decode((mut row, fields, flags): (TranslationRow, String, String)) -> Result<TranslationRow> {
    row.fields = serde_json::from_str(&fields).map_err(StoreError::from)?;
    row.automatic_flags = serde_json::from_str(&flags).map_err(StoreError::from)?;
    Ok(row)
}

/// Write one row, checking its lock version. Returns the new version.
fn write_row(conn: &Connection, row: &TranslationRow) -> Result<i64> {
    let fields = serde_json::to_string(&row.fields).map_err(StoreError::from)?;
    let flags = serde_json::to_string(&row.automatic_flags).map_err(StoreError::from)?;
    let now = chrono::Utc::now().to_rfc3339();
    let next_version = row.lock_version + 1;

    let written = if row.lock_version == 0 {
        conn.execute(
            r#"
            INSERT OR IGNORE INTO translations (
                model, host_id, locale, fields, automatic_flags, lock_version, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                row.model,
                row.host_id,
                row.locale.as_str(),
                fields,
                flags,
                next_version,
                now,
            ],
        )?
    } else {
        conn.execute(
            r#"
            UPDATE translations
            SET fields = ?1, automatic_flags = ?2, lock_version = ?3, updated_at = ?4
            WHERE model = ?5 AND host_id = ?6 AND locale = ?7 AND lock_version = ?8
            "#,
            params![
                fields,
                flags,
                next_version,
                now,
                row.model,
                row.host_id,
                row.locale.as_str(),
                row.lock_version,
            ],
        )?
    };

    if written == 0 {
        return Err(row.conflict().into());
    }

    debug!(
        "Saved {} ({}) at version {}",
        row.key(),
        row.locale,
        next_version
    );
    Ok(next_version)
}

#[async_trait]
impl LocalizedRecordStore for SqliteStore {
    async fn load(&self, key: &RecordKey, locale: &Locale) -> Result<Option<TranslationRow>, StoreError> {
        let key = key.clone();
        let locale = locale.clone();

        self.db
            .execute_async(move |conn| {
                let raw = conn
                    .query_row(
                        &format!(
                            "SELECT {} FROM translations WHERE model = ?1 AND host_id = ?2 AND locale = ?3",
                            SELECT_COLUMNS
                        ),
                        params![key.model, key.host_id, locale.as_str()],
                        row_from_sql,
                    )
                    .optional()?;
                raw.map(decode).transpose()
            })
            .await
            .map_err(into_store_error)
    }

    async fn load_all(&self, key: &RecordKey) -> Result<Vec<TranslationRow>, StoreError> {
        let key = key.clone();

        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM translations WHERE model = ?1 AND host_id = ?2 ORDER BY locale",
                    SELECT_COLUMNS
                ))?;
                let raw = stmt
                    .query_map(params![key.model, key.host_id], row_from_sql)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                raw.into_iter().map(decode).collect()
            })
            .await
            .map_err(into_store_error)
    }

    async fn save(&self, row: &TranslationRow) -> Result<i64, StoreError> {
        let row = row.clone();
        self.db
            .execute_async(move |conn| write_row(conn, &row))
            .await
            .map_err(into_store_error)
    }

    async fn save_all(&self, rows: &[TranslationRow]) -> Result<Vec<i64>, StoreError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let rows = rows.to_vec();
        self.db
            .transaction_async(move |tx| rows.iter().map(|row| write_row(tx, row)).collect())
            .await
            .map_err(into_store_error)
    }

    async fn delete_record(&self, key: &RecordKey) -> Result<usize, StoreError> {
        let key = key.clone();
        self.db
            .execute_async(move |conn| {
                let removed = conn.execute(
                    "DELETE FROM translations WHERE model = ?1 AND host_id = ?2",
                    params![key.model, key.host_id],
                )?;
                Ok(removed)
            })
            .await
            .map_err(into_store_error)
    }
}
