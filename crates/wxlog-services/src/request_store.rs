//! SQLite storage for weather request records.
//!
//! `RequestStore` owns a single connection. Ids come from an AUTOINCREMENT
//! column so a deleted id is never handed out again. The daily series is kept
//! as a JSON text column (`daily_json`).

use std::path::Path;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use wxlog_core::{AppError, DatabaseError, RusqliteErrorExt, Units};
use wxlog_weather::DailyWeather;

use crate::record::{NewWeatherRequest, WeatherRequestRecord};

/// Current schema version.
const SCHEMA_VERSION: i32 = 1;

const SELECT_COLUMNS: &str = "SELECT id, location_query, location_name, latitude, longitude, \
     start_date, end_date, units, daily_json, created_at, updated_at FROM requests";

#[derive(Debug, Error)]
pub enum RequestStoreError {
    #[error("Record not found: {0}")]
    NotFound(i64),

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<rusqlite::Error> for RequestStoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.into_database_error())
    }
}

impl From<RequestStoreError> for AppError {
    fn from(e: RequestStoreError) -> Self {
        match e {
            RequestStoreError::NotFound(id) => AppError::NotFound(id.to_string()),
            RequestStoreError::Storage(db) => AppError::Database(db),
            RequestStoreError::Serialization(msg) => {
                AppError::Database(DatabaseError::Corruption(msg))
            }
        }
    }
}

pub type RequestStoreResult<T> = Result<T, RequestStoreError>;

/// RFC 3339 UTC with microseconds, as stored in `created_at`/`updated_at`.
pub(crate) fn format_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error<E>(index: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e))
}

pub struct RequestStore {
    conn: Connection,
}

impl RequestStore {
    /// Open (or create) the store at `path`, creating parent directories.
    pub fn open<P: AsRef<Path>>(path: P) -> RequestStoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::ConnectionFailed(format!("{}: {}", parent.display(), e))
            })?;
        }

        let conn = Connection::open(path)
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
        let store = Self { conn };
        store.init_schema()?;
        tracing::info!("Request store opened at {}", path.display());
        Ok(store)
    }

    pub fn open_in_memory() -> RequestStoreResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> RequestStoreResult<()> {
        self.conn
            .execute("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)", [])?;

        let version: i32 = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
            .optional()?
            .unwrap_or(0);

        if version > SCHEMA_VERSION {
            return Err(DatabaseError::MigrationFailed(format!(
                "database schema v{} is newer than supported v{}",
                version, SCHEMA_VERSION
            ))
            .into());
        }

        self.conn
            .execute_batch(
                r#"
            CREATE TABLE IF NOT EXISTS requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                location_query TEXT NOT NULL,
                location_name TEXT NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                units TEXT NOT NULL,
                daily_json TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_requests_created ON requests(created_at DESC);
            "#,
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

        if version < SCHEMA_VERSION {
            self.conn.execute("DELETE FROM schema_version", [])?;
            self.conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )?;
        }

        Ok(())
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<WeatherRequestRecord> {
        let start_str: String = row.get(5)?;
        let end_str: String = row.get(6)?;
        let units_str: String = row.get(7)?;
        let daily_json: String = row.get(8)?;
        let created_at_str: String = row.get(9)?;
        let updated_at_str: String = row.get(10)?;

        let start_date = NaiveDate::parse_from_str(&start_str, "%Y-%m-%d")
            .map_err(|e| conversion_error(5, e))?;
        let end_date = NaiveDate::parse_from_str(&end_str, "%Y-%m-%d")
            .map_err(|e| conversion_error(6, e))?;
        let units: Units = units_str.parse().map_err(|e| conversion_error(7, e))?;
        let daily_series: Vec<DailyWeather> =
            serde_json::from_str(&daily_json).map_err(|e| conversion_error(8, e))?;
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_error(9, e))?;
        let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_error(10, e))?;

        Ok(WeatherRequestRecord {
            id: row.get(0)?,
            location_query: row.get(1)?,
            location_name: row.get(2)?,
            latitude: row.get(3)?,
            longitude: row.get(4)?,
            start_date,
            end_date,
            units,
            daily_series,
            created_at,
            updated_at,
        })
    }

    fn series_json(series: &[DailyWeather]) -> RequestStoreResult<String> {
        serde_json::to_string(series).map_err(|e| RequestStoreError::Serialization(e.to_string()))
    }

    /// Insert a new record. `created_at` and `updated_at` are both set to now.
    pub fn create(&self, request: &NewWeatherRequest) -> RequestStoreResult<WeatherRequestRecord> {
        let now = Utc::now();
        let now_str = format_timestamp(now);
        let daily_json = Self::series_json(&request.daily_series)?;

        self.conn.execute(
            r#"
            INSERT INTO requests (location_query, location_name, latitude, longitude,
                start_date, end_date, units, daily_json, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            "#,
            params![
                request.location_query,
                request.location_name,
                request.latitude,
                request.longitude,
                request.start_date.format("%Y-%m-%d").to_string(),
                request.end_date.format("%Y-%m-%d").to_string(),
                request.units.as_str(),
                daily_json,
                now_str,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        tracing::debug!("Created weather request with ID: {}", id);

        self.get(id)
    }

    pub fn get(&self, id: i64) -> RequestStoreResult<WeatherRequestRecord> {
        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
        self.conn
            .query_row(&sql, params![id], Self::row_to_record)
            .optional()?
            .ok_or(RequestStoreError::NotFound(id))
    }

    /// Newest first. Ties on `created_at` fall back to the higher id.
    pub fn list(&self) -> RequestStoreResult<Vec<WeatherRequestRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY created_at DESC, id DESC", SELECT_COLUMNS))?;

        let rows = stmt.query_map([], Self::row_to_record)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Replace every field except `id` and `created_at`; `updated_at` moves to now.
    pub fn update(
        &self,
        id: i64,
        request: &NewWeatherRequest,
    ) -> RequestStoreResult<WeatherRequestRecord> {
        let daily_json = Self::series_json(&request.daily_series)?;
        let updated_at_str = format_timestamp(Utc::now());

        let affected = self.conn.execute(
            r#"
            UPDATE requests
            SET location_query = ?1, location_name = ?2, latitude = ?3, longitude = ?4,
                start_date = ?5, end_date = ?6, units = ?7, daily_json = ?8, updated_at = ?9
            WHERE id = ?10
            "#,
            params![
                request.location_query,
                request.location_name,
                request.latitude,
                request.longitude,
                request.start_date.format("%Y-%m-%d").to_string(),
                request.end_date.format("%Y-%m-%d").to_string(),
                request.units.as_str(),
                daily_json,
                updated_at_str,
                id,
            ],
        )?;

        if affected == 0 {
            return Err(RequestStoreError::NotFound(id));
        }

        tracing::debug!("Updated weather request: {}", id);
        self.get(id)
    }

    pub fn delete(&self, id: i64) -> RequestStoreResult<()> {
        let affected = self.conn.execute("DELETE FROM requests WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(RequestStoreError::NotFound(id));
        }

        tracing::debug!("Deleted weather request: {}", id);
        Ok(())
    }

    pub fn count(&self) -> RequestStoreResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM requests", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use std::time::Duration;

    fn create_test_store() -> RequestStore {
        RequestStore::open_in_memory().expect("Failed to create in-memory store")
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample(query: &str) -> NewWeatherRequest {
        NewWeatherRequest {
            location_query: query.to_string(),
            location_name: format!("{}, Somewhere", query),
            latitude: 40.0,
            longitude: -105.0,
            start_date: date("2024-06-01"),
            end_date: date("2024-06-02"),
            units: Units::Metric,
            daily_series: vec![
                DailyWeather {
                    date: date("2024-06-01"),
                    temp_max: Some(24.0),
                    temp_min: Some(11.5),
                    weather_code: Some(2),
                },
                DailyWeather {
                    date: date("2024-06-02"),
                    temp_max: None,
                    temp_min: Some(12.0),
                    weather_code: None,
                },
            ],
        }
    }

    #[test]
    fn test_create_and_get() {
        let store = create_test_store();

        let record = store.create(&sample("Boulder")).unwrap();
        assert!(record.id > 0);
        assert_eq!(record.created_at, record.updated_at);
        assert_eq!(record.location_name, "Boulder, Somewhere");

        let fetched = store.get(record.id).unwrap();
        assert_eq!(fetched, record);
        assert_eq!(fetched.daily_series.len(), 2);
        assert_eq!(fetched.daily_series[1].temp_max, None);
    }

    #[test]
    fn test_get_nonexistent() {
        let store = create_test_store();
        assert!(matches!(store.get(99999), Err(RequestStoreError::NotFound(99999))));
    }

    #[test]
    fn test_list_newest_first() {
        let store = create_test_store();

        store.create(&sample("First")).unwrap();
        store.create(&sample("Second")).unwrap();
        store.create(&sample("Third")).unwrap();

        let records = store.list().unwrap();
        let queries: Vec<_> = records.iter().map(|r| r.location_query.as_str()).collect();
        assert_eq!(queries, vec!["Third", "Second", "First"]);
    }

    #[test]
    fn test_update_keeps_id_and_created_at() {
        let store = create_test_store();

        let original = store.create(&sample("Boulder")).unwrap();
        std::thread::sleep(Duration::from_millis(5));

        let mut changed = sample("Denver");
        changed.units = Units::Imperial;
        changed.daily_series.truncate(1);
        let updated = store.update(original.id, &changed).unwrap();

        assert_eq!(updated.id, original.id);
        assert_eq!(updated.created_at, original.created_at);
        assert!(updated.updated_at > original.updated_at);
        assert_eq!(updated.location_query, "Denver");
        assert_eq!(updated.units, Units::Imperial);
        assert_eq!(updated.daily_series.len(), 1);
    }

    #[test]
    fn test_update_nonexistent() {
        let store = create_test_store();
        let result = store.update(42, &sample("Nowhere"));
        assert!(matches!(result, Err(RequestStoreError::NotFound(42))));
    }

    #[test]
    fn test_delete() {
        let store = create_test_store();

        let record = store.create(&sample("Boulder")).unwrap();
        store.delete(record.id).unwrap();

        assert_eq!(store.count().unwrap(), 0);
        assert!(matches!(store.get(record.id), Err(RequestStoreError::NotFound(_))));
        assert!(matches!(store.delete(record.id), Err(RequestStoreError::NotFound(_))));
    }

    #[test]
    fn test_ids_are_never_reused() {
        let store = create_test_store();

        let first = store.create(&sample("A")).unwrap();
        let second = store.create(&sample("B")).unwrap();
        store.delete(second.id).unwrap();

        let third = store.create(&sample("C")).unwrap();
        assert!(third.id > second.id);
        assert!(second.id > first.id);
    }

    #[test]
    fn test_count() {
        let store = create_test_store();
        assert_eq!(store.count().unwrap(), 0);

        store.create(&sample("A")).unwrap();
        store.create(&sample("B")).unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("weatherapp.sqlite");

        let id = {
            let store = RequestStore::open(&db_path).unwrap();
            store.create(&sample("Boulder")).unwrap().id
        };

        let reopened = RequestStore::open(&db_path).unwrap();
        let record = reopened.get(id).unwrap();
        assert_eq!(record.location_query, "Boulder");
        assert_eq!(reopened.count().unwrap(), 1);
    }

    #[test]
    fn test_store_error_converts_to_app_error() {
        let app_err: AppError = RequestStoreError::NotFound(5).into();
        assert_eq!(app_err.status_code(), 404);

        let app_err: AppError = RequestStoreError::Serialization("bad json".into()).into();
        assert_eq!(app_err.status_code(), 500);
    }
}
