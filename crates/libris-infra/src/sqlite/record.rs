//! SQLite record repository implementation.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;

use libris_core::repository::record::RecordRepository;
use libris_types::error::StorageError;
use libris_types::record::{Record, RecordId};
use libris_types::sync::SyncCursor;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `RecordRepository`.
pub struct SqliteRecordRepository {
    pool: DatabasePool,
}

impl SqliteRecordRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain Record.
struct RecordRow {
    id: i64,
    code: String,
    title: String,
    author: String,
    summary: Option<String>,
    stamp: String,
}

impl RecordRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            code: row.try_get("code")?,
            title: row.try_get("title")?,
            author: row.try_get("author")?,
            summary: row.try_get("summary")?,
            stamp: row.try_get("stamp")?,
        })
    }

    fn into_record(self) -> Result<Record, StorageError> {
        Ok(Record {
            id: RecordId(self.id),
            code: self.code,
            title: self.title,
            author: self.author,
            summary: self.summary,
            stamp: parse_datetime(&self.stamp)?,
        })
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Query(format!("invalid stamp '{s}': {e}")))
}

/// Fixed-width UTC form so `MAX(stamp)` orders chronologically.
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl RecordRepository for SqliteRecordRepository {
    async fn insert(&self, record: &Record) -> Result<(), StorageError> {
        let result = sqlx::query(
            r#"INSERT INTO records (id, code, title, author, summary, stamp)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(record.id.0)
        .bind(&record.code)
        .bind(&record.title)
        .bind(&record.author)
        .bind(&record.summary)
        .bind(format_datetime(&record.stamp))
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => {
                Err(StorageError::DuplicateKey(record.id))
            }
            Err(e) => Err(StorageError::Query(e.to_string())),
        }
    }

    async fn get_by_id(&self, id: RecordId) -> Result<Option<Record>, StorageError> {
        let row = sqlx::query("SELECT * FROM records WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let record_row = RecordRow::from_row(&row)
                    .map_err(|e| StorageError::Query(e.to_string()))?;
                Ok(Some(record_row.into_record()?))
            }
            None => Ok(None),
        }
    }

    async fn get_all(&self) -> Result<Vec<Record>, StorageError> {
        let rows = sqlx::query("SELECT * FROM records ORDER BY id")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                RecordRow::from_row(row)
                    .map_err(|e| StorageError::Query(e.to_string()))?
                    .into_record()
            })
            .collect()
    }

    async fn count(&self) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM records")
            .fetch_one(&self.pool.reader)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        let count: i64 = row
            .try_get("count")
            .map_err(|e| StorageError::Query(e.to_string()))?;
        Ok(count as u64)
    }

    async fn latest_cursor(&self) -> Result<Option<SyncCursor>, StorageError> {
        let row = sqlx::query("SELECT MAX(id) as last_id, MAX(stamp) as last_stamp FROM records")
            .fetch_one(&self.pool.reader)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        let last_id: Option<i64> = row
            .try_get("last_id")
            .map_err(|e| StorageError::Query(e.to_string()))?;
        let last_stamp: Option<String> = row
            .try_get("last_stamp")
            .map_err(|e| StorageError::Query(e.to_string()))?;

        match (last_id, last_stamp) {
            (Some(id), Some(stamp)) => Ok(Some(SyncCursor {
                last_id: RecordId(id),
                last_stamp: parse_datetime(&stamp)?,
            })),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn test_pool() -> (tempfile::TempDir, DatabasePool) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let pool = DatabasePool::new(&url).await.unwrap();
        (dir, pool)
    }

    fn record(id: i64, summary: Option<&str>, day: u32) -> Record {
        Record {
            id: RecordId(id),
            code: format!("LIB-{id:04}"),
            title: format!("Title {id}"),
            author: "Ursula K. Le Guin".to_string(),
            summary: summary.map(str::to_string),
            stamp: Utc.with_ymd_and_hms(2023, 6, day, 12, 30, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let (_dir, pool) = test_pool().await;
        let repo = SqliteRecordRepository::new(pool);

        let rec = record(42, Some("A wizard's coming of age."), 3);
        repo.insert(&rec).await.unwrap();

        let fetched = repo.get_by_id(RecordId(42)).await.unwrap().unwrap();
        assert_eq!(fetched, rec);
    }

    #[tokio::test]
    async fn test_null_summary_round_trips() {
        let (_dir, pool) = test_pool().await;
        let repo = SqliteRecordRepository::new(pool);

        repo.insert(&record(1, None, 1)).await.unwrap();

        let fetched = repo.get_by_id(RecordId(1)).await.unwrap().unwrap();
        assert_eq!(fetched.summary, None);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let (_dir, pool) = test_pool().await;
        let repo = SqliteRecordRepository::new(pool);

        assert!(repo.get_by_id(RecordId(99)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let (_dir, pool) = test_pool().await;
        let repo = SqliteRecordRepository::new(pool);

        repo.insert(&record(7, Some("first"), 1)).await.unwrap();
        let err = repo.insert(&record(7, Some("second"), 2)).await.unwrap_err();

        assert!(matches!(err, StorageError::DuplicateKey(RecordId(7))));
        let kept = repo.get_by_id(RecordId(7)).await.unwrap().unwrap();
        assert_eq!(kept.summary.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_get_all_ordered_by_id() {
        let (_dir, pool) = test_pool().await;
        let repo = SqliteRecordRepository::new(pool);

        for id in [5, 1, 3] {
            repo.insert(&record(id, None, 1)).await.unwrap();
        }

        let ids: Vec<i64> = repo.get_all().await.unwrap().iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec![1, 3, 5]);
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_latest_cursor() {
        let (_dir, pool) = test_pool().await;
        let repo = SqliteRecordRepository::new(pool);

        assert!(repo.latest_cursor().await.unwrap().is_none());

        // Highest id and newest stamp come from different records.
        repo.insert(&record(10, None, 2)).await.unwrap();
        repo.insert(&record(4, None, 20)).await.unwrap();

        let cursor = repo.latest_cursor().await.unwrap().unwrap();
        assert_eq!(cursor.last_id, RecordId(10));
        assert_eq!(
            cursor.last_stamp,
            Utc.with_ymd_and_hms(2023, 6, 20, 12, 30, 0).unwrap()
        );
    }
}
