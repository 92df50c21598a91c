use crate::error::Result;
use crate::models;
use sqlx::{Row, sqlite::SqlitePool};

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        use sqlx::sqlite::SqliteConnectOptions;
        use std::str::FromStr;

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let pool = SqlitePool::connect_with(options).await?;
        Ok(Self { pool })
    }

    #[cfg(test)]
    pub async fn open_in_memory() -> Result<Self> {
        use sqlx::sqlite::SqlitePoolOptions;

        // A single connection that never expires, so the in-memory database lives as long as the pool.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self { pool })
    }

    /// Creates the `emails` table if it is not there yet. Existing rows are untouched.
    pub async fn ensure_schema(&self) -> Result<()> {
        let schema = include_str!("../schema.sql");
        sqlx::query(schema).execute(&self.pool).await?;
        Ok(())
    }

    /// Appends one record and returns its id. Each insert commits on its own.
    pub async fn insert(&self, record: &models::NewRecord) -> Result<i64> {
        let result =
            sqlx::query("INSERT INTO emails (sender, subject, body, date) VALUES (?, ?, ?, ?)")
                .bind(&record.sender)
                .bind(&record.subject)
                .bind(&record.body)
                .bind(&record.date)
                .execute(&self.pool)
                .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn scan_all(&self) -> Result<Vec<models::Record>> {
        let rows = sqlx::query("SELECT id, sender, subject, body, date FROM emails ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        // Columns are nullable; rows written by other tools may carry NULLs.
        let records = rows
            .into_iter()
            .map(|row| models::Record {
                id: row.get(0),
                sender: row.get::<Option<String>, _>(1).unwrap_or_default(),
                subject: row.get::<Option<String>, _>(2).unwrap_or_default(),
                body: row.get::<Option<String>, _>(3).unwrap_or_default(),
                date: row.get::<Option<String>, _>(4).unwrap_or_default(),
            })
            .collect();

        Ok(records)
    }

    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) FROM emails")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get(0))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewRecord;
    use pretty_assertions::assert_eq;

    fn sample(subject: &str) -> NewRecord {
        NewRecord {
            sender: "Alice <alice@example.com>".to_string(),
            subject: subject.to_string(),
            body: "Hi Bob,\nsee you soon.".to_string(),
            date: "Mon, 2 Jan 2023 10:00:00 +0000".to_string(),
        }
    }

    async fn fresh() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        db.ensure_schema().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_insert_then_scan_returns_record() {
        let db = fresh().await;
        let record = sample("Lunch");

        let id = db.insert(&record).await.unwrap();
        let all = db.scan_all().await.unwrap();

        assert_eq!(all, vec![record.with_id(id)]);
    }

    #[tokio::test]
    async fn test_ids_are_strictly_increasing() {
        let db = fresh().await;

        let mut last = 0;
        for subject in ["one", "two", "three"] {
            let id = db.insert(&sample(subject)).await.unwrap();
            assert!(id > last, "id {} not greater than {}", id, last);
            last = id;
        }

        let subjects: Vec<String> = db
            .scan_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.subject)
            .collect();
        assert_eq!(subjects, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_identical_records_are_not_deduplicated() {
        let db = fresh().await;
        let record = sample("Same");

        let first = db.insert(&record).await.unwrap();
        let second = db.insert(&record).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(db.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let db = fresh().await;
        db.insert(&sample("kept")).await.unwrap();

        for _ in 0..3 {
            db.ensure_schema().await.unwrap();
        }

        assert_eq!(db.count().await.unwrap(), 1);
        let columns: Vec<String> = sqlx::query("SELECT name FROM pragma_table_info('emails')")
            .fetch_all(&db.pool)
            .await
            .unwrap()
            .into_iter()
            .map(|row| row.get(0))
            .collect();
        assert_eq!(columns, vec!["id", "sender", "subject", "body", "date"]);
    }

    #[tokio::test]
    async fn test_null_columns_read_as_empty() {
        let db = fresh().await;
        sqlx::query("INSERT INTO emails (sender) VALUES ('someone')")
            .execute(&db.pool)
            .await
            .unwrap();

        let all = db.scan_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].sender, "someone");
        assert_eq!(all[0].subject, "");
        assert_eq!(all[0].date, "");
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("emails.db").display());

        let db = Database::new(&url).await.unwrap();
        db.ensure_schema().await.unwrap();
        db.insert(&sample("persisted")).await.unwrap();
        db.close().await;

        let reopened = Database::new(&url).await.unwrap();
        reopened.ensure_schema().await.unwrap();
        let all = reopened.scan_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].subject, "persisted");
    }
}
