use crate::errors::ServiceError;
use crate::models::VerificationRecord;
use crate::store::HistorySink;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;
use uuid::Uuid;
use zk_proofs::PredicateFamily;

pub type Db = Pool<Sqlite>;

pub async fn connect(db_url: &str) -> Result<Db, ServiceError> {
    let options = SqliteConnectOptions::from_str(db_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().max_connections(5).connect_with(options).await?;
    Ok(pool)
}

pub async fn init_schema(db: &Db) -> Result<(), ServiceError> {
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS verifications (
  id TEXT PRIMARY KEY,
  identity TEXT NOT NULL,
  family TEXT NOT NULL,
  created_at TEXT NOT NULL,
  verified INTEGER NOT NULL,
  result INTEGER NOT NULL,
  receipt_hash TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS verifications_identity ON verifications(identity, family);
"#,
    )
    .execute(db)
    .await?;

    Ok(())
}

/// Verification history persisted in SQLite.
#[derive(Clone)]
pub struct SqliteHistory {
    db: Db,
}

impl SqliteHistory {
    pub async fn open(db_url: &str) -> Result<Self, ServiceError> {
        let db = connect(db_url).await?;
        init_schema(&db).await?;
        Ok(Self { db })
    }

    pub async fn list_for(&self, identity: &str, family: PredicateFamily) -> Result<Vec<VerificationRecord>, ServiceError> {
        let rows = sqlx::query(
            r#"SELECT created_at, verified, result, receipt_hash
               FROM verifications
               WHERE identity = ? AND family = ?
               ORDER BY created_at"#,
        )
        .bind(identity)
        .bind(family.as_str())
        .fetch_all(&self.db)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let created_at: String = row.get(0);
            let timestamp = DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| ServiceError::Storage(format!("bad timestamp: {e}")))?
                .with_timezone(&Utc);
            let verified: i64 = row.get(1);
            let result: i64 = row.get(2);

            out.push(VerificationRecord {
                identity: identity.to_string(),
                family,
                timestamp,
                verified: verified == 1,
                result: u8::from(result == 1),
                receipt_hash: row.get(3),
            });
        }

        Ok(out)
    }
}

#[async_trait]
impl HistorySink for SqliteHistory {
    async fn record(&self, record: &VerificationRecord) -> Result<(), ServiceError> {
        sqlx::query(
            r#"INSERT INTO verifications (id, identity, family, created_at, verified, result, receipt_hash)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&record.identity)
        .bind(record.family.as_str())
        .bind(record.timestamp.to_rfc3339())
        .bind(if record.verified { 1i64 } else { 0i64 })
        .bind(i64::from(record.result))
        .bind(&record.receipt_hash)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}
