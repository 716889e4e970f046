//! MySQL implementation of the OtpSessionRepository trait.
//!
//! Sessions live in `otp_sessions`; every issued code is also appended to
//! `otp_request_log` so the rate limiter can count requests whose session was
//! later replaced.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Connection, MySqlConnection, MySqlPool, Row};
use tracing::warn;

use otp_core::domain::entities::OtpSession;
use otp_core::errors::{StorageError, StorageResult};
use otp_core::repositories::OtpSessionRepository;

/// SQLSTATE reported by MySQL for deadlocks and serialization failures
const SQLSTATE_SERIALIZATION_FAILURE: &str = "40001";

/// Seconds a create waits for another create on the same phone
const PHONE_LOCK_TIMEOUT_SECS: i64 = 5;

/// Name of the MySQL user-level lock guarding one phone's session row
///
/// Lock names are limited to 64 characters; canonical phones are far shorter.
fn phone_lock_name(phone: &str) -> String {
    format!("otp_session:{}", phone)
}

/// MySQL implementation of OtpSessionRepository
pub struct MySqlOtpSessionRepository {
    /// Database connection pool
    pool: MySqlPool,
}

impl MySqlOtpSessionRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Classify a SQLx error for the session services
    ///
    /// `key` names the row being written and is reported on unique violations.
    fn map_error(e: sqlx::Error, key: &str) -> StorageError {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return StorageError::DuplicateKey {
                    key: key.to_string(),
                };
            }
            if db.code().as_deref() == Some(SQLSTATE_SERIALIZATION_FAILURE) {
                return StorageError::Conflict {
                    message: db.message().to_string(),
                };
            }
        }
        StorageError::unavailable(e)
    }

    fn unavailable(e: sqlx::Error) -> StorageError {
        Self::map_error(e, "")
    }

    /// Delete the phone's sessions, insert `session` and log the request
    ///
    /// Runs while the caller holds the phone lock. Old rows are deleted by
    /// primary key so the transaction takes no gap locks on the phone index.
    async fn replace_locked(conn: &mut MySqlConnection, session: &OtpSession) -> StorageResult<u64> {
        let key = session.session_id.as_str();
        let mut tx = conn.begin().await.map_err(Self::unavailable)?;

        let existing: Vec<String> =
            sqlx::query_scalar("SELECT session_id FROM otp_sessions WHERE phone = ?")
                .bind(&session.phone)
                .fetch_all(&mut *tx)
                .await
                .map_err(|e| Self::map_error(e, key))?;

        let mut removed = 0;
        for session_id in &existing {
            removed += sqlx::query("DELETE FROM otp_sessions WHERE session_id = ?")
                .bind(session_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| Self::map_error(e, key))?
                .rows_affected();
        }

        let insert = r#"
            INSERT INTO otp_sessions (
                session_id, phone, otp, created_at, failed_attempts
            ) VALUES (?, ?, ?, ?, ?)
        "#;

        sqlx::query(insert)
            .bind(&session.session_id)
            .bind(&session.phone)
            .bind(&session.otp)
            .bind(session.created_at)
            .bind(session.failed_attempts)
            .execute(&mut *tx)
            .await
            .map_err(|e| Self::map_error(e, key))?;

        sqlx::query("INSERT INTO otp_request_log (phone, requested_at) VALUES (?, ?)")
            .bind(&session.phone)
            .bind(session.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| Self::map_error(e, key))?;

        tx.commit().await.map_err(|e| Self::map_error(e, key))?;

        Ok(removed)
    }

    /// Convert database row to OtpSession entity
    fn row_to_session(row: &sqlx::mysql::MySqlRow) -> StorageResult<OtpSession> {
        Ok(OtpSession {
            session_id: row.try_get("session_id").map_err(StorageError::unavailable)?,
            phone: row.try_get("phone").map_err(StorageError::unavailable)?,
            otp: row.try_get("otp").map_err(StorageError::unavailable)?,
            created_at: row
                .try_get::<DateTime<Utc>, _>("created_at")
                .map_err(StorageError::unavailable)?,
            failed_attempts: row
                .try_get("failed_attempts")
                .map_err(StorageError::unavailable)?,
        })
    }
}

#[async_trait]
impl OtpSessionRepository for MySqlOtpSessionRepository {
    async fn replace_for_phone(&self, session: &OtpSession) -> StorageResult<u64> {
        let mut conn = self.pool.acquire().await.map_err(Self::unavailable)?;
        let lock_name = phone_lock_name(&session.phone);

        // Serializes creates for one phone across every server instance
        let acquired: Option<i64> = sqlx::query_scalar("SELECT GET_LOCK(?, ?)")
            .bind(&lock_name)
            .bind(PHONE_LOCK_TIMEOUT_SECS)
            .fetch_one(&mut *conn)
            .await
            .map_err(Self::unavailable)?;

        if acquired != Some(1) {
            return Err(StorageError::Conflict {
                message: "Timed out waiting for the phone lock".to_string(),
            });
        }

        let result = Self::replace_locked(&mut conn, session).await;

        let released = sqlx::query("SELECT RELEASE_LOCK(?)")
            .bind(&lock_name)
            .execute(&mut *conn)
            .await;
        if let Err(e) = released {
            warn!(
                error = %e,
                event = "otp_phone_lock_release_failed",
                "Failed to release phone lock, dropping connection"
            );
            // Closing the session releases every lock it holds
            drop(conn.detach());
        }

        result
    }

    async fn find_by_id(&self, session_id: &str) -> StorageResult<Option<OtpSession>> {
        let query = r#"
            SELECT session_id, phone, otp, created_at, failed_attempts
            FROM otp_sessions
            WHERE session_id = ?
            LIMIT 1
        "#;

        let result = sqlx::query(query)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::unavailable)?;

        match result {
            Some(row) => Ok(Some(Self::row_to_session(&row)?)),
            None => Ok(None),
        }
    }

    async fn consume(
        &self,
        session_id: &str,
        otp: &str,
        not_before: DateTime<Utc>,
    ) -> StorageResult<bool> {
        let query = r#"
            DELETE FROM otp_sessions
            WHERE session_id = ? AND otp = ? AND created_at >= ?
        "#;

        let result = sqlx::query(query)
            .bind(session_id)
            .bind(otp)
            .bind(not_before)
            .execute(&self.pool)
            .await
            .map_err(Self::unavailable)?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_failed_attempt(&self, session_id: &str) -> StorageResult<Option<u32>> {
        let mut tx = self.pool.begin().await.map_err(Self::unavailable)?;

        let updated = sqlx::query(
            "UPDATE otp_sessions SET failed_attempts = failed_attempts + 1 WHERE session_id = ?",
        )
        .bind(session_id)
        .execute(&mut *tx)
        .await
        .map_err(Self::unavailable)?
        .rows_affected();

        if updated == 0 {
            tx.rollback().await.map_err(Self::unavailable)?;
            return Ok(None);
        }

        let attempts: u32 =
            sqlx::query_scalar("SELECT failed_attempts FROM otp_sessions WHERE session_id = ?")
                .bind(session_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(Self::unavailable)?;

        tx.commit().await.map_err(Self::unavailable)?;

        Ok(Some(attempts))
    }

    async fn delete_by_id(&self, session_id: &str) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM otp_sessions WHERE session_id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(Self::unavailable)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_phone(&self, phone: &str) -> StorageResult<u64> {
        let result = sqlx::query("DELETE FROM otp_sessions WHERE phone = ?")
            .bind(phone)
            .execute(&self.pool)
            .await
            .map_err(Self::unavailable)?;

        Ok(result.rows_affected())
    }

    async fn count_by_phone(&self, phone: &str) -> StorageResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM otp_sessions WHERE phone = ?")
            .bind(phone)
            .fetch_one(&self.pool)
            .await
            .map_err(Self::unavailable)?;

        Ok(count.max(0) as u64)
    }

    async fn request_times_since(
        &self,
        phone: &str,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<DateTime<Utc>>> {
        let query = r#"
            SELECT requested_at
            FROM otp_request_log
            WHERE phone = ? AND requested_at >= ?
            ORDER BY requested_at ASC
        "#;

        sqlx::query_scalar::<_, DateTime<Utc>>(query)
            .bind(phone)
            .bind(since)
            .fetch_all(&self.pool)
            .await
            .map_err(Self::unavailable)
    }

    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> StorageResult<u64> {
        let result = sqlx::query("DELETE FROM otp_sessions WHERE created_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(Self::unavailable)?;

        Ok(result.rows_affected())
    }

    async fn prune_request_log(&self, cutoff: DateTime<Utc>) -> StorageResult<u64> {
        let result = sqlx::query("DELETE FROM otp_request_log WHERE requested_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(Self::unavailable)?;

        Ok(result.rows_affected())
    }
}
