//! In-memory implementation of OtpSessionRepository for tests and local runs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::entities::OtpSession;
use crate::errors::{StorageError, StorageResult};

use super::r#trait::OtpSessionRepository;

#[derive(Default)]
struct State {
    sessions: HashMap<String, OtpSession>,
    request_log: Vec<(String, DateTime<Utc>)>,
}

/// Mock session repository
///
/// All operations take the write lock for their whole duration, so each one
/// behaves like a single transaction.
pub struct MockOtpSessionRepository {
    state: Arc<RwLock<State>>,
    unavailable: AtomicBool,
    forced_collisions: AtomicU32,
    forced_conflicts: AtomicU32,
}

impl MockOtpSessionRepository {
    /// Create a new empty repository
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            unavailable: AtomicBool::new(false),
            forced_collisions: AtomicU32::new(0),
            forced_conflicts: AtomicU32::new(0),
        }
    }

    /// Make every subsequent call fail with `StorageError::Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make the next `count` inserts fail with a duplicate key
    pub fn force_collisions(&self, count: u32) {
        self.forced_collisions.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` inserts fail with a transaction conflict
    pub fn force_conflicts(&self, count: u32) {
        self.forced_conflicts.store(count, Ordering::SeqCst);
    }

    /// Store a session as-is, bypassing replacement and the request log
    pub async fn insert_raw(&self, session: OtpSession) {
        let mut state = self.state.write().await;
        state.sessions.insert(session.session_id.clone(), session);
    }

    /// Append a request-log entry with an explicit timestamp
    pub async fn record_request_at(&self, phone: &str, requested_at: DateTime<Utc>) {
        let mut state = self.state.write().await;
        state.request_log.push((phone.to_string(), requested_at));
    }

    /// All sessions currently stored for a phone
    pub async fn sessions_for_phone(&self, phone: &str) -> Vec<OtpSession> {
        let state = self.state.read().await;
        state
            .sessions
            .values()
            .filter(|s| s.phone == phone)
            .cloned()
            .collect()
    }

    /// Number of request-log entries, across all phones
    pub async fn request_log_len(&self) -> usize {
        self.state.read().await.request_log.len()
    }

    fn ensure_available(&self) -> StorageResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable("mock store is offline"));
        }
        Ok(())
    }

    fn take_forced(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for MockOtpSessionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OtpSessionRepository for MockOtpSessionRepository {
    async fn replace_for_phone(&self, session: &OtpSession) -> StorageResult<u64> {
        self.ensure_available()?;
        let mut state = self.state.write().await;

        if Self::take_forced(&self.forced_conflicts) {
            return Err(StorageError::Conflict {
                message: "Deadlock found when trying to get lock".to_string(),
            });
        }
        if Self::take_forced(&self.forced_collisions)
            || state.sessions.contains_key(&session.session_id)
        {
            return Err(StorageError::DuplicateKey {
                key: session.session_id.clone(),
            });
        }

        let before = state.sessions.len();
        state.sessions.retain(|_, s| s.phone != session.phone);
        let removed = (before - state.sessions.len()) as u64;

        state
            .sessions
            .insert(session.session_id.clone(), session.clone());
        state
            .request_log
            .push((session.phone.clone(), session.created_at));

        Ok(removed)
    }

    async fn find_by_id(&self, session_id: &str) -> StorageResult<Option<OtpSession>> {
        self.ensure_available()?;
        let state = self.state.read().await;
        Ok(state.sessions.get(session_id).cloned())
    }

    async fn consume(
        &self,
        session_id: &str,
        otp: &str,
        not_before: DateTime<Utc>,
    ) -> StorageResult<bool> {
        self.ensure_available()?;
        let mut state = self.state.write().await;

        let matches = state
            .sessions
            .get(session_id)
            .map(|s| s.otp == otp && s.created_at >= not_before)
            .unwrap_or(false);

        if matches {
            state.sessions.remove(session_id);
        }
        Ok(matches)
    }

    async fn record_failed_attempt(&self, session_id: &str) -> StorageResult<Option<u32>> {
        self.ensure_available()?;
        let mut state = self.state.write().await;

        Ok(state.sessions.get_mut(session_id).map(|s| {
            s.failed_attempts += 1;
            s.failed_attempts
        }))
    }

    async fn delete_by_id(&self, session_id: &str) -> StorageResult<bool> {
        self.ensure_available()?;
        let mut state = self.state.write().await;
        Ok(state.sessions.remove(session_id).is_some())
    }

    async fn delete_by_phone(&self, phone: &str) -> StorageResult<u64> {
        self.ensure_available()?;
        let mut state = self.state.write().await;

        let before = state.sessions.len();
        state.sessions.retain(|_, s| s.phone != phone);
        Ok((before - state.sessions.len()) as u64)
    }

    async fn count_by_phone(&self, phone: &str) -> StorageResult<u64> {
        self.ensure_available()?;
        let state = self.state.read().await;
        Ok(state.sessions.values().filter(|s| s.phone == phone).count() as u64)
    }

    async fn request_times_since(
        &self,
        phone: &str,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<DateTime<Utc>>> {
        self.ensure_available()?;
        let state = self.state.read().await;

        let mut times: Vec<DateTime<Utc>> = state
            .request_log
            .iter()
            .filter(|(p, at)| p == phone && *at >= since)
            .map(|(_, at)| *at)
            .collect();
        times.sort();
        Ok(times)
    }

    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> StorageResult<u64> {
        self.ensure_available()?;
        let mut state = self.state.write().await;

        let before = state.sessions.len();
        state.sessions.retain(|_, s| s.created_at >= cutoff);
        Ok((before - state.sessions.len()) as u64)
    }

    async fn prune_request_log(&self, cutoff: DateTime<Utc>) -> StorageResult<u64> {
        self.ensure_available()?;
        let mut state = self.state.write().await;

        let before = state.request_log.len();
        state.request_log.retain(|(_, at)| *at >= cutoff);
        Ok((before - state.request_log.len()) as u64)
    }
}
