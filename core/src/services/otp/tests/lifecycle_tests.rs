//! Tests for SessionLifecycleManager

use futures::future::join_all;
use std::sync::Arc;

use crate::errors::OtpError;
use crate::repositories::{MockOtpSessionRepository, OtpSessionRepository};
use crate::services::otp::{SessionLifecycleManager, MAX_CREATE_RETRIES};

use super::mocks::{otp_config, PHONE};

fn manager(repo: &Arc<MockOtpSessionRepository>) -> SessionLifecycleManager<MockOtpSessionRepository> {
    SessionLifecycleManager::new(repo.clone(), &otp_config())
}

#[tokio::test]
async fn test_sequential_creates_keep_only_latest() {
    let repo = Arc::new(MockOtpSessionRepository::new());
    let lifecycle = manager(&repo);

    let mut last = None;
    for _ in 0..4 {
        last = Some(lifecycle.create_or_replace(PHONE).await.unwrap());
    }
    let last = last.unwrap();

    let stored = repo.sessions_for_phone(PHONE).await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].session_id, last.session_id);
    assert_eq!(stored[0].otp, last.otp);
    assert_eq!(last.superseded, 1);
    assert_eq!(repo.request_log_len().await, 4);
}

#[tokio::test]
async fn test_issued_code_shape() {
    let repo = Arc::new(MockOtpSessionRepository::new());
    let issued = manager(&repo).create_or_replace(PHONE).await.unwrap();

    assert_eq!(issued.phone, PHONE);
    assert_eq!(issued.otp.len(), 6);
    assert!(issued.otp.chars().all(|c| c.is_ascii_digit()));
    assert!(!format!("{:?}", issued).contains(&issued.otp));
}

#[tokio::test]
async fn test_collisions_are_retried() {
    let repo = Arc::new(MockOtpSessionRepository::new());
    repo.force_collisions(2);

    let issued = manager(&repo).create_or_replace(PHONE).await.unwrap();

    assert!(repo.find_by_id(&issued.session_id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_conflicts_are_retried() {
    let repo = Arc::new(MockOtpSessionRepository::new());
    repo.force_conflicts(MAX_CREATE_RETRIES - 1);

    assert!(manager(&repo).create_or_replace(PHONE).await.is_ok());
}

#[tokio::test]
async fn test_retry_exhaustion_surfaces_storage_unavailable() {
    let repo = Arc::new(MockOtpSessionRepository::new());
    repo.force_collisions(MAX_CREATE_RETRIES);

    let result = manager(&repo).create_or_replace(PHONE).await;

    assert!(matches!(result, Err(OtpError::StorageUnavailable { .. })));
    assert_eq!(repo.count_by_phone(PHONE).await.unwrap(), 0);
}

#[tokio::test]
async fn test_store_failure_is_fail_closed() {
    let repo = Arc::new(MockOtpSessionRepository::new());
    repo.set_unavailable(true);

    let result = manager(&repo).create_or_replace(PHONE).await;
    assert!(matches!(result, Err(OtpError::StorageUnavailable { .. })));
}

#[tokio::test]
async fn test_concurrent_creates_leave_one_row() {
    let repo = Arc::new(MockOtpSessionRepository::new());
    let lifecycle = Arc::new(manager(&repo));

    let handles = (0..10).map(|_| {
        let lifecycle = lifecycle.clone();
        tokio::spawn(async move { lifecycle.create_or_replace(PHONE).await })
    });
    let results = join_all(handles).await;

    for result in results {
        assert!(result.unwrap().is_ok());
    }
    assert_eq!(repo.count_by_phone(PHONE).await.unwrap(), 1);
}

#[tokio::test]
async fn test_delete_by_phone_and_id() {
    let repo = Arc::new(MockOtpSessionRepository::new());
    let lifecycle = manager(&repo);

    let issued = lifecycle.create_or_replace(PHONE).await.unwrap();
    assert!(lifecycle.delete_by_id(&issued.session_id).await.unwrap());
    assert!(!lifecycle.delete_by_id(&issued.session_id).await.unwrap());

    lifecycle.create_or_replace(PHONE).await.unwrap();
    assert_eq!(lifecycle.delete_by_phone(PHONE).await.unwrap(), 1);
    assert_eq!(repo.count_by_phone(PHONE).await.unwrap(), 0);
}
