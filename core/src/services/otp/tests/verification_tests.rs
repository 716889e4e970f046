//! Tests for VerificationEngine

use chrono::{Duration, Utc};
use futures::future::join_all;
use std::sync::Arc;

use crate::domain::entities::OtpSession;
use crate::errors::OtpError;
use crate::repositories::{MockOtpSessionRepository, OtpSessionRepository};
use crate::services::otp::VerificationEngine;

use super::mocks::{otp_config, PHONE};

async fn setup(session: OtpSession) -> (Arc<MockOtpSessionRepository>, VerificationEngine<MockOtpSessionRepository>) {
    let repo = Arc::new(MockOtpSessionRepository::new());
    repo.insert_raw(session).await;
    let engine = VerificationEngine::new(repo.clone(), &otp_config().with_expiry_minutes(1));
    (repo, engine)
}

#[tokio::test]
async fn test_correct_code_verifies_once() {
    let session = OtpSession::new(PHONE, "482913");
    let id = session.session_id.clone();
    let (repo, engine) = setup(session).await;

    let verified = engine.verify(&id, "482913").await.unwrap();
    assert_eq!(verified.phone, PHONE);
    assert_eq!(verified.session_id, id);

    assert_eq!(engine.verify(&id, "482913").await, Err(OtpError::SessionNotFound));
    assert_eq!(repo.count_by_phone(PHONE).await.unwrap(), 0);
}

#[tokio::test]
async fn test_unknown_session() {
    let (_, engine) = setup(OtpSession::new(PHONE, "482913")).await;
    assert_eq!(engine.verify("nope", "482913").await, Err(OtpError::SessionNotFound));
}

#[tokio::test]
async fn test_expired_session_is_deleted() {
    let session = OtpSession::new(PHONE, "482913").with_created_at(Utc::now() - Duration::seconds(61));
    let id = session.session_id.clone();
    let (repo, engine) = setup(session).await;

    assert_eq!(engine.verify(&id, "482913").await, Err(OtpError::SessionExpired));
    assert!(repo.find_by_id(&id).await.unwrap().is_none());
    assert_eq!(engine.verify(&id, "482913").await, Err(OtpError::SessionNotFound));
}

#[tokio::test]
async fn test_mismatch_keeps_session() {
    let session = OtpSession::new(PHONE, "482913");
    let id = session.session_id.clone();
    let (_, engine) = setup(session).await;

    assert_eq!(
        engine.verify(&id, "000000").await,
        Err(OtpError::OtpMismatch { remaining_attempts: Some(4) })
    );
    assert!(engine.verify(&id, "482913").await.is_ok());
}

#[tokio::test]
async fn test_attempt_budget_burns_session() {
    let session = OtpSession::new(PHONE, "482913");
    let id = session.session_id.clone();
    let (repo, engine) = setup(session).await;

    for remaining in (1..5).rev() {
        assert_eq!(
            engine.verify(&id, "000000").await,
            Err(OtpError::OtpMismatch { remaining_attempts: Some(remaining) })
        );
    }
    assert_eq!(engine.verify(&id, "000000").await, Err(OtpError::TooManyAttempts));
    assert!(repo.find_by_id(&id).await.unwrap().is_none());
    assert_eq!(engine.verify(&id, "482913").await, Err(OtpError::SessionNotFound));
}

#[tokio::test]
async fn test_zero_budget_allows_unlimited_retries() {
    let repo = Arc::new(MockOtpSessionRepository::new());
    let session = OtpSession::new(PHONE, "482913");
    let id = session.session_id.clone();
    repo.insert_raw(session).await;
    let engine = VerificationEngine::new(repo, &otp_config().with_max_verify_attempts(0));

    for _ in 0..20 {
        assert_eq!(
            engine.verify(&id, "000000").await,
            Err(OtpError::OtpMismatch { remaining_attempts: None })
        );
    }
    assert!(engine.verify(&id, "482913").await.is_ok());
}

#[tokio::test]
async fn test_concurrent_correct_codes_succeed_once() {
    let session = OtpSession::new(PHONE, "482913");
    let id = session.session_id.clone();
    let (_, engine) = setup(session).await;
    let engine = Arc::new(engine);

    let handles = (0..8).map(|_| {
        let engine = engine.clone();
        let id = id.clone();
        tokio::spawn(async move { engine.verify(&id, "482913").await })
    });
    let results: Vec<_> = join_all(handles).await.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| *e == OtpError::SessionNotFound));
}

#[tokio::test]
async fn test_store_failure_is_fail_closed() {
    let session = OtpSession::new(PHONE, "482913");
    let id = session.session_id.clone();
    let (repo, engine) = setup(session).await;
    repo.set_unavailable(true);

    assert!(matches!(
        engine.verify(&id, "482913").await,
        Err(OtpError::StorageUnavailable { .. })
    ));
}

#[tokio::test]
async fn test_oversized_lifetime_still_verifies() {
    let repo = Arc::new(MockOtpSessionRepository::new());
    let session = OtpSession::new(PHONE, "482913");
    let id = session.session_id.clone();
    repo.insert_raw(session).await;

    let mut config = otp_config();
    config.expiry_minutes = i64::MAX / 2;
    let engine = VerificationEngine::new(repo.clone(), &config);

    let verified = engine.verify(&id, "482913").await.unwrap();
    assert_eq!(verified.session_id, id);
}
