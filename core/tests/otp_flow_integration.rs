//! End-to-end tests for the custom OTP flow over the in-memory store

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use otp_core::domain::entities::OtpSession;
    use otp_core::errors::{DeliveryResult, OtpError};
    use otp_core::repositories::{MockOtpSessionRepository, OtpSessionRepository};
    use otp_core::services::otp::{
        CustomOtpProvider, ExpirySweeper, OtpProvider, SessionLifecycleManager, SmsServiceTrait,
        VerificationEngine,
    };
    use otp_shared::config::{OtpConfig, RateLimitConfig, SweeperConfig};

    const PHONE: &str = "+911234567890";

    // Records the last code sent to each phone
    struct RecordingSmsService {
        inbox: RwLock<HashMap<String, String>>,
    }

    impl RecordingSmsService {
        fn new() -> Self {
            Self {
                inbox: RwLock::new(HashMap::new()),
            }
        }

        async fn last_code(&self, phone: &str) -> Option<String> {
            self.inbox.read().await.get(phone).cloned()
        }
    }

    #[async_trait]
    impl SmsServiceTrait for RecordingSmsService {
        async fn send_verification_code(&self, phone: &str, code: &str) -> DeliveryResult<String> {
            self.inbox
                .write()
                .await
                .insert(phone.to_string(), code.to_string());
            Ok(format!("msg_id_{}", Utc::now().timestamp_millis()))
        }

        fn is_valid_phone_number(&self, phone: &str) -> bool {
            phone.starts_with('+')
        }
    }

    fn otp_config() -> OtpConfig {
        OtpConfig::default().with_expiry_minutes(1)
    }

    fn rate_limit_config() -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            max_requests_per_phone: 5,
            window_minutes: 15,
            min_seconds_between_requests: 30,
        }
    }

    #[tokio::test]
    async fn test_end_to_end_single_use() {
        let repo = Arc::new(MockOtpSessionRepository::new());
        let lifecycle = SessionLifecycleManager::new(repo.clone(), &otp_config());
        let engine = VerificationEngine::new(repo.clone(), &otp_config());

        let issued = lifecycle.create_or_replace(PHONE).await.unwrap();

        let verified = engine.verify(&issued.session_id, &issued.otp).await.unwrap();
        assert_eq!(verified.phone, PHONE);

        let again = engine.verify(&issued.session_id, &issued.otp).await;
        assert_eq!(again, Err(OtpError::SessionNotFound));
    }

    #[tokio::test]
    async fn test_end_to_end_with_known_session() {
        let repo = Arc::new(MockOtpSessionRepository::new());
        let mut session = OtpSession::new(PHONE, "482913");
        session.session_id = "s1".to_string();
        repo.replace_for_phone(&session).await.unwrap();
        let engine = VerificationEngine::new(repo, &otp_config());

        assert!(engine.verify("s1", "482913").await.is_ok());
        assert_eq!(engine.verify("s1", "482913").await, Err(OtpError::SessionNotFound));
    }

    #[tokio::test]
    async fn test_provider_flow_through_sms_channel() {
        let repo = Arc::new(MockOtpSessionRepository::new());
        let sms = Arc::new(RecordingSmsService::new());
        let provider: Arc<dyn OtpProvider> = Arc::new(CustomOtpProvider::new(
            repo.clone(),
            sms.clone(),
            &otp_config(),
            &rate_limit_config(),
        ));

        let handle = provider.send(PHONE).await.unwrap();
        let code = sms.last_code(PHONE).await.unwrap();

        let wrong = if code == "000000" { "111111" } else { "000000" };
        assert!(matches!(
            provider.verify(&handle.session_id, wrong).await,
            Err(OtpError::OtpMismatch { .. })
        ));
        assert!(provider.verify(&handle.session_id, &code).await.is_ok());
        assert_eq!(repo.count_by_phone(PHONE).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_new_request_invalidates_previous_code() {
        let repo = Arc::new(MockOtpSessionRepository::new());
        let lifecycle = SessionLifecycleManager::new(repo.clone(), &otp_config());
        let engine = VerificationEngine::new(repo.clone(), &otp_config());

        let first = lifecycle.create_or_replace(PHONE).await.unwrap();
        let second = lifecycle.create_or_replace(PHONE).await.unwrap();

        assert_eq!(
            engine.verify(&first.session_id, &first.otp).await,
            Err(OtpError::SessionNotFound)
        );
        assert!(engine.verify(&second.session_id, &second.otp).await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_creates_from_many_tasks() {
        let repo = Arc::new(MockOtpSessionRepository::new());
        let lifecycle = Arc::new(SessionLifecycleManager::new(repo.clone(), &otp_config()));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let lifecycle = lifecycle.clone();
            handles.push(tokio::spawn(async move {
                lifecycle.create_or_replace(PHONE).await
            }));
        }

        let mut issued = Vec::new();
        for handle in handles {
            issued.push(handle.await.unwrap().unwrap());
        }

        let stored = repo.sessions_for_phone(PHONE).await;
        assert_eq!(stored.len(), 1);
        assert!(issued.iter().any(|i| i.session_id == stored[0].session_id));
    }

    #[tokio::test]
    async fn test_sweeper_and_lazy_expiry_agree() {
        let repo = Arc::new(MockOtpSessionRepository::new());
        let stale = OtpSession::new(PHONE, "482913").with_created_at(Utc::now() - Duration::seconds(61));
        let stale_id = stale.session_id.clone();
        repo.insert_raw(stale).await;

        let sweeper = ExpirySweeper::new(
            repo.clone(),
            &otp_config(),
            &rate_limit_config(),
            SweeperConfig::default(),
        );
        assert_eq!(sweeper.sweep(1).await.unwrap(), 1);

        let engine = VerificationEngine::new(repo, &otp_config());
        assert_eq!(
            engine.verify(&stale_id, "482913").await,
            Err(OtpError::SessionNotFound)
        );
    }
}
