// src/service/auth.rs

use crate::error::app_error::AppError;
use crate::models::user::{LoginRequest, RegisterRequest, User};
use std::time::Duration;
use tracing::debug;

/// Backend that turns credentials into an identity.
#[async_trait::async_trait]
pub trait AuthGateway: Send + Sync {
    async fn authenticate(&self, request: &LoginRequest) -> Result<User, AppError>;
    async fn register(&self, request: &RegisterRequest) -> Result<User, AppError>;
}

/// Stand-in backend: waits a fixed latency, then accepts any credentials.
///
/// Identities are synthesized from the identifier (see [`User::synthesize`]); no secret
/// is ever checked.
#[derive(Debug, Clone)]
pub struct MockAuthGateway {
    latency: Duration,
}

impl MockAuthGateway {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for MockAuthGateway {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait::async_trait]
impl AuthGateway for MockAuthGateway {
    async fn authenticate(&self, request: &LoginRequest) -> Result<User, AppError> {
        debug!(latency_ms = self.latency.as_millis() as u64, "simulating login round trip");
        tokio::time::sleep(self.latency).await;
        Ok(User::synthesize(&request.email))
    }

    async fn register(&self, request: &RegisterRequest) -> Result<User, AppError> {
        debug!(latency_ms = self.latency.as_millis() as u64, "simulating registration round trip");
        tokio::time::sleep(self.latency).await;
        Ok(User::from_registration(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserRole;

    #[tokio::test(start_paused = true)]
    async fn authenticate_waits_then_synthesizes() {
        let gateway = MockAuthGateway::default();
        let started = tokio::time::Instant::now();

        let user = gateway.authenticate(&LoginRequest::new("teacher@demo.com", "123456")).await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(1));
        assert_eq!(user.role, UserRole::Teacher);
        assert_eq!(user.name, "Teacher");
    }

    #[tokio::test(start_paused = true)]
    async fn register_keeps_requested_role() {
        let gateway = MockAuthGateway::new(Duration::from_millis(250));
        let request = RegisterRequest {
            email: "teacher.smith@demo.com".to_string(),
            password: "secret".to_string(),
            name: "Grace".to_string(),
            role: UserRole::Admin,
            department: None,
            student_id: None,
        };

        let user = gateway.register(&request).await.unwrap();
        assert_eq!(user.role, UserRole::Admin);
        assert_eq!(user.name, "Grace");
    }
}
