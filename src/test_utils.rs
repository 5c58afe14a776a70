use crate::config::SessionConfig;
use crate::error::app_error::AppError;
use crate::models::notification::ErrorNotice;
use crate::models::user::{LoginRequest, RegisterRequest, User, UserRole};
use crate::service::auth::{AuthGateway, MockAuthGateway};
use crate::service::navigation::{HistoryNavigator, Navigator};
use crate::service::notifier::Notifier;
use crate::service::session_manager::SessionManager;
use crate::storage::{KeyValueStore, MemoryStore, SessionRepository};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedNotice {
    Success { message: String, context: String },
    Warning { message: String, context: String },
    Error(ErrorNotice),
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<RecordedNotice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<RecordedNotice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn successes(&self) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter_map(|n| match n {
                RecordedNotice::Success { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter_map(|n| match n {
                RecordedNotice::Warning { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<ErrorNotice> {
        self.notices()
            .into_iter()
            .filter_map(|n| match n {
                RecordedNotice::Error(notice) => Some(notice),
                _ => None,
            })
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn show_success(&self, message: &str, context: &str) {
        self.notices.lock().unwrap().push(RecordedNotice::Success {
            message: message.to_string(),
            context: context.to_string(),
        });
    }

    fn show_warning(&self, message: &str, context: &str) {
        self.notices.lock().unwrap().push(RecordedNotice::Warning {
            message: message.to_string(),
            context: context.to_string(),
        });
    }

    fn add_error(&self, notice: ErrorNotice) {
        self.notices.lock().unwrap().push(RecordedNotice::Error(notice));
    }
}

pub struct FailingNavigator;

impl Navigator for FailingNavigator {
    fn navigate(&self, path: &str) -> Result<(), AppError> {
        Err(AppError::Navigation(path.to_string()))
    }
}

pub struct FailingGateway;

#[async_trait::async_trait]
impl AuthGateway for FailingGateway {
    async fn authenticate(&self, _request: &LoginRequest) -> Result<User, AppError> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Err(AppError::Authentication("backend unavailable".to_string()))
    }

    async fn register(&self, _request: &RegisterRequest) -> Result<User, AppError> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Err(AppError::Authentication("backend unavailable".to_string()))
    }
}

/// Store whose writes always fail, as a full disk would.
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get_item(&self, _key: &str) -> Result<Option<String>, AppError> {
        Ok(None)
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<(), AppError> {
        Err(AppError::storage("quota exceeded", std::io::Error::other("no space left")))
    }

    fn remove_item(&self, _key: &str) -> Result<(), AppError> {
        Ok(())
    }
}

pub fn test_config() -> SessionConfig {
    SessionConfig::default()
}

pub fn sample_registration(role: UserRole) -> RegisterRequest {
    RegisterRequest {
        email: "new.user@demo.com".to_string(),
        password: "hunter22".to_string(),
        name: "New User".to_string(),
        role,
        department: Some("Physics".to_string()),
        student_id: Some("STU-0042".to_string()),
    }
}

/// A manager wired to in-memory fakes, with handles on every collaborator.
pub struct TestSession {
    pub manager: SessionManager,
    pub store: Arc<MemoryStore>,
    pub repository: SessionRepository,
    pub notifier: Arc<RecordingNotifier>,
    pub navigator: Arc<HistoryNavigator>,
}

pub fn test_session() -> TestSession {
    test_session_with(test_config(), None)
}

pub fn test_session_with(config: SessionConfig, gateway: Option<Arc<dyn AuthGateway>>) -> TestSession {
    let store = Arc::new(MemoryStore::new());
    let repository = SessionRepository::new(store.clone());
    let notifier = Arc::new(RecordingNotifier::default());
    let navigator = Arc::new(HistoryNavigator::new());
    let gateway = gateway.unwrap_or_else(|| Arc::new(MockAuthGateway::new(config.simulated_latency())));

    let manager = SessionManager::new(config, repository.clone(), gateway, notifier.clone(), navigator.clone());

    TestSession {
        manager,
        store,
        repository,
        notifier,
        navigator,
    }
}
