use crate::config::SessionConfig;
use crate::error::app_error::AppError;
use crate::models::notification::{ErrorKind, ErrorNotice};
use crate::models::session::{SessionData, SessionSnapshot, SessionState};
use crate::models::user::{LoginRequest, RegisterRequest, User, UserRole};
use crate::service::auth::{AuthGateway, MockAuthGateway};
use crate::service::navigation::{Navigator, resolve_redirect};
use crate::service::notifier::Notifier;
use crate::storage::{KeyValueStore, SessionRepository};
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use validator::Validate;

const EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

/// Single source of truth for who is logged in.
///
/// Construct one per client at startup, call [`restore_from_persisted_state`](Self::restore_from_persisted_state)
/// once, and hand clones to whatever needs to read or change the session. Each mutating
/// operation writes through to storage before it returns. A session ends on explicit
/// [`logout`](Self::logout) or when its fixed window elapses; the latter is enforced by a
/// single background task per session.
///
/// Timer scheduling uses the ambient Tokio runtime.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

struct Inner {
    config: SessionConfig,
    repository: SessionRepository,
    gateway: Arc<dyn AuthGateway>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    data: Mutex<SessionData>,
    timer: Mutex<ExpiryTimer>,
    changes: watch::Sender<SessionSnapshot>,
}

/// The pending auto-logout. `generation` changes on every cancel so a task that already
/// woke up cannot end a session it was not scheduled for.
#[derive(Default)]
struct ExpiryTimer {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl ExpiryTimer {
    fn cancel(&mut self) {
        self.generation += 1;
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Teardown {
    Logout,
    /// Fired by the expiry task scheduled under this generation.
    Expired(u64),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionManager {
    pub fn new(
        config: SessionConfig,
        repository: SessionRepository,
        gateway: Arc<dyn AuthGateway>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (changes, _) = watch::channel(SessionSnapshot::default());

        Self {
            inner: Arc::new(Inner {
                config,
                repository,
                gateway,
                notifier,
                navigator,
                data: Mutex::new(SessionData::default()),
                timer: Mutex::new(ExpiryTimer::default()),
                changes,
            }),
        }
    }

    /// Manager backed by [`MockAuthGateway`] with the configured latency.
    pub fn with_mock_gateway(config: SessionConfig, store: Arc<dyn KeyValueStore>, notifier: Arc<dyn Notifier>, navigator: Arc<dyn Navigator>) -> Self {
        let gateway = Arc::new(MockAuthGateway::new(config.simulated_latency()));
        Self::new(config, SessionRepository::new(store), gateway, notifier, navigator)
    }

    /// Bring back a session saved by a previous run. Never fails: problems become notices.
    ///
    /// Meant to run once at startup. If nothing valid is stored, any session already held
    /// in memory is dropped as well.
    pub fn restore_from_persisted_state(&self) {
        let inner = &self.inner;
        let now = Utc::now();
        let duration = inner.config.duration();

        let persisted = match inner.repository.load() {
            Ok(Some(persisted)) => persisted,
            Ok(None) => {
                debug!("no persisted session to restore");
                inner.discard_session();
                return;
            }
            Err(e) => {
                warn!(error = %e, "discarding unreadable persisted session");
                inner.discard_session();
                inner.notifier.add_error(ErrorNotice::new(
                    "Your saved session could not be read and has been cleared. Please log in again.",
                    ErrorKind::from(&e),
                    "session restore",
                ));
                return;
            }
        };

        let Some(age) = persisted.age(now) else {
            warn!(login_at = %persisted.login_at, "discarding persisted session with a login time in the future");
            inner.discard_session();
            inner.notifier.add_error(ErrorNotice::new(
                "Your saved session was invalid and has been cleared. Please log in again.",
                ErrorKind::Session,
                "session restore",
            ));
            return;
        };

        if age >= duration {
            info!(user_id = %persisted.user.id, age_secs = age.num_seconds(), "persisted session expired");
            inner.discard_session();
            inner.notifier.show_warning(EXPIRED_MESSAGE, "session restore");
            return;
        }

        let mut data = lock(&inner.data);
        if let Err(e) = inner.repository.save(&persisted.user, persisted.login_at) {
            warn!(error = %e, "failed to rewrite restored session");
        }
        info!(user_id = %persisted.user.id, role = %persisted.user.role, "session restored");
        data.user = Some(persisted.user);
        data.login_at = Some(persisted.login_at);
        data.error_message = None;
        inner.schedule_expiry(duration - age);
        inner.publish(&data);
    }

    pub async fn login(&self, request: LoginRequest) -> Result<User, AppError> {
        let outcome = {
            let _loading = LoadingGuard::begin(&self.inner);
            match request.validate() {
                Ok(()) => match self.inner.gateway.authenticate(&request).await {
                    Ok(user) => self.inner.establish(user),
                    Err(e) => Err(e),
                },
                Err(e) => Err(e.into()),
            }
        };

        match outcome {
            Ok(user) => {
                info!(user_id = %user.id, role = %user.role, "user logged in");
                self.inner.notifier.show_success(&format!("Welcome back, {}!", user.name), "login");
                let target = resolve_redirect(request.return_url.as_deref(), &user.role.dashboard_path());
                self.inner.redirect(&target, "login");
                Ok(user)
            }
            Err(e) => Err(self.inner.fail(e, "login")),
        }
    }

    /// Like [`login`](Self::login), but identity fields come from the request and the caller
    /// decides where to navigate afterwards.
    pub async fn register(&self, request: RegisterRequest) -> Result<User, AppError> {
        let outcome = {
            let _loading = LoadingGuard::begin(&self.inner);
            match request.validate() {
                Ok(()) => match self.inner.gateway.register(&request).await {
                    Ok(user) => self.inner.establish(user),
                    Err(e) => Err(e),
                },
                Err(e) => Err(e.into()),
            }
        };

        match outcome {
            Ok(user) => {
                info!(user_id = %user.id, role = %user.role, "user registered");
                self.inner.notifier.show_success(&format!("Welcome, {}! Your account has been created.", user.name), "register");
                Ok(user)
            }
            Err(e) => Err(self.inner.fail(e, "register")),
        }
    }

    pub fn logout(&self) {
        self.inner.teardown(Teardown::Logout);
    }

    pub fn clear_error(&self) {
        let mut data = lock(&self.inner.data);
        data.error_message = None;
        self.inner.publish(&data);
    }

    /// Stop the expiry task without ending the session, e.g. on application shutdown.
    /// Persisted state is left in place so the next start can restore it.
    pub fn dispose(&self) {
        let _data = lock(&self.inner.data);
        lock(&self.inner.timer).cancel();
        debug!("session manager disposed");
    }

    pub fn is_authenticated(&self) -> bool {
        lock(&self.inner.data).is_valid_at(Utc::now(), self.inner.config.duration())
    }

    pub fn current_user(&self) -> Option<User> {
        let data = lock(&self.inner.data);
        if data.is_valid_at(Utc::now(), self.inner.config.duration()) { data.user.clone() } else { None }
    }

    pub fn role(&self) -> Option<UserRole> {
        self.current_user().map(|user| user.role)
    }

    pub fn display_name(&self) -> Option<String> {
        self.current_user().map(|user| user.name)
    }

    pub fn email(&self) -> Option<String> {
        self.current_user().map(|user| user.email)
    }

    pub fn has_role(&self, role: UserRole) -> bool {
        self.role() == Some(role)
    }

    pub fn has_any_role(&self, roles: &[UserRole]) -> bool {
        self.role().is_some_and(|role| roles.contains(&role))
    }

    pub fn error_message(&self) -> Option<String> {
        lock(&self.inner.data).error_message.clone()
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.inner.data).loading
    }

    pub fn state(&self) -> SessionState {
        lock(&self.inner.data).state(Utc::now(), self.inner.config.duration())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        lock(&self.inner.data).expires_at(self.inner.config.duration())
    }

    /// Time left before the session is forcibly ended.
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at().map(|expires_at| expires_at - Utc::now()).filter(|left| *left > Duration::zero())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        lock(&self.inner.data).snapshot(Utc::now(), self.inner.config.duration())
    }

    /// Observe session changes. The receiver starts at the current snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.changes.subscribe()
    }
}

impl Inner {
    fn publish(&self, data: &SessionData) {
        self.changes.send_replace(data.snapshot(Utc::now(), self.config.duration()));
    }

    /// Persist first, then commit: if storage refuses the write the previous session stays.
    fn establish(self: &Arc<Self>, user: User) -> Result<User, AppError> {
        // Storage keeps millisecond precision; keep memory identical to it.
        let now = Utc::now();
        let login_at = DateTime::<Utc>::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now);
        let mut data = lock(&self.data);

        if let Err(e) = self.repository.save(&user, login_at) {
            let rollback = match (&data.user, data.login_at) {
                (Some(previous), Some(previous_login_at)) => self.repository.save(previous, previous_login_at),
                _ => self.repository.clear(),
            };
            if let Err(rollback_error) = rollback {
                warn!(error = %rollback_error, "failed to roll back persisted session");
            }
            return Err(e);
        }

        data.user = Some(user.clone());
        data.login_at = Some(login_at);
        data.error_message = None;
        self.schedule_expiry(self.config.duration());
        self.publish(&data);

        Ok(user)
    }

    /// Caller must hold the `data` lock; lock order is always `data` then `timer`.
    fn schedule_expiry(self: &Arc<Self>, after: Duration) {
        let mut timer = lock(&self.timer);
        timer.cancel();
        let generation = timer.generation;
        let delay = after.to_std().unwrap_or(std::time::Duration::ZERO);

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!("no async runtime available; session expiry will only be checked on access");
                return;
            }
        };

        let weak: Weak<Inner> = Arc::downgrade(self);
        timer.handle = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.teardown(Teardown::Expired(generation));
            }
        }));
        debug!(generation, delay_secs = delay.as_secs(), "session expiry scheduled");
    }

    fn teardown(&self, reason: Teardown) {
        let user_id = {
            let mut data = lock(&self.data);
            {
                let mut timer = lock(&self.timer);
                match reason {
                    Teardown::Logout => timer.cancel(),
                    Teardown::Expired(generation) if generation == timer.generation => {
                        // Detach rather than abort: the expiry task is the one running this.
                        timer.handle.take();
                        timer.generation += 1;
                    }
                    Teardown::Expired(generation) => {
                        debug!(generation, "stale expiry timer ignored");
                        return;
                    }
                }
            }
            if let Err(e) = self.repository.clear() {
                warn!(error = %e, "failed to clear persisted session");
            }
            let user_id = data.user.take().map(|user| user.id);
            data.login_at = None;
            data.error_message = None;
            self.publish(&data);
            user_id
        };

        match reason {
            Teardown::Logout => {
                info!(user_id = ?user_id, "user logged out");
                self.notifier.show_success("You have been logged out.", "logout");
                self.redirect(&self.config.login_route, "logout");
            }
            Teardown::Expired(_) => {
                warn!(user_id = ?user_id, "session expired");
                self.notifier.add_error(
                    ErrorNotice::new(EXPIRED_MESSAGE, ErrorKind::Session, "session timeout").with_action("Log in again", self.config.login_route.clone()),
                );
                self.redirect(&self.config.login_route, "session timeout");
            }
        }
    }

    fn redirect(&self, target: &str, context: &str) {
        let Err(e) = self.navigator.navigate(target) else {
            return;
        };

        warn!(error = %e, route = %target, context = %context, "navigation failed");
        self.notifier.add_error(ErrorNotice::new(format!("Could not open {}", target), ErrorKind::Navigation, context));

        let home = &self.config.home_route;
        if target != home.as_str()
            && let Err(e) = self.navigator.navigate(home)
        {
            warn!(error = %e, route = %home, context = %context, "fallback navigation failed");
        }
    }

    /// Clears storage and any in-memory session so both agree that nobody is logged in.
    fn discard_session(&self) {
        let mut data = lock(&self.data);
        lock(&self.timer).cancel();
        if let Err(e) = self.repository.clear() {
            warn!(error = %e, "failed to clear persisted session");
        }
        if let Some(user) = data.user.take() {
            debug!(user_id = %user.id, "in-memory session dropped during restore");
            data.login_at = None;
            self.publish(&data);
        }
    }

    fn fail(&self, e: AppError, context: &str) -> AppError {
        let message = e.to_string();
        {
            let mut data = lock(&self.data);
            data.error_message = Some(message.clone());
            self.publish(&data);
        }
        error!(error = ?e, context = %context, "session operation failed");
        self.notifier.add_error(ErrorNotice::new(message, ErrorKind::from(&e), context));
        e
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let timer = self.timer.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = timer.handle.take() {
            handle.abort();
        }
    }
}

/// Raises the loading flag for the lifetime of an in-flight login or registration,
/// including when the caller drops the future early.
struct LoadingGuard<'a> {
    inner: &'a Inner,
}

impl<'a> LoadingGuard<'a> {
    fn begin(inner: &'a Inner) -> Self {
        let mut data = lock(&inner.data);
        data.loading = true;
        data.error_message = None;
        inner.publish(&data);
        Self { inner }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut data = lock(&self.inner.data);
        data.loading = false;
        self.inner.publish(&data);
    }
}
