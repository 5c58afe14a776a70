use crate::models::user::User;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// How long a session stays valid after login, regardless of activity.
pub const SESSION_DURATION_SECS: i64 = 24 * 60 * 60;

#[derive(Serialize, Debug, Copy, Clone, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unauthenticated,
    /// A login or registration is in flight. Never a resting state.
    Authenticating,
    Authenticated,
}

/// In-memory session held by the manager.
#[derive(Debug, Clone, Default)]
pub struct SessionData {
    pub user: Option<User>,
    pub login_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub loading: bool,
}

impl SessionData {
    pub fn expires_at(&self, duration: Duration) -> Option<DateTime<Utc>> {
        self.user
            .as_ref()
            .and(self.login_at)
            .map(|login_at| login_at.checked_add_signed(duration).unwrap_or(DateTime::<Utc>::MAX_UTC))
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>, duration: Duration) -> bool {
        self.expires_at(duration).is_some_and(|expires_at| now < expires_at)
    }

    pub fn state(&self, now: DateTime<Utc>, duration: Duration) -> SessionState {
        if self.loading {
            SessionState::Authenticating
        } else if self.is_valid_at(now, duration) {
            SessionState::Authenticated
        } else {
            SessionState::Unauthenticated
        }
    }

    pub fn snapshot(&self, now: DateTime<Utc>, duration: Duration) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state(now, duration),
            user: self.user.clone(),
            error_message: self.error_message.clone(),
            loading: self.loading,
            expires_at: self.expires_at(duration),
        }
    }
}

/// Read-only view of the session handed to observers.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub user: Option<User>,
    pub error_message: Option<String>,
    pub loading: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            state: SessionState::Unauthenticated,
            user: None,
            error_message: None,
            loading: false,
            expires_at: None,
        }
    }
}

/// What survives a restart: the identity and the instant the session began.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedSession {
    pub user: User,
    pub login_at: DateTime<Utc>,
}

impl PersistedSession {
    /// Time elapsed since login, or `None` when the stored instant lies in the future.
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        let age = now - self.login_at;
        (age >= Duration::zero()).then_some(age)
    }
}
