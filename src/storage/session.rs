use crate::error::app_error::AppError;
use crate::models::session::PersistedSession;
use crate::models::user::User;
use crate::storage::KeyValueStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::warn;

pub const USER_KEY: &str = "lms.current_user";
pub const LOGIN_TIME_KEY: &str = "lms.login_time";

/// Reads and writes the two keys that let a session survive a restart.
#[derive(Clone)]
pub struct SessionRepository {
    store: Arc<dyn KeyValueStore>,
}

impl SessionRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn save(&self, user: &User, login_at: DateTime<Utc>) -> Result<(), AppError> {
        let blob = serde_json::to_string(user).map_err(|e| AppError::serialization("Failed to serialize user", e))?;
        self.store.set_item(USER_KEY, &blob)?;
        self.store.set_item(LOGIN_TIME_KEY, &login_at.timestamp_millis().to_string())?;
        Ok(())
    }

    /// `Ok(None)` when nothing (or only half a session) is stored.
    pub fn load(&self) -> Result<Option<PersistedSession>, AppError> {
        let blob = self.store.get_item(USER_KEY)?;
        let login_time = self.store.get_item(LOGIN_TIME_KEY)?;

        let (blob, login_time) = match (blob, login_time) {
            (Some(blob), Some(login_time)) => (blob, login_time),
            (None, None) => return Ok(None),
            _ => {
                warn!("incomplete persisted session found");
                return Ok(None);
            }
        };

        let user: User = serde_json::from_str(&blob).map_err(|e| AppError::corrupt_session(format!("unreadable user blob: {}", e)))?;
        let millis: i64 = login_time
            .trim()
            .parse()
            .map_err(|_| AppError::corrupt_session(format!("unreadable login time '{}'", login_time)))?;
        let login_at =
            DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| AppError::corrupt_session(format!("login time {} out of range", millis)))?;

        Ok(Some(PersistedSession { user, login_at }))
    }

    /// Removes both keys. Attempts the second removal even when the first fails.
    pub fn clear(&self) -> Result<(), AppError> {
        let user = self.store.remove_item(USER_KEY);
        let login_time = self.store.remove_item(LOGIN_TIME_KEY);
        user.and(login_time)
    }
}
