use crate::error::app_error::AppError;
use regex::Regex;
use std::sync::{LazyLock, Mutex, PoisonError};
use tracing::{debug, info};

static SCHEME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("valid scheme pattern"));

pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str) -> Result<(), AppError>;
}

/// Accepts an externally supplied redirect target only when it is an internal,
/// scheme-less path. The value is percent-decoded before it is checked.
pub fn safe_redirect(raw: &str) -> Option<String> {
    let decoded = urlencoding::decode(raw.trim()).ok()?;
    let path = decoded.trim();

    if !path.starts_with('/') || path.contains("//") || path.contains('\\') || SCHEME.is_match(path) {
        return None;
    }
    if path.chars().any(char::is_control) {
        return None;
    }

    Some(path.to_string())
}

/// [`safe_redirect`] with a fallback; rejected targets are dropped silently.
pub fn resolve_redirect(raw: Option<&str>, fallback: &str) -> String {
    match raw {
        Some(raw) => safe_redirect(raw).unwrap_or_else(|| {
            debug!(target_url = %raw, "rejected unsafe redirect target");
            fallback.to_string()
        }),
        None => fallback.to_string(),
    }
}

/// In-process router that records every route it was sent to.
#[derive(Debug, Default)]
pub struct HistoryNavigator {
    history: Mutex<Vec<String>>,
}

impl HistoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<String> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).last().cloned()
    }

    pub fn history(&self) -> Vec<String> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Navigator for HistoryNavigator {
    fn navigate(&self, path: &str) -> Result<(), AppError> {
        if safe_redirect(path).is_none() {
            return Err(AppError::Navigation(path.to_string()));
        }
        info!(route = %path, "navigated");
        self.history.lock().unwrap_or_else(PoisonError::into_inner).push(path.to_string());
        Ok(())
    }
}
