use crate::models::notification::ErrorNotice;
use tracing::{error, info, warn};

/// Where the session manager reports outcomes. It never renders anything itself.
pub trait Notifier: Send + Sync {
    fn show_success(&self, message: &str, context: &str);
    fn show_warning(&self, message: &str, context: &str);
    fn add_error(&self, notice: ErrorNotice);
}

/// Reports notices as tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn show_success(&self, message: &str, context: &str) {
        info!(context = %context, "{}", message);
    }

    fn show_warning(&self, message: &str, context: &str) {
        warn!(context = %context, "{}", message);
    }

    fn add_error(&self, notice: ErrorNotice) {
        error!(
            context = %notice.context,
            kind = %notice.kind,
            action = ?notice.action.as_ref().map(|a| a.route.as_str()),
            "{}",
            notice.message
        );
    }
}
