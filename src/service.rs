pub mod auth;
pub mod navigation;
pub mod notifier;
pub mod session_manager;
