use serde::Serialize;
use std::fmt;

/// Category attached to error notices so the UI can decide how to present them.
#[derive(Serialize, Debug, Copy, Clone, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Authentication,
    Validation,
    Session,
    Storage,
    Navigation,
    Configuration,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Authentication => "authentication",
            ErrorKind::Validation => "validation",
            ErrorKind::Session => "session",
            ErrorKind::Storage => "storage",
            ErrorKind::Navigation => "navigation",
            ErrorKind::Configuration => "configuration",
        };
        f.write_str(name)
    }
}

/// Follow-up offered alongside a notice, e.g. "Log in again" pointing at the login route.
#[derive(Serialize, Debug, Clone, Eq, PartialEq)]
pub struct NoticeAction {
    pub label: String,
    pub route: String,
}

#[derive(Serialize, Debug, Clone, Eq, PartialEq)]
pub struct ErrorNotice {
    pub message: String,
    pub kind: ErrorKind,
    pub context: String,
    pub action: Option<NoticeAction>,
}

impl ErrorNotice {
    pub fn new(message: impl Into<String>, kind: ErrorKind, context: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            context: context.into(),
            action: None,
        }
    }

    pub fn with_action(mut self, label: impl Into<String>, route: impl Into<String>) -> Self {
        self.action = Some(NoticeAction {
            label: label.into(),
            route: route.into(),
        });
        self
    }
}
