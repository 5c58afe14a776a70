use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Roles known to the portal. Serialized names double as route segments.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Student,
    Teacher,
    Admin,
}

impl UserRole {
    /// Derive a role from a free-text login identifier.
    ///
    /// Demo behavior only: there is no credential store behind it, so anyone can pick
    /// a role by choosing an identifier.
    pub fn infer(identifier: &str) -> Self {
        let identifier = identifier.to_lowercase();
        if identifier.contains("admin") {
            UserRole::Admin
        } else if identifier.contains("teacher") {
            UserRole::Teacher
        } else {
            UserRole::Student
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Teacher => "teacher",
            UserRole::Admin => "admin",
        }
    }

    pub fn dashboard_path(&self) -> String {
        format!("/{}/dashboard", self.as_str())
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "student" | "learner" => Ok(UserRole::Student),
            "teacher" | "instructor" => Ok(UserRole::Teacher),
            "admin" | "administrator" => Ok(UserRole::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub avatar: String,
    pub department: Option<String>,
    pub student_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Clone, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
    /// Where to go after a successful login. Only internal paths are honored.
    #[serde(default)]
    pub return_url: Option<String>,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            return_url: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
    #[validate(length(min = 1))]
    pub name: String,
    pub role: UserRole,
    pub department: Option<String>,
    pub student_id: Option<String>,
}

/// Local part of an email-like identifier with its first character upper-cased.
pub fn display_name_from_identifier(identifier: &str) -> String {
    let local = identifier.split('@').next().unwrap_or(identifier).trim();
    let mut chars = local.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn avatar_url(name: &str) -> String {
    format!("https://ui-avatars.com/api/?name={}&background=random", urlencoding::encode(name))
}

fn identity_id(email: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, email.trim().to_lowercase().as_bytes())
}

impl User {
    /// Build a deterministic identity from a login identifier.
    pub fn synthesize(identifier: &str) -> Self {
        let now = Utc::now();
        let role = UserRole::infer(identifier);
        let name = display_name_from_identifier(identifier);
        let id = identity_id(identifier);

        let department = match role {
            UserRole::Admin => "Administration",
            UserRole::Teacher | UserRole::Student => "Computer Science",
        };
        let student_id = (role == UserRole::Student).then(|| format!("STU{}", &id.simple().to_string()[..8].to_uppercase()));

        Self {
            id,
            email: identifier.trim().to_string(),
            avatar: avatar_url(&name),
            name,
            role,
            department: Some(department.to_string()),
            student_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn from_registration(request: &RegisterRequest) -> Self {
        let now = Utc::now();
        let student_id = match request.role {
            UserRole::Student => request.student_id.clone(),
            UserRole::Teacher | UserRole::Admin => None,
        };

        Self {
            id: identity_id(&request.email),
            email: request.email.trim().to_string(),
            name: request.name.trim().to_string(),
            role: request.role,
            avatar: avatar_url(request.name.trim()),
            department: request.department.clone(),
            student_id,
            created_at: now,
            updated_at: now,
        }
    }
}
