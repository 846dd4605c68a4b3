use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Author,
    Reader,
    Reviewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Author => "AUTHOR",
            Role::Reader => "READER",
            Role::Reviewer => "REVIEWER",
        }
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "AUTHOR" => Ok(Role::Author),
            "READER" => Ok(Role::Reader),
            "REVIEWER" => Ok(Role::Reviewer),
            other => Err(AppError::validation("unknown_role".to_string(), format!("unknown role '{}'", other))),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

/// Request verbs checked by the authorization engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
    /// Workflow review actions; satisfied by REVIEWER or library admin.
    Review,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
            Verb::Review => "REVIEW",
        }
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Verb::Get),
            "POST" => Ok(Verb::Post),
            "PUT" => Ok(Verb::Put),
            "DELETE" => Ok(Verb::Delete),
            "REVIEW" => Ok(Verb::Review),
            other => Err(AppError::validation("unknown_verb".to_string(), format!("unknown verb '{}'", other))),
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LibraryKind {
    User,
    Collective,
}

/// A registered tenant namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    pub name: String,
    pub kind: LibraryKind,
    /// COLLECTIVE libraries may be readable by everyone.
    #[serde(default)]
    pub public_read: bool,
}

impl Library {
    pub fn user(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: LibraryKind::User, public_read: false }
    }
    pub fn collective(name: impl Into<String>, public_read: bool) -> Self {
        Self { name: name.into(), kind: LibraryKind::Collective, public_read }
    }
    pub fn is_globally_readable(&self) -> bool {
        self.kind == LibraryKind::Collective && self.public_read
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    /// The caller's own library; writes into it default to PERSONAL visibility.
    pub home_library: String,
    #[serde(default)]
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub role: Role,
    pub library: String,
    pub username: String,
    pub granted_by: String,
    pub granted_when: DateTime<Utc>,
}
