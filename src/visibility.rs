//! Visibility policy: write-time classification of a document and the read-time
//! decision whether a search must be restricted to PUBLIC records.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::identity::Authorizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    Public,
    Private,
    Personal,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "PUBLIC",
            Visibility::Private => "PRIVATE",
            Visibility::Personal => "PERSONAL",
        }
    }

    pub fn parse(s: &str) -> AppResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PUBLIC" => Ok(Visibility::Public),
            "PRIVATE" => Ok(Visibility::Private),
            "PERSONAL" => Ok(Visibility::Personal),
            other => Err(AppError::validation("unknown_visibility".to_string(), format!("unknown visibility '{}'", other))),
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

/// Classify a new record.
///
/// PUBLIC only on explicit request by a library admin or higher. Without a request,
/// records written into the caller's home library are PERSONAL, anything else PRIVATE.
pub fn assign_visibility(
    authz: &Authorizer,
    requestor: &str,
    home_library: Option<&str>,
    target_library: &str,
    requested: Option<Visibility>,
) -> AppResult<Visibility> {
    match requested {
        Some(Visibility::Public) => {
            if authz.is_lib_admin(target_library, requestor) || authz.is_db_admin(requestor) {
                Ok(Visibility::Public)
            } else {
                Err(AppError::forbidden(
                    "public_requires_admin".to_string(),
                    format!("'{}' may not publish into '{}'", requestor, target_library),
                ))
            }
        }
        Some(v) => Ok(v),
        None => {
            if home_library == Some(target_library) {
                Ok(Visibility::Personal)
            } else {
                Ok(Visibility::Private)
            }
        }
    }
}

/// Whether a search over `scope` by `requestor` must only see PUBLIC records.
///
/// Database admins and anyone holding admin, author or reader on the scope see
/// everything; for a wildcard scope the grant must itself span the wildcard.
pub fn needs_public_filter(authz: &Authorizer, scope: &str, requestor: &str) -> bool {
    if authz.is_db_admin(requestor) {
        return false;
    }
    !authz.is_lib_reader(scope, requestor)
}

/// Post-query guard applied to every row the backend returns.
pub fn is_visible(visibility: Visibility, public_only: bool) -> bool {
    !public_only || visibility == Visibility::Public
}
