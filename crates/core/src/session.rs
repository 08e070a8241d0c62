//! Session model: the currently authenticated identity.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Role attached to the denormalized profile snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Member,
    Admin,
}

/// Denormalized profile snapshot captured at login/registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

/// Bearer token plus profile snapshot. Exactly one session is active per
/// profile; overwritten on re-login, cleared on logout. The token alone is
/// cleared when the backend rejects it, so subsequent requests go out
/// unauthenticated while the profile keeps the UI populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: Option<String>,
    pub profile: UserProfile,
    pub logged_in_at: String,
}

impl Session {
    pub fn new(token: Option<String>, profile: UserProfile) -> Self {
        Self {
            token,
            profile,
            logged_in_at: Utc::now().to_rfc3339(),
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}
