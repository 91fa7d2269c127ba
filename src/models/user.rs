//! User model
//!
//! Users own a password hash, a set of permission labels and, while a
//! password reset is pending, a reset token with its expiry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered storefront customer or staff member.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Email address (unique, lowercased)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Granted permission labels
    pub permissions: Vec<Permission>,
    /// Pending password reset token
    #[serde(skip_serializing, default)]
    pub reset_token: Option<String>,
    /// When the pending reset token was issued to expire
    #[serde(skip_serializing, default)]
    pub reset_token_expiry: Option<DateTime<Utc>>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new User.
    ///
    /// The password must already be hashed, see `services::password::hash_password()`.
    pub fn new(
        name: String,
        email: String,
        password_hash: String,
        permissions: Vec<Permission>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            name,
            email,
            password_hash,
            permissions,
            reset_token: None,
            reset_token_expiry: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Coarse role label attached to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Permission {
    Admin,
    /// Default label granted on signup
    User,
    ItemCreate,
    ItemUpdate,
    ItemDelete,
    PermissionUpdate,
}

/// Input for signing up (before password hashing)
#[derive(Debug, Clone, Deserialize)]
pub struct SignupInput {
    #[serde(default)]
    pub name: String,
    pub email: String,
    /// Plaintext password (will be hashed)
    pub password: String,
}

impl SignupInput {
    pub fn new(name: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Input for signing in
#[derive(Debug, Clone, Deserialize)]
pub struct SigninInput {
    pub email: String,
    pub password: String,
}

impl SigninInput {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Input for completing a password reset
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordInput {
    pub password: String,
    pub confirm_password: String,
    pub reset_token: String,
}
