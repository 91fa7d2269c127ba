//! Mutation service
//!
//! Every write the storefront performs goes through here: item
//! create/update/delete, account signup and signin, signout, and the
//! password reset flow (request a token by email, then redeem it).
//!
//! Items carry no owner, so item mutations are not authorized against the
//! caller.

use crate::db::repositories::{is_unique_violation, ItemRepository, UserRepository};
use crate::models::{
    CreateItemInput, Item, Permission, ResetPasswordInput, SigninInput, SignupInput,
    UpdateItemInput, User,
};
use crate::services::mail::{make_a_nice_email, MailMessage, MailTransport};
use crate::services::password::{hash_password, verify_password};
use crate::services::token::{generate_reset_token, TokenIssuer};
use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

/// How long a reset token stays redeemable
const RESET_TOKEN_TTL_HOURS: i64 = 1;

const RESET_EMAIL_SUBJECT: &str = "Your Password Reset Token";

/// Error types for mutation operations
#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    #[error("No user found for email {0}")]
    UserNotFound(String),

    #[error("Item {0} not found")]
    ItemNotFound(i64),

    #[error("Invalid Password")]
    InvalidPassword,

    #[error("Passwords don't match")]
    PasswordMismatch,

    #[error("This token is either expired or invalid")]
    InvalidResetToken,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    /// Persistence, hashing, signing or mail failure
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// A user together with a freshly signed session token
#[derive(Debug, Clone, Serialize)]
pub struct AuthPayload {
    pub user: User,
    #[serde(skip)]
    pub token: String,
}

/// Plain acknowledgement body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Service for every storefront mutation
pub struct MutationService {
    user_repo: Arc<dyn UserRepository>,
    item_repo: Arc<dyn ItemRepository>,
    tokens: TokenIssuer,
    mailer: Arc<dyn MailTransport>,
    frontend_url: String,
    mail_from: String,
}

impl MutationService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        item_repo: Arc<dyn ItemRepository>,
        tokens: TokenIssuer,
        mailer: Arc<dyn MailTransport>,
        frontend_url: impl Into<String>,
        mail_from: impl Into<String>,
    ) -> Self {
        Self {
            user_repo,
            item_repo,
            tokens,
            mailer,
            frontend_url: frontend_url.into(),
            mail_from: mail_from.into(),
        }
    }

    /// Persist a new item from the supplied fields
    pub async fn create_item(&self, input: CreateItemInput) -> Result<Item, MutationError> {
        let item = self.item_repo.create(&Item::new(input)).await?;
        tracing::info!("Created item {} ({})", item.id, item.title);
        Ok(item)
    }

    /// Overwrite the supplied fields of item `id`
    pub async fn update_item(
        &self,
        id: i64,
        input: UpdateItemInput,
    ) -> Result<Item, MutationError> {
        let mut item = self
            .item_repo
            .get_by_id(id)
            .await?
            .ok_or(MutationError::ItemNotFound(id))?;

        item.apply(input);
        Ok(self.item_repo.update(&item).await?)
    }

    /// Delete item `id`, returning it as it was before removal
    pub async fn delete_item(&self, id: i64) -> Result<Item, MutationError> {
        let item = self
            .item_repo
            .get_by_id(id)
            .await?
            .ok_or(MutationError::ItemNotFound(id))?;

        if !self.item_repo.delete(id).await? {
            return Err(MutationError::ItemNotFound(id));
        }

        tracing::info!("Deleted item {}", id);
        Ok(item)
    }

    /// Register a new account with the `USER` permission and sign it in.
    ///
    /// The email is stored lowercased.
    pub async fn signup(&self, input: SignupInput) -> Result<AuthPayload, MutationError> {
        let email = normalize_email(&input.email);
        if email.is_empty() {
            return Err(MutationError::Validation("Email cannot be empty".to_string()));
        }
        if input.password.is_empty() {
            return Err(MutationError::Validation(
                "Password cannot be empty".to_string(),
            ));
        }

        if self.user_repo.get_by_email(&email).await?.is_some() {
            return Err(MutationError::UserExists(email));
        }

        let password_hash = hash_password(&input.password)?;
        let user = User::new(
            input.name.trim().to_string(),
            email.clone(),
            password_hash,
            vec![Permission::User],
        );
        // A concurrent signup can win between the lookup and the insert
        let user = match self.user_repo.create(&user).await {
            Ok(user) => user,
            Err(e) if is_unique_violation(&e) => return Err(MutationError::UserExists(email)),
            Err(e) => return Err(e.context("Failed to create user").into()),
        };

        tracing::info!("User {} signed up", user.id);
        self.authenticate(user)
    }

    /// Check credentials and sign the user in
    pub async fn signin(&self, input: SigninInput) -> Result<AuthPayload, MutationError> {
        let email = normalize_email(&input.email);
        let user = self
            .user_repo
            .get_by_email(&email)
            .await?
            .ok_or_else(|| MutationError::UserNotFound(input.email.clone()))?;

        if !verify_password(&input.password, &user.password_hash)? {
            tracing::warn!("Failed signin for user {}", user.id);
            return Err(MutationError::InvalidPassword);
        }

        tracing::info!("User {} signed in", user.id);
        self.authenticate(user)
    }

    /// Acknowledge a signout; the caller drops the session cookie
    pub fn signout(&self) -> Message {
        Message::new("Goodbye!")
    }

    /// Issue a reset token for `email` and mail the reset link to the user
    pub async fn request_reset(&self, email: &str) -> Result<Message, MutationError> {
        let normalized = normalize_email(email);
        let user = self
            .user_repo
            .get_by_email(&normalized)
            .await?
            .ok_or_else(|| MutationError::UserNotFound(email.to_string()))?;

        let reset_token = generate_reset_token()?;
        let expiry = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);
        self.user_repo
            .set_reset_token(&user.email, &reset_token, expiry)
            .await?;

        let link = format!(
            "{}/reset?resetToken={}",
            self.frontend_url.trim_end_matches('/'),
            urlencoding::encode(&reset_token)
        );
        let html = make_a_nice_email(&format!(
            "Your password Reset Token is here!\n\n<a href=\"{}\">Click Here to reset</a>",
            link
        ))?;

        self.mailer
            .send_mail(MailMessage {
                from: self.mail_from.clone(),
                to: user.email.clone(),
                subject: RESET_EMAIL_SUBJECT.to_string(),
                html,
            })
            .await?;

        tracing::info!("Password reset requested for user {}", user.id);
        Ok(Message::new("Thanks!"))
    }

    /// Redeem a reset token, set the new password and sign the user in
    pub async fn reset_password(
        &self,
        input: ResetPasswordInput,
    ) -> Result<AuthPayload, MutationError> {
        if input.password != input.confirm_password {
            return Err(MutationError::PasswordMismatch);
        }

        let not_before = Utc::now() - Duration::hours(RESET_TOKEN_TTL_HOURS);
        let user = self
            .user_repo
            .find_by_reset_token(&input.reset_token, not_before)
            .await?
            .ok_or(MutationError::InvalidResetToken)?;

        let password_hash = hash_password(&input.password)?;
        let user = self.user_repo.update_password(user.id, &password_hash).await?;

        tracing::info!("User {} reset their password", user.id);
        self.authenticate(user)
    }

    /// Resolve a session token to its user.
    ///
    /// Bad signatures and tokens naming a vanished user both yield `None`.
    pub async fn current_user(&self, token: &str) -> Result<Option<User>, MutationError> {
        let claims = match self.tokens.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!("Ignoring session token: {}", e);
                return Ok(None);
            }
        };

        Ok(self.user_repo.get_by_id(claims.user_id).await?)
    }

    fn authenticate(&self, user: User) -> Result<AuthPayload, MutationError> {
        let token = self.tokens.issue(user.id)?;
        Ok(AuthPayload { user, token })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// Normalised emails are lowercase and idempotent
        #[test]
        fn normalize_email_is_lowercase_and_stable(
            local in "[a-zA-Z0-9._]{1,12}",
            domain in "[a-zA-Z]{2,10}",
            pad in " {0,3}",
        ) {
            let raw = format!("{pad}{local}@{domain}.COM{pad}");
            let normalized = normalize_email(&raw);

            prop_assert_eq!(&normalized, &normalized.to_lowercase());
            prop_assert_eq!(normalize_email(&normalized), normalized.clone());
            prop_assert!(!normalized.starts_with(' ') && !normalized.ends_with(' '));
        }
    }
}
