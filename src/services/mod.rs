//! Services layer - Business logic
//!
//! Credential hashing, session and reset tokens, outgoing mail, and the
//! mutation service that ties them to the repositories.

pub mod mail;
pub mod mutation;
pub mod password;
pub mod token;

pub use mail::{make_a_nice_email, MailMessage, MailTransport, SmtpMailTransport};
pub use mutation::{AuthPayload, Message, MutationError, MutationService};
pub use password::{hash_password, verify_password};
pub use token::{generate_reset_token, SessionClaims, TokenError, TokenIssuer};
