//! Data models
//!
//! Database entities (User, Item) and the inputs accepted by the mutation service.

mod item;
mod user;

pub use item::{CreateItemInput, Item, UpdateItemInput};
pub use user::{Permission, ResetPasswordInput, SigninInput, SignupInput, User};
