//! Storefront - mutation backend for a small online shop
//!
//! Item create/update/delete, account signup/signin/signout and an
//! email-driven password reset, served over a JSON HTTP API.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
