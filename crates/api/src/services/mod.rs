//! Business logic services.
//!
//! # Services
//!
//! - `throttle` - Login attempt limiting
//! - `catalog` - Product listing with a cache-aside page cache
//! - `auth` - Registration, email verification, and login
//! - `tokens` - Session JWTs
//! - `uploads` - Product image storage
//! - `notify` - Verification and reset webhooks

pub mod auth;
pub mod catalog;
pub mod notify;
pub mod throttle;
pub mod tokens;
pub mod uploads;
