//! Tanam Core - Shared domain types.
//!
//! This crate provides the types shared by the Tanam components:
//! - `api` - The marketplace HTTP API (auth, products, cart)
//! - `cli` - Command-line tools for migrations and throttle maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no cache clients. Pagination arithmetic lives here so that the
//! cache layer and the SQL layer agree on page boundaries.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, prices, and pagination

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
