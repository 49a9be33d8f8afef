//! Core types for Tanam.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod page;
pub mod price;

pub use email::{Email, EmailError};
pub use id::*;
pub use page::{PAGE_SIZE, Pagination};
pub use price::{Price, PriceError};
