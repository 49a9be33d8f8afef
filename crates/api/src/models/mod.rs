//! Domain models for the marketplace API.
//!
//! Field names on the wire follow the mobile client's JSON contract
//! (`product_name`, `user_email`, ...), so most fields carry a serde rename.

pub mod cart;
pub mod product;
pub mod user;

pub use cart::CartItem;
pub use product::{NewProduct, Product};
pub use user::User;
