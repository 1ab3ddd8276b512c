//! # Handlers
//! src/handlers/mod.rs
//!
//! Un handler por método HTTP. Todos tienen la firma de
//! [`crate::router::Handler`]: reciben la configuración, el request y el
//! body todavía sin leer.

pub mod get;
pub mod post;

pub use get::{get_handler, head_handler};
pub use post::post_handler;
