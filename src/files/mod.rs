//! # Acceso al Directorio Servido
//! src/files/mod.rs
//!
//! - `resolve`: path del request → path dentro del directorio raíz
//! - `mime`: extensión → `Content-Type`
//! - `listing`: página HTML con el contenido de un directorio

pub mod listing;
pub mod mime;
pub mod resolve;

pub use listing::list;
pub use mime::guess_type;
pub use resolve::resolve;
