//! # Subida de Archivos
//! src/upload/mod.rs
//!
//! - `multipart`: parser streaming de `multipart/form-data`
//! - `handler`: guarda la parte `file` en el directorio destino

pub mod handler;
pub mod multipart;

pub use handler::{handle_upload, stored_filename, target_directory, UploadError, UploadResult};
pub use multipart::{Multipart, MultipartError};
