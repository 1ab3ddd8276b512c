//! # Tipos MIME
//! src/files/mime.rs
//!
//! Asocia la extensión de un archivo con su `Content-Type`.
//! Primero se consultan los overrides propios (código fuente como
//! `text/plain`, para que el navegador lo muestre en vez de descargarlo),
//! luego la tabla estándar de `mime_guess`.

use std::path::Path;

/// Tipo usado cuando la extensión es desconocida o no existe
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Extensiones que se sirven como texto plano
const TEXT_OVERRIDES: &[&str] = &[
    "c", "cc", "cfg", "cpp", "go", "h", "hpp", "ini", "java", "log", "md", "py", "rs", "sh",
    "toml",
];

/// Adivina el `Content-Type` de un archivo a partir de su extensión
///
/// La comparación no distingue mayúsculas.
///
/// # Ejemplo
/// ```
/// use std::path::Path;
/// use upload_server::files::guess_type;
///
/// assert_eq!(guess_type(Path::new("index.HTML")), "text/html");
/// assert_eq!(guess_type(Path::new("main.py")), "text/plain");
/// assert_eq!(guess_type(Path::new("blob.xyz123")), "application/octet-stream");
/// ```
pub fn guess_type(path: &Path) -> String {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return DEFAULT_MIME_TYPE.to_string();
    };
    let ext = ext.to_ascii_lowercase();

    if TEXT_OVERRIDES.contains(&ext.as_str()) {
        return "text/plain".to_string();
    }

    mime_guess::from_ext(&ext)
        .first()
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string())
}
