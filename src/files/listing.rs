//! # Listado de Directorios
//! src/files/listing.rs
//!
//! Genera la página HTML que se muestra cuando se pide un directorio sin
//! `index.html`. Incluye el formulario de subida, un enlace al directorio
//! padre y un enlace por cada hijo inmediato.
//!
//! Todo texto que sale del sistema de archivos o del request se escapa, y
//! todo enlace se codifica con percent-encoding.

use super::resolve::LINK_ENCODE_SET;
use crate::error::HttpError;
use html_escape::{encode_double_quoted_attribute, encode_text};
use percent_encoding::{percent_decode_str, percent_encode};
use std::borrow::Cow;
use std::ffi::OsStr;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Un hijo del directorio listado
#[derive(Debug)]
struct Entry {
    /// Texto visible (con `/` o `@` según el tipo)
    label: String,
    /// Destino del enlace, ya codificado
    href: String,
    /// Clave de orden: nombre en minúsculas
    sort_key: String,
}

impl Entry {
    fn new(dir: &Path, name: &OsStr) -> Self {
        let full = dir.join(name);
        let display = name.to_string_lossy();
        let mut href: String = percent_encode(&name_bytes(name), LINK_ENCODE_SET).collect();

        // `is_dir` sigue symlinks: un link a un directorio se lista como directorio
        let label = if full.is_dir() {
            href.push('/');
            format!("{}/", display)
        } else if full.symlink_metadata().is_ok_and(|m| m.file_type().is_symlink()) {
            format!("{}@", display)
        } else {
            display.to_string()
        };

        Self {
            label,
            href,
            sort_key: display.to_lowercase(),
        }
    }
}

#[cfg(unix)]
fn name_bytes(name: &OsStr) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(name.as_bytes())
}

#[cfg(not(unix))]
fn name_bytes(name: &OsStr) -> Cow<'_, [u8]> {
    match name.to_string_lossy() {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    }
}

/// Path del directorio padre de `request_path`, o `None` en la raíz
///
/// `/a/b/` → `/a/`, `/a/` → `/`
pub fn parent_path(request_path: &str) -> Option<String> {
    if request_path == "/" || request_path.is_empty() {
        return None;
    }

    let trimmed = request_path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => Some(trimmed[..=idx].to_string()),
        None => Some("/".to_string()),
    }
}

/// Genera el listado HTML del directorio `dir`
///
/// `request_path` es el path del request tal como llegó (codificado, sin
/// query). Falla con [`HttpError::NotFound`] si el directorio no se puede leer.
pub fn list(dir: &Path, request_path: &str) -> Result<String, HttpError> {
    let read_dir = fs::read_dir(dir)
        .map_err(|_| HttpError::NotFound("No permission to list directory".to_string()))?;

    // Entradas que desaparecen mientras se lista se ignoran
    let mut entries: Vec<Entry> = read_dir
        .filter_map(Result::ok)
        .map(|entry| Entry::new(dir, &entry.file_name()))
        .collect();
    entries.sort_by(|a, b| a.sort_key.cmp(&b.sort_key).then_with(|| a.label.cmp(&b.label)));

    let display_path = percent_decode_str(request_path).decode_utf8_lossy();
    let title = encode_text(&display_path);

    let mut html = String::new();
    // write! sobre un String no puede fallar
    let _ = write!(
        html,
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>Directory listing for {title}</title>\n\
         </head>\n\
         <body>\n\
         <h2>Directory listing for {title}</h2>\n\
         <hr>\n\
         <form enctype=\"multipart/form-data\" method=\"post\" action=\"{action}\">\n\
         <input name=\"file\" type=\"file\"/>\n\
         <input type=\"submit\" value=\"upload\"/>\n\
         </form>\n\
         <hr>\n",
        title = title,
        action = encode_double_quoted_attribute(request_path),
    );

    if let Some(parent) = parent_path(request_path) {
        let _ = writeln!(
            html,
            "<a href=\"{}\">Back</a><br/>",
            encode_double_quoted_attribute(&parent)
        );
    }

    html.push_str("<ul>\n");
    for entry in &entries {
        let _ = writeln!(
            html,
            "<li><a href=\"{}\">{}</a></li>",
            encode_double_quoted_attribute(&entry.href),
            encode_text(&entry.label)
        );
    }
    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");

    Ok(html)
}
