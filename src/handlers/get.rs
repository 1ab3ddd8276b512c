//! # Handlers GET y HEAD
//! src/handlers/get.rs
//!
//! Sirve archivos y listados de directorio. HEAD arma exactamente la misma
//! respuesta que GET y luego descarta el body.

use crate::config::Config;
use crate::error::HttpError;
use crate::files::resolve::canonical_path;
use crate::files::{guess_type, list, resolve};
use crate::http::{Request, Response, StatusCode};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Archivos que se sirven en lugar del listado, en orden de preferencia
pub const INDEX_FILES: [&str; 2] = ["index.html", "index.htm"];

pub fn get_handler(config: &Config, request: &Request, _body: &mut dyn Read) -> Response {
    send_head(config, request).unwrap_or_else(HttpError::into_response)
}

pub fn head_handler(config: &Config, request: &Request, body: &mut dyn Read) -> Response {
    get_handler(config, request, body).into_head()
}

/// Construye la respuesta para el path pedido, con el archivo ya abierto
///
/// - Directorio pedido con un path no canónico (sin `/` final, con `..`,
///   `//` o `%2e`): redirección al path normalizado con `/`
/// - Directorio con `index.html` o `index.htm`: ese archivo
/// - Directorio sin index: listado HTML
/// - Cualquier otra cosa: el archivo, o 404 si no se puede abrir
pub fn send_head(config: &Config, request: &Request) -> Result<Response, HttpError> {
    let path = resolve(request.target(), &config.directory);

    if path.is_dir() {
        let request_path = request.path();
        let canonical = format!("{}/", canonical_path(request_path));
        if request_path != canonical {
            let mut location = canonical;
            if let Some(query) = request.query() {
                location.push('?');
                location.push_str(query);
            }
            return Err(HttpError::Redirect(location));
        }

        if let Some(index) = INDEX_FILES
            .iter()
            .map(|name| path.join(name))
            .find(|candidate| candidate.is_file())
        {
            return serve_file(&index);
        }

        return list(&path, request_path).map(Response::html);
    }

    serve_file(&path)
}

/// Abre un archivo y arma la respuesta con sus headers
fn serve_file(path: &Path) -> Result<Response, HttpError> {
    let not_found = || HttpError::NotFound("File not found".to_string());

    let file = File::open(path).map_err(|_| not_found())?;
    let metadata = file.metadata().map_err(|_| not_found())?;
    // Abrir un directorio funciona en unix; no se puede servir como archivo
    if !metadata.is_file() {
        return Err(not_found());
    }

    let mut response = Response::new(StatusCode::Ok)
        .with_header("Content-Type", &guess_type(path));
    if let Ok(modified) = metadata.modified() {
        response.add_header("Last-Modified", &httpdate::fmt_http_date(modified));
    }

    Ok(response.with_file(file, metadata.len()))
}
