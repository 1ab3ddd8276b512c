//! # Manejo de Subidas
//! src/upload/handler.rs
//!
//! Recibe un POST `multipart/form-data`, busca la parte llamada `file` y
//! copia sus datos al directorio destino sin cargarlos en memoria.
//!
//! Un archivo con el mismo nombre se sobrescribe. Si la escritura falla a
//! mitad de camino, el archivo parcial queda en disco y el resultado se
//! informa como fallido.

use super::multipart::{parse_header_params, Multipart, MultipartError};
use crate::files::resolve::is_plain_segment;
use crate::http::Request;
use log::debug;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Nombre del campo del formulario que contiene el archivo
pub const FILE_FIELD: &str = "file";

/// Tamaño del bloque de copia hacia el disco
const COPY_CHUNK: usize = 64 * 1024;

/// Resultado de una subida, mostrado en la página de respuesta
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub success: bool,
    pub message: String,
}

impl UploadResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl From<Result<String, UploadError>> for UploadResult {
    fn from(result: Result<String, UploadError>) -> Self {
        match result {
            Ok(message) => UploadResult::success(message),
            Err(e) => UploadResult::failure(e.to_string()),
        }
    }
}

/// Motivos por los que una subida puede fallar
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("invalid content type")]
    InvalidContentType,

    #[error("invalid content type: missing multipart boundary")]
    MissingBoundary,

    #[error("no file field")]
    NoFileField,

    #[error("no file selected")]
    NoFileSelected,

    #[error("invalid filename: {0:?}")]
    InvalidFilename(String),

    #[error("{0}")]
    Multipart(#[from] MultipartError),

    #[error("failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// Directorio donde se guarda una subida hecha contra `resolved`
///
/// Si el path del request es un directorio existente se usa ese; si no,
/// su directorio padre.
pub fn target_directory(resolved: &Path) -> PathBuf {
    if resolved.is_dir() {
        return resolved.to_path_buf();
    }
    resolved
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| resolved.to_path_buf())
}

/// Nombre con el que se guarda un archivo subido
///
/// Solo se conserva el último componente del nombre que mandó el cliente,
/// separando tanto por `/` como por `\`.
///
/// ```
/// use upload_server::upload::stored_filename;
///
/// assert_eq!(stored_filename("evil/../../../etc/passwd").unwrap(), "passwd");
/// assert_eq!(stored_filename("C:\\Users\\me\\notes.txt").unwrap(), "notes.txt");
/// ```
pub fn stored_filename(submitted: &str) -> Result<String, UploadError> {
    let name = submitted.rsplit(['/', '\\']).next().unwrap_or("");

    if !is_plain_segment(name) {
        return Err(UploadError::InvalidFilename(submitted.to_string()));
    }
    Ok(name.to_string())
}

/// Procesa el body de un POST y guarda el archivo en `target_dir`
pub fn handle_upload(request: &Request, body: &mut dyn Read, target_dir: &Path) -> UploadResult {
    store_upload(request, body, target_dir).into()
}

fn store_upload(
    request: &Request,
    body: &mut dyn Read,
    target_dir: &Path,
) -> Result<String, UploadError> {
    let content_type = request
        .header("content-type")
        .ok_or(UploadError::InvalidContentType)?;

    let (media_type, params) = parse_header_params(content_type);
    if media_type != "multipart/form-data" {
        return Err(UploadError::InvalidContentType);
    }

    let boundary = params
        .iter()
        .find(|(key, _)| key == "boundary")
        .map(|(_, value)| value.as_str())
        .filter(|boundary| !boundary.is_empty())
        .ok_or(UploadError::MissingBoundary)?;

    let mut multipart = Multipart::new(body, boundary);

    while let Some(mut part) = multipart.next_part()? {
        if part.name() != Some(FILE_FIELD) {
            continue;
        }

        let submitted = part.filename().unwrap_or("");
        if submitted.is_empty() {
            return Err(UploadError::NoFileSelected);
        }

        let name = stored_filename(submitted)?;
        let path = target_dir.join(&name);
        debug!("writing upload {:?} to {}", submitted, path.display());

        let written = copy_to_file(&mut part, &path)?;
        return Ok(format!(
            "The file \"{}\" was uploaded successfully ({} bytes)",
            name, written
        ));
    }

    Err(UploadError::NoFileField)
}

/// Copia `reader` a `path`, distinguiendo errores de lectura y de escritura
fn copy_to_file(reader: &mut impl Read, path: &Path) -> Result<u64, UploadError> {
    let write_error = |source: io::Error| UploadError::Write {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(write_error)?;
    let mut writer = BufWriter::new(file);
    let mut chunk = vec![0u8; COPY_CHUNK];
    let mut written = 0u64;

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(MultipartError::from_body(e).into()),
        };
        writer.write_all(&chunk[..n]).map_err(write_error)?;
        written += n as u64;
    }

    writer.flush().map_err(write_error)?;
    Ok(written)
}
