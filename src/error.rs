//! # Errores del Servidor
//! src/error.rs
//!
//! Tipos de error compartidos entre módulos:
//!
//! - [`ConfigError`]: configuración inválida al arrancar
//! - [`HttpError`]: resultado de un request que no es un 200 (404, 301, 400)
//! - [`ConnectionError`]: fallo al leer el request de un socket
//!
//! Los errores de subida viven en [`crate::upload::UploadError`] porque
//! nunca cambian el código de estado: se muestran en la página de resultado.

use crate::http::{ParseError, Response, StatusCode};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errores de configuración
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("directory {} does not exist or is not accessible: {source}", .path.display())]
    MissingDirectory { path: PathBuf, source: io::Error },

    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Resultado de un request que no termina en 200 OK
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    /// Archivo o directorio inexistente o ilegible
    #[error("{0}")]
    NotFound(String),

    /// Directorio pedido sin `/` final; contiene el nuevo `Location`
    #[error("moved permanently to {0}")]
    Redirect(String),

    /// Request que no se puede atender tal como vino
    #[error("{0}")]
    BadRequest(String),
}

impl HttpError {
    /// Código de estado asociado a cada tipo de error
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::NotFound(_) => StatusCode::NotFound,
            HttpError::Redirect(_) => StatusCode::MovedPermanently,
            HttpError::BadRequest(_) => StatusCode::BadRequest,
        }
    }

    /// Convierte el error en la respuesta que se envía al cliente
    pub fn into_response(self) -> Response {
        match self {
            HttpError::Redirect(location) => Response::redirect(&location),
            other => Response::error(other.status(), &other.to_string()),
        }
    }
}

/// Fallos al leer un request desde el socket
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("malformed request: {0}")]
    Parse(#[from] ParseError),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl ConnectionError {
    /// Respuesta para el cliente, si todavía tiene sentido enviar una
    pub fn to_response(&self) -> Option<Response> {
        match self {
            ConnectionError::Parse(ParseError::UnsupportedMethod(method)) => Some(Response::error(
                StatusCode::NotImplemented,
                &format!("Unsupported method ({})", method),
            )),
            ConnectionError::Parse(e) => {
                Some(HttpError::BadRequest(format!("Bad request: {}", e)).into_response())
            }
            ConnectionError::Io(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_status() {
        assert_eq!(HttpError::NotFound("x".into()).status(), StatusCode::NotFound);
        assert_eq!(
            HttpError::Redirect("/a/".into()).status(),
            StatusCode::MovedPermanently
        );
        assert_eq!(HttpError::BadRequest("x".into()).status(), StatusCode::BadRequest);
    }

    #[test]
    fn test_redirect_into_response() {
        let response = HttpError::Redirect("/sub/".into()).into_response();
        assert_eq!(response.status(), StatusCode::MovedPermanently);
        assert_eq!(response.header("Location"), Some("/sub/"));
    }

    #[test]
    fn test_not_found_into_response() {
        let response = HttpError::NotFound("File not found".into()).into_response();
        let body = String::from_utf8(response.body().as_bytes().unwrap().to_vec()).unwrap();

        assert_eq!(response.status(), StatusCode::NotFound);
        assert!(body.contains("File not found"));
    }

    #[test]
    fn test_connection_error_responses() {
        let unsupported = ConnectionError::from(ParseError::UnsupportedMethod("PUT".into()));
        assert_eq!(
            unsupported.to_response().unwrap().status(),
            StatusCode::NotImplemented
        );

        let bad = ConnectionError::from(ParseError::InvalidRequestLine);
        assert_eq!(bad.to_response().unwrap().status(), StatusCode::BadRequest);

        let io = ConnectionError::from(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
        assert!(io.to_response().is_none());
    }
}
