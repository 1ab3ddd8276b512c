//! # Construcción de Respuestas HTTP
//!
//! Este módulo proporciona una API para construir respuestas HTTP/1.0
//! y escribirlas en el socket.
//!
//! El body puede estar en memoria (listados, páginas de error, resultado de
//! una subida) o ser un archivo abierto que se copia al socket en bloques.
//! En ambos casos el `Content-Length` se conoce antes de enviar nada:
//! nunca se usa chunked encoding.
//!
//! ## Ejemplo de uso
//!
//! ```
//! use upload_server::http::{Response, StatusCode};
//!
//! let response = Response::new(StatusCode::Ok)
//!     .with_header("Content-Type", "text/plain")
//!     .with_body_bytes(b"Hello".to_vec());
//!
//! let mut out = Vec::new();
//! response.write_to(&mut out).unwrap();
//! assert!(out.ends_with(b"\r\n\r\nHello"));
//! ```

use super::StatusCode;
use html_escape::encode_text;
use std::fs::File;
use std::io::{self, Read, Write};

/// Cuerpo de una respuesta
#[derive(Debug)]
pub enum Body {
    /// Sin body (redirecciones, HEAD)
    Empty,

    /// Body ya materializado en memoria
    Bytes(Vec<u8>),

    /// Archivo abierto; `len` viene de sus metadatos
    File { file: File, len: u64 },
}

impl Body {
    /// Largo del body en bytes
    pub fn len(&self) -> u64 {
        match self {
            Body::Empty => 0,
            Body::Bytes(bytes) => bytes.len() as u64,
            Body::File { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
impl Body {
    /// Bytes del body si está en memoria
    pub(crate) fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Body::Empty => Some(&[]),
            Body::Bytes(bytes) => Some(bytes),
            Body::File { .. } => None,
        }
    }
}

/// Representa una respuesta HTTP/1.0 completa
#[derive(Debug)]
pub struct Response {
    /// Código de estado HTTP (200, 404, etc.)
    status: StatusCode,

    /// Headers HTTP en orden de inserción, sin duplicados
    headers: Vec<(String, String)>,

    /// Cuerpo de la respuesta
    body: Body,
}

impl Response {
    /// Crea una nueva respuesta con el código de estado especificado
    ///
    /// Por defecto, la respuesta no tiene headers ni body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Body::Empty,
        }
    }

    /// Agrega un header a la respuesta
    ///
    /// Si el header ya existe (sin distinguir mayúsculas), se sobrescribe.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    /// Agrega un header a una respuesta existente (versión mutable)
    pub fn add_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    /// Establece el cuerpo de la respuesta desde bytes
    ///
    /// Automáticamente calcula y agrega el header `Content-Length`.
    pub fn with_body_bytes(mut self, body: Vec<u8>) -> Self {
        self.add_header("Content-Length", &body.len().to_string());
        self.body = Body::Bytes(body);
        self
    }

    /// Usa un archivo abierto como cuerpo de la respuesta
    ///
    /// El archivo se copia al socket recién en [`Response::write_to`].
    pub fn with_file(mut self, file: File, len: u64) -> Self {
        self.add_header("Content-Length", &len.to_string());
        self.body = Body::File { file, len };
        self
    }

    /// Crea una página HTML exitosa (200 OK)
    pub fn html(body: String) -> Self {
        Self::new(StatusCode::Ok)
            .with_header("Content-Type", "text/html; charset=utf-8")
            .with_body_bytes(body.into_bytes())
    }

    /// Crea una respuesta de error con una pequeña página HTML
    ///
    /// El mensaje se escapa antes de insertarlo en el HTML.
    ///
    /// # Ejemplo
    /// ```
    /// use upload_server::http::{Response, StatusCode};
    ///
    /// let response = Response::error(StatusCode::NotFound, "File not found");
    /// assert_eq!(response.status(), StatusCode::NotFound);
    /// ```
    pub fn error(status: StatusCode, message: &str) -> Self {
        let body = format!(
            "<!DOCTYPE html>\n\
             <html>\n\
             <head>\n<meta charset=\"utf-8\">\n<title>Error response</title>\n</head>\n\
             <body>\n\
             <h1>Error response</h1>\n\
             <p>Error code: {}</p>\n\
             <p>Message: {}.</p>\n\
             </body>\n\
             </html>\n",
            status.as_u16(),
            encode_text(message),
        );
        Self::new(status)
            .with_header("Content-Type", "text/html; charset=utf-8")
            .with_body_bytes(body.into_bytes())
    }

    /// Crea una redirección permanente (301) hacia `location`
    pub fn redirect(location: &str) -> Self {
        Self::new(StatusCode::MovedPermanently)
            .with_header("Location", location)
            .with_header("Content-Length", "0")
    }

    /// Descarta el body conservando todos los headers
    ///
    /// Es la respuesta a un HEAD: mismo `Content-Length` que el GET.
    pub fn into_head(mut self) -> Self {
        let len = self.body.len();
        if self.header("Content-Length").is_none() {
            self.add_header("Content-Length", &len.to_string());
        }
        self.body = Body::Empty;
        self
    }

    /// Genera la status line y los headers, terminados en la línea vacía
    fn head_bytes(&self) -> Vec<u8> {
        let mut result = Vec::new();

        // 1. Status line: HTTP/1.0 200 OK\r\n
        result.extend_from_slice(format!("HTTP/1.0 {}\r\n", self.status).as_bytes());

        // 2. Headers: Header-Name: Value\r\n
        for (name, value) in &self.headers {
            result.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }
        if self.header("Content-Length").is_none() {
            result.extend_from_slice(format!("Content-Length: {}\r\n", self.body.len()).as_bytes());
        }

        // 3. Línea vacía que separa headers del body
        result.extend_from_slice(b"\r\n");
        result
    }

    /// Escribe la respuesta completa en `writer`
    ///
    /// Retorna la cantidad de bytes de body enviados.
    pub fn write_to<W: Write>(self, writer: &mut W) -> io::Result<u64> {
        writer.write_all(&self.head_bytes())?;

        let sent = match self.body {
            Body::Empty => 0,
            Body::Bytes(bytes) => {
                writer.write_all(&bytes)?;
                bytes.len() as u64
            }
            Body::File { file, len } => io::copy(&mut file.take(len), writer)?,
        };

        writer.flush()?;
        Ok(sent)
    }

    /// Obtiene el código de estado de la respuesta
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Obtiene un header específico, sin distinguir mayúsculas
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Obtiene una referencia al body
    pub fn body(&self) -> &Body {
        &self.body
    }
}
