//! # Parsing de Requests HTTP/1.0
//! src/http/request.rs
//!
//! Este módulo implementa el parser del *head* de un request HTTP.
//! El body nunca se carga completo en memoria: queda en el stream y se
//! consume después a través de [`BodyReader`](super::body::BodyReader).
//!
//! ## Formato de un Request HTTP/1.0
//!
//! ```text
//! POST /docs/?x=1 HTTP/1.0\r\n
//! Content-Type: multipart/form-data; boundary=XyZ\r\n
//! Content-Length: 1234\r\n
//! \r\n
//! <body>
//! ```
//!
//! ## Componentes
//!
//! 1. **Request Line**: `METHOD /target HTTP/1.x`
//! 2. **Headers**: Pares `Name: Value` (uno por línea, sin distinguir mayúsculas)
//! 3. **Empty Line**: `\r\n` que separa headers del body

use crate::error::ConnectionError;
use std::collections::HashMap;
use std::io::{BufRead, Read};
use thiserror::Error;

/// Métodos HTTP soportados
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Obtener un archivo o un listado
    GET,

    /// HEAD - Como GET pero solo retorna headers
    HEAD,

    /// POST - Subir un archivo (multipart/form-data)
    POST,
}

impl Method {
    /// Parsea un método HTTP desde un string
    ///
    /// # Errores
    ///
    /// Retorna error si el método no es soportado
    fn from_str(s: &str) -> Result<Self, ParseError> {
        match s {
            "GET" => Ok(Method::GET),
            "HEAD" => Ok(Method::HEAD),
            "POST" => Ok(Method::POST),
            _ => Err(ParseError::UnsupportedMethod(s.to_string())),
        }
    }

    /// Convierte el método a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
        }
    }
}

/// Representa el head de un request HTTP parseado
#[derive(Debug, Clone)]
pub struct Request {
    /// Método HTTP (GET, HEAD, POST)
    method: Method,

    /// Target tal como llegó (ej: "/docs/a%20b.txt?x=1")
    target: String,

    /// Headers HTTP, con el nombre en minúsculas
    headers: HashMap<String, String>,

    /// Versión HTTP ("HTTP/1.0" o "HTTP/1.1")
    version: String,
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Request incompleto o truncado
    #[error("Incomplete HTTP request")]
    IncompleteRequest,

    /// Formato inválido de la request line
    #[error("Invalid request line format")]
    InvalidRequestLine,

    /// Método HTTP no soportado
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// Versión HTTP incorrecta
    #[error("Invalid HTTP version: {0}")]
    InvalidHttpVersion(String),

    /// Header malformado
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Content-Length que no es un número
    #[error("Invalid Content-Length: {0}")]
    InvalidContentLength(String),

    /// El head supera el límite configurado
    #[error("Request head exceeds {0} bytes")]
    HeadTooLarge(usize),

    /// Request vacío
    #[error("Empty request")]
    EmptyRequest,
}

impl Request {
    /// Lee el head de un request desde el stream, línea por línea,
    /// hasta encontrar la línea vacía.
    ///
    /// Retorna `Ok(None)` si el cliente cerró la conexión sin enviar nada.
    /// El stream queda posicionado al inicio del body.
    pub fn read_from<R: BufRead>(
        reader: &mut R,
        max_head_bytes: usize,
    ) -> Result<Option<Self>, ConnectionError> {
        let mut head = Vec::new();
        let mut limited = reader.by_ref().take(max_head_bytes as u64);

        loop {
            let start = head.len();
            let n = limited.read_until(b'\n', &mut head)?;

            if n == 0 {
                if head.is_empty() {
                    return Ok(None);
                }
                return Err(Self::cut_short(limited.limit(), max_head_bytes).into());
            }

            let line = &head[start..];
            if !line.ends_with(b"\n") {
                return Err(Self::cut_short(limited.limit(), max_head_bytes).into());
            }

            if line == b"\r\n" || line == b"\n" {
                // Líneas vacías antes de la request line se ignoran (RFC 7230 3.5)
                if start == 0 {
                    head.clear();
                    continue;
                }
                break;
            }
        }

        Ok(Some(Self::parse(&head)?))
    }

    fn cut_short(remaining: u64, max_head_bytes: usize) -> ParseError {
        if remaining == 0 {
            ParseError::HeadTooLarge(max_head_bytes)
        } else {
            ParseError::IncompleteRequest
        }
    }

    /// Parsea el head completo de un request desde bytes
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use upload_server::http::Request;
    ///
    /// let raw = b"GET /docs/?sort=name HTTP/1.0\r\nHost: localhost\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.path(), "/docs/");
    /// assert_eq!(request.query(), Some("sort=name"));
    /// assert_eq!(request.header("host"), Some("localhost"));
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        let request_str = String::from_utf8_lossy(buffer);

        if request_str.trim().is_empty() {
            return Err(ParseError::EmptyRequest);
        }

        let lines: Vec<&str> = request_str
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();

        // 1. Request line
        let (method, target, version) = Self::parse_request_line(lines[0])?;

        // 2. Headers hasta la línea vacía
        let headers = Self::parse_headers(&lines[1..])?;

        Ok(Request {
            method,
            target,
            headers,
            version,
        })
    }

    /// Parsea la request line
    ///
    /// Formato: `GET /path?query HTTP/1.0`
    fn parse_request_line(line: &str) -> Result<(Method, String, String), ParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();

        if parts.len() != 3 {
            return Err(ParseError::InvalidRequestLine);
        }

        let method = Method::from_str(parts[0])?;

        let target = parts[1].to_string();
        if !target.starts_with('/') {
            return Err(ParseError::InvalidRequestLine);
        }

        let version = parts[2].to_string();
        if version != "HTTP/1.0" && version != "HTTP/1.1" {
            return Err(ParseError::InvalidHttpVersion(version));
        }

        Ok((method, target, version))
    }

    /// Parsea los headers HTTP
    ///
    /// Los nombres se guardan en minúsculas; un header repetido se une con ", ".
    fn parse_headers(lines: &[&str]) -> Result<HashMap<String, String>, ParseError> {
        let mut headers: HashMap<String, String> = HashMap::new();
        let mut last: Option<String> = None;

        for line in lines {
            if line.trim().is_empty() {
                break;
            }

            // Continuación obsoleta (obs-fold): se agrega al header anterior
            if line.starts_with(' ') || line.starts_with('\t') {
                match last.as_ref().and_then(|name| headers.get_mut(name)) {
                    Some(value) => {
                        value.push(' ');
                        value.push_str(line.trim());
                        continue;
                    }
                    None => return Err(ParseError::InvalidHeader(line.to_string())),
                }
            }

            let Some(colon_pos) = line.find(':') else {
                return Err(ParseError::InvalidHeader(line.to_string()));
            };

            let name = line[..colon_pos].trim().to_ascii_lowercase();
            if name.is_empty() {
                return Err(ParseError::InvalidHeader(line.to_string()));
            }
            let value = line[colon_pos + 1..].trim();

            headers
                .entry(name.clone())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
            last = Some(name);
        }

        Ok(headers)
    }

    // === Métodos públicos para acceder a los campos ===

    /// Obtiene el método HTTP del request
    pub fn method(&self) -> Method {
        self.method
    }

    /// Obtiene el target completo, con query y fragmento
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Obtiene el path del request (sin `?query` ni `#fragmento`), sin decodificar
    pub fn path(&self) -> &str {
        let end = self.target.find(['?', '#']).unwrap_or(self.target.len());
        &self.target[..end]
    }

    /// Obtiene la query string, si existe
    pub fn query(&self) -> Option<&str> {
        let start = self.target.find('?')? + 1;
        let rest = &self.target[start..];
        let end = rest.find('#').unwrap_or(rest.len());
        Some(&rest[..end])
    }

    /// Obtiene un header específico, sin distinguir mayúsculas
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|s| s.as_str())
    }

    /// Obtiene la versión HTTP
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Content-Length declarado por el cliente
    pub fn content_length(&self) -> Result<Option<u64>, ParseError> {
        match self.header("content-length") {
            Some(value) => value
                .parse::<u64>()
                .map(Some)
                .map_err(|_| ParseError::InvalidContentLength(value.to_string())),
            None => Ok(None),
        }
    }

    /// Indica si el body viene con `Transfer-Encoding: chunked`
    pub fn is_chunked(&self) -> bool {
        self.header("transfer-encoding")
            .map(|te| {
                te.rsplit(',')
                    .next()
                    .is_some_and(|last| last.trim().eq_ignore_ascii_case("chunked"))
            })
            .unwrap_or(false)
    }
}
