//! # Parser multipart/form-data
//! src/upload/multipart.rs
//!
//! Parser *streaming* de bodies `multipart/form-data` (RFC 7578). Nunca
//! guarda una parte completa en memoria: el buffer interno contiene como
//! mucho un bloque de lectura más el largo del delimitador.
//!
//! ## Formato
//!
//! ```text
//! --XyZ\r\n
//! Content-Disposition: form-data; name="file"; filename="a.txt"\r\n
//! Content-Type: text/plain\r\n
//! \r\n
//! <datos>\r\n
//! --XyZ--\r\n
//! ```
//!
//! ## Uso
//!
//! ```
//! use std::io::Read;
//! use upload_server::upload::multipart::Multipart;
//!
//! let body = b"--XyZ\r\n\
//!     Content-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\r\n\
//!     hola\r\n--XyZ--\r\n";
//!
//! let mut multipart = Multipart::new(&body[..], "XyZ");
//! let mut part = multipart.next_part().unwrap().unwrap();
//! assert_eq!(part.name(), Some("file"));
//! assert_eq!(part.filename(), Some("a.txt"));
//!
//! let mut data = String::new();
//! part.read_to_string(&mut data).unwrap();
//! assert_eq!(data, "hola");
//! ```

use memchr::memmem;
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::io::{self, Read};
use std::sync::OnceLock;
use thiserror::Error;

/// Tamaño de cada lectura del stream subyacente
const READ_CHUNK: usize = 8 * 1024;

/// Límite para los headers de una parte
pub const MAX_PART_HEADERS: usize = 16 * 1024;

/// Errores del parser multipart
#[derive(Debug, Error)]
pub enum MultipartError {
    #[error("multipart body does not contain the declared boundary")]
    MissingBoundary,

    #[error("multipart body ended unexpectedly")]
    Truncated,

    #[error("multipart part headers exceed {0} bytes")]
    HeadersTooLarge(usize),

    #[error("malformed multipart header: {0}")]
    MalformedHeader(String),

    #[error("failed to read request body: {0}")]
    Io(#[from] io::Error),
}

impl MultipartError {
    pub(crate) fn from_body(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            MultipartError::Truncated
        } else {
            MultipartError::Io(err)
        }
    }
}

/// Headers de una parte
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartHeaders {
    /// `name` de Content-Disposition
    pub name: Option<String>,
    /// `filename` de Content-Disposition (puede ser `""`)
    pub filename: Option<String>,
    /// Content-Type declarado por el cliente
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Antes del primer delimitador
    Preamble,
    /// Justo después de un delimitador: sigue `--` o CRLF
    AfterDelimiter,
    /// Leyendo los headers de una parte
    Headers,
    /// Leyendo los datos de una parte
    Body,
    /// Se leyó el delimitador final
    Finished,
}

/// Parser streaming sobre cualquier `Read`
pub struct Multipart<R> {
    reader: R,
    buf: Vec<u8>,
    eof: bool,
    /// `--boundary`
    dash_boundary: Vec<u8>,
    /// `\r\n--boundary`
    delimiter: Vec<u8>,
    state: State,
}

impl<R: Read> Multipart<R> {
    /// Crea un parser para `boundary` (sin los `--` iniciales)
    pub fn new(reader: R, boundary: &str) -> Self {
        let dash_boundary = [b"--".as_slice(), boundary.as_bytes()].concat();
        let delimiter = [b"\r\n".as_slice(), dash_boundary.as_slice()].concat();

        Self {
            reader,
            buf: Vec::with_capacity(READ_CHUNK + delimiter.len()),
            eof: false,
            dash_boundary,
            delimiter,
            state: State::Preamble,
        }
    }

    /// Avanza a la siguiente parte
    ///
    /// Los datos no leídos de la parte anterior se descartan.
    /// Retorna `Ok(None)` al llegar al delimitador final.
    pub fn next_part(&mut self) -> Result<Option<Part<'_, R>>, MultipartError> {
        loop {
            match self.state {
                State::Preamble => self.skip_preamble()?,
                State::Body => self.skip_body()?,
                State::AfterDelimiter => self.after_delimiter()?,
                State::Headers => {
                    let headers = self.read_headers()?;
                    self.state = State::Body;
                    return Ok(Some(Part {
                        headers,
                        multipart: self,
                    }));
                }
                State::Finished => return Ok(None),
            }
        }
    }

    /// Lee otro bloque del stream. Retorna `false` en EOF.
    fn fill(&mut self) -> io::Result<bool> {
        if self.eof {
            return Ok(false);
        }

        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.reader.read(&mut chunk) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(false);
                }
                Ok(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                    return Ok(true);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn skip_preamble(&mut self) -> Result<(), MultipartError> {
        loop {
            if let Some(idx) = memmem::find(&self.buf, &self.dash_boundary) {
                self.buf.drain(..idx + self.dash_boundary.len());
                self.state = State::AfterDelimiter;
                return Ok(());
            }

            // Conservar una posible coincidencia parcial al final del buffer
            let keep = self.dash_boundary.len() - 1;
            if self.buf.len() > keep {
                self.buf.drain(..self.buf.len() - keep);
            }

            if !self.fill()? {
                return Err(MultipartError::MissingBoundary);
            }
        }
    }

    fn after_delimiter(&mut self) -> Result<(), MultipartError> {
        loop {
            if self.buf.starts_with(b"--") {
                // Delimitador final; el epílogo se ignora
                self.state = State::Finished;
                return Ok(());
            }

            if let Some(idx) = memmem::find(&self.buf, b"\r\n") {
                // Solo se permite relleno de espacios antes del CRLF
                if !self.buf[..idx].iter().all(|b| *b == b' ' || *b == b'\t') {
                    return Err(MultipartError::MalformedHeader(
                        "unexpected data after boundary".to_string(),
                    ));
                }
                self.buf.drain(..idx + 2);
                self.state = State::Headers;
                return Ok(());
            }

            if self.buf.len() > MAX_PART_HEADERS {
                return Err(MultipartError::HeadersTooLarge(MAX_PART_HEADERS));
            }
            if !self.fill()? {
                return Err(MultipartError::Truncated);
            }
        }
    }

    fn read_headers(&mut self) -> Result<PartHeaders, MultipartError> {
        loop {
            // Parte sin headers: el CRLF vacío viene de inmediato
            if self.buf.starts_with(b"\r\n") {
                self.buf.drain(..2);
                return Ok(PartHeaders::default());
            }

            if let Some(idx) = memmem::find(&self.buf, b"\r\n\r\n") {
                if idx > MAX_PART_HEADERS {
                    return Err(MultipartError::HeadersTooLarge(MAX_PART_HEADERS));
                }
                let block = String::from_utf8_lossy(&self.buf[..idx]).into_owned();
                self.buf.drain(..idx + 4);
                return parse_part_headers(&block);
            }

            if self.buf.len() > MAX_PART_HEADERS {
                return Err(MultipartError::HeadersTooLarge(MAX_PART_HEADERS));
            }
            if !self.fill()? {
                return Err(MultipartError::Truncated);
            }
        }
    }

    /// Lee datos de la parte actual hasta el siguiente delimitador
    fn read_body(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.state != State::Body || out.is_empty() {
            return Ok(0);
        }

        loop {
            if let Some(idx) = memmem::find(&self.buf, &self.delimiter) {
                if idx == 0 {
                    self.buf.drain(..self.delimiter.len());
                    self.state = State::AfterDelimiter;
                    return Ok(0);
                }
                return Ok(self.take_into(out, idx));
            }

            // Todo lo que no puede ser el comienzo del delimitador es dato
            let safe = self.buf.len().saturating_sub(self.delimiter.len() - 1);
            if safe > 0 {
                return Ok(self.take_into(out, safe));
            }

            if !self.fill()? {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "multipart body ended inside a part",
                ));
            }
        }
    }

    fn take_into(&mut self, out: &mut [u8], available: usize) -> usize {
        let n = available.min(out.len());
        out[..n].copy_from_slice(&self.buf[..n]);
        self.buf.drain(..n);
        n
    }

    fn skip_body(&mut self) -> Result<(), MultipartError> {
        let mut sink = [0u8; READ_CHUNK];
        while self.state == State::Body {
            self.read_body(&mut sink).map_err(MultipartError::from_body)?;
        }
        Ok(())
    }
}

/// Una parte del body multipart; sus datos se leen con [`Read`]
pub struct Part<'m, R> {
    headers: PartHeaders,
    multipart: &'m mut Multipart<R>,
}

impl<R: Read> Part<'_, R> {
    /// Nombre del campo del formulario
    pub fn name(&self) -> Option<&str> {
        self.headers.name.as_deref()
    }

    /// Nombre de archivo enviado por el cliente, tal cual
    pub fn filename(&self) -> Option<&str> {
        self.headers.filename.as_deref()
    }
}

impl<R: Read> Read for Part<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.multipart.read_body(buf)
    }
}

fn parse_part_headers(block: &str) -> Result<PartHeaders, MultipartError> {
    let mut headers = PartHeaders::default();

    for line in block.split("\r\n") {
        let Some((name, value)) = line.split_once(':') else {
            return Err(MultipartError::MalformedHeader(line.to_string()));
        };
        let value = value.trim();

        if name.trim().eq_ignore_ascii_case("content-disposition") {
            let (_, params) = parse_header_params(value);
            headers.name = param(&params, "name").map(str::to_string);
            headers.filename = param(&params, "filename*")
                .and_then(decode_ext_value)
                .or_else(|| param(&params, "filename").map(str::to_string));
        } else if name.trim().eq_ignore_ascii_case("content-type") {
            headers.content_type = Some(value.to_string());
        }
    }

    Ok(headers)
}

fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Decodifica un valor RFC 5987 (`UTF-8''nombre%20con%20espacios`)
fn decode_ext_value(value: &str) -> Option<String> {
    let (charset, rest) = value.split_once('\'')?;
    let (_lang, encoded) = rest.split_once('\'')?;
    if !charset.eq_ignore_ascii_case("utf-8") {
        return None;
    }
    Some(percent_decode_str(encoded).decode_utf8_lossy().into_owned())
}

fn param_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#";\s*([^\s=;]+)\s*=\s*(?:"((?:[^"\\]|\\.)*)"|([^;]*))"#)
            .expect("static regex is valid")
    })
}

/// Separa un header del estilo `tipo/subtipo; clave=valor; clave2="valor 2"`
///
/// Retorna el valor principal en minúsculas y los parámetros (claves en
/// minúsculas, valores sin comillas).
///
/// ```
/// use upload_server::upload::multipart::parse_header_params;
///
/// let (media, params) = parse_header_params("multipart/form-data; boundary=\"a b\"");
/// assert_eq!(media, "multipart/form-data");
/// assert_eq!(params, vec![("boundary".to_string(), "a b".to_string())]);
/// ```
pub fn parse_header_params(value: &str) -> (String, Vec<(String, String)>) {
    let (main, rest) = match value.find(';') {
        Some(idx) => (&value[..idx], &value[idx..]),
        None => (value, ""),
    };

    let params = param_regex()
        .captures_iter(rest)
        .map(|caps| {
            let key = caps[1].to_ascii_lowercase();
            let value = match (caps.get(2), caps.get(3)) {
                (Some(quoted), _) => quoted
                    .as_str()
                    .replace("\\\\", "\\")
                    .replace("\\\"", "\""),
                (None, Some(token)) => token.as_str().trim().to_string(),
                (None, None) => String::new(),
            };
            (key, value)
        })
        .collect();

    (main.trim().to_ascii_lowercase(), params)
}
