//! # Lectura del Body
//! src/http/body.rs
//!
//! El body de un request se lee directamente del socket, sin cargarlo
//! entero en memoria. Hay tres casos:
//!
//! - Sin body (GET/HEAD, o POST sin `Content-Length`)
//! - Largo fijo: exactamente `Content-Length` bytes
//! - `Transfer-Encoding: chunked`: se decodifica chunk por chunk

use super::request::{ParseError, Request};
use std::io::{self, BufRead, Read, Take};

/// Largo máximo de una línea de tamaño de chunk o de trailer
const MAX_CHUNK_LINE: u64 = 4096;

/// Lector del body de un request
pub enum BodyReader<'a, R> {
    /// El request no trae body
    Empty,

    /// Body de largo conocido (`Content-Length`)
    Fixed(Take<&'a mut R>),

    /// Body con `Transfer-Encoding: chunked`
    Chunked(ChunkedReader<&'a mut R>),
}

impl<'a, R: BufRead> BodyReader<'a, R> {
    /// Construye el lector adecuado según los headers del request.
    ///
    /// `Transfer-Encoding: chunked` tiene prioridad sobre `Content-Length`.
    pub fn for_request(request: &Request, reader: &'a mut R) -> Result<Self, ParseError> {
        if request.is_chunked() {
            return Ok(BodyReader::Chunked(ChunkedReader::new(reader)));
        }

        match request.content_length()? {
            Some(len) if len > 0 => Ok(BodyReader::Fixed(reader.take(len))),
            _ => Ok(BodyReader::Empty),
        }
    }

    /// Descarta lo que quede del body sin leer
    ///
    /// Se llama antes de escribir la respuesta, para que el cliente no reciba
    /// un RST mientras todavía está enviando.
    pub fn drain(&mut self) -> io::Result<u64> {
        io::copy(self, &mut io::sink())
    }
}

impl<R: BufRead> Read for BodyReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            BodyReader::Empty => Ok(0),
            BodyReader::Fixed(take) => take.read(buf),
            BodyReader::Chunked(chunked) => chunked.read(buf),
        }
    }
}

/// Decodificador de `Transfer-Encoding: chunked`
///
/// ```text
/// 4\r\n
/// Wiki\r\n
/// 0\r\n
/// \r\n
/// ```
pub struct ChunkedReader<R> {
    inner: R,
    /// Bytes pendientes del chunk actual
    remaining: u64,
    done: bool,
}

impl<R: BufRead> ChunkedReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            remaining: 0,
            done: false,
        }
    }

    fn read_line(&mut self) -> io::Result<String> {
        let mut line = Vec::new();
        (&mut self.inner)
            .take(MAX_CHUNK_LINE)
            .read_until(b'\n', &mut line)?;

        if !line.ends_with(b"\n") {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "chunked body ended inside a size line",
            ));
        }

        Ok(String::from_utf8_lossy(&line).trim_end().to_string())
    }

    fn read_chunk_size(&mut self) -> io::Result<u64> {
        let line = self.read_line()?;
        // Las extensiones (";name=value") se ignoran
        let size = line.split(';').next().unwrap_or("").trim();

        u64::from_str_radix(size, 16).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid chunk size: {:?}", size),
            )
        })
    }

    fn skip_trailers(&mut self) -> io::Result<()> {
        while !self.read_line()?.is_empty() {}
        Ok(())
    }
}

impl<R: BufRead> Read for ChunkedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.done || buf.is_empty() {
            return Ok(0);
        }

        if self.remaining == 0 {
            self.remaining = self.read_chunk_size()?;
            if self.remaining == 0 {
                self.skip_trailers()?;
                self.done = true;
                return Ok(0);
            }
        }

        let max = self.remaining.min(buf.len() as u64) as usize;
        let n = self.inner.read(&mut buf[..max])?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "chunked body ended inside a chunk",
            ));
        }

        self.remaining -= n as u64;
        if self.remaining == 0 && !self.read_line()?.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "missing CRLF after chunk data",
            ));
        }

        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor};

    fn request(raw: &[u8]) -> Request {
        Request::parse(raw).unwrap()
    }

    #[test]
    fn test_fixed_body_stops_at_content_length() {
        let req = request(b"POST / HTTP/1.0\r\nContent-Length: 5\r\n\r\n");
        let mut stream = BufReader::new(Cursor::new(b"helloEXTRA".to_vec()));

        let mut body = BodyReader::for_request(&req, &mut stream).unwrap();
        let mut out = String::new();
        body.read_to_string(&mut out).unwrap();

        assert_eq!(out, "hello");
    }

    #[test]
    fn test_no_length_means_empty_body() {
        let req = request(b"POST / HTTP/1.0\r\n\r\n");
        let mut stream = BufReader::new(Cursor::new(b"ignored".to_vec()));

        let mut body = BodyReader::for_request(&req, &mut stream).unwrap();
        assert!(matches!(body, BodyReader::Empty));
        assert_eq!(body.drain().unwrap(), 0);
    }

    #[test]
    fn test_chunked_body() {
        let req = request(b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n");
        let raw = b"4\r\nWiki\r\n5;ext=1\r\npedia\r\nE\r\n in\r\n\r\nchunks.\r\n0\r\nX-Trailer: 1\r\n\r\n";
        let mut stream = BufReader::new(Cursor::new(raw.to_vec()));

        let mut body = BodyReader::for_request(&req, &mut stream).unwrap();
        let mut out = String::new();
        body.read_to_string(&mut out).unwrap();

        assert_eq!(out, "Wikipedia in\r\n\r\nchunks.");
    }

    #[test]
    fn test_truncated_chunk_is_an_error() {
        let mut reader = ChunkedReader::new(BufReader::new(Cursor::new(b"a\r\nabc".to_vec())));
        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_invalid_chunk_size() {
        let mut reader = ChunkedReader::new(BufReader::new(Cursor::new(b"zz\r\n".to_vec())));
        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_drain_consumes_rest_of_body() {
        let req = request(b"POST / HTTP/1.0\r\nContent-Length: 8\r\n\r\n");
        let mut stream = BufReader::new(Cursor::new(b"12345678after".to_vec()));

        {
            let mut body = BodyReader::for_request(&req, &mut stream).unwrap();
            let mut first = [0u8; 3];
            body.read_exact(&mut first).unwrap();
            assert_eq!(body.drain().unwrap(), 5);
        }

        let mut rest = String::new();
        stream.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "after");
    }
}
