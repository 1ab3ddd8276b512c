//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Implementación del servidor TCP que maneja múltiples conexiones
//! simultáneas usando threads. Cada conexión se procesa en su propio thread
//! y atiende exactamente un request (HTTP/1.0, `Connection: close`).
//!
//! La configuración y el router se comparten entre threads con `Arc`; ambos
//! son de solo lectura, así que no hace falta sincronización adicional.

use crate::config::Config;
use crate::error::{ConnectionError, HttpError};
use crate::http::{BodyReader, Request, Response};
use crate::router::{add_common_headers, Router};
use log::{debug, error, info, warn};
use std::io::{self, BufReader, Read};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Tiempo máximo esperando que el cliente cierre su lado
const LINGER_TIMEOUT: Duration = Duration::from_secs(2);

/// Bytes que se descartan como máximo al cerrar
const LINGER_MAX_BYTES: u64 = 1024 * 1024;

/// Servidor HTTP/1.0 concurrente
pub struct Server {
    config: Arc<Config>,
    router: Arc<Router>,
    listener: Option<TcpListener>,
}

impl Server {
    /// Crea un servidor de archivos con el router por defecto
    pub fn new(config: Config) -> Self {
        Self::with_router(config, Router::file_server())
    }

    pub fn with_router(config: Config, router: Router) -> Self {
        Self {
            config: Arc::new(config),
            router: Arc::new(router),
            listener: None,
        }
    }

    /// Abre el socket y retorna la dirección real
    ///
    /// Con `port = 0` el sistema elige un puerto libre.
    pub fn bind(&mut self) -> io::Result<SocketAddr> {
        let listener = TcpListener::bind(self.config.address())?;
        let addr = listener.local_addr()?;
        self.listener = Some(listener);
        Ok(addr)
    }

    /// Acepta conexiones indefinidamente, un thread por conexión
    ///
    /// Si no se llamó a [`Server::bind`], lo hace primero.
    pub fn run(mut self) -> io::Result<()> {
        let listener = match self.listener.take() {
            Some(listener) => listener,
            None => TcpListener::bind(self.config.address())?,
        };
        info!("listening on {} (one thread per connection)", listener.local_addr()?);

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => self.spawn_connection(stream),
                Err(e) => error!("failed to accept connection: {}", e),
            }
        }

        Ok(())
    }

    fn spawn_connection(&self, stream: TcpStream) {
        let router = Arc::clone(&self.router);
        let config = Arc::clone(&self.config);

        let spawned = thread::Builder::new()
            .name("connection".to_string())
            .spawn(move || {
                let peer = peer_label(&stream);
                if let Err(e) = handle_connection(stream, &router, &config) {
                    warn!("{}: {}", peer, e);
                }
            });

        if let Err(e) = spawned {
            error!("failed to spawn connection thread: {}", e);
        }
    }
}

fn peer_label(stream: &TcpStream) -> String {
    stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Atiende un request completo sobre `stream`
///
/// 1. Lee y parsea el head
/// 2. Arma el lector del body y despacha al handler
/// 3. Descarta el body que el handler no leyó
/// 4. Escribe la respuesta
///
/// Los requests malformados reciben su página de error antes de retornar
/// el error al caller.
pub fn handle_connection(
    stream: TcpStream,
    router: &Router,
    config: &Config,
) -> Result<(), ConnectionError> {
    let peer = peer_label(&stream);
    let mut writer = stream.try_clone()?;
    let mut reader = BufReader::new(stream);

    let request = match Request::read_from(&mut reader, config.max_header_bytes) {
        Ok(Some(request)) => request,
        Ok(None) => {
            debug!("{} closed the connection without a request", peer);
            return Ok(());
        }
        Err(e) => {
            if let Some(mut response) = e.to_response() {
                add_common_headers(&mut response);
                info!("{} \"-\" {} -", peer, response.status().as_u16());
                if let Err(write_err) = send(response, &mut writer) {
                    debug!("{}: could not send error page: {}", peer, write_err);
                }
                linger(&mut reader);
            }
            return Err(e);
        }
    };

    let response = match BodyReader::for_request(&request, &mut reader) {
        Ok(mut body) => {
            let response = router.route(config, &request, &mut body);
            if let Err(e) = body.drain() {
                debug!("{}: could not drain request body: {}", peer, e);
            }
            response
        }
        Err(e) => {
            let mut response = HttpError::BadRequest(format!("Bad request: {}", e)).into_response();
            add_common_headers(&mut response);
            response
        }
    };

    let status = response.status();
    let sent = send(response, &mut writer)?;
    linger(&mut reader);
    info!(
        "{} \"{} {} {}\" {} {}",
        peer,
        request.method().as_str(),
        request.target(),
        request.version(),
        status.as_u16(),
        sent
    );

    Ok(())
}

fn send(response: Response, writer: &mut TcpStream) -> io::Result<u64> {
    let sent = response.write_to(writer)?;
    // El cliente ya puede leer hasta EOF
    let _ = writer.shutdown(Shutdown::Write);
    Ok(sent)
}

/// Descarta lo que el cliente siga enviando hasta que cierre su lado
///
/// Cerrar un socket con datos sin leer provoca un RST, y el cliente puede
/// perder la respuesta que todavía no leyó.
fn linger(reader: &mut BufReader<TcpStream>) {
    if reader.get_ref().set_read_timeout(Some(LINGER_TIMEOUT)).is_ok() {
        let _ = io::copy(&mut reader.by_ref().take(LINGER_MAX_BYTES), &mut io::sink());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ParseError;
    use std::fs;
    use std::io::Write;
    use tempfile::TempDir;

    fn ephemeral_listener() -> TcpListener {
        TcpListener::bind("127.0.0.1:0").expect("bind")
    }

    fn test_config() -> (TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("hello.txt"), b"hello").unwrap();
        let config = Config {
            directory: dir.path().to_path_buf(),
            max_header_bytes: 1024,
            ..Config::default()
        };
        (dir, config)
    }

    /// Envía `raw` a `handle_connection` y retorna la respuesta cruda
    fn exchange(config: Config, raw: &[u8]) -> (String, Result<(), ConnectionError>) {
        let listener = ephemeral_listener();
        let addr = listener.local_addr().unwrap();

        let t = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            handle_connection(stream, &Router::file_server(), &config)
        });

        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(raw).unwrap();
        client.shutdown(Shutdown::Write).unwrap();

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        let result = t.join().unwrap();

        (String::from_utf8_lossy(&buf).into_owned(), result)
    }

    #[test]
    fn test_get_file() {
        let (_dir, config) = test_config();
        let (text, result) = exchange(config, b"GET /hello.txt HTTP/1.0\r\n\r\n");

        assert!(result.is_ok());
        assert!(text.starts_with("HTTP/1.0 200 OK\r\n"));
        assert!(text.contains("Server: upload_server/"));
        assert!(text.contains("Connection: close"));
        assert!(text.ends_with("\r\n\r\nhello"));
    }

    #[test]
    fn test_parse_error() {
        let (_dir, config) = test_config();
        let (text, result) = exchange(config, b"\x00\x01\x02\x03garbage");

        assert!(text.starts_with("HTTP/1.0 400 Bad Request"));
        assert!(matches!(result, Err(ConnectionError::Parse(_))));
    }

    #[test]
    fn test_unsupported_method() {
        let (_dir, config) = test_config();
        let (text, result) = exchange(config, b"DELETE /hello.txt HTTP/1.0\r\n\r\n");

        assert!(text.starts_with("HTTP/1.0 501 Not Implemented"));
        assert!(matches!(
            result,
            Err(ConnectionError::Parse(ParseError::UnsupportedMethod(_)))
        ));
    }

    #[test]
    fn test_head_too_large() {
        let (_dir, config) = test_config();
        let raw = format!("GET / HTTP/1.0\r\nX-Big: {}\r\n\r\n", "a".repeat(2048));
        let (text, result) = exchange(config, raw.as_bytes());

        assert!(text.starts_with("HTTP/1.0 400 Bad Request"));
        assert!(matches!(
            result,
            Err(ConnectionError::Parse(ParseError::HeadTooLarge(1024)))
        ));
    }

    #[test]
    fn test_invalid_content_length() {
        let (_dir, config) = test_config();
        let (text, result) = exchange(config, b"POST / HTTP/1.0\r\nContent-Length: abc\r\n\r\n");

        assert!(result.is_ok());
        assert!(text.starts_with("HTTP/1.0 400 Bad Request"));
        assert!(text.contains("Bad request: Invalid Content-Length: abc"));
        assert!(text.contains("Server: upload_server/"));
        assert!(text.contains("Content-Type: text/html; charset=utf-8"));
    }

    #[test]
    fn test_upload_over_socket() {
        let (dir, config) = test_config();
        let body = b"--b\r\n\
                     Content-Disposition: form-data; name=\"file\"; filename=\"up.bin\"\r\n\r\n\
                     \x00\x01\x02\r\n--b--\r\n";
        let mut raw = format!(
            "POST / HTTP/1.0\r\nContent-Type: multipart/form-data; boundary=b\r\nContent-Length: {}\r\n\r\n",
            body.len()
        )
        .into_bytes();
        raw.extend_from_slice(body);

        let (text, result) = exchange(config, &raw);

        assert!(result.is_ok());
        assert!(text.starts_with("HTTP/1.0 200 OK"));
        assert!(text.contains("Success:"));
        assert_eq!(fs::read(dir.path().join("up.bin")).unwrap(), b"\x00\x01\x02");
    }

    #[test]
    fn test_peer_closed_immediately() {
        let (_dir, config) = test_config();
        let listener = ephemeral_listener();
        let addr = listener.local_addr().unwrap();

        let t = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            handle_connection(stream, &Router::file_server(), &config)
        });

        drop(TcpStream::connect(addr).unwrap());

        assert!(t.join().unwrap().is_ok());
    }

    #[test]
    fn test_bind_reports_ephemeral_port() {
        let (_dir, mut config) = test_config();
        config.host = "127.0.0.1".to_string();
        config.port = 0;

        let mut server = Server::new(config);
        let addr = server.bind().unwrap();
        assert_ne!(addr.port(), 0);
        assert!(TcpStream::connect(addr).is_ok());
    }
}
