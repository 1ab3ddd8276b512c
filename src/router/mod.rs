//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Despacha cada request al handler de su método HTTP.
//!
//! ## Arquitectura
//!
//! ```text
//! Request → Router → Handler(config, request, body) → Response
//! ```
//!
//! Todos los paths los atiende el mismo handler; lo que cambia es el
//! método. Un método sin handler registrado recibe 501 Not Implemented.

use crate::config::Config;
use crate::handlers::{get_handler, head_handler, post_handler};
use crate::http::{Method, Request, Response, StatusCode};
use std::io::Read;

/// Valor del header `Server`
pub const SERVER_NAME: &str = concat!("upload_server/", env!("CARGO_PKG_VERSION"));

/// Tipo de función handler
///
/// Recibe la configuración compartida, el request ya parseado y el body
/// (vacío si el request no trae uno).
pub type Handler = fn(&Config, &Request, &mut dyn Read) -> Response;

/// Router que mapea métodos a handlers
pub struct Router {
    routes: Vec<(Method, Handler)>,
}

impl Router {
    /// Crea un nuevo router vacío
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Router del servidor de archivos: GET, HEAD y POST
    pub fn file_server() -> Self {
        let mut router = Self::new();
        router.register(Method::GET, get_handler);
        router.register(Method::HEAD, head_handler);
        router.register(Method::POST, post_handler);
        router
    }

    /// Registra el handler de un método, reemplazando el anterior si existía
    ///
    /// # Ejemplo
    /// ```
    /// use std::io::Read;
    /// use upload_server::config::Config;
    /// use upload_server::http::{Method, Request, Response, StatusCode};
    /// use upload_server::router::Router;
    ///
    /// fn ok_handler(_: &Config, _: &Request, _: &mut dyn Read) -> Response {
    ///     Response::new(StatusCode::Ok).with_body_bytes(b"ok".to_vec())
    /// }
    ///
    /// let mut router = Router::new();
    /// router.register(Method::GET, ok_handler);
    /// ```
    pub fn register(&mut self, method: Method, handler: Handler) {
        self.routes.retain(|(m, _)| *m != method);
        self.routes.push((method, handler));
    }

    /// Ejecuta el handler del método del request
    ///
    /// Agrega a la respuesta los headers comunes.
    pub fn route(&self, config: &Config, request: &Request, body: &mut dyn Read) -> Response {
        let handler = self
            .routes
            .iter()
            .find(|(method, _)| *method == request.method())
            .map(|(_, handler)| *handler);

        let mut response = match handler {
            Some(handler) => handler(config, request, body),
            None => Response::error(
                StatusCode::NotImplemented,
                &format!("Unsupported method ({})", request.method().as_str()),
            ),
        };
        add_common_headers(&mut response);
        response
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::file_server()
    }
}

/// Agrega headers comunes a todas las respuestas
pub fn add_common_headers(response: &mut Response) {
    response.add_header("Server", SERVER_NAME);
    response.add_header("Connection", "close");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn ok_handler(_: &Config, _: &Request, _: &mut dyn Read) -> Response {
        Response::new(StatusCode::Ok).with_body_bytes(b"ok".to_vec())
    }

    fn echo_handler(_: &Config, _: &Request, body: &mut dyn Read) -> Response {
        let mut data = Vec::new();
        body.read_to_end(&mut data).unwrap();
        Response::new(StatusCode::Ok).with_body_bytes(data)
    }

    fn request(raw: &str) -> Request {
        Request::parse(raw.as_bytes()).unwrap()
    }

    #[test]
    fn test_router_creation() {
        let router = Router::new();
        assert_eq!(router.routes.len(), 0);
    }

    #[test]
    fn test_file_server_registers_three_methods() {
        let router = Router::file_server();
        assert_eq!(router.routes.len(), 3);
    }

    #[test]
    fn test_register_replaces_handler() {
        let mut router = Router::new();
        router.register(Method::GET, ok_handler);
        router.register(Method::GET, echo_handler);
        assert_eq!(router.routes.len(), 1);
    }

    #[test]
    fn test_route_found() {
        let mut router = Router::new();
        router.register(Method::GET, ok_handler);

        let response = router.route(
            &Config::default(),
            &request("GET /anything HTTP/1.0\r\n\r\n"),
            &mut io::empty(),
        );
        assert_eq!(response.status(), StatusCode::Ok);
    }

    #[test]
    fn test_unregistered_method_is_501() {
        let mut router = Router::new();
        router.register(Method::GET, ok_handler);

        let response = router.route(
            &Config::default(),
            &request("POST / HTTP/1.0\r\n\r\n"),
            &mut io::empty(),
        );
        assert_eq!(response.status(), StatusCode::NotImplemented);
    }

    #[test]
    fn test_body_reaches_handler() {
        let mut router = Router::new();
        router.register(Method::POST, echo_handler);

        let response = router.route(
            &Config::default(),
            &request("POST / HTTP/1.0\r\nContent-Length: 5\r\n\r\n"),
            &mut io::Cursor::new(b"hello".to_vec()),
        );
        assert_eq!(response.body().as_bytes(), Some(&b"hello"[..]));
    }

    #[test]
    fn test_common_headers() {
        let router = Router::new();
        let response = router.route(
            &Config::default(),
            &request("GET / HTTP/1.0\r\n\r\n"),
            &mut io::empty(),
        );

        assert_eq!(response.header("Connection"), Some("close"));
        assert!(response.header("Server").unwrap().starts_with("upload_server/"));
    }
}
