//! # Módulo HTTP
//!
//! Este módulo implementa el protocolo HTTP/1.0 desde cero, sin usar
//! librerías de alto nivel. Incluye:
//!
//! - Parsing del head de los requests
//! - Lectura del body (largo fijo o chunked) directamente del socket
//! - Construcción de responses HTTP con `Content-Length` exacto
//! - Manejo de status codes
//!
//! ## Especificación HTTP/1.0
//!
//! El servidor habla HTTP/1.0 (RFC 1945) aunque acepta requests 1.1:
//! - Una sola petición por conexión (`Connection: close`)
//! - Las respuestas nunca usan chunked transfer encoding
//!
//! ### Formato de Response
//!
//! ```text
//! HTTP/1.0 200 OK\r\n
//! Content-Type: text/html; charset=utf-8\r\n
//! Content-Length: 13\r\n
//! \r\n
//! <p>hola</p>
//! ```

pub mod body;      // Lectura del body del request
pub mod request;   // Parsing de HTTP requests
pub mod response;  // Construcción de HTTP responses
pub mod status;    // Códigos de estado HTTP

// Re-exportamos los tipos principales para facilitar su uso
pub use body::BodyReader;
pub use request::{Method, ParseError, Request};
pub use response::{Body, Response};
pub use status::StatusCode;
