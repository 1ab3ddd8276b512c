//! # Upload Server
//! src/lib.rs
//!
//! Servidor HTTP/1.0 de archivos con subida vía formulario
//! `multipart/form-data`. Sirve un directorio raíz (archivos y listados) y
//! permite subir archivos a cualquier subdirectorio desde el navegador.
//!
//! ## Arquitectura
//!
//! El servidor está dividido en módulos especializados:
//! - `config`: argumentos CLI y variables de entorno
//! - `error`: tipos de error compartidos
//! - `http`: parsing de requests, body y respuestas HTTP/1.0
//! - `server`: listener TCP, un thread por conexión
//! - `router`: despacho por método HTTP
//! - `handlers`: GET/HEAD (archivos y listados) y POST (subidas)
//! - `files`: resolución de paths, tipos MIME y listados HTML
//! - `upload`: parser multipart y escritura de archivos subidos
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use upload_server::config::Config;
//! use upload_server::server::Server;
//!
//! let config = Config::default().resolve().expect("directorio inválido");
//! Server::new(config).run().expect("Error al iniciar servidor");
//! ```

pub mod config;
pub mod error;
pub mod files;
pub mod handlers;
pub mod http;
pub mod router;
pub mod server;
pub mod upload;
