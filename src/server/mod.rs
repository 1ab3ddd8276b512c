//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Este módulo implementa el servidor TCP que:
//! 1. Escucha en un puerto
//! 2. Acepta conexiones entrantes, cada una en su propio thread
//! 3. Lee el head del request y arma el lector del body
//! 4. Despacha al router y envía la respuesta
//!
//! Un fallo en una conexión (request malformado, cliente que corta) se
//! registra y termina solo ese thread.

pub mod tcp;

// Re-exportar para facilitar el uso
pub use tcp::{handle_connection, Server};
