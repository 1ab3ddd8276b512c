//! # Configuración del Servidor
//! src/config.rs
//!
//! Este módulo define la configuración del servidor con soporte para
//! argumentos CLI y variables de entorno.
//!
//! La configuración se construye una sola vez al arrancar, se valida con
//! [`Config::resolve`] y luego se comparte (solo lectura) con todos los
//! threads que atienden conexiones.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./upload_server --port 8000 --directory /srv/share
//! ./upload_server -p 9000 -d .
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 SERVE_DIR=/srv/share ./upload_server
//! ```

use crate::error::ConfigError;
use clap::Parser;
use log::info;
use std::fs;
use std::path::PathBuf;

/// Configuración del servidor de archivos
#[derive(Debug, Clone, Parser)]
#[command(name = "upload_server")]
#[command(about = "Servidor HTTP/1.0 de archivos con subida via formulario multipart")]
#[command(version)]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8000", env = "HTTP_PORT")]
    pub port: u16,

    /// Directorio raíz que se sirve y donde se guardan las subidas
    #[arg(short, long, default_value = ".", env = "SERVE_DIR")]
    pub directory: PathBuf,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "0.0.0.0", env = "HTTP_HOST")]
    pub host: String,

    /// Tamaño máximo del head de un request (request line + headers)
    #[arg(long = "max-header-bytes", default_value = "65536", env = "MAX_HEADER_BYTES")]
    pub max_header_bytes: usize,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use upload_server::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "0.0.0.0:8000");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Valida los valores que no dependen del sistema de archivos
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_header_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max header bytes must be >= 1".to_string(),
            ));
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".to_string()));
        }
        Ok(())
    }

    /// Valida la configuración y deja `directory` como path absoluto canónico
    ///
    /// Todas las rutas derivadas de requests se calculan a partir de este
    /// directorio, así que debe existir y ser un directorio.
    pub fn resolve(mut self) -> Result<Self, ConfigError> {
        self.validate()?;

        let canonical = fs::canonicalize(&self.directory).map_err(|source| {
            ConfigError::MissingDirectory {
                path: self.directory.clone(),
                source,
            }
        })?;

        if !canonical.is_dir() {
            return Err(ConfigError::NotADirectory(canonical));
        }

        self.directory = canonical;
        Ok(self)
    }

    /// Registra un resumen de la configuración
    pub fn log_summary(&self) {
        info!("serving {} on http://{}/", self.directory.display(), self.address());
        info!("max request head: {} bytes", self.max_header_bytes);
    }
}

impl Default for Config {
    /// Configuración por defecto (igual a la del CLI)
    fn default() -> Self {
        Self {
            port: 8000,
            directory: PathBuf::from("."),
            host: "0.0.0.0".to_string(),
            max_header_bytes: 64 * 1024,
        }
    }
}
