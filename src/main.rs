//! # Upload Server - Entry Point
//! src/main.rs
//!
//! Punto de entrada del servidor. Lee la configuración (CLI o variables de
//! entorno), valida el directorio raíz y atiende conexiones hasta que el
//! proceso termina.
//!
//! El nivel de log se controla con `RUST_LOG` (por defecto `info`).

use anyhow::Context;
use upload_server::config::Config;
use upload_server::server::Server;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::new()
        .resolve()
        .context("failed to load configuration")?;
    config.log_summary();

    let address = config.address();
    Server::new(config)
        .run()
        .with_context(|| format!("server on {} stopped", address))
}
