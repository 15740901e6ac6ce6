//! spectrosim: a TCP spectrometer simulator
//!
//! Clients send newline-delimited JSON commands over a persistent
//! connection and receive simulated spectral datasets in response:
//! - Client → server: {"command": "<name>"}
//! - Server → client: {"wavelengths": [...], "intensities": [...]}
//!
//! Features:
//! - Six simulated reference sources (dark, white, attenuated white,
//!   mercury, neon, aiming beam)
//! - Concurrent clients, one task per connection
//! - Malformed input is logged and dropped without closing anything
//! - Configuration via CLI arguments or TOML file

mod config;
mod framer;
mod registry;
mod server;
mod spectrum;

use config::Config;
use server::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        host = %config.host,
        port = config.port,
        wavelength_min = config.wavelength_min,
        wavelength_max = config.wavelength_max,
        num_points = config.num_points,
        "Starting spectrosim server"
    );

    // Bind failures are fatal; everything after this point is contained
    // per-connection.
    let server = Server::bind(&config).await?;
    info!(address = %server.local_addr()?, "Server listening");

    let handle = server.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            handle.stop();
        }
    });

    server.run().await?;
    info!("Server stopped");
    Ok(())
}
