//! TCP server for the spectrometer simulator.
//!
//! Accepts connections, frames newline-delimited JSON commands, and
//! writes back simulated spectra. One tokio task per connection; the
//! only cross-task state is the client roster.

use crate::config::Config;
use crate::framer::Framer;
use crate::registry::CommandRegistry;
use crate::spectrum::{Spectrum, SpectrumGenerator};
use bytes::BytesMut;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, trace, warn};

/// Maximum number of concurrent connections
const MAX_CONNECTIONS: usize = 1024;

/// Read chunk size
const READ_CHUNK_SIZE: usize = 4096;

/// Shared set of active connections.
///
/// Every mutation goes through the lock; handlers remove their own
/// entry via a guard so the roster never leaks a closed connection.
#[derive(Clone, Default)]
pub struct Roster {
    connections: Arc<Mutex<HashMap<u64, SocketAddr>>>,
    next_id: Arc<AtomicU64>,
}

impl Roster {
    fn insert(&self, peer: SocketAddr) -> RosterGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.connections.lock().unwrap().insert(id, peer);
        RosterGuard {
            connections: Arc::clone(&self.connections),
            id,
        }
    }

    pub fn count(&self) -> usize {
        self.connections.lock().unwrap().len()
    }
}

/// Removes the roster entry exactly once, on every handler exit path.
struct RosterGuard {
    connections: Arc<Mutex<HashMap<u64, SocketAddr>>>,
    id: u64,
}

impl Drop for RosterGuard {
    fn drop(&mut self) {
        self.connections.lock().unwrap().remove(&self.id);
    }
}

/// Handle for stopping a running server and inspecting its roster.
#[derive(Clone)]
pub struct ServerHandle {
    shutdown: Arc<watch::Sender<bool>>,
    roster: Roster,
}

impl ServerHandle {
    /// Request termination of the accept loop and every active handler.
    /// Handlers blocked on read unblock and close their sockets;
    /// failures while closing are swallowed.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Number of currently connected clients.
    pub fn client_count(&self) -> usize {
        self.roster.count()
    }
}

/// Server instance
pub struct Server {
    listener: TcpListener,
    registry: Arc<CommandRegistry>,
    generator: Arc<SpectrumGenerator>,
    roster: Roster,
    connection_limit: Arc<Semaphore>,
    shutdown: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Server {
    /// Bind the listening socket. A bind failure (port or address
    /// conflict) is fatal at startup and surfaces to the caller.
    pub async fn bind(config: &Config) -> Result<Self, std::io::Error> {
        let listener = TcpListener::bind(config.listen_addr()).await?;
        let registry = Arc::new(CommandRegistry::new());
        let generator = Arc::new(SpectrumGenerator::new(
            (config.wavelength_min, config.wavelength_max),
            config.num_points,
        ));

        for command in registry.commands() {
            info!(command, "Available command");
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        Ok(Server {
            listener,
            registry,
            generator,
            roster: Roster::default(),
            connection_limit: Arc::new(Semaphore::new(MAX_CONNECTIONS)),
            shutdown: Arc::new(shutdown),
            shutdown_rx,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    /// Handle for stopping this server from another task.
    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            shutdown: Arc::clone(&self.shutdown),
            roster: self.roster.clone(),
        }
    }

    /// Accept connections until stopped, spawning one handler task per
    /// client. Accepting never waits on an active connection.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut handlers = JoinSet::new();
        let mut shutdown = self.shutdown_rx.clone();

        loop {
            // Wait for a connection slot
            let permit = tokio::select! {
                permit = self.connection_limit.clone().acquire_owned() => permit?,
                _ = shutdown.changed() => break,
            };

            let (stream, peer) = tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!(error = %e, "Failed to accept connection");
                        continue;
                    }
                },
                _ = shutdown.changed() => break,
            };

            debug!(peer = %peer, "Client connected");
            let registry = Arc::clone(&self.registry);
            let generator = Arc::clone(&self.generator);
            let roster_guard = self.roster.insert(peer);
            let handler_shutdown = self.shutdown_rx.clone();

            handlers.spawn(async move {
                if let Err(e) = handle_connection(
                    stream,
                    peer,
                    registry,
                    generator,
                    handler_shutdown,
                )
                .await
                {
                    debug!(peer = %peer, error = %e, "Connection error");
                }
                debug!(peer = %peer, "Client disconnected");
                drop(roster_guard);
                drop(permit);
            });
        }

        info!("Stop requested, closing active connections");
        while handlers.join_next().await.is_some() {}
        Ok(())
    }
}

/// Handle a single client connection.
///
/// Commands are processed strictly in arrival order; this task is the
/// sole writer for its connection, so response frames never interleave.
async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    registry: Arc<CommandRegistry>,
    generator: Arc<SpectrumGenerator>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut framer = Framer::new();
    let mut chunk = BytesMut::with_capacity(READ_CHUNK_SIZE);
    let mut rng = SmallRng::from_entropy();

    loop {
        if *shutdown.borrow() {
            return Ok(());
        }

        chunk.clear();
        let n = tokio::select! {
            read = stream.read_buf(&mut chunk) => read?,
            _ = shutdown.changed() => return Ok(()),
        };
        if n == 0 {
            // Connection closed by client
            trace!(peer = %peer, "Connection closed by client");
            return Ok(());
        }

        for frame in framer.feed(&chunk) {
            match frame {
                Ok(message) => {
                    let Some(name) = message.command else {
                        debug!(peer = %peer, "Message without command field, ignoring");
                        continue;
                    };
                    match registry.lookup(&name) {
                        Some(source) => {
                            debug!(peer = %peer, command = %name, "Received command");
                            let spectrum = generator.generate(source, &mut rng);
                            write_spectrum(&mut stream, &spectrum).await?;
                            trace!(
                                peer = %peer,
                                points = spectrum.intensities.len(),
                                "Sent spectrum"
                            );
                        }
                        // No error frame back: thin clients rely on
                        // unknown commands being dropped silently.
                        None => warn!(peer = %peer, command = %name, "Unknown command"),
                    }
                }
                Err(e) => {
                    warn!(peer = %peer, error = %e, "Invalid JSON received, discarding line");
                }
            }
        }
    }
}

/// Outbound dataset frame.
#[derive(Serialize)]
struct OutboundMessage<'a> {
    wavelengths: &'a [f64],
    intensities: &'a [f64],
}

/// Serialize a spectrum as one JSON line and write it out.
async fn write_spectrum(
    stream: &mut TcpStream,
    spectrum: &Spectrum,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut frame = serde_json::to_vec(&OutboundMessage {
        wavelengths: &spectrum.wavelengths[..],
        intensities: &spectrum.intensities[..],
    })?;
    frame.push(b'\n');
    stream.write_all(&frame).await?;
    Ok(())
}
