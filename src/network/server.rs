//! TCP Server
//!
//! Accepts connections and dispatches them to worker threads.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, TrySendError};

use crate::config::Config;
use crate::error::{FolioError, Result};
use crate::gateway::Gateway;
use crate::protocol::{write_response, Response};

use super::Connection;

/// How long the accept loop sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Cloneable handle that stops a running server
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Signal the server to stop accepting and exit `run`
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// TCP server for FolioDB
///
/// ## Threading:
/// - The caller's thread runs a non-blocking accept loop
/// - Accepted streams go through a bounded channel (`max_connections`)
///   to a fixed pool of `worker_threads`
/// - A full queue gets an ERROR "server busy" response and is closed
pub struct Server {
    config: Config,
    gateway: Arc<Gateway>,
    listener: TcpListener,
    shutdown: ShutdownHandle,
}

impl Server {
    /// Bind the listener on `config.listen_addr`
    pub fn bind(config: Config, gateway: Arc<Gateway>) -> Result<Self> {
        if config.worker_threads == 0 {
            return Err(FolioError::Config(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        if config.max_connections == 0 {
            return Err(FolioError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }

        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            FolioError::Network(format!("Failed to bind {}: {}", config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            gateway,
            listener,
            shutdown: ShutdownHandle::default(),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Get a handle that stops this server
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    /// Run the accept loop (blocking until shutdown)
    ///
    /// Workers finish the command in flight, then close their connection
    /// before `run` returns.
    pub fn run(&self) -> Result<()> {
        tracing::info!("Listening on {}", self.local_addr()?);

        let (sender, receiver) = channel::bounded::<TcpStream>(self.config.max_connections);
        let workers = self.spawn_workers(&receiver)?;
        drop(receiver);

        while !self.shutdown.is_shutdown() {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    tracing::trace!("Accepted connection from {}", addr);
                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::warn!("Dropping connection from {}: {}", addr, e);
                        continue;
                    }
                    match sender.try_send(stream) {
                        Ok(()) => {}
                        Err(TrySendError::Full(stream)) => reject_busy(stream, addr),
                        Err(TrySendError::Disconnected(_)) => {
                            tracing::error!("All workers exited, stopping server");
                            break;
                        }
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        tracing::info!("Shutting down, waiting for {} workers", workers.len());
        drop(sender);
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("Worker thread panicked");
            }
        }

        Ok(())
    }

    fn spawn_workers(&self, receiver: &Receiver<TcpStream>) -> Result<Vec<JoinHandle<()>>> {
        let mut workers = Vec::with_capacity(self.config.worker_threads);

        for id in 0..self.config.worker_threads {
            let receiver = receiver.clone();
            let gateway = Arc::clone(&self.gateway);
            let read_ms = self.config.read_timeout_ms;
            let write_ms = self.config.write_timeout_ms;
            let shutdown = self.shutdown.clone();

            let handle = thread::Builder::new()
                .name(format!("foliodb-worker-{}", id))
                .spawn(move || {
                    for stream in receiver.iter() {
                        let gateway = Arc::clone(&gateway);
                        let shutdown = shutdown.clone();
                        if let Err(e) = serve(stream, gateway, shutdown, read_ms, write_ms) {
                            tracing::warn!("Connection ended with error: {}", e);
                        }
                    }
                })?;
            workers.push(handle);
        }

        Ok(workers)
    }
}

fn serve(
    stream: TcpStream,
    gateway: Arc<Gateway>,
    shutdown: ShutdownHandle,
    read_ms: u64,
    write_ms: u64,
) -> Result<()> {
    let mut connection = Connection::new(stream, gateway, shutdown)?;
    connection.set_timeouts(read_ms, write_ms)?;

    let result = connection.handle();
    tracing::debug!("Connection from {} closed", connection.peer_addr());
    result
}

fn reject_busy(mut stream: TcpStream, addr: SocketAddr) {
    tracing::warn!("Connection queue full, rejecting {}", addr);
    let _ = write_response(&mut stream, &Response::error("server busy"));
}
