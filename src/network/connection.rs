//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufRead, BufReader, BufWriter, ErrorKind};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::{FolioError, Result};
use crate::gateway::Gateway;
use crate::protocol::{decode_command, read_frame, write_response, Command, Response};

use super::ShutdownHandle;

/// How often an idle connection checks for server shutdown
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Record operations
    gateway: Arc<Gateway>,

    /// Peer address for logging
    peer_addr: String,

    /// Server-wide stop signal, checked between commands
    shutdown: ShutdownHandle,

    /// Idle limit between commands (`None` waits forever)
    read_timeout: Option<Duration>,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(
        stream: TcpStream,
        gateway: Arc<Gateway>,
        shutdown: ShutdownHandle,
    ) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            gateway,
            peer_addr,
            shutdown,
            read_timeout: None,
        })
    }

    /// Configure connection timeouts (0 leaves a direction unbounded)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        self.read_timeout = (read_ms > 0).then(|| Duration::from_millis(read_ms));
        self.reader.get_ref().set_read_timeout(self.read_timeout)?;
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }

        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads commands in a loop and sends responses.
    /// Returns on disconnect, on server shutdown, or on an error.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            if !self.wait_for_request()? {
                return Ok(());
            }

            let frame = match read_frame(&mut self.reader) {
                Ok(frame) => frame,
                Err(FolioError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Client {} disconnected ({:?})", self.peer_addr, e.kind());
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    let _ = self.send_response(Response::error(&e.to_string()));
                    return Err(e);
                }
            };

            // Whole frame consumed, so a bad command leaves the stream in sync
            let command = match decode_command(&frame) {
                Ok(cmd) => cmd,
                Err(e) => {
                    tracing::warn!("Bad command from {}: {}", self.peer_addr, e);
                    self.send_response(Response::error(&e.to_string()))?;
                    continue;
                }
            };

            tracing::trace!("Received command from {}: {:?}", self.peer_addr, command);

            let response = self.execute_command(command);

            if let Err(e) = self.send_response(response) {
                if let FolioError::Io(ref io_err) = e {
                    if is_disconnect(io_err.kind()) || io_err.kind() == ErrorKind::BrokenPipe {
                        tracing::debug!(
                            "Client {} disconnected before response could be sent: {}",
                            self.peer_addr,
                            e
                        );
                        return Ok(());
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Block until the next request starts arriving
    ///
    /// Returns `false` when the session should end quietly: the client went
    /// away, sat idle past the read timeout, or the server is shutting down.
    fn wait_for_request(&mut self) -> Result<bool> {
        if !self.reader.buffer().is_empty() {
            return Ok(true);
        }

        let idle_since = Instant::now();
        self.reader
            .get_ref()
            .set_read_timeout(Some(IDLE_POLL_INTERVAL))?;

        let ready = loop {
            if self.shutdown.is_shutdown() {
                tracing::debug!("Closing {} for shutdown", self.peer_addr);
                break false;
            }

            match self.reader.fill_buf() {
                Ok(buf) => break !buf.is_empty(),
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    if let Some(limit) = self.read_timeout {
                        if idle_since.elapsed() >= limit {
                            tracing::debug!("Client {} idle, closing", self.peer_addr);
                            break false;
                        }
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) if is_disconnect(e.kind()) => break false,
                Err(e) => return Err(e.into()),
            }
        };

        // Mid-frame reads use the configured timeout again
        self.reader.get_ref().set_read_timeout(self.read_timeout)?;
        Ok(ready)
    }

    /// Execute a command and return a response
    fn execute_command(&self, command: Command) -> Response {
        let result = match command {
            Command::Create { record } => self
                .gateway
                .create(record)
                .and_then(|stored| json_response(&stored)),
            Command::Fetch { name } => match self.gateway.fetch(&name) {
                Ok(Some(record)) => json_response(&record),
                Ok(None) => Ok(Response::not_found()),
                Err(e) => Err(e),
            },
            Command::FetchAll => self
                .gateway
                .fetch_all()
                .and_then(|records| json_response(&records)),
            Command::Remove { name } => match self.gateway.remove(&name) {
                Ok(true) => Ok(Response::ok(None)),
                Ok(false) => Ok(Response::not_found()),
                Err(e) => Err(e),
            },
            Command::Ping => Ok(Response::ok(Some(b"PONG".to_vec()))),
        };

        result.unwrap_or_else(|e| Response::error(&e.to_string()))
    }

    /// Send a response to the client
    fn send_response(&mut self, response: Response) -> Result<()> {
        write_response(&mut self.writer, &response)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn json_response<T: Serialize + ?Sized>(value: &T) -> Result<Response> {
    let body = serde_json::to_vec(value).map_err(|e| FolioError::Encoding(e.to_string()))?;
    Ok(Response::ok(Some(body)))
}

/// EOF, reset, abort and read timeouts all end the session quietly
fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::WouldBlock
            | ErrorKind::TimedOut
    )
}
