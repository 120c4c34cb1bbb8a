//! Server Tests
//!
//! End-to-end tests over a real TCP socket:
//! - Client operations against a running server
//! - Error and not-found responses
//! - Many clients at once
//! - Graceful shutdown

use std::io::{BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use foliodb::network::{Client, Server, ShutdownHandle};
use foliodb::protocol::{read_response, Response, Status};
use foliodb::{Config, Driver, FolioError, Gateway, Record};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

struct TestServer {
    _temp: TempDir,
    addr: SocketAddr,
    shutdown: ShutdownHandle,
    thread: Option<JoinHandle<()>>,
}

impl TestServer {
    fn start() -> Self {
        Self::start_with(Config::builder().worker_threads(4))
    }

    fn start_with(builder: foliodb::config::ConfigBuilder) -> Self {
        let temp = TempDir::new().unwrap();
        let config = builder
            .data_dir(temp.path())
            .listen_addr("127.0.0.1:0")
            .build();

        let driver = Arc::new(Driver::open(&config.data_dir).unwrap());
        let server = Server::bind(config, Arc::new(Gateway::new(driver))).unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = server.shutdown_handle();
        let thread = thread::spawn(move || server.run().unwrap());

        Self {
            _temp: temp,
            addr,
            shutdown,
            thread: Some(thread),
        }
    }

    fn client(&self) -> Client {
        Client::connect(self.addr).unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.shutdown();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn user(name: &str) -> Record {
    Record {
        age: "40".to_string(),
        company: "Initech".to_string(),
        ..Record::new(name)
    }
}

// =============================================================================
// Client Operation Tests
// =============================================================================

#[test]
fn test_ping() {
    let server = TestServer::start();
    server.client().ping().unwrap();
}

#[test]
fn test_create_fetch_remove() {
    let server = TestServer::start();
    let mut client = server.client();

    let stored = client.create(&user("alice")).unwrap();
    assert_eq!(stored, user("alice"));

    assert_eq!(client.fetch("alice").unwrap(), Some(user("alice")));
    assert!(client.remove("alice").unwrap());
    assert_eq!(client.fetch("alice").unwrap(), None);
    assert!(!client.remove("alice").unwrap());
}

#[test]
fn test_fetch_all() {
    let server = TestServer::start();
    let mut client = server.client();

    // Users collection does not exist yet
    let err = client.fetch_all().unwrap_err();
    assert!(matches!(err, FolioError::Network(_)));

    for name in ["a", "b", "c"] {
        client.create(&user(name)).unwrap();
    }

    let mut names: Vec<String> = client
        .fetch_all()
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[test]
fn test_invalid_records_are_errors_and_connection_survives() {
    let server = TestServer::start();
    let mut client = server.client();

    let err = client.create(&user("")).unwrap_err();
    assert!(matches!(err, FolioError::Network(ref msg) if msg.contains("name")));

    let err = client.create(&user("../escape")).unwrap_err();
    assert!(matches!(err, FolioError::Network(_)));

    // Same connection keeps working
    client.ping().unwrap();
}

#[test]
fn test_malformed_frame_gets_error_response() {
    let server = TestServer::start();

    let stream = TcpStream::connect(server.addr).unwrap();
    let mut writer = stream.try_clone().unwrap();
    let mut reader = BufReader::new(stream);

    // CREATE with a body that is not a record
    let body = b"not json";
    let mut frame = vec![0x01];
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(body);
    writer.write_all(&frame).unwrap();

    let response = read_response(&mut reader).unwrap();
    assert_eq!(response.status, Status::Error);

    // PING still answered on the same stream
    writer.write_all(&[0x05, 0, 0, 0, 0]).unwrap();
    let response = read_response(&mut reader).unwrap();
    assert_eq!(response.status, Status::Ok);
    assert_eq!(response.message(), "PONG");
}

#[test]
fn test_payloads_by_command() {
    let server = TestServer::start();

    let stream = TcpStream::connect(server.addr).unwrap();
    let mut writer = stream.try_clone().unwrap();
    let mut reader = BufReader::new(stream);

    // CREATE echoes the record as a JSON object
    let body = serde_json::to_vec(&user("alice")).unwrap();
    let mut frame = vec![0x01];
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    writer.write_all(&frame).unwrap();
    let response = read_response(&mut reader).unwrap();
    assert_eq!(response.status, Status::Ok);
    let stored: Record = serde_json::from_slice(&response.payload.unwrap()).unwrap();
    assert_eq!(stored, user("alice"));

    // FETCH_ALL is a JSON array
    writer.write_all(&[0x03, 0, 0, 0, 0]).unwrap();
    let response = read_response(&mut reader).unwrap();
    let all: Vec<Record> = serde_json::from_slice(&response.payload.unwrap()).unwrap();
    assert_eq!(all, vec![user("alice")]);

    // REMOVE carries no payload, nor does the NOT_FOUND that follows
    let mut frame = vec![0x04];
    frame.extend_from_slice(&5u32.to_be_bytes());
    frame.extend_from_slice(b"alice");
    writer.write_all(&frame).unwrap();
    writer.write_all(&frame).unwrap();
    let removed = read_response(&mut reader).unwrap();
    assert_eq!(removed, Response::ok(None));
    let missing = read_response(&mut reader).unwrap();
    assert_eq!(missing, Response::not_found());
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_many_clients_concurrently() {
    let server = TestServer::start();
    let addr = server.addr;

    let handles: Vec<_> = (0..16)
        .map(|i| {
            thread::spawn(move || {
                let mut client = Client::connect(addr).unwrap();
                let name = format!("user{}", i);
                client.create(&user(&name)).unwrap();
                assert_eq!(client.fetch(&name).unwrap(), Some(user(&name)));
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(server.client().fetch_all().unwrap().len(), 16);
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_shutdown_stops_run() {
    let mut server = TestServer::start();
    server.client().ping().unwrap();

    server.shutdown.shutdown();
    server.thread.take().unwrap().join().unwrap();
}

#[test]
fn test_shutdown_closes_idle_connections() {
    // One worker, no read timeout: the connected client pins the worker
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp.path())
        .listen_addr("127.0.0.1:0")
        .worker_threads(1)
        .read_timeout_ms(0)
        .build();
    let driver = Arc::new(Driver::open(temp.path()).unwrap());
    let server = Server::bind(config, Arc::new(Gateway::new(driver))).unwrap();
    let addr = server.local_addr().unwrap();
    let shutdown = server.shutdown_handle();

    let (done_tx, done_rx) = mpsc::channel();
    let thread = thread::spawn(move || {
        let result = server.run();
        let _ = done_tx.send(());
        result.unwrap();
    });

    let mut client = Client::connect(addr).unwrap();
    client.ping().unwrap();

    shutdown.shutdown();
    done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("run did not return while a client was connected");
    thread.join().unwrap();

    // Server side hung up
    assert!(client.ping().is_err());
}

#[test]
fn test_bind_rejects_zero_workers() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp.path())
        .listen_addr("127.0.0.1:0")
        .worker_threads(0)
        .build();
    let driver = Arc::new(Driver::open(temp.path()).unwrap());

    let result = Server::bind(config, Arc::new(Gateway::new(driver)));
    assert!(matches!(result, Err(FolioError::Config(_))));
}

#[test]
fn test_bind_reports_address_in_use() {
    let server = TestServer::start();
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp.path())
        .listen_addr(server.addr.to_string())
        .build();
    let driver = Arc::new(Driver::open(temp.path()).unwrap());

    let result = Server::bind(config, Arc::new(Gateway::new(driver)));
    assert!(matches!(result, Err(FolioError::Network(_))));
}
