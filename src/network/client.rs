//! Blocking Client
//!
//! Speaks the wire protocol to a running server.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use serde::de::DeserializeOwned;

use crate::error::{FolioError, Result};
use crate::gateway::Record;
use crate::protocol::{read_response, write_command, Command, Response, Status};

/// A single connection to a FolioDB server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| FolioError::Network(format!("Failed to connect: {}", e)))?;
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Store a record; returns the record as stored by the server
    pub fn create(&mut self, record: &Record) -> Result<Record> {
        let response = self.call(&Command::Create {
            record: record.clone(),
        })?;
        match response.status {
            Status::Ok => decode_payload(&response),
            _ => Err(unexpected(&response)),
        }
    }

    /// Load a record; `None` if the server has no such record
    pub fn fetch(&mut self, name: &str) -> Result<Option<Record>> {
        let response = self.call(&Command::Fetch {
            name: name.to_string(),
        })?;
        match response.status {
            Status::Ok => decode_payload(&response).map(Some),
            Status::NotFound => Ok(None),
            Status::Error => Err(unexpected(&response)),
        }
    }

    /// Load every record
    pub fn fetch_all(&mut self) -> Result<Vec<Record>> {
        let response = self.call(&Command::FetchAll)?;
        match response.status {
            Status::Ok => decode_payload(&response),
            _ => Err(unexpected(&response)),
        }
    }

    /// Delete a record; `false` if it did not exist
    pub fn remove(&mut self, name: &str) -> Result<bool> {
        let response = self.call(&Command::Remove {
            name: name.to_string(),
        })?;
        match response.status {
            Status::Ok => Ok(true),
            Status::NotFound => Ok(false),
            Status::Error => Err(unexpected(&response)),
        }
    }

    /// Round-trip a PING
    pub fn ping(&mut self) -> Result<()> {
        let response = self.call(&Command::Ping)?;
        match response.status {
            Status::Ok => Ok(()),
            _ => Err(unexpected(&response)),
        }
    }

    /// Send a command and wait for its response
    pub fn call(&mut self, command: &Command) -> Result<Response> {
        write_command(&mut self.writer, command)?;
        read_response(&mut self.reader)
    }
}

fn decode_payload<T: DeserializeOwned>(response: &Response) -> Result<T> {
    let payload = response.payload.as_deref().unwrap_or(&[]);
    serde_json::from_slice(payload).map_err(|e| FolioError::Decoding(e.to_string()))
}

fn unexpected(response: &Response) -> FolioError {
    match response.status {
        Status::Error => FolioError::Network(response.message()),
        status => FolioError::Protocol(format!("Unexpected response status: {:?}", status)),
    }
}
