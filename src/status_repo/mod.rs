// Game server status via the Java edition server list ping (tokio TCP).

pub mod motd;
pub mod protocol;

use std::future::Future;
use std::time::Duration;

use bytes::BytesMut;
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::instrument;

use crate::models::ServerStatus;

pub const DEFAULT_PORT: u16 = 25565;

#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error("invalid server address {0:?}")]
    InvalidAddress(String),
    #[error("status query timed out after {0:?}")]
    Timeout(Duration),
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("protocol: {0}")]
    Protocol(String),
    #[error("status json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no map name on description line {line}")]
    MapNotFound { line: usize },
}

/// Something that can report a server's point-in-time status.
pub trait StatusSource: Send + Sync {
    fn status(&self) -> impl Future<Output = Result<ServerStatus, StatusError>> + Send;
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    description: serde_json::Value,
    players: Option<PlayersResponse>,
}

#[derive(Debug, Deserialize)]
struct PlayersResponse {
    #[serde(default)]
    online: u32,
    #[serde(default)]
    sample: Vec<PlayerSample>,
}

#[derive(Debug, Deserialize)]
struct PlayerSample {
    name: String,
}

/// Parses the JSON document of a status response.
pub fn parse_status_json(json: &str) -> Result<ServerStatus, StatusError> {
    let resp: StatusResponse = serde_json::from_str(json)?;
    let (players_online, player_sample) = match resp.players {
        Some(p) => (p.online, p.sample.into_iter().map(|s| s.name).collect()),
        None => (0, Vec::new()),
    };
    Ok(ServerStatus {
        description: motd::flatten_description(&resp.description),
        players_online,
        player_sample,
    })
}

/// Splits `host[:port]`; the port defaults to 25565.
pub fn parse_address(address: &str) -> Result<(String, u16), StatusError> {
    let invalid = || StatusError::InvalidAddress(address.to_string());
    let (host, port) = match address.rsplit_once(':') {
        Some((host, port)) => (host, port.parse::<u16>().map_err(|_| invalid())?),
        None => (address, DEFAULT_PORT),
    };
    if host.is_empty() || port == 0 {
        return Err(invalid());
    }
    Ok((host.to_string(), port))
}

pub struct JavaStatusRepo {
    host: String,
    port: u16,
    timeout: Duration,
}

impl JavaStatusRepo {
    pub fn new(address: &str, timeout: Duration) -> Result<Self, StatusError> {
        let (host, port) = parse_address(address)?;
        Ok(Self {
            host,
            port,
            timeout,
        })
    }

    async fn ping(&self) -> Result<ServerStatus, StatusError> {
        let mut stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        stream
            .write_all(&protocol::handshake_packet(&self.host, self.port))
            .await?;
        stream.write_all(&protocol::status_request_packet()).await?;

        let mut buf = BytesMut::with_capacity(4096);
        let body = loop {
            if let Some(body) = protocol::split_frame(&mut buf)? {
                break body;
            }
            if stream.read_buf(&mut buf).await? == 0 {
                return Err(StatusError::Protocol(
                    "connection closed before status response".into(),
                ));
            }
        };
        let json = protocol::decode_status_response(body)?;
        parse_status_json(&json)
    }
}

impl StatusSource for JavaStatusRepo {
    #[instrument(skip(self), fields(repo = "status", host = %self.host, port = self.port))]
    async fn status(&self) -> Result<ServerStatus, StatusError> {
        tokio::time::timeout(self.timeout, self.ping())
            .await
            .map_err(|_| StatusError::Timeout(self.timeout))?
    }
}
