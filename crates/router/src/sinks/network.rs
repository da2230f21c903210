//! NetworkWriter - UDP fire-and-forget streaming

use bytes::Bytes;
use contracts::{ContractError, Envelope, EnvelopeWriter};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, error, instrument, warn};

/// Datagram encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkFormat {
    /// Forward the routed bytes unchanged (bincode)
    #[default]
    Raw,
    /// Re-encode as JSON (human-readable, larger)
    Json,
}

/// Configuration for NetworkWriter
#[derive(Debug, Clone)]
pub struct NetworkWriterConfig {
    /// Target address
    pub addr: SocketAddr,
    /// Datagram encoding
    pub format: NetworkFormat,
    /// Datagrams above this size are skipped (UDP tops out at 65507 for IPv4)
    pub max_packet_size: usize,
}

impl NetworkWriterConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let addr_str = params
            .get("addr")
            .ok_or_else(|| "missing 'addr' parameter".to_string())?;

        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|e| format!("invalid address '{}': {}", addr_str, e))?;

        let format = match params.get("format").map(String::as_str) {
            Some("raw") | Some("bincode") | None => NetworkFormat::Raw,
            Some("json") => NetworkFormat::Json,
            Some(other) => return Err(format!("unknown format '{}'", other)),
        };

        let max_packet_size = params
            .get("max_packet_size")
            .and_then(|s| s.parse().ok())
            .unwrap_or(65000);

        Ok(Self {
            addr,
            format,
            max_packet_size,
        })
    }
}

/// Writer that sends each envelope as one UDP datagram
pub struct NetworkWriter {
    name: String,
    config: NetworkWriterConfig,
    socket: Option<UdpSocket>,
}

impl NetworkWriter {
    /// Create a new NetworkWriter
    #[instrument(name = "network_writer_new", skip(name, config))]
    pub async fn new(name: impl Into<String>, config: NetworkWriterConfig) -> std::io::Result<Self> {
        let name = name.into();
        let bind = if config.addr.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" };
        let socket = UdpSocket::bind(bind).await?;
        socket.connect(&config.addr).await?;

        debug!(sink = %name, target = %config.addr, "NetworkWriter connected");

        Ok(Self {
            name,
            config,
            socket: Some(socket),
        })
    }

    /// Create from params (for factory)
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = NetworkWriterConfig::from_params(params)
            .map_err(|e| ContractError::sink_connection(&name, e))?;

        Self::new(name.clone(), config)
            .await
            .map_err(|e| ContractError::sink_connection(&name, e.to_string()))
    }

    fn socket(&self) -> Result<&UdpSocket, ContractError> {
        self.socket
            .as_ref()
            .ok_or_else(|| ContractError::sink_write(&self.name, "socket not connected"))
    }

    fn encode(&self, data: &Bytes) -> Result<Bytes, ContractError> {
        match self.config.format {
            NetworkFormat::Raw => Ok(data.clone()),
            NetworkFormat::Json => {
                let envelope = Envelope::unmarshal(data)?;
                serde_json::to_vec(&envelope)
                    .map(Bytes::from)
                    .map_err(|e| ContractError::sink_write(&self.name, format!("json error: {}", e)))
            }
        }
    }
}

impl EnvelopeWriter for NetworkWriter {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "network_writer_write", skip(self, data), fields(sink = %self.name))]
    async fn write(&mut self, data: &Bytes) -> Result<(), ContractError> {
        let socket = self.socket()?;
        let payload = self.encode(data)?;

        if payload.len() > self.config.max_packet_size {
            warn!(
                sink = %self.name,
                size = payload.len(),
                max = self.config.max_packet_size,
                "Datagram too large, skipped"
            );
            return Ok(());
        }

        match socket.send(&payload).await {
            Ok(sent) => debug!(sink = %self.name, bytes = sent, "Sent"),
            // UDP is best-effort
            Err(e) => error!(sink = %self.name, error = %e, "UDP send failed"),
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "network_writer_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.socket = None;
        debug!(sink = %self.name, "NetworkWriter closed");
        Ok(())
    }
}
