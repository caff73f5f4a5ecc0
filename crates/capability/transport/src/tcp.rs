//! TCP 链路实现
//!
//! 每次 `connect` 建立新连接，`close` 丢弃连接。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! let mut transport = TcpTransport::new(TcpConfig::new("192.168.1.100:4001"));
//! transport.connect().await?;
//! transport.write(b"Q1\r").await?;
//! let data = transport.read().await?;
//! transport.close()?;
//! ```

use crate::{READ_CHUNK_SIZE, Transport, TransportError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

/// TCP 链路配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpConfig {
    /// 目标地址（host:port）
    pub address: String,
    /// 连接超时（毫秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// 单次读取超时（毫秒）
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
}

fn default_connect_timeout() -> u64 {
    1000
}

fn default_read_timeout() -> u64 {
    1000
}

impl TcpConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            connect_timeout_ms: default_connect_timeout(),
            read_timeout_ms: default_read_timeout(),
        }
    }
}

/// TCP 链路
pub struct TcpTransport {
    config: TcpConfig,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new(config: TcpConfig) -> Self {
        Self {
            config,
            stream: None,
        }
    }

    pub fn config(&self) -> &TcpConfig {
        &self.config
    }

    fn stream(&mut self) -> Result<&mut TcpStream, TransportError> {
        self.stream.as_mut().ok_or(TransportError::NotConnected)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        // 旧连接直接丢弃，避免残留数据混入新一轮应答
        self.stream = None;

        let timeout = Duration::from_millis(self.config.connect_timeout_ms);
        let stream = match tokio::time::timeout(timeout, TcpStream::connect(&self.config.address))
            .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(TransportError::Connect(format!(
                    "{}: {}",
                    self.config.address, e
                )));
            }
            Err(_) => {
                return Err(TransportError::Connect(format!(
                    "{}: timed out after {}ms",
                    self.config.address, self.config.connect_timeout_ms
                )));
            }
        };
        stream.set_nodelay(true)?;

        debug!(address = %self.config.address, "tcp transport connected");
        self.stream = Some(stream);
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream()?;
        stream.write_all(data).await?;
        stream.flush().await?;
        debug!(bytes = data.len(), "tcp transport wrote");
        Ok(())
    }

    async fn read(&mut self) -> Result<Vec<u8>, TransportError> {
        let timeout = Duration::from_millis(self.config.read_timeout_ms);
        let stream = self.stream()?;
        let mut buf = [0u8; READ_CHUNK_SIZE];

        match tokio::time::timeout(timeout, stream.read(&mut buf)).await {
            Ok(Ok(0)) => Err(TransportError::ConnectionClosed),
            Ok(Ok(n)) => Ok(buf[..n].to_vec()),
            Ok(Err(e)) => Err(TransportError::Io(e)),
            Err(_) => Err(TransportError::Timeout),
        }
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.stream.take().is_some() {
            debug!(address = %self.config.address, "tcp transport closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_defaults() {
        let json = r#"{"address": "127.0.0.1:4001"}"#;
        let config: TcpConfig = serde_json::from_str(json).expect("config");
        assert_eq!(config.address, "127.0.0.1:4001");
        assert_eq!(config.connect_timeout_ms, 1000);
        assert_eq!(config.read_timeout_ms, 1000);
    }

    #[tokio::test]
    async fn test_io_without_connect() {
        let mut transport = TcpTransport::new(TcpConfig::new("127.0.0.1:1"));
        assert!(matches!(
            transport.write(b"x").await,
            Err(TransportError::NotConnected)
        ));
        assert!(matches!(
            transport.read().await,
            Err(TransportError::NotConnected)
        ));
        assert!(!transport.is_connected());
        transport.close().expect("close");
        transport.close().expect("close twice");
    }
}
