//! 串口链路实现
//!
//! 基于 tokio-serial，支持 5–8 数据位、1/2 停止位、N/E/O 校验。

use crate::{READ_CHUNK_SIZE, Transport, TransportError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::debug;

/// 串口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// 端口名（/dev/ttyUSB0、COM3）
    pub port_name: String,
    /// 波特率
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// 数据位（5、6、7、8）
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    /// 停止位（1、2）
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    /// 校验（N、E、O）
    #[serde(default = "default_parity")]
    pub parity: char,
    /// 单次读取超时（毫秒）
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

fn default_parity() -> char {
    'N'
}

fn default_read_timeout() -> u64 {
    200
}

impl SerialConfig {
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            parity: default_parity(),
            read_timeout_ms: default_read_timeout(),
        }
    }

    fn data_bits(&self) -> Result<DataBits, TransportError> {
        match self.data_bits {
            5 => Ok(DataBits::Five),
            6 => Ok(DataBits::Six),
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            other => Err(TransportError::Config(format!("invalid data bits: {}", other))),
        }
    }

    fn stop_bits(&self) -> Result<StopBits, TransportError> {
        match self.stop_bits {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::Two),
            other => Err(TransportError::Config(format!("invalid stop bits: {}", other))),
        }
    }

    fn parity(&self) -> Result<Parity, TransportError> {
        match self.parity.to_ascii_uppercase() {
            'N' => Ok(Parity::None),
            'E' => Ok(Parity::Even),
            'O' => Ok(Parity::Odd),
            other => Err(TransportError::Config(format!("invalid parity: {}", other))),
        }
    }
}

/// 串口链路
pub struct SerialTransport {
    config: SerialConfig,
    port: Option<SerialStream>,
}

impl SerialTransport {
    pub fn new(config: SerialConfig) -> Self {
        Self { config, port: None }
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    fn port(&mut self) -> Result<&mut SerialStream, TransportError> {
        self.port.as_mut().ok_or(TransportError::NotConnected)
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.port = None;

        let port = tokio_serial::new(&self.config.port_name, self.config.baud_rate)
            .data_bits(self.config.data_bits()?)
            .stop_bits(self.config.stop_bits()?)
            .parity(self.config.parity()?)
            .flow_control(tokio_serial::FlowControl::None)
            .timeout(Duration::from_millis(self.config.read_timeout_ms))
            .open_native_async()
            .map_err(|e| TransportError::Connect(format!("{}: {}", self.config.port_name, e)))?;

        debug!(
            port = %self.config.port_name,
            baud_rate = self.config.baud_rate,
            "serial transport opened"
        );
        self.port = Some(port);
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let port = self.port()?;
        port.write_all(data).await?;
        port.flush().await?;
        debug!(bytes = data.len(), "serial transport wrote");
        Ok(())
    }

    async fn read(&mut self) -> Result<Vec<u8>, TransportError> {
        let timeout = Duration::from_millis(self.config.read_timeout_ms);
        let port = self.port()?;
        read_chunk(port, timeout).await
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.port.take().is_some() {
            debug!(port = %self.config.port_name, "serial transport closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }
}

/// 单次限时读取；读到 0 字节表示端口已断开
async fn read_chunk<R>(reader: &mut R, timeout: Duration) -> Result<Vec<u8>, TransportError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = [0u8; READ_CHUNK_SIZE];
    match tokio::time::timeout(timeout, reader.read(&mut buf)).await {
        Ok(Ok(0)) => Err(TransportError::ConnectionClosed),
        Ok(Ok(n)) => Ok(buf[..n].to_vec()),
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::TimedOut => Err(TransportError::Timeout),
        Ok(Err(e)) => Err(TransportError::Io(e)),
        Err(_) => Err(TransportError::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{"port_name": "/dev/ttyUSB0", "baud_rate": 19200, "parity": "E"}"#;
        let config: SerialConfig = serde_json::from_str(json).expect("config");
        assert_eq!(config.port_name, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, 19200);
        assert_eq!(config.data_bits, 8);
        assert_eq!(config.stop_bits, 1);
        assert_eq!(config.parity().expect("parity"), Parity::Even);
    }

    #[test]
    fn test_invalid_line_settings() {
        let mut config = SerialConfig::new("/dev/ttyUSB0", 9600);
        config.data_bits = 9;
        assert!(matches!(config.data_bits(), Err(TransportError::Config(_))));

        config.stop_bits = 3;
        assert!(matches!(config.stop_bits(), Err(TransportError::Config(_))));

        config.parity = 'X';
        assert!(matches!(config.parity(), Err(TransportError::Config(_))));
    }

    #[tokio::test]
    async fn test_read_chunk_eof_is_connection_closed() {
        let timeout = Duration::from_millis(100);
        let err = read_chunk(&mut tokio::io::empty(), timeout)
            .await
            .expect_err("eof");
        assert!(matches!(err, TransportError::ConnectionClosed));

        let mut reply: &[u8] = b"(220.1\r";
        let data = read_chunk(&mut reply, timeout).await.expect("data");
        assert_eq!(data, b"(220.1\r".to_vec());
    }

    #[tokio::test]
    async fn test_missing_port_fails_to_connect() {
        let mut transport = SerialTransport::new(SerialConfig::new("/dev/devpoll-missing", 9600));
        let err = transport.connect().await.expect_err("no such port");
        assert!(matches!(err, TransportError::Connect(_)));
        assert!(!transport.is_connected());
    }
}
