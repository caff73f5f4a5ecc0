//! # 传输能力模块
//!
//! 为协议引擎提供统一的链路抽象，支持：
//! - **TCP**：串口服务器 / 网口设备
//! - **Serial**：RS-232 / RS-485 直连
//!
//! ## 契约
//!
//! ```text
//! connect → write → read_until(deadline)* → close
//! ```
//!
//! - `read_until` 受调用方截止时间约束，到期返回 [`TransportError::Timeout`]
//! - `close` 幂等，可多次调用
//! - [`ConnectionGuard`] 在离开作用域时关闭链路（成功、超时、错误路径一致）

mod error;
mod guard;
mod serial;
mod tcp;

pub use error::TransportError;
pub use guard::ConnectionGuard;
pub use serial::{SerialConfig, SerialTransport};
pub use tcp::{TcpConfig, TcpTransport};

use async_trait::async_trait;
use tokio::time::Instant;

/// 读缓冲大小
pub(crate) const READ_CHUNK_SIZE: usize = 1024;

/// 设备链路抽象
#[async_trait]
pub trait Transport: Send {
    /// 打开链路
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// 写出完整数据
    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// 读取一段数据，超时由实现决定
    async fn read(&mut self) -> Result<Vec<u8>, TransportError>;

    /// 在截止时间前读取一段数据
    ///
    /// 到期时丢弃进行中的读取并返回 [`TransportError::Timeout`]。
    async fn read_until(&mut self, deadline: Instant) -> Result<Vec<u8>, TransportError> {
        match tokio::time::timeout_at(deadline, self.read()).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        }
    }

    /// 关闭链路（幂等）
    fn close(&mut self) -> Result<(), TransportError>;

    /// 链路是否处于打开状态
    fn is_connected(&self) -> bool;
}
