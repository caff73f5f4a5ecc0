//! 传输错误类型定义

/// 传输层错误
///
/// `Timeout` 单独列出：它是可恢复的截止时间到期，不是链路故障。
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// 无法建立链路
    #[error("connect failed: {0}")]
    Connect(String),

    /// 未连接时读写
    #[error("transport not connected")]
    NotConnected,

    /// 对端关闭连接
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// 读取截止时间到期，期间无数据
    #[error("read timed out")]
    Timeout,

    /// 配置错误
    #[error("invalid transport config: {0}")]
    Config(String),

    /// IO 错误
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}
