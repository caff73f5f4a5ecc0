//! 协议错误类型定义

use devpoll_transport::TransportError;

/// 协议引擎错误
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// 配置错误（HEX 字段非法、缺少必填项、不支持的数据类型或字节序）
    #[error("config error: {0}")]
    Config(String),

    /// 链路错误（连接、写入、读取失败）
    #[error("transport error: {0}")]
    Transport(TransportError),

    /// 超时且未收到任何数据
    #[error("timeout: {0}")]
    Timeout(String),

    /// 超时时只收到不完整的帧
    #[error("incomplete frame: {0}")]
    IncompleteFrame(String),

    /// 数据解析错误
    #[error("data parse error: {0}")]
    DataParse(String),
}

impl ProtocolError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<TransportError> for ProtocolError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => Self::Timeout("transport read timed out".to_string()),
            other => Self::Transport(other),
        }
    }
}
