//! 帧接收
//!
//! 一次完整的收发：连接 → 写帧 → 分片读取直到满足结束条件或总超时 → 关闭。
//!
//! ```text
//! deadline = now + total
//! loop:
//!   remaining = deadline - now        (≤ 0 → 结束)
//!   read_until(min(deadline, now + slice))
//!     ├── 超时     → 继续
//!     ├── 读错误   → 立即返回错误
//!     └── 数据     → 追加，满足结束条件 → Complete
//! 总超时：有数据 → Partial，无数据 → Timeout
//! ```
//!
//! 链路由 [`ConnectionGuard`] 持有，任一路径返回都会关闭。

use crate::error::ProtocolError;
use devpoll_transport::{ConnectionGuard, Transport, TransportError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

/// 默认总超时
pub const DEFAULT_TOTAL_TIMEOUT: Duration = Duration::from_secs(3);
/// 默认单次读取超时
pub const DEFAULT_READ_SLICE: Duration = Duration::from_millis(200);

/// 帧结束条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    /// 缓冲区最后一个字节等于该字节
    EndByte(u8),
    /// 缓冲区以该字节序列结尾
    Suffix(Vec<u8>),
}

impl Terminator {
    pub fn is_satisfied(&self, buffer: &[u8]) -> bool {
        match self {
            Self::EndByte(byte) => buffer.last() == Some(byte),
            Self::Suffix(suffix) => !suffix.is_empty() && buffer.ends_with(suffix),
        }
    }
}

/// 接收结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// 满足结束条件
    Complete(Vec<u8>),
    /// 总超时到期时的不完整数据
    Partial(Vec<u8>),
}

impl Received {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Complete(bytes) | Self::Partial(bytes) => bytes,
        }
    }
}

/// 超时受限的帧接收器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReceiver {
    total: Duration,
    slice: Duration,
}

impl Default for FrameReceiver {
    fn default() -> Self {
        Self::new(DEFAULT_TOTAL_TIMEOUT, DEFAULT_READ_SLICE)
    }
}

impl FrameReceiver {
    /// 单次读取超时不超过总超时。
    pub fn new(total: Duration, slice: Duration) -> Self {
        Self {
            total,
            slice: slice.min(total),
        }
    }

    pub fn total_timeout(&self) -> Duration {
        self.total
    }

    pub fn read_slice(&self) -> Duration {
        self.slice
    }

    /// 连接、写帧并接收应答。
    pub async fn exchange<T>(
        &self,
        transport: &mut T,
        frame: &[u8],
        terminator: &Terminator,
    ) -> Result<Received, ProtocolError>
    where
        T: Transport + ?Sized,
    {
        let mut conn = ConnectionGuard::acquire(transport).await?;
        conn.write(frame).await?;
        debug!(bytes = frame.len(), "frame sent");

        let deadline = Instant::now() + self.total;
        let mut buffer = Vec::new();

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let attempt_deadline = deadline.min(now + self.slice);

            match conn.read_until(attempt_deadline).await {
                Ok(chunk) => {
                    if chunk.is_empty() {
                        continue;
                    }
                    trace!(bytes = chunk.len(), "chunk received");
                    buffer.extend_from_slice(&chunk);
                    if terminator.is_satisfied(&buffer) {
                        return Ok(Received::Complete(buffer));
                    }
                }
                Err(TransportError::Timeout) => continue,
                Err(e) => return Err(ProtocolError::Transport(e)),
            }
        }

        if buffer.is_empty() {
            Err(ProtocolError::Timeout(format!(
                "no response within {}ms",
                self.total.as_millis()
            )))
        } else {
            Ok(Received::Partial(buffer))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminators() {
        let eoi = Terminator::EndByte(0x0D);
        assert!(eoi.is_satisfied(b"~2001\r"));
        assert!(!eoi.is_satisfied(b"~2001"));
        assert!(!eoi.is_satisfied(b""));

        let crlf = Terminator::Suffix(b"\r\n".to_vec());
        assert!(crlf.is_satisfied(b"12 34\r\n"));
        assert!(!crlf.is_satisfied(b"12 34\n\r"));
        assert!(!crlf.is_satisfied(b"\n"));
        assert!(!Terminator::Suffix(Vec::new()).is_satisfied(b"abc"));
    }

    #[test]
    fn test_slice_clamped_to_total() {
        let receiver = FrameReceiver::new(Duration::from_millis(100), Duration::from_secs(1));
        assert_eq!(receiver.read_slice(), Duration::from_millis(100));
        assert_eq!(FrameReceiver::default().total_timeout(), DEFAULT_TOTAL_TIMEOUT);
    }
}
