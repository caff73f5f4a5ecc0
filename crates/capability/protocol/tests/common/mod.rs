//! 测试辅助：按脚本应答的内存链路

#![allow(dead_code)]

use async_trait::async_trait;
use devpoll_transport::{Transport, TransportError};
use std::collections::VecDeque;
use std::time::Duration;

/// 一次 read 的脚本动作
#[derive(Debug, Clone)]
pub enum Step {
    /// 立即返回数据
    Data(Vec<u8>),
    /// 延迟后返回数据
    Delayed(Duration, Vec<u8>),
    /// 读取失败
    Fail,
}

/// 脚本耗尽后 read 永不返回，模拟静默设备。
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    steps: VecDeque<Step>,
    pub written: Vec<Vec<u8>>,
    pub connects: usize,
    pub closes: usize,
    connected: bool,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
            ..Default::default()
        }
    }

    pub fn replying(chunks: &[&[u8]]) -> Self {
        Self::new(chunks.iter().map(|c| Step::Data(c.to_vec())).collect())
    }

    pub fn silent() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.connects += 1;
        self.connected = true;
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.written.push(data.to_vec());
        Ok(())
    }

    async fn read(&mut self) -> Result<Vec<u8>, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        // 延迟步骤在睡眠结束后才出队，读取被取消时脚本不丢失
        if let Some(Step::Delayed(delay, _)) = self.steps.front() {
            tokio::time::sleep(*delay).await;
        }
        match self.steps.pop_front() {
            Some(Step::Data(data)) | Some(Step::Delayed(_, data)) => Ok(data),
            Some(Step::Fail) => Err(TransportError::ConnectionClosed),
            None => std::future::pending().await,
        }
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.connected {
            self.closes += 1;
        }
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
