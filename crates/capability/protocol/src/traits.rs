//! 协议接口 Trait 定义
//!
//! 两种协议变体（电总帧协议、分隔文本协议）实现同一组操作，
//! 轮询循环只依赖本接口。
//!
//! 设计原则：
//! - 所有操作显式接收 DeviceProfile（只读借用）
//! - 命令生成与响应解析是同步纯计算，只有 send 涉及 IO
//! - 单个测点解析失败只记录日志，不影响同一响应中的其他测点

use crate::error::ProtocolError;
use async_trait::async_trait;
use devpoll_transport::Transport;
use domain::{CommandSet, DecodedValues, DeviceProfile, MetricAddress};

/// 设备协议接口
#[async_trait]
pub trait Protocol: Send + Sync {
    /// 生成命令键 → 帧的映射，共享命令键的测点只生成一帧
    fn generate_commands(&self, profile: &DeviceProfile) -> Result<CommandSet, ProtocolError>;

    /// 测点所属命令的确定性键
    fn generate_key(&self, profile: &DeviceProfile, addr: &MetricAddress) -> String;

    /// 由指定命令应答的测点（保持档案顺序）
    fn command_addrs<'a>(
        &self,
        profile: &'a DeviceProfile,
        command_key: &str,
    ) -> Vec<&'a MetricAddress> {
        profile
            .addrs
            .iter()
            .filter(|addr| self.generate_key(profile, addr) == command_key)
            .collect()
    }

    /// 一次独立的 连接 → 发送 → 接收 → 关闭
    async fn send(
        &self,
        transport: &mut dyn Transport,
        frame: &[u8],
        profile: &DeviceProfile,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// 解析应答，返回 测点编码 → 解码值
    fn parse_response<'a>(
        &self,
        data: &[u8],
        profile: &DeviceProfile,
        addrs: &[&'a MetricAddress],
    ) -> DecodedValues<'a>;
}
