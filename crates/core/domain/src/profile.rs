//! 设备协议档案
//!
//! 描述一台设备的静态配置：身份信息、传输方式、收发前后缀，
//! 以及每个测点如何从响应帧中定位与解码。
//!
//! 档案由外部加载器（JSON/表格）产出并校验，加载后不可变。
//! 序列化字段名是稳定标识（`devType`、`cid1`、`startAt` 等）。

use crate::metric_code::derive_metric_code;
use serde::{Deserialize, Serialize};

/// 传输方式
///
/// 表格中使用 `电总` / `Q1`，JSON 中也接受英文别名。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransmissionMode {
    /// ASCII-HEX 编码的二进制帧（电总协议）
    #[serde(rename = "电总", alias = "FRAMED")]
    Framed,
    /// 分隔符切分的纯文本（Q1 协议）
    #[serde(rename = "Q1", alias = "DELIMITED")]
    Delimited,
}

impl TransmissionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Framed => "电总",
            Self::Delimited => "Q1",
        }
    }
}

impl Default for TransmissionMode {
    /// 未声明电总的档案按文本协议处理。
    fn default() -> Self {
        Self::Delimited
    }
}

/// 设备信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeviceInfo {
    /// 设备名称
    pub name: String,
    /// 协议编码
    pub code: String,
    /// 设备类型
    pub dev_type: String,
    /// 发送前缀
    pub send_pre: String,
    /// 发送后缀
    pub send_suf: String,
    /// 接收前缀
    pub rev_pre: String,
    /// 接收后缀
    pub rev_suf: String,
    /// CID1（HEX）
    pub cid1: String,
    /// 传输方式
    pub transmission_mode: TransmissionMode,
    /// 指标分割符
    pub separator: String,
    /// 协议版本号（HEX）
    pub version: String,
    /// 通讯地址（HEX）
    pub addr: String,
    /// CRC 位数
    pub crc_num: u32,
}

/// 测点配置
///
/// 一个可解码的测量点。多个测点可共享同一条命令（CID1/命令/命令内容相同），
/// 由一次响应同时解出。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetricAddress {
    /// 接收前缀（覆盖设备级）
    pub rev_pre: String,
    /// 命令 CID1（HEX）
    pub cid1: String,
    /// 命令 CID2（HEX）/ 文本命令
    pub command: String,
    /// 命令内容（HEX）/ 文本参数
    pub command_extra: String,
    /// 指标名称
    pub metric_name: String,
    /// 指标单位
    pub metric_unit: String,
    /// 测点编码（结果映射的键）
    pub metric_code: String,
    /// 测点序号（从 1 开始，0 表示未设置）
    pub metric_index: usize,
    /// 起始位
    pub start_at: usize,
    /// 数据长度
    pub length: usize,
    /// 枚举描述，原样透传
    pub enum_str: String,
    /// 截取偏移
    pub cut_offset: usize,
    /// 截取长度
    pub cut_length: usize,
    /// 缩放（0 表示未配置）
    pub scale: f64,
    /// 字节排序
    pub byte_order: String,
    /// 数据类型
    pub data_type: String,
    /// 值映射（JSON 对象）
    pub re_map: String,
    /// 非零告警
    pub not_zero_alarm: String,
    /// 告警描述
    pub alarm_cont: String,
    /// 偏置
    pub foundation: f64,
    /// 发送前缀（覆盖设备级）
    pub send_pre: String,
    /// 发送后缀（覆盖设备级）
    pub send_suf: String,
    /// 接收后缀（覆盖设备级）
    pub rev_suf: String,
}

impl MetricAddress {
    /// 有效缩放系数：未配置（0）时按 1 处理。
    pub fn effective_scale(&self) -> f64 {
        if self.scale == 0.0 { 1.0 } else { self.scale }
    }

    /// 应用仿射变换 `raw * scale + foundation`。
    pub fn scaled(&self, raw: f64) -> f64 {
        raw * self.effective_scale() + self.foundation
    }
}

/// 设备协议档案：设备信息 + 有序测点列表。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    pub dev: DeviceInfo,
    pub addrs: Vec<MetricAddress>,
}

impl DeviceProfile {
    pub fn new(dev: DeviceInfo, addrs: Vec<MetricAddress>) -> Self {
        Self { dev, addrs }
    }

    pub fn transmission_mode(&self) -> TransmissionMode {
        self.dev.transmission_mode
    }

    /// 为未填写编码的测点按指标名称派生编码，返回补齐的数量。
    pub fn fill_metric_codes(&mut self) -> usize {
        let mut filled = 0;
        for addr in &mut self.addrs {
            if addr.metric_code.trim().is_empty() {
                addr.metric_code = derive_metric_code(&addr.metric_name);
                filled += 1;
            }
        }
        filled
    }
}

/// 单个测点的解码结果。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedMetricValue<'a> {
    pub address: &'a MetricAddress,
    pub value: f64,
}

impl<'a> DecodedMetricValue<'a> {
    pub fn new(address: &'a MetricAddress, value: f64) -> Self {
        Self { address, value }
    }
}
