pub mod metric_code;
pub mod profile;

pub use metric_code::{METRIC_CODES, derive_metric_code, lookup_metric_code};
pub use profile::{DecodedMetricValue, DeviceInfo, DeviceProfile, MetricAddress, TransmissionMode};

use std::collections::BTreeMap;

/// 命令集：命令键 → 待发送帧。
///
/// 使用有序映射，轮询顺序在多次生成间保持一致。
pub type CommandSet = BTreeMap<String, Vec<u8>>;

/// 一次响应的解析结果：测点编码 → 解码值。
pub type DecodedValues<'a> = BTreeMap<String, DecodedMetricValue<'a>>;
