//! 设备档案校验
//!
//! 在生成命令之前检查档案完整性，一次性列出所有问题。

use crate::byte_order::ByteOrder;
use crate::decode::{DataType, TextDataType};
use crate::error::ProtocolError;
use domain::{DeviceProfile, MetricAddress, TransmissionMode};
use std::collections::HashSet;

/// 校验档案，所有问题合并为一个配置错误返回
pub fn validate_profile(profile: &DeviceProfile) -> Result<(), ProtocolError> {
    let issues = profile_issues(profile);
    if issues.is_empty() {
        return Ok(());
    }
    Err(ProtocolError::Config(format!(
        "profile {} is invalid: {}",
        profile.dev.name,
        issues.join("; ")
    )))
}

/// 档案问题列表
pub fn profile_issues(profile: &DeviceProfile) -> Vec<String> {
    let mut issues = Vec::new();
    let dev = &profile.dev;

    if profile.addrs.is_empty() {
        issues.push("no metric addresses configured".to_string());
    }
    if dev.code.trim().is_empty() || dev.dev_type.trim().is_empty() {
        issues.push("device code or devType is not set".to_string());
    }

    let mode = profile.transmission_mode();
    match mode {
        TransmissionMode::Framed => {
            for (field, value) in [
                ("cid1", &dev.cid1),
                ("version", &dev.version),
                ("addr", &dev.addr),
            ] {
                if value.trim().is_empty() {
                    issues.push(format!("device {} is not set", field));
                }
            }
            if dev.crc_num == 0 {
                issues.push("device crcNum is not set".to_string());
            }
        }
        TransmissionMode::Delimited => {
            for (field, value) in [
                ("revPre", &dev.rev_pre),
                ("revSuf", &dev.rev_suf),
                ("sendSuf", &dev.send_suf),
                ("separator", &dev.separator),
            ] {
                if value.is_empty() {
                    issues.push(format!("device {} is not set", field));
                }
            }
        }
    }

    let mut codes = HashSet::new();
    for addr in &profile.addrs {
        if addr.metric_name.trim().is_empty() {
            issues.push(format!("metric {:?} has no metricName", addr.metric_code));
        }
        // 解析结果按编码聚合，编码必须存在且唯一
        let code = addr.metric_code.trim();
        if code.is_empty() {
            issues.push(format!("{} has no metricCode", addr.metric_name));
        } else if !codes.insert(code) {
            issues.push(format!("metricCode {} is used more than once", code));
        }
        if addr.command.trim().is_empty() {
            issues.push(format!("{} has no command", addr.metric_name));
        }
        match mode {
            TransmissionMode::Framed => framed_address_issues(addr, &mut issues),
            TransmissionMode::Delimited => text_address_issues(addr, &mut issues),
        }
    }
    issues
}

fn text_address_issues(addr: &MetricAddress, issues: &mut Vec<String>) {
    if addr.metric_index == 0 && addr.length == 0 {
        issues.push(format!("{} needs metricIndex or length", addr.metric_name));
    }
    match TextDataType::parse(&addr.data_type) {
        Ok(TextDataType::Map) if addr.re_map.trim().is_empty() => {
            issues.push(format!("{} is MAP but has no reMap", addr.metric_name));
        }
        Ok(_) => {}
        Err(e) => issues.push(format!("{}: {}", addr.metric_name, e)),
    }
}

fn framed_address_issues(addr: &MetricAddress, issues: &mut Vec<String>) {
    if addr.length == 0 {
        issues.push(format!("{} has no data length", addr.metric_name));
    }
    let data_type = DataType::parse(&addr.data_type);
    let byte_order = ByteOrder::parse(&addr.byte_order);

    if let Err(e) = &data_type {
        issues.push(format!("{}: {}", addr.metric_name, e));
    }
    if let Err(e) = &byte_order {
        issues.push(format!("{}: {}", addr.metric_name, e));
    }

    if let Ok(data_type) = data_type {
        if let Some(width) = data_type.width() {
            if addr.length > 0 && addr.length < width {
                issues.push(format!(
                    "{} length {} is shorter than {:?} ({} bytes)",
                    addr.metric_name, addr.length, data_type, width
                ));
            }
        }
        if let (true, Some(width), Ok(order)) =
            (data_type.needs_byte_order(), data_type.width(), byte_order)
        {
            if !order.supports_width(width) {
                issues.push(format!(
                    "{} byte order {} cannot read {:?}",
                    addr.metric_name, order, data_type
                ));
            }
        }
    }
}
