//! 测点编码派生
//!
//! 档案未填写 `metricCode` 时，由指标名称派生：
//! - 常用指标走固定对照表；
//! - 其余名称保留 ASCII 字母数字（小写），开头的数字移到末尾；
//! - 名称中含有被丢弃或替换的字符时追加名称 SHA-256 的前 8 位，
//!   保证不同名称得到不同编码。

use sha2::{Digest, Sha256};

/// 常用指标名称 → 测点编码
pub const METRIC_CODES: &[(&str, &str)] = &[
    ("开关机", "air_switch_machine"),
    ("进风温度", "air_inlet_air_temperature"),
    ("进风湿度", "air_inlet_air_humidity"),
    ("出风温度", "air_wind_temperature"),
    ("出风湿度", "air_air_humidity"),
    ("总有功功率", "el_total_active_power"),
    ("总功率因数", "el_total_power_factor"),
    ("频率", "el_frequency"),
    ("平均相电压", "el_average_phase_voltage"),
    ("平均线电压", "el_average_line_voltage"),
    ("平均电流", "el_average_current"),
    ("总无功功率", "el_total_reactive_power"),
    ("A-B线电压", "el_a_to_b_line_voltage"),
    ("C-B线电压", "el_c_to_b_line_voltage"),
    ("A-C线电压", "el_a_to_c_line_voltage"),
    ("A相电流", "el_a_phase_current"),
    ("B相电流", "el_b_phase_current"),
    ("C相电流", "el_c_phase_current"),
    ("A相有功功率", "el_a_phase_active_power"),
    ("B相有功功率", "el_b_phase_active_power"),
    ("C相有功功率", "el_c_phase_active_power"),
    ("总视在功率", "el_total_apparent_power"),
    ("有功功率(单相)", "pdu_active_power_single_phase"),
    ("功率因数(单相)", "pdu_power_factor_single_phase"),
    ("无功功率(单相)", "pdu_reactive_power_single_phase"),
    ("机组状态", "air_machine_running_state"),
    ("压缩机", "air_compressor_working_condition"),
    ("温度", "device_temperature"),
    ("湿度", "device_humidity"),
    ("烟感状态", "device_smoking"),
    ("水浸状态", "device_flooding"),
    ("单体电压", "battery_voltage"),
    ("单体内阻", "battery_resistance"),
    ("单体温度", "battery_temperature"),
    ("组电压", "battery_group_voltage"),
    ("组电流", "battery_group_discharge_current"),
    ("平均温度", "average_temperature_of_battery_pack"),
    ("单体平均电压", "average_voltage_of_battery_pack"),
    ("平均单体内阻", "pack_avg_resistance"),
];

/// 查对照表（名称需已去除空白）
pub fn lookup_metric_code(name: &str) -> Option<&'static str> {
    METRIC_CODES
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, code)| *code)
}

/// 由指标名称派生测点编码，名称为空时返回空串
pub fn derive_metric_code(metric_name: &str) -> String {
    let name: String = metric_name.chars().filter(|c| !c.is_whitespace()).collect();
    if name.is_empty() {
        return String::new();
    }
    if let Some(code) = lookup_metric_code(&name) {
        return code.to_string();
    }

    let mut base = String::with_capacity(name.len());
    let mut lossy = false;
    for ch in name.chars() {
        match ch {
            'a'..='z' | '0'..='9' | '_' => base.push(ch),
            'A'..='Z' => base.push(ch.to_ascii_lowercase()),
            '０'..='９' => {
                lossy = true;
                base.push(char::from(b'0' + (ch as u32 - '０' as u32) as u8));
            }
            '(' | '（' | '-' | '{' => {
                lossy = true;
                base.push('_');
            }
            _ => lossy = true,
        }
    }
    let base = move_leading_digits(base.trim_matches('_'));

    if base.is_empty() {
        format!("m_{}", short_hash(&name))
    } else if lossy {
        format!("{}_{}", base, short_hash(&name))
    } else {
        base
    }
}

fn move_leading_digits(code: &str) -> String {
    let split = code
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(code.len());
    let (digits, rest) = code.split_at(split);
    format!("{}{}", rest, digits)
}

fn short_hash(name: &str) -> String {
    let digest = Sha256::digest(name.as_bytes());
    hex::encode(&digest[..4])
}
