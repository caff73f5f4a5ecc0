//! 数值解码
//!
//! - 帧协议：原始字节 → 整数 / IEEE 浮点 / Q16.16 定点 / 位段 / 符号-幅值
//! - 文本协议：字符串片段 → 浮点提取 / 值映射 / 二进制 / 十六进制
//!
//! 这里只负责得到原始值，缩放与偏置由 [`MetricAddress::scaled`] 统一完成。

use crate::byte_order::ByteOrder;
use crate::error::ProtocolError;
use domain::MetricAddress;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// 帧协议支持的数据类型标签
pub const FRAMED_DATA_TYPES: &[&str] = &[
    "INT8",
    "UINT8",
    "INT16",
    "UINT16",
    "INT32",
    "UINT32",
    "INT64",
    "UINT64",
    "FLOAT32",
    "FLOAT32-IEEE",
    "FLOAT64",
    "FLOAT64-IEEE",
    "FIXED",
    "UFIXED",
    "BIN2INT",
    "SIGN",
];

/// 文本协议支持的数据类型标签
pub const TEXT_DATA_TYPES: &[&str] = &["FLOAT", "MAP", "BIN2INT", "HEX2INT"];

/// Q16.16 定点缩放
const FIXED_POINT_SCALE: f64 = 65536.0;

/// 帧协议数据类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float32,
    Float64,
    /// 有符号 Q16.16
    Fixed,
    /// 无符号 Q16.16
    Ufixed,
    /// 二进制位段截取
    Bin2Int,
    /// 符号-幅值（1 或 2 字节）
    Sign,
}

impl DataType {
    pub fn parse(tag: &str) -> Result<Self, ProtocolError> {
        let value = match tag.trim().to_ascii_uppercase().as_str() {
            "INT8" => Self::Int8,
            "UINT8" => Self::Uint8,
            "INT16" => Self::Int16,
            "UINT16" => Self::Uint16,
            "INT32" => Self::Int32,
            "UINT32" => Self::Uint32,
            "INT64" => Self::Int64,
            "UINT64" => Self::Uint64,
            "FLOAT32" | "FLOAT32-IEEE" => Self::Float32,
            "FLOAT64" | "FLOAT64-IEEE" => Self::Float64,
            "FIXED" => Self::Fixed,
            "UFIXED" => Self::Ufixed,
            "BIN2INT" => Self::Bin2Int,
            "SIGN" => Self::Sign,
            "" => return Err(ProtocolError::Config("data type is not set".to_string())),
            other => {
                return Err(ProtocolError::Config(format!(
                    "unsupported data type: {}",
                    other
                )));
            }
        };
        Ok(value)
    }

    /// 固定宽度（字节）；位段与符号-幅值按实际截取长度解释，返回 None
    pub fn width(&self) -> Option<usize> {
        match self {
            Self::Int8 | Self::Uint8 => Some(1),
            Self::Int16 | Self::Uint16 => Some(2),
            Self::Int32 | Self::Uint32 | Self::Float32 | Self::Fixed | Self::Ufixed => Some(4),
            Self::Int64 | Self::Uint64 | Self::Float64 => Some(8),
            Self::Bin2Int | Self::Sign => None,
        }
    }

    /// 读取时是否需要字节序
    pub fn needs_byte_order(&self) -> bool {
        self.width().is_some_and(|width| width > 1)
    }
}

/// 按测点配置把帧中截取的字节解码为原始值（未缩放）。
pub fn decode_framed(bytes: &[u8], addr: &MetricAddress) -> Result<f64, ProtocolError> {
    let data_type = DataType::parse(&addr.data_type)?;
    match data_type {
        DataType::Int8 => first_byte(bytes).map(|b| b as i8 as f64),
        DataType::Uint8 => first_byte(bytes).map(|b| b as f64),
        DataType::Bin2Int => bin2int(bytes, addr.cut_offset, addr.cut_length).map(|v| v as f64),
        DataType::Sign => sign_magnitude(bytes, &addr.byte_order),
        _ => {
            let order = ByteOrder::parse(&addr.byte_order)?;
            decode_with_order(bytes, data_type, order)
        }
    }
}

/// 多字节类型解码
pub fn decode_with_order(
    bytes: &[u8],
    data_type: DataType,
    order: ByteOrder,
) -> Result<f64, ProtocolError> {
    let value = match data_type {
        DataType::Int8 => first_byte(bytes)? as i8 as f64,
        DataType::Uint8 => first_byte(bytes)? as f64,
        DataType::Int16 => order.read_u16(bytes)? as i16 as f64,
        DataType::Uint16 => order.read_u16(bytes)? as f64,
        DataType::Int32 => order.read_u32(bytes)? as i32 as f64,
        DataType::Uint32 => order.read_u32(bytes)? as f64,
        DataType::Int64 => order.read_u64(bytes)? as i64 as f64,
        DataType::Uint64 => order.read_u64(bytes)? as f64,
        DataType::Float32 => f32::from_bits(order.read_u32(bytes)?) as f64,
        DataType::Float64 => f64::from_bits(order.read_u64(bytes)?),
        DataType::Fixed => order.read_u32(bytes)? as i32 as f64 / FIXED_POINT_SCALE,
        DataType::Ufixed => order.read_u32(bytes)? as f64 / FIXED_POINT_SCALE,
        DataType::Bin2Int | DataType::Sign => {
            return Err(ProtocolError::Config(format!(
                "{:?} is not a fixed-width type",
                data_type
            )));
        }
    };
    Ok(value)
}

fn first_byte(bytes: &[u8]) -> Result<u8, ProtocolError> {
    bytes
        .first()
        .copied()
        .ok_or_else(|| ProtocolError::DataParse("need 1 byte, got 0".to_string()))
}

/// 字节的二进制字符串表示（每字节 8 位，高位在前）
pub fn to_binary_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:08b}", b)).collect()
}

/// 二进制位段截取
///
/// 取二进制串中以右端向左 `cut_offset` 位处为终点、长度 `cut_length` 的子串。
pub fn bin2int(bytes: &[u8], cut_offset: usize, cut_length: usize) -> Result<u64, ProtocolError> {
    if cut_length == 0 {
        return Err(ProtocolError::Config(
            "BIN2INT requires a cut length".to_string(),
        ));
    }
    if cut_length > 64 {
        return Err(ProtocolError::Config(format!(
            "BIN2INT cut length {} exceeds 64 bits",
            cut_length
        )));
    }

    let bits = to_binary_string(bytes);
    let end = bits
        .len()
        .checked_sub(cut_offset)
        .and_then(|end| end.checked_sub(cut_length).map(|start| (start, end)));
    let (start, end) = end.ok_or_else(|| {
        ProtocolError::DataParse(format!(
            "cut offset {} + length {} exceeds {} bits",
            cut_offset,
            cut_length,
            bits.len()
        ))
    })?;

    u64::from_str_radix(&bits[start..end], 2)
        .map_err(|e| ProtocolError::DataParse(format!("BIN2INT parse failed: {}", e)))
}

/// 符号-幅值解码
///
/// 1 字节：bit7 为符号，bit0-6 为幅值；2 字节：bit15 为符号，bit0-14 为幅值。
pub fn sign_magnitude(bytes: &[u8], byte_order: &str) -> Result<f64, ProtocolError> {
    match bytes.len() {
        1 => {
            let raw = bytes[0];
            let magnitude = (raw & 0x7F) as f64;
            Ok(if raw & 0x80 != 0 { -magnitude } else { magnitude })
        }
        2 => {
            let raw = ByteOrder::parse(byte_order)?.read_u16(bytes)?;
            let magnitude = (raw & 0x7FFF) as f64;
            Ok(if raw & 0x8000 != 0 { -magnitude } else { magnitude })
        }
        0 => Err(ProtocolError::DataParse("SIGN needs at least 1 byte".to_string())),
        n => Err(ProtocolError::Config(format!(
            "SIGN does not support {}-byte fields",
            n
        ))),
    }
}

/// 文本协议数据类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDataType {
    /// 提取首个数值
    Float,
    /// 值映射表查找
    Map,
    /// 二进制字符串
    Bin2Int,
    /// 十六进制字符串
    Hex2Int,
}

impl TextDataType {
    pub fn parse(tag: &str) -> Result<Self, ProtocolError> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "FLOAT" => Ok(Self::Float),
            "MAP" => Ok(Self::Map),
            "BIN2INT" => Ok(Self::Bin2Int),
            "HEX2INT" => Ok(Self::Hex2Int),
            "" => Err(ProtocolError::Config("data type is not set".to_string())),
            other => Err(ProtocolError::Config(format!(
                "unsupported text data type: {}",
                other
            ))),
        }
    }
}

/// 按测点配置把文本片段解码为原始值（未缩放）。
pub fn decode_token(token: &str, addr: &MetricAddress) -> Result<f64, ProtocolError> {
    if token.is_empty() {
        return Err(ProtocolError::DataParse(format!(
            "empty value for {}",
            addr.metric_name
        )));
    }

    match TextDataType::parse(&addr.data_type)? {
        TextDataType::Float => extract_number(token).ok_or_else(|| {
            ProtocolError::DataParse(format!("no number found in {:?}", token))
        }),
        TextDataType::Map => remap(token, &addr.re_map),
        TextDataType::Bin2Int => i64::from_str_radix(token, 2)
            .map(|v| v as f64)
            .map_err(|e| ProtocolError::DataParse(format!("BIN2INT {:?}: {}", token, e))),
        TextDataType::Hex2Int => i64::from_str_radix(token, 16)
            .map(|v| v as f64)
            .map_err(|e| ProtocolError::DataParse(format!("HEX2INT {:?}: {}", token, e))),
    }
}

fn number_pattern() -> &'static Regex {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    NUMBER.get_or_init(|| Regex::new(r"[-+]?[0-9]+(\.[0-9]+)?").expect("number pattern compiles"))
}

/// 提取字符串中的第一个有符号十进制数（容忍前后的非数字字符）
pub fn extract_number(input: &str) -> Option<f64> {
    number_pattern()
        .find(input)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// 值映射：未命中的片段解为 0
pub fn remap(token: &str, re_map: &str) -> Result<f64, ProtocolError> {
    if re_map.trim().is_empty() {
        return Err(ProtocolError::Config("MAP requires a reMap table".to_string()));
    }
    let table: HashMap<String, f64> = serde_json::from_str(re_map)
        .map_err(|e| ProtocolError::Config(format!("invalid reMap: {}", e)))?;
    Ok(table.get(token).copied().unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framed(data_type: &str, byte_order: &str) -> MetricAddress {
        MetricAddress {
            data_type: data_type.to_string(),
            byte_order: byte_order.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_single_byte_types() {
        assert_eq!(decode_framed(&[0xFE], &framed("INT8", "")).unwrap(), -2.0);
        assert_eq!(decode_framed(&[0xFE], &framed("UINT8", "")).unwrap(), 254.0);
    }

    #[test]
    fn test_integers_and_floats() {
        assert_eq!(
            decode_framed(&[0xFF, 0x38], &framed("INT16", "AB")).unwrap(),
            -200.0
        );
        assert_eq!(
            decode_framed(&[0x38, 0xFF], &framed("UINT16", "BA")).unwrap(),
            65336.0
        );
        assert_eq!(
            decode_framed(&[0xFF, 0xFF, 0xFF, 0xFE], &framed("INT32", "ABCD")).unwrap(),
            -2.0
        );
        let bits = 12.5f32.to_bits().to_be_bytes();
        assert_eq!(
            decode_framed(&bits, &framed("FLOAT32-IEEE", "ABCD")).unwrap(),
            12.5
        );
        let swapped = [bits[2], bits[3], bits[0], bits[1]];
        assert_eq!(decode_framed(&swapped, &framed("FLOAT32", "CDAB")).unwrap(), 12.5);
        let bits = (-0.25f64).to_bits().to_le_bytes();
        assert_eq!(
            decode_framed(&bits, &framed("FLOAT64", "HGFEDCBA")).unwrap(),
            -0.25
        );
        assert_eq!(
            decode_framed(&[0, 0, 0, 0, 0, 0, 0x01, 0x00], &framed("UINT64", "ABCDEFGH")).unwrap(),
            256.0
        );
    }

    #[test]
    fn test_fixed_point() {
        assert_eq!(
            decode_framed(&[0x00, 0x01, 0x80, 0x00], &framed("UFIXED", "ABCD")).unwrap(),
            1.5
        );
        assert_eq!(
            decode_framed(&[0xFF, 0xFE, 0x80, 0x00], &framed("FIXED", "ABCD")).unwrap(),
            -1.5
        );
    }

    #[test]
    fn test_bin2int_cut() {
        assert_eq!(to_binary_string(&[0x00, 0x0A]), "0000000000001010");
        assert_eq!(bin2int(&[0x00, 0x0A], 0, 4).unwrap(), 10);
        assert_eq!(bin2int(&[0x00, 0x0A], 1, 3).unwrap(), 5);
        assert_eq!(bin2int(&[0x80], 7, 1).unwrap(), 1);
        assert!(bin2int(&[0x00], 0, 0).is_err());
        assert!(bin2int(&[0x00], 4, 5).is_err());
    }

    #[test]
    fn test_sign_magnitude() {
        assert_eq!(sign_magnitude(&[0x85], "").unwrap(), -5.0);
        assert_eq!(sign_magnitude(&[0x05], "").unwrap(), 5.0);
        assert_eq!(sign_magnitude(&[0x80, 0x0A], "AB").unwrap(), -10.0);
        assert_eq!(sign_magnitude(&[0x0A, 0x80], "BA").unwrap(), -10.0);
        assert!(matches!(
            sign_magnitude(&[0x00, 0x00, 0x01], "ABCD"),
            Err(ProtocolError::Config(_))
        ));
    }

    #[test]
    fn test_short_or_misconfigured_input_fails() {
        assert!(decode_framed(&[0x01], &framed("UINT16", "AB")).is_err());
        assert!(decode_framed(&[], &framed("INT8", "")).is_err());
        assert!(decode_framed(&[0x01, 0x02], &framed("UINT16", "")).is_err());
        assert!(decode_framed(&[0x01, 0x02], &framed("INT128", "AB")).is_err());
        assert!(decode_framed(&[0x01, 0x02], &framed("UINT16", "CDAB")).is_err());
    }

    #[test]
    fn test_text_tokens() {
        let mut addr = MetricAddress {
            data_type: "FLOAT".to_string(),
            ..Default::default()
        };
        assert_eq!(decode_token("(220.5V", &addr).unwrap(), 220.5);
        assert_eq!(decode_token("T=-12", &addr).unwrap(), -12.0);
        assert!(decode_token("N/A", &addr).is_err());
        assert!(decode_token("", &addr).is_err());

        addr.data_type = "BIN2INT".to_string();
        assert_eq!(decode_token("0101", &addr).unwrap(), 5.0);
        addr.data_type = "HEX2INT".to_string();
        assert_eq!(decode_token("1F", &addr).unwrap(), 31.0);
        addr.data_type = "INT2BIN".to_string();
        assert!(decode_token("1", &addr).is_err());
    }

    #[test]
    fn test_extract_number_only_ascii_digits() {
        assert_eq!(extract_number("٣ V=220.5"), Some(220.5));
        assert_eq!(extract_number("١٢٣"), None);
    }

    #[test]
    fn test_remap() {
        let table = r#"{"ON": 1, "OFF": 0, "FAULT": 2}"#;
        assert_eq!(remap("FAULT", table).unwrap(), 2.0);
        assert_eq!(remap("UNKNOWN", table).unwrap(), 0.0);
        assert!(remap("ON", "").is_err());
        assert!(remap("ON", "not json").is_err());
    }
}
