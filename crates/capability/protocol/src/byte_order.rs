//! 字节序解析
//!
//! 字节序标签描述源字节到语义字节（大端）位置的置换：
//!
//! | 标签 | 置换 | 说明 |
//! |------|------|------|
//! | `AB` / `ABCD` / `ABCDEFGH` | 恒等 | 大端 |
//! | `BA` / `DCBA` / `HGFEDCBA` | 反转 | 小端 |
//! | `BADC` | `[1,0,3,2]` | 字内字节交换 |
//! | `CDAB` | `[2,3,0,1]` | 16 位字交换 |
//! | `GHEFCDAB` | `[6,7,4,5,2,3,0,1]` | 64 位字组交换 |
//!
//! 只接受上表中的标签，其他标签直接报配置错误。
//! 读取：`semantic[i] = source[perm[i]]`，再按大端拼装；写入为其逆变换。

use crate::error::ProtocolError;
use std::str::FromStr;

/// 支持的字节序标签
pub const BYTE_ORDERS: &[&str] = &[
    "AB", "ABCD", "ABCDEFGH", "BA", "DCBA", "HGFEDCBA", "BADC", "CDAB", "GHEFCDAB",
];

const BADC: [usize; 4] = [1, 0, 3, 2];
const CDAB: [usize; 4] = [2, 3, 0, 1];
const GHEFCDAB: [usize; 8] = [6, 7, 4, 5, 2, 3, 0, 1];

/// 多字节数值的字节排列方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// AB / ABCD / ABCDEFGH
    BigEndian,
    /// BA / DCBA / HGFEDCBA
    LittleEndian,
    /// BADC
    SwapBytesInWords,
    /// CDAB
    SwapWords,
    /// GHEFCDAB
    SwapWords64,
}

impl ByteOrder {
    /// 解析字节序标签（忽略首尾空白与大小写）。
    pub fn parse(tag: &str) -> Result<Self, ProtocolError> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "AB" | "ABCD" | "ABCDEFGH" => Ok(Self::BigEndian),
            "BA" | "DCBA" | "HGFEDCBA" => Ok(Self::LittleEndian),
            "BADC" => Ok(Self::SwapBytesInWords),
            "CDAB" => Ok(Self::SwapWords),
            "GHEFCDAB" => Ok(Self::SwapWords64),
            "" => Err(ProtocolError::Config("byte order is not set".to_string())),
            other => Err(ProtocolError::Config(format!(
                "unsupported byte order: {}",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BigEndian => "ABCD",
            Self::LittleEndian => "DCBA",
            Self::SwapBytesInWords => "BADC",
            Self::SwapWords => "CDAB",
            Self::SwapWords64 => "GHEFCDAB",
        }
    }

    /// 该字节序能否读取 `width` 字节的值
    pub fn supports_width(&self, width: usize) -> bool {
        self.source_positions(width).is_ok()
    }

    /// 宽度为 `width` 时，每个语义位置对应的源字节位置。
    fn source_positions(&self, width: usize) -> Result<Vec<usize>, ProtocolError> {
        let fixed: &[usize] = match self {
            Self::BigEndian => return Ok((0..width).collect()),
            Self::LittleEndian => return Ok((0..width).rev().collect()),
            Self::SwapBytesInWords => &BADC,
            Self::SwapWords => &CDAB,
            Self::SwapWords64 => &GHEFCDAB,
        };
        if width > fixed.len() || fixed[..width].iter().any(|&pos| pos >= width) {
            return Err(ProtocolError::Config(format!(
                "byte order {} cannot address a {}-byte value",
                self.as_str(),
                width
            )));
        }
        Ok(fixed[..width].to_vec())
    }

    /// 将源字节重排为大端语义顺序。
    pub fn reorder(&self, source: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        let positions = self.source_positions(source.len())?;
        Ok(positions.into_iter().map(|pos| source[pos]).collect())
    }

    fn read_array<const N: usize>(&self, source: &[u8]) -> Result<[u8; N], ProtocolError> {
        let source = source.get(..N).ok_or_else(|| {
            ProtocolError::DataParse(format!("need {} bytes, got {}", N, source.len()))
        })?;
        let mut out = [0u8; N];
        for (i, pos) in self.source_positions(N)?.into_iter().enumerate() {
            out[i] = source[pos];
        }
        Ok(out)
    }

    fn write_array<const N: usize>(&self, big_endian: [u8; N]) -> Result<[u8; N], ProtocolError> {
        let mut out = [0u8; N];
        for (i, pos) in self.source_positions(N)?.into_iter().enumerate() {
            out[pos] = big_endian[i];
        }
        Ok(out)
    }

    pub fn read_u16(&self, source: &[u8]) -> Result<u16, ProtocolError> {
        self.read_array::<2>(source).map(u16::from_be_bytes)
    }

    pub fn read_u32(&self, source: &[u8]) -> Result<u32, ProtocolError> {
        self.read_array::<4>(source).map(u32::from_be_bytes)
    }

    pub fn read_u64(&self, source: &[u8]) -> Result<u64, ProtocolError> {
        self.read_array::<8>(source).map(u64::from_be_bytes)
    }

    pub fn write_u16(&self, value: u16) -> Result<[u8; 2], ProtocolError> {
        self.write_array(value.to_be_bytes())
    }

    pub fn write_u32(&self, value: u32) -> Result<[u8; 4], ProtocolError> {
        self.write_array(value.to_be_bytes())
    }

    pub fn write_u64(&self, value: u64) -> Result<[u8; 8], ProtocolError> {
        self.write_array(value.to_be_bytes())
    }
}

impl FromStr for ByteOrder {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
