//! 电总 AC 帧协议
//!
//! ## 帧格式
//!
//! ```text
//! SOI | VER | ADR | CID1 | CID2 | LENGTH | INFO | CHKSUM | EOI
//!  1     2     2     2      2       4       2n      4       1   （字符数）
//! ```
//!
//! - SOI / EOI 为原始单字节（默认 `~` 0x7E / `\r` 0x0D）
//! - 其余字段先组装为原始字节，再按每字节两个大写 ASCII-HEX 字符编码
//! - LENGTH = LCHKSUM(4 bit) | LENID(12 bit)，LENID 为 INFO 的 ASCII 字符数
//! - CHKSUM 为 VER..INFO 全部编码字符按 u16 求和后取反加一
//!
//! ## 应答解析
//!
//! 去掉 SOI/EOI 后做 HEX 解码得到二进制载荷（下标 0 为 VER），
//! 测点按 `[startAt, startAt + length)` 截取载荷字节再解码。

use crate::byte_order::ByteOrder;
use crate::decode::decode_framed;
use crate::error::ProtocolError;
use crate::receiver::{FrameReceiver, Received, Terminator};
use crate::traits::Protocol;
use async_trait::async_trait;
use devpoll_transport::Transport;
use domain::{CommandSet, DecodedMetricValue, DecodedValues, DeviceProfile, MetricAddress};
use tracing::{debug, warn};

/// 默认起始标志
pub const DEFAULT_SOI: u8 = 0x7E;
/// 默认结束标志
pub const DEFAULT_EOI: u8 = 0x0D;

/// LENID 可表示的最大字符数（12 bit）
const MAX_LENID: usize = 0x0FFF;
/// CHKSUM 的编码字符数
const CHECKSUM_CHARS: usize = 4;

/// 帧头字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub ver: u8,
    pub adr: u8,
    pub cid1: u8,
    pub cid2: u8,
}

/// 电总 AC 帧协议
#[derive(Debug, Clone, Copy)]
pub struct AcProtocol {
    soi: u8,
    eoi: u8,
    receiver: FrameReceiver,
}

impl Default for AcProtocol {
    fn default() -> Self {
        Self::new(DEFAULT_SOI, DEFAULT_EOI, FrameReceiver::default())
    }
}

impl AcProtocol {
    pub fn new(soi: u8, eoi: u8, receiver: FrameReceiver) -> Self {
        Self { soi, eoi, receiver }
    }

    pub fn soi(&self) -> u8 {
        self.soi
    }

    pub fn eoi(&self) -> u8 {
        self.eoi
    }

    /// 组装完整帧
    pub fn build_frame(&self, header: FrameHeader, info: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        let length = length_field(info.len() * 2)?;

        let mut raw = vec![header.ver, header.adr, header.cid1, header.cid2];
        raw.extend_from_slice(&ByteOrder::BigEndian.write_u16(length)?);
        raw.extend_from_slice(info);
        let body = hex::encode_upper(raw).into_bytes();
        let chksum = ByteOrder::BigEndian.write_u16(checksum(&body))?;

        let mut frame = Vec::with_capacity(body.len() + CHECKSUM_CHARS + 2);
        frame.push(self.soi);
        frame.extend_from_slice(&body);
        frame.extend_from_slice(hex::encode_upper(chksum).as_bytes());
        frame.push(self.eoi);
        Ok(frame)
    }

    /// 去掉帧边界并 HEX 解码，得到二进制载荷
    ///
    /// 校验和不一致只记录告警，载荷照常返回。
    pub fn decode_payload(&self, data: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        let body = self.frame_body(data);
        if body.is_empty() {
            return Err(ProtocolError::DataParse("empty response frame".to_string()));
        }

        if let Err(e) = verify_checksum(body) {
            warn!(error = %e, "response checksum mismatch");
        }

        let payload = hex::decode(body)
            .map_err(|e| ProtocolError::DataParse(format!("response is not ascii-hex: {}", e)))?;

        if let Some(&rtn) = payload.get(3) {
            if rtn != 0 {
                warn!(rtn = %format!("{:02X}", rtn), meaning = rtn_meaning(rtn), "device returned error code");
            }
        }
        Ok(payload)
    }

    fn frame_body<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        let mut body = data;
        if let Some((&first, rest)) = body.split_first() {
            if first == self.soi {
                body = rest;
            }
        }
        if let Some((&last, rest)) = body.split_last() {
            if last == self.eoi {
                body = rest;
            }
        }
        while let Some((&last, rest)) = body.split_last() {
            if last == b'\r' || last == b'\n' {
                body = rest;
            } else {
                break;
            }
        }
        body
    }
}

/// 解析单字节 HEX 字段（一位数左补 0）
pub fn parse_hex_byte(field: &str, value: &str) -> Result<u8, ProtocolError> {
    let value = value.trim();
    let padded = match value.len() {
        0 => return Err(ProtocolError::Config(format!("{} is not set", field))),
        1 => format!("0{}", value),
        2 => value.to_string(),
        _ => {
            return Err(ProtocolError::Config(format!(
                "{} {:?} is longer than one byte",
                field, value
            )));
        }
    };
    let bytes = hex::decode(&padded)
        .map_err(|e| ProtocolError::Config(format!("{} {:?} is not hex: {}", field, value, e)))?;
    Ok(bytes[0])
}

/// 解析任意长度 HEX 字段，空串为空载荷
pub fn parse_hex_bytes(field: &str, value: &str) -> Result<Vec<u8>, ProtocolError> {
    hex::decode(value.trim())
        .map_err(|e| ProtocolError::Config(format!("{} {:?} is not hex: {}", field, value, e)))
}

/// LENGTH 字段：高 4 位为 LENID 三个半字节之和的补码校验
pub fn length_field(lenid: usize) -> Result<u16, ProtocolError> {
    if lenid > MAX_LENID {
        return Err(ProtocolError::Config(format!(
            "INFO of {} chars exceeds LENID limit {}",
            lenid, MAX_LENID
        )));
    }
    let lenid = lenid as u16;
    let nibbles = ((lenid >> 8) & 0x0F) + ((lenid >> 4) & 0x0F) + (lenid & 0x0F);
    let lchksum = (!nibbles).wrapping_add(1) & 0x0F;
    Ok((lchksum << 12) | lenid)
}

/// 编码字符的 u16 累加和取反加一
pub fn checksum(encoded: &[u8]) -> u16 {
    let sum = encoded
        .iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(b as u16));
    (!sum).wrapping_add(1)
}

/// 校验帧体（SOI 与 EOI 之间的字符）末尾 4 个字符的 CHKSUM
pub fn verify_checksum(body: &[u8]) -> Result<(), ProtocolError> {
    if body.len() < CHECKSUM_CHARS {
        return Err(ProtocolError::DataParse(format!(
            "frame body of {} chars has no checksum",
            body.len()
        )));
    }
    let (content, trailer) = body.split_at(body.len() - CHECKSUM_CHARS);
    let received = hex::decode(trailer)
        .map_err(|e| ProtocolError::DataParse(format!("checksum is not hex: {}", e)))
        .and_then(|bytes| ByteOrder::BigEndian.read_u16(&bytes))?;
    let expected = checksum(content);
    if received != expected {
        return Err(ProtocolError::DataParse(format!(
            "checksum {:04X} != expected {:04X}",
            received, expected
        )));
    }
    Ok(())
}

/// RTN 返回码说明
fn rtn_meaning(rtn: u8) -> &'static str {
    match rtn {
        0x00 => "normal",
        0x01 => "version error",
        0x02 => "checksum error",
        0x03 => "length checksum error",
        0x04 => "invalid CID2",
        0x05 => "command format error",
        0x06 => "invalid data",
        _ => "vendor specific",
    }
}

fn extract<'p>(payload: &'p [u8], addr: &MetricAddress) -> Result<&'p [u8], ProtocolError> {
    if addr.length == 0 {
        return Err(ProtocolError::Config(format!(
            "{} has no data length",
            addr.metric_name
        )));
    }
    let end = addr.start_at.checked_add(addr.length).ok_or_else(|| {
        ProtocolError::DataParse(format!(
            "{} startAt {} + length {} overflows",
            addr.metric_name, addr.start_at, addr.length
        ))
    })?;
    payload.get(addr.start_at..end).ok_or_else(|| {
        ProtocolError::DataParse(format!(
            "payload of {} bytes does not cover [{}, {})",
            payload.len(),
            addr.start_at,
            end
        ))
    })
}

#[async_trait]
impl Protocol for AcProtocol {
    fn generate_commands(&self, profile: &DeviceProfile) -> Result<CommandSet, ProtocolError> {
        let dev_cid1 = parse_hex_byte("device cid1", &profile.dev.cid1)?;
        let ver = parse_hex_byte("device version", &profile.dev.version)?;
        let adr = parse_hex_byte("device addr", &profile.dev.addr)?;

        let mut commands = CommandSet::new();
        for addr in &profile.addrs {
            let key = self.generate_key(profile, addr);
            if commands.contains_key(&key) {
                continue;
            }

            let cid1 = match parse_hex_byte("cid1", &addr.cid1) {
                Ok(cid1) => cid1,
                Err(e) => {
                    if !addr.cid1.trim().is_empty() {
                        debug!(metric = %addr.metric_code, error = %e, "falling back to device cid1");
                    }
                    dev_cid1
                }
            };
            let cid2 = parse_hex_byte("command", &addr.command).map_err(|e| {
                ProtocolError::Config(format!("{}: {}", addr.metric_name, e))
            })?;
            let info = parse_hex_bytes("commandExtra", &addr.command_extra).map_err(|e| {
                ProtocolError::Config(format!("{}: {}", addr.metric_name, e))
            })?;

            let frame = self.build_frame(
                FrameHeader {
                    ver,
                    adr,
                    cid1,
                    cid2,
                },
                &info,
            )?;
            debug!(key = %key, frame = %String::from_utf8_lossy(&frame).trim_end(), "command generated");
            commands.insert(key, frame);
        }
        Ok(commands)
    }

    fn generate_key(&self, profile: &DeviceProfile, addr: &MetricAddress) -> String {
        format!(
            "{}@{}@{}@{}",
            profile.dev.cid1, addr.cid1, addr.command, addr.command_extra
        )
    }

    async fn send(
        &self,
        transport: &mut dyn Transport,
        frame: &[u8],
        _profile: &DeviceProfile,
    ) -> Result<Vec<u8>, ProtocolError> {
        let terminator = Terminator::EndByte(self.eoi);
        match self.receiver.exchange(transport, frame, &terminator).await? {
            Received::Complete(data) => Ok(data),
            Received::Partial(data) => {
                warn!(
                    eoi = %format!("{:02X}", self.eoi),
                    received = %hex::encode_upper(&data),
                    "response missing EOI"
                );
                Err(ProtocolError::IncompleteFrame(format!(
                    "{} bytes without EOI after {}ms",
                    data.len(),
                    self.receiver.total_timeout().as_millis()
                )))
            }
        }
    }

    fn parse_response<'a>(
        &self,
        data: &[u8],
        _profile: &DeviceProfile,
        addrs: &[&'a MetricAddress],
    ) -> DecodedValues<'a> {
        let mut values = DecodedValues::new();
        let payload = match self.decode_payload(data) {
            Ok(payload) => payload,
            Err(e) => {
                for addr in addrs {
                    warn!(metric = %addr.metric_code, error = %e, "failed to decode metric");
                }
                return values;
            }
        };

        for &addr in addrs {
            match extract(&payload, addr).and_then(|bytes| decode_framed(bytes, addr)) {
                Ok(raw) => {
                    values.insert(
                        addr.metric_code.clone(),
                        DecodedMetricValue::new(addr, addr.scaled(raw)),
                    );
                }
                Err(e) => {
                    warn!(metric = %addr.metric_code, error = %e, "failed to decode metric");
                }
            }
        }
        values
    }
}
