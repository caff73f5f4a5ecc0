//! 分隔文本协议（Q1 类 UPS / 整流器）
//!
//! 命令：`sendPre + cid1 + command + commandExtra + sendSuf`
//! 应答：以 `revSuf` 结尾的文本，按分隔符切分为片段，测点按序号取值。
//!
//! 前后缀优先取测点配置，未配置时取设备配置；`\r`、`\n` 与 `空格` 会被展开。

use crate::decode::decode_token;
use crate::error::ProtocolError;
use crate::receiver::{FrameReceiver, Received, Terminator};
use crate::traits::Protocol;
use async_trait::async_trait;
use devpoll_transport::Transport;
use domain::{CommandSet, DecodedMetricValue, DecodedValues, DeviceProfile, MetricAddress};
use tracing::{debug, warn};

/// 未配置 revSuf 时的应答结束符
pub const DEFAULT_REV_SUF: &str = "\r\n";

/// 空格占位符
const SPACE_MARKER: &str = "空格";

/// 展开转义：字面量 `\r`、`\n` 与 `空格`
pub fn expand_escapes(raw: &str) -> String {
    raw.replace("\\r", "\r")
        .replace("\\n", "\n")
        .replace(SPACE_MARKER, " ")
}

/// 测点覆盖优先，其次设备配置，均未配置时为空串
fn pick(addr_value: &str, dev_value: &str) -> String {
    if !addr_value.is_empty() {
        expand_escapes(addr_value)
    } else {
        expand_escapes(dev_value)
    }
}

/// 测点实际生效的前后缀
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Affixes {
    pub send_pre: String,
    pub send_suf: String,
    pub rev_pre: String,
    pub rev_suf: String,
}

impl Affixes {
    pub fn resolve(profile: &DeviceProfile, addr: &MetricAddress) -> Self {
        Self {
            send_pre: pick(&addr.send_pre, &profile.dev.send_pre),
            send_suf: pick(&addr.send_suf, &profile.dev.send_suf),
            rev_pre: pick(&addr.rev_pre, &profile.dev.rev_pre),
            rev_suf: pick(&addr.rev_suf, &profile.dev.rev_suf),
        }
    }
}

/// 分隔文本协议
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleTextProtocol {
    receiver: FrameReceiver,
}

impl SimpleTextProtocol {
    pub fn new(receiver: FrameReceiver) -> Self {
        Self { receiver }
    }

    /// 组装单个测点的命令
    pub fn build_command(&self, profile: &DeviceProfile, addr: &MetricAddress) -> Vec<u8> {
        let affixes = Affixes::resolve(profile, addr);
        format!(
            "{}{}{}{}{}",
            affixes.send_pre,
            expand_escapes(&addr.cid1),
            expand_escapes(&addr.command),
            expand_escapes(&addr.command_extra),
            affixes.send_suf
        )
        .into_bytes()
    }

    /// 命令对应的应答结束符
    ///
    /// 生成该命令的测点配置了 revSuf 时优先使用，否则取设备配置，
    /// 均未配置时为 `\r\n`。
    pub fn terminator(&self, profile: &DeviceProfile, frame: &[u8]) -> Terminator {
        let rev_suf = profile
            .addrs
            .iter()
            .filter(|addr| !addr.rev_suf.is_empty())
            .find(|addr| self.build_command(profile, addr) == frame)
            .map(|addr| expand_escapes(&addr.rev_suf))
            .unwrap_or_else(|| expand_escapes(&profile.dev.rev_suf));
        if rev_suf.is_empty() {
            Terminator::Suffix(DEFAULT_REV_SUF.as_bytes().to_vec())
        } else {
            Terminator::Suffix(rev_suf.into_bytes())
        }
    }

    /// 从应答中截取测点对应的文本片段
    pub fn extract(
        &self,
        data: &[u8],
        profile: &DeviceProfile,
        addr: &MetricAddress,
    ) -> Result<String, ProtocolError> {
        let raw = String::from_utf8_lossy(data);
        let text = raw.replace('\r', "");
        let separator = match profile.dev.separator.as_str() {
            SPACE_MARKER => " ",
            other => other,
        };
        let tokens: Vec<&str> = if separator.is_empty() {
            vec![text.as_str()]
        } else {
            text.split(separator).collect()
        };

        let mut token = if addr.metric_index > 0 && addr.metric_index <= tokens.len() {
            tokens[addr.metric_index - 1].to_string()
        } else if addr.length > 0 {
            let end = addr.start_at.checked_add(addr.length).ok_or_else(|| {
                ProtocolError::DataParse(format!(
                    "{} startAt {} + length {} overflows",
                    addr.metric_name, addr.start_at, addr.length
                ))
            })?;
            raw.get(addr.start_at..end)
                .map(str::to_string)
                .ok_or_else(|| {
                    ProtocolError::DataParse(format!(
                        "response of {} bytes does not cover [{}, {})",
                        raw.len(),
                        addr.start_at,
                        end
                    ))
                })?
        } else {
            return Err(ProtocolError::DataParse(format!(
                "index {} out of {} tokens and no length for {}",
                addr.metric_index,
                tokens.len(),
                addr.metric_name
            )));
        };

        if addr.metric_index == 1 {
            let rev_pre = Affixes::resolve(profile, addr).rev_pre;
            if !rev_pre.is_empty() {
                if let Some(stripped) = token.strip_prefix(rev_pre.as_str()) {
                    token = stripped.to_string();
                }
            }
        }

        if addr.cut_length > 0 {
            let cut = addr
                .cut_offset
                .checked_add(addr.cut_length)
                .and_then(|end| token.get(addr.cut_offset..end));
            if let Some(cut) = cut {
                token = cut.to_string();
            }
        }

        Ok(token)
    }
}

#[async_trait]
impl Protocol for SimpleTextProtocol {
    fn generate_commands(&self, profile: &DeviceProfile) -> Result<CommandSet, ProtocolError> {
        let mut commands = CommandSet::new();
        for addr in &profile.addrs {
            if addr.command.trim().is_empty() {
                return Err(ProtocolError::Config(format!(
                    "{} has no command",
                    addr.metric_name
                )));
            }
            let key = self.generate_key(profile, addr);
            if commands.contains_key(&key) {
                continue;
            }
            let command = self.build_command(profile, addr);
            debug!(key = %key, command = %String::from_utf8_lossy(&command).trim_end(), "command generated");
            commands.insert(key, command);
        }
        Ok(commands)
    }

    fn generate_key(&self, profile: &DeviceProfile, addr: &MetricAddress) -> String {
        format!(
            "{}_{}_{}_{}",
            profile.dev.cid1, addr.cid1, addr.command, addr.command_extra
        )
    }

    async fn send(
        &self,
        transport: &mut dyn Transport,
        frame: &[u8],
        profile: &DeviceProfile,
    ) -> Result<Vec<u8>, ProtocolError> {
        let terminator = self.terminator(profile, frame);
        match self.receiver.exchange(transport, frame, &terminator).await? {
            Received::Complete(data) => Ok(data),
            Received::Partial(data) => {
                warn!(
                    bytes = data.len(),
                    received = %String::from_utf8_lossy(&data),
                    "response missing suffix, using partial data"
                );
                Ok(data)
            }
        }
    }

    fn parse_response<'a>(
        &self,
        data: &[u8],
        profile: &DeviceProfile,
        addrs: &[&'a MetricAddress],
    ) -> DecodedValues<'a> {
        let mut values = DecodedValues::new();
        for &addr in addrs {
            let decoded = self
                .extract(data, profile, addr)
                .and_then(|token| decode_token(&token, addr));
            match decoded {
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

#[cfg(test)]
mod tests {
    use super::*;
    use domain::DeviceInfo;

    fn profile(separator: &str, rev_pre: &str) -> DeviceProfile {
        DeviceProfile::new(
            DeviceInfo {
                separator: separator.to_string(),
                rev_pre: rev_pre.to_string(),
                ..Default::default()
            },
            Vec::new(),
        )
    }

    fn indexed(metric_index: usize) -> MetricAddress {
        MetricAddress {
            metric_index,
            data_type: "FLOAT".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_expand_escapes() {
        assert_eq!(expand_escapes("Q1\\r"), "Q1\r");
        assert_eq!(expand_escapes("\\r\\n"), "\r\n");
        assert_eq!(expand_escapes("A空格B"), "A B");
    }

    #[test]
    fn test_extract_by_index() {
        let protocol = SimpleTextProtocol::default();
        let profile = profile("空格", "");
        let token = protocol
            .extract(b"12 34 56\r", &profile, &indexed(2))
            .unwrap();
        assert_eq!(token, "34");
        let token = protocol
            .extract(b"12 34 56\r", &profile, &indexed(3))
            .unwrap();
        assert_eq!(token, "56");
    }

    #[test]
    fn test_first_token_strips_rev_prefix() {
        let protocol = SimpleTextProtocol::default();
        let profile = profile("空格", "(");
        let token = protocol
            .extract(b"(220.1 219.8\r", &profile, &indexed(1))
            .unwrap();
        assert_eq!(token, "220.1");
    }

    #[test]
    fn test_extract_by_range_and_cut() {
        let protocol = SimpleTextProtocol::default();
        let profile = profile("", "");
        let addr = MetricAddress {
            start_at: 1,
            length: 5,
            cut_offset: 1,
            cut_length: 3,
            ..Default::default()
        };
        assert_eq!(protocol.extract(b"#10110\r", &profile, &addr).unwrap(), "011");

        let missing = MetricAddress {
            metric_index: 9,
            ..Default::default()
        };
        assert!(protocol.extract(b"1 2\r", &profile, &missing).is_err());
    }

    #[test]
    fn test_oversized_offsets_do_not_overflow() {
        let protocol = SimpleTextProtocol::default();
        let profile = profile("", "");
        let addr = MetricAddress {
            start_at: usize::MAX,
            length: 2,
            ..Default::default()
        };
        assert!(matches!(
            protocol.extract(b"#10110\r", &profile, &addr),
            Err(ProtocolError::DataParse(_))
        ));

        let addr = MetricAddress {
            start_at: 1,
            length: 5,
            cut_offset: usize::MAX,
            cut_length: 3,
            ..Default::default()
        };
        assert_eq!(protocol.extract(b"#10110\r", &profile, &addr).unwrap(), "10110");
    }

    #[test]
    fn test_terminator_defaults_to_crlf() {
        let protocol = SimpleTextProtocol::default();
        assert_eq!(
            protocol.terminator(&profile("", ""), b"Q1\r"),
            Terminator::Suffix(b"\r\n".to_vec())
        );
        let mut custom = profile("", "");
        custom.dev.rev_suf = "\\r".to_string();
        assert_eq!(
            protocol.terminator(&custom, b"Q1\r"),
            Terminator::Suffix(b"\r".to_vec())
        );
    }

    #[test]
    fn test_terminator_prefers_address_rev_suf() {
        let protocol = SimpleTextProtocol::default();
        let mut profile = profile("空格", "(");
        profile.dev.rev_suf = "\\r\\n".to_string();
        profile.dev.send_suf = "\\r".to_string();
        profile.addrs = vec![
            MetricAddress {
                command: "Q1".to_string(),
                rev_suf: "\\r".to_string(),
                ..Default::default()
            },
            MetricAddress {
                command: "F".to_string(),
                ..Default::default()
            },
        ];

        let q1 = protocol.build_command(&profile, &profile.addrs[0]);
        let f = protocol.build_command(&profile, &profile.addrs[1]);
        assert_eq!(protocol.terminator(&profile, &q1), Terminator::Suffix(b"\r".to_vec()));
        assert_eq!(protocol.terminator(&profile, &f), Terminator::Suffix(b"\r\n".to_vec()));
    }
}
