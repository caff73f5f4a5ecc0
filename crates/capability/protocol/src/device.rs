//! 按档案选择协议变体

use crate::ac::{AcProtocol, DEFAULT_EOI, DEFAULT_SOI};
use crate::error::ProtocolError;
use crate::receiver::FrameReceiver;
use crate::simple_text::SimpleTextProtocol;
use crate::traits::Protocol;
use async_trait::async_trait;
use devpoll_transport::Transport;
use domain::{CommandSet, DecodedValues, DeviceProfile, MetricAddress, TransmissionMode};

/// 协议构造参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolOptions {
    /// 帧起始标志（仅电总）
    pub soi: u8,
    /// 帧结束标志（仅电总）
    pub eoi: u8,
    pub receiver: FrameReceiver,
}

impl Default for ProtocolOptions {
    fn default() -> Self {
        Self {
            soi: DEFAULT_SOI,
            eoi: DEFAULT_EOI,
            receiver: FrameReceiver::default(),
        }
    }
}

/// 设备协议
#[derive(Debug, Clone, Copy)]
pub enum DeviceProtocol {
    Framed(AcProtocol),
    DelimitedText(SimpleTextProtocol),
}

impl DeviceProtocol {
    pub fn for_profile(profile: &DeviceProfile, options: ProtocolOptions) -> Self {
        match profile.transmission_mode() {
            TransmissionMode::Framed => {
                Self::Framed(AcProtocol::new(options.soi, options.eoi, options.receiver))
            }
            TransmissionMode::Delimited => {
                Self::DelimitedText(SimpleTextProtocol::new(options.receiver))
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Framed(_) => "ac-framed",
            Self::DelimitedText(_) => "simple-text",
        }
    }

    fn inner(&self) -> &dyn Protocol {
        match self {
            Self::Framed(protocol) => protocol,
            Self::DelimitedText(protocol) => protocol,
        }
    }
}

#[async_trait]
impl Protocol for DeviceProtocol {
    fn generate_commands(&self, profile: &DeviceProfile) -> Result<CommandSet, ProtocolError> {
        self.inner().generate_commands(profile)
    }

    fn generate_key(&self, profile: &DeviceProfile, addr: &MetricAddress) -> String {
        self.inner().generate_key(profile, addr)
    }

    async fn send(
        &self,
        transport: &mut dyn Transport,
        frame: &[u8],
        profile: &DeviceProfile,
    ) -> Result<Vec<u8>, ProtocolError> {
        self.inner().send(transport, frame, profile).await
    }

    fn parse_response<'a>(
        &self,
        data: &[u8],
        profile: &DeviceProfile,
        addrs: &[&'a MetricAddress],
    ) -> DecodedValues<'a> {
        self.inner().parse_response(data, profile, addrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::DeviceInfo;

    #[test]
    fn test_selects_variant_by_mode() {
        let mut profile = DeviceProfile::new(DeviceInfo::default(), Vec::new());
        let protocol = DeviceProtocol::for_profile(&profile, ProtocolOptions::default());
        assert_eq!(protocol.name(), "simple-text");

        profile.dev.transmission_mode = TransmissionMode::Framed;
        let protocol = DeviceProtocol::for_profile(&profile, ProtocolOptions::default());
        assert!(matches!(protocol, DeviceProtocol::Framed(ac) if ac.eoi() == DEFAULT_EOI));
    }
}
