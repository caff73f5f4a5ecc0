//! 按配置创建设备链路。

use devpoll_config::{PollerConfig, Target};
use devpoll_transport::{SerialConfig, SerialTransport, TcpConfig, TcpTransport, Transport};

/// 单次读取超时与接收分片一致，总超时由协议层控制。
pub fn build_transport(config: &PollerConfig) -> Box<dyn Transport> {
    match &config.target {
        Target::Tcp(address) => Box::new(TcpTransport::new(TcpConfig {
            address: address.clone(),
            connect_timeout_ms: config.connect_timeout_ms,
            read_timeout_ms: config.read_slice_ms,
        })),
        Target::Serial(port_name) => Box::new(SerialTransport::new(SerialConfig {
            port_name: port_name.clone(),
            baud_rate: config.serial.baud_rate,
            data_bits: config.serial.data_bits,
            stop_bits: config.serial.stop_bits,
            parity: config.serial.parity,
            read_timeout_ms: config.read_slice_ms,
        })),
    }
}
