//! 采集进程运行配置加载。

use std::env;
use std::str::FromStr;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 设备链路目标。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// `host:port`（串口服务器或网口设备）
    Tcp(String),
    /// 本地串口（`/dev/ttyUSB0`、`COM3`）
    Serial(String),
}

impl Target {
    /// `/dev/` 或 `COM` 开头视为串口，其余按 `host:port` 处理。
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        if raw.starts_with("/dev/") || raw.to_ascii_uppercase().starts_with("COM") {
            return Ok(Self::Serial(raw.to_string()));
        }
        match raw.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
                Ok(Self::Tcp(raw.to_string()))
            }
            _ => Err(ConfigError::Invalid(
                "DEVPOLL_TARGET".to_string(),
                raw.to_string(),
            )),
        }
    }
}

/// 串口参数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialSettings {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: char,
}

/// 采集进程运行配置。
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub profile_path: String,
    pub target: Target,
    pub serial: SerialSettings,
    pub connect_timeout_ms: u64,
    pub response_timeout_ms: u64,
    pub read_slice_ms: u64,
    pub command_delay_ms: u64,
    pub frame_soi: u8,
    pub frame_eoi: u8,
    /// 未设置时一直运行到 Ctrl-C
    pub max_cycles: Option<u64>,
}

impl PollerConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let profile_path = env::var("DEVPOLL_PROFILE")
            .map_err(|_| ConfigError::Missing("DEVPOLL_PROFILE".to_string()))?;
        let target = env::var("DEVPOLL_TARGET")
            .map_err(|_| ConfigError::Missing("DEVPOLL_TARGET".to_string()))
            .and_then(|raw| Target::parse(&raw))?;

        let serial = SerialSettings {
            baud_rate: read_with_default("DEVPOLL_BAUD_RATE", 9600)?,
            data_bits: read_with_default("DEVPOLL_DATA_BITS", 8)?,
            stop_bits: read_with_default("DEVPOLL_STOP_BITS", 1)?,
            parity: read_with_default("DEVPOLL_PARITY", 'N')?.to_ascii_uppercase(),
        };
        if !(5..=8).contains(&serial.data_bits) {
            return Err(invalid("DEVPOLL_DATA_BITS", serial.data_bits));
        }
        if !matches!(serial.stop_bits, 1 | 2) {
            return Err(invalid("DEVPOLL_STOP_BITS", serial.stop_bits));
        }
        if !matches!(serial.parity, 'N' | 'E' | 'O') {
            return Err(invalid("DEVPOLL_PARITY", serial.parity));
        }

        let connect_timeout_ms = read_with_default("DEVPOLL_CONNECT_TIMEOUT_MS", 1000)?;
        let response_timeout_ms = read_with_default("DEVPOLL_RESPONSE_TIMEOUT_MS", 3000)?;
        let read_slice_ms = read_with_default("DEVPOLL_READ_SLICE_MS", 200)?;
        if response_timeout_ms == 0 {
            return Err(invalid("DEVPOLL_RESPONSE_TIMEOUT_MS", response_timeout_ms));
        }
        if read_slice_ms == 0 || read_slice_ms > response_timeout_ms {
            return Err(invalid("DEVPOLL_READ_SLICE_MS", read_slice_ms));
        }

        Ok(Self {
            profile_path,
            target,
            serial,
            connect_timeout_ms,
            response_timeout_ms,
            read_slice_ms,
            command_delay_ms: read_with_default("DEVPOLL_COMMAND_DELAY_MS", 1000)?,
            frame_soi: read_hex_byte_with_default("DEVPOLL_FRAME_SOI", 0x7E)?,
            frame_eoi: read_hex_byte_with_default("DEVPOLL_FRAME_EOI", 0x0D)?,
            max_cycles: read_optional_u64("DEVPOLL_MAX_CYCLES")?.filter(|value| *value > 0),
        })
    }
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::Invalid(key.to_string(), value.to_string())
}

fn read_with_default<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    let value = match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => return Ok(default),
    };
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

/// 读取单字节 HEX（可带 `0x` 前缀）。
fn read_hex_byte_with_default(key: &str, default: u8) -> Result<u8, ConfigError> {
    let value = match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => return Ok(default),
    };
    let digits = value.trim();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(digits);
    u8::from_str_radix(digits, 16).map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional_u64(key: &str) -> Result<Option<u64>, ConfigError> {
    match env::var(key) {
        Ok(value) if value.is_empty() => Ok(None),
        Ok(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(key.to_string(), value)),
        Err(_) => Ok(None),
    }
}
