//! # 协议引擎能力模块
//!
//! 向工业遥测设备轮询测点数据，支持两种线路协议：
//! - **电总 AC 帧协议**：ASCII-HEX 编码的二进制帧，带长度校验与帧校验和
//! - **分隔文本协议**：以前后缀界定、分隔符切分的纯文本应答
//!
//! ## 架构设计
//!
//! ```text
//! DeviceProfile (JSON 档案)
//!       │
//!       ▼
//! validate_profile ──► DeviceProtocol::for_profile
//!                            │
//!                            ├── AcProtocol
//!                            └── SimpleTextProtocol
//!                            │
//!       generate_commands ───┤  命令键 → 帧（去重，按键排序）
//!                            │
//!       send ────────────────┤  FrameReceiver：连接 → 写 → 限时接收 → 关闭
//!                            │
//!       parse_response ──────┘  截取 → 解码（字节序 / 数据类型）→ 缩放
//! ```
//!
//! ## 档案示例
//!
//! ```json
//! {
//!   "dev": { "code": "R01", "devType": "rectifier", "transmissionMode": "电总",
//!            "cid1": "40", "version": "20", "addr": "01", "crcNum": 4 },
//!   "addrs": [
//!     { "metricName": "输出电压", "metricCode": "out_v", "command": "42",
//!       "startAt": 7, "length": 2, "dataType": "UINT16", "byteOrder": "AB", "scale": 0.1 }
//!   ]
//! }
//! ```

mod ac;
mod byte_order;
mod decode;
mod device;
mod error;
mod receiver;
mod simple_text;
mod traits;
mod validate;

pub use ac::{
    AcProtocol, DEFAULT_EOI, DEFAULT_SOI, FrameHeader, checksum, length_field, parse_hex_byte,
    parse_hex_bytes, verify_checksum,
};
pub use byte_order::{BYTE_ORDERS, ByteOrder};
pub use decode::{
    DataType, FRAMED_DATA_TYPES, TEXT_DATA_TYPES, TextDataType, bin2int, decode_framed,
    decode_token, decode_with_order, extract_number, remap, sign_magnitude, to_binary_string,
};
pub use device::{DeviceProtocol, ProtocolOptions};
pub use error::ProtocolError;
pub use receiver::{
    DEFAULT_READ_SLICE, DEFAULT_TOTAL_TIMEOUT, FrameReceiver, Received, Terminator,
};
pub use simple_text::{Affixes, DEFAULT_REV_SUF, SimpleTextProtocol, expand_escapes};
pub use traits::Protocol;
pub use validate::{profile_issues, validate_profile};
