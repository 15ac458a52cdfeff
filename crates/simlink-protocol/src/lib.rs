//! # Simlink Protocol
//!
//! 仿真器 UDP 数据报协议定义（无网络依赖）
//!
//! ## 模块
//!
//! - `constants`: 协议常量定义
//! - `codec`: f64 数组与字节缓冲区之间的编解码
//! - `frames`: 电机指令帧 / 遥测帧
//!
//! ## 字节序
//!
//! 协议使用 Intel (LSB) 低位在前（小端字节序），编码和解码两侧一致。
//! 每个值按 IEEE-754 双精度原始位模式传输，因此 NaN/Infinity 也能精确往返。

pub mod codec;
pub mod constants;
pub mod frames;

// 重新导出常用类型
pub use codec::*;
pub use constants::*;
pub use frames::*;

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid payload length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// 字节序转换工具函数
///
/// 小端字节序转 f64（原始位模式重解释）
pub fn bytes_to_f64_le(bytes: [u8; 8]) -> f64 {
    f64::from_le_bytes(bytes)
}

/// f64 转小端字节序
pub fn f64_to_bytes_le(value: f64) -> [u8; 8] {
    value.to_le_bytes()
}
