//! 电机指令帧 / 遥测帧
//!
//! - `MotorCommand`: 客户端 → 仿真器，每个旋翼一个推力值
//! - `TelemetryFrame`: 仿真器 → 客户端，解码后的遥测值

use crate::codec::{decode, encode_into};
use crate::constants::{DEFAULT_MOTOR_COUNT, encoded_len};
use bytes::BytesMut;

/// 电机指令向量
///
/// 长度在构造时固定；推力值约定在 `[0.0, 1.0]`，但不做强制检查。
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotorCommand {
    values: Vec<f64>,
}

impl MotorCommand {
    /// 创建 `motor_count` 个电机的指令（初始值全为 0）
    pub fn new(motor_count: usize) -> Self {
        Self {
            values: vec![0.0; motor_count],
        }
    }

    /// 从已有值创建
    pub fn from_values(values: impl Into<Vec<f64>>) -> Self {
        Self {
            values: values.into(),
        }
    }

    /// 所有电机设置为同一推力
    pub fn fill(&mut self, thrust: f64) {
        self.values.fill(thrust);
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// 可写视图（长度不可变）
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 编码后的数据报长度（字节）
    pub fn wire_len(&self) -> usize {
        encoded_len(self.values.len())
    }

    /// 编码到缓冲区（追加写入）
    pub fn encode_into(&self, buf: &mut BytesMut) {
        encode_into(&self.values, buf);
    }
}

impl Default for MotorCommand {
    fn default() -> Self {
        Self::new(DEFAULT_MOTOR_COUNT)
    }
}

/// 遥测帧（解码后）
///
/// 只在一次接收期间有意义；IO 线程会把最新一帧发布给观察者。
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TelemetryFrame {
    values: Vec<f64>,
}

impl TelemetryFrame {
    /// 从原始数据报解码（截断式，尾部余数丢弃）
    pub fn decode(bytes: &[u8]) -> Self {
        Self {
            values: decode(bytes),
        }
    }

    pub fn from_values(values: impl Into<Vec<f64>>) -> Self {
        Self {
            values: values.into(),
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// 第一个遥测值（仿真器当前只回传这一个）
    pub fn first(&self) -> Option<f64> {
        self.values.first().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
