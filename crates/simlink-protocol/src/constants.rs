//! 协议常量定义

/// 单个 f64 值在线上的字节数
pub const F64_WIRE_SIZE: usize = 8;

/// 默认电机数量（四旋翼）
pub const DEFAULT_MOTOR_COUNT: usize = 4;

/// 默认遥测帧中的值数量
///
/// 仿真器每次只回传一个 f64。
pub const DEFAULT_TELEMETRY_COUNT: usize = 1;

/// 默认电机指令端口（仿真器侧监听）
pub const DEFAULT_MOTOR_PORT: u16 = 5000;

/// 默认遥测端口（本进程监听）
pub const DEFAULT_TELEMETRY_PORT: u16 = 5001;

/// 默认接收超时（毫秒）
pub const DEFAULT_RECEIVE_TIMEOUT_MS: u64 = 1000;

/// 计算 `count` 个 f64 编码后的字节长度
pub const fn encoded_len(count: usize) -> usize {
    count * F64_WIRE_SIZE
}
