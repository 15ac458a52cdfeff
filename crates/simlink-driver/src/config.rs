//! 连接配置
//!
//! 端点、电机数量、遥测帧大小与接收超时放在同一个配置值里，
//! 避免发送端和接收端对数组长度的理解不一致。

use crate::error::LinkError;
use serde::{Deserialize, Serialize};
use simlink_protocol::{
    DEFAULT_MOTOR_COUNT, DEFAULT_MOTOR_PORT, DEFAULT_RECEIVE_TIMEOUT_MS, DEFAULT_TELEMETRY_COUNT,
    DEFAULT_TELEMETRY_PORT, encoded_len,
};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

/// 链路配置
///
/// # Example
///
/// ```
/// use simlink_driver::LinkConfig;
///
/// let config = LinkConfig::from_toml_str(
///     r#"
///     host = "127.0.0.1"
///     motor_port = 5000
///     telemetry_port = 5001
///     motor_count = 6
///     "#,
/// )
/// .unwrap();
/// assert_eq!(config.motor_count, 6);
/// assert_eq!(config.receive_timeout_ms, 1000); // 未指定的字段取默认值
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// 仿真器主机地址
    pub host: String,
    /// 仿真器电机指令端口
    pub motor_port: u16,
    /// 本地遥测监听端口（0 表示由系统分配）
    pub telemetry_port: u16,
    /// 电机数量
    pub motor_count: usize,
    /// 每个遥测帧中的 f64 个数
    pub telemetry_count: usize,
    /// 接收超时（毫秒）
    pub receive_timeout_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            motor_port: DEFAULT_MOTOR_PORT,
            telemetry_port: DEFAULT_TELEMETRY_PORT,
            motor_count: DEFAULT_MOTOR_COUNT,
            telemetry_count: DEFAULT_TELEMETRY_COUNT,
            receive_timeout_ms: DEFAULT_RECEIVE_TIMEOUT_MS,
        }
    }
}

impl LinkConfig {
    /// 创建配置（电机数量默认 4）
    pub fn new(host: impl Into<String>, motor_port: u16, telemetry_port: u16) -> Self {
        Self {
            host: host.into(),
            motor_port,
            telemetry_port,
            ..Self::default()
        }
    }

    /// 从 TOML 字符串解析
    pub fn from_toml_str(s: &str) -> Result<Self, LinkError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LinkError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 检查配置合法性
    ///
    /// # Errors
    /// - `LinkError::InvalidConfig`: 电机数量、遥测个数、电机端口或超时为 0
    pub fn validate(&self) -> Result<(), LinkError> {
        if self.motor_count == 0 {
            return Err(LinkError::InvalidConfig("motor_count must be > 0".into()));
        }
        if self.telemetry_count == 0 {
            return Err(LinkError::InvalidConfig(
                "telemetry_count must be > 0".into(),
            ));
        }
        if self.motor_port == 0 {
            return Err(LinkError::InvalidConfig("motor_port must be > 0".into()));
        }
        // 超时为 0 时 set_read_timeout 会报错
        if self.receive_timeout_ms == 0 {
            return Err(LinkError::InvalidConfig(
                "receive_timeout_ms must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// 解析仿真器电机指令端点
    pub fn motor_addr(&self) -> Result<SocketAddr, LinkError> {
        (self.host.as_str(), self.motor_port)
            .to_socket_addrs()
            .map_err(|e| LinkError::InvalidAddress(format!("{}: {}", self.host, e)))?
            .next()
            .ok_or_else(|| LinkError::InvalidAddress(format!("{}: no address", self.host)))
    }

    /// 遥测 socket 绑定地址（所有网卡）
    ///
    /// 地址族跟随仿真器主机：主机解析为 IPv6 时绑定 `[::]`，否则绑定 `0.0.0.0`。
    pub fn telemetry_bind_addr(&self) -> SocketAddr {
        let ip = match self.motor_addr() {
            Ok(addr) => unspecified_for(&addr),
            Err(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };
        SocketAddr::new(ip, self.telemetry_port)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    /// 电机指令数据报长度（字节）
    pub fn motor_frame_len(&self) -> usize {
        encoded_len(self.motor_count)
    }

    /// 遥测数据报长度（字节）
    pub fn telemetry_frame_len(&self) -> usize {
        encoded_len(self.telemetry_count)
    }
}

/// 与 `peer` 同地址族的通配地址
pub fn unspecified_for(peer: &SocketAddr) -> IpAddr {
    if peer.is_ipv6() {
        IpAddr::V6(Ipv6Addr::UNSPECIFIED)
    } else {
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    }
}
