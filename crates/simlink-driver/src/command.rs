//! 电机指令来源
//!
//! IO 循环每次迭代调用一次 [`MotorSource::fill`] 覆盖电机向量。
//! 这里是接入真实飞控的位置；默认实现只输出常量推力。

use simlink_protocol::MotorCommand;

/// 默认常量推力
pub const DEFAULT_THRUST: f64 = 0.6;

/// 电机指令来源 Trait
pub trait MotorSource: Send {
    /// 覆盖写入本次迭代的电机指令
    fn fill(&mut self, motors: &mut MotorCommand);
}

/// 常量推力：所有电机输出同一个值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantThrust(pub f64);

impl Default for ConstantThrust {
    fn default() -> Self {
        Self(DEFAULT_THRUST)
    }
}

impl MotorSource for ConstantThrust {
    fn fill(&mut self, motors: &mut MotorCommand) {
        motors.fill(self.0);
    }
}

impl<F> MotorSource for F
where
    F: FnMut(&mut [f64]) + Send,
{
    fn fill(&mut self, motors: &mut MotorCommand) {
        self(motors.values_mut())
    }
}
