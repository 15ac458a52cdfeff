//! 错误处理策略
//!
//! IO 循环不直接吞掉发送/接收错误，而是交给 [`ErrorPolicy`] 决定
//! "记录并继续" 还是 "中止循环"。默认的 [`BestEffort`] 永远继续，
//! 单次网络异常不会让循环停下。

use crate::error::LinkError;
use tracing::{debug, trace};

/// 失败发生的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Send,
    Receive,
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureStage::Send => write!(f, "send"),
            FailureStage::Receive => write!(f, "receive"),
        }
    }
}

/// 一次失败事件
#[derive(Debug)]
pub struct LinkFailure<'a> {
    pub stage: FailureStage,
    pub error: &'a LinkError,
    /// 该阶段连续失败次数（含本次；超时不计入）
    pub consecutive: u32,
}

/// 策略决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// 记录后进入下一次迭代
    Continue,
    /// 退出循环
    Abort,
}

/// 错误处理策略 Trait
///
/// 在 IO 线程上调用，实现必须非阻塞。
pub trait ErrorPolicy: Send {
    fn on_failure(&mut self, failure: &LinkFailure<'_>) -> PolicyDecision;
}

/// 尽力而为：记录日志，永远继续
#[derive(Debug, Clone, Copy, Default)]
pub struct BestEffort;

impl ErrorPolicy for BestEffort {
    fn on_failure(&mut self, failure: &LinkFailure<'_>) -> PolicyDecision {
        if failure.error.is_timeout() {
            trace!("{} timeout", failure.stage);
        } else {
            debug!(
                "{} failed ({} in a row): {}",
                failure.stage, failure.consecutive, failure.error
            );
        }
        PolicyDecision::Continue
    }
}

/// 失败预算：同一阶段连续失败超过 `max_consecutive` 次后中止
///
/// 接收超时是仿真器未回包的正常现象，不计入预算。
#[derive(Debug, Clone, Copy)]
pub struct FailureBudget {
    pub max_consecutive: u32,
}

impl FailureBudget {
    pub fn new(max_consecutive: u32) -> Self {
        Self { max_consecutive }
    }
}

impl ErrorPolicy for FailureBudget {
    fn on_failure(&mut self, failure: &LinkFailure<'_>) -> PolicyDecision {
        if failure.error.is_timeout() {
            return BestEffort.on_failure(failure);
        }
        if failure.consecutive > self.max_consecutive {
            debug!(
                "{} failure budget exhausted ({} > {}): {}",
                failure.stage, failure.consecutive, self.max_consecutive, failure.error
            );
            PolicyDecision::Abort
        } else {
            BestEffort.on_failure(failure)
        }
    }
}

impl<F> ErrorPolicy for F
where
    F: FnMut(&LinkFailure<'_>) -> PolicyDecision + Send,
{
    fn on_failure(&mut self, failure: &LinkFailure<'_>) -> PolicyDecision {
        self(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn io_error() -> LinkError {
        LinkError::Io(io::Error::from(io::ErrorKind::ConnectionRefused))
    }

    #[test]
    fn test_best_effort_always_continues() {
        let err = io_error();
        let mut policy = BestEffort;
        for consecutive in [1, 10, u32::MAX] {
            let failure = LinkFailure {
                stage: FailureStage::Send,
                error: &err,
                consecutive,
            };
            assert_eq!(policy.on_failure(&failure), PolicyDecision::Continue);
        }
    }

    #[test]
    fn test_failure_budget() {
        let err = io_error();
        let mut policy = FailureBudget::new(2);

        let decide = |policy: &mut FailureBudget, consecutive| {
            policy.on_failure(&LinkFailure {
                stage: FailureStage::Receive,
                error: &err,
                consecutive,
            })
        };
        assert_eq!(decide(&mut policy, 1), PolicyDecision::Continue);
        assert_eq!(decide(&mut policy, 2), PolicyDecision::Continue);
        assert_eq!(decide(&mut policy, 3), PolicyDecision::Abort);
    }

    #[test]
    fn test_failure_budget_ignores_timeouts() {
        let mut policy = FailureBudget::new(0);
        let failure = LinkFailure {
            stage: FailureStage::Receive,
            error: &LinkError::Timeout,
            consecutive: 100,
        };
        assert_eq!(policy.on_failure(&failure), PolicyDecision::Continue);
    }

    fn abort_on_send(failure: &LinkFailure<'_>) -> PolicyDecision {
        match failure.stage {
            FailureStage::Send => PolicyDecision::Abort,
            FailureStage::Receive => PolicyDecision::Continue,
        }
    }

    #[test]
    fn test_fn_policy() {
        let err = io_error();
        let mut policy = abort_on_send;
        let send = LinkFailure {
            stage: FailureStage::Send,
            error: &err,
            consecutive: 1,
        };
        let receive = LinkFailure {
            stage: FailureStage::Receive,
            error: &err,
            consecutive: 1,
        };
        assert_eq!(policy.on_failure(&send), PolicyDecision::Abort);
        assert_eq!(policy.on_failure(&receive), PolicyDecision::Continue);
    }
}
