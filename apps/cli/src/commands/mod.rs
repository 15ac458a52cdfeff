//! 命令定义和实现

pub mod mock_sim;
pub mod run;

pub use mock_sim::MockSimCommand;
pub use run::RunCommand;
