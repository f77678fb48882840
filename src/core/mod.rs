//! 核心编排层：错误类型与回合编排器

pub mod error;
pub mod orchestrator;

pub use error::AgentError;
pub use orchestrator::TurnOrchestrator;
