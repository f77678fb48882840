//! 回合错误类型
//!
//! 传播策略：历史/会话注册表/课程后端等 I/O 邻接失败在调用点降级为默认值 + 日志，
//! 只有推理引擎失败（Llm / JsonParse）会从 handle_turn 向上传播。

use thiserror::Error;

/// 回合处理过程中可能出现的错误（推理、解析、工具、网关、配置）
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("JSON parse error: {0}")]
    JsonParse(String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Config error: {0}")]
    Config(String),
}
