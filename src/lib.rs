//! Tutor - 语音助教回合编排器
//!
//! 位于实时语音管线与带工具的推理智能体之间：对每条用户话语先产出口播叙述，
//! 再按决策执行工具行动，并保持外部存储的对话历史跨回合、跨重启一致。
//!
//! 模块划分：
//! - **agent**: 叙述/行动双智能体、提示词与房间级生命周期（AgentContext）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型与回合编排器（两阶段协议）
//! - **gateway**: 远程工具网关（MCP streamable HTTP）与会话绑定拦截
//! - **history**: 外部历史存储客户端
//! - **lesson**: 课程计划载荷与课程后端端口
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: 规范化消息形状
//! - **observability**: tracing 初始化与回合事件端口
//! - **pipeline**: 语音管线边界适配
//! - **session**: 会话注册表与按房间记忆化的解析器
//! - **tools**: 本地工具注册表、执行器与课程工具

pub mod agent;
pub mod config;
pub mod core;
pub mod gateway;
pub mod history;
pub mod lesson;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod pipeline;
pub mod session;
pub mod tools;

pub use agent::{AgentContext, NarrationDecision};
pub use core::{AgentError, TurnOrchestrator};
