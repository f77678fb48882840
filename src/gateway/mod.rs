//! 远程工具网关
//!
//! ToolGateway 是远程工具执行服务的端口（open / call_tool / close）；
//! McpGateway 走 MCP streamable HTTP；SessionBinder 拦截每次出站调用，
//! 注入/修复工具会话 id 并保证每房间至多一次显式建会话。

pub mod binder;
pub mod mcp;

use async_trait::async_trait;
use serde_json::Value;

pub use binder::{SessionBinder, SESSION_CREATE_TOOL, SESSION_PLACEHOLDER_PREFIX};
pub use mcp::McpGateway;

/// 远程工具网关端口
#[async_trait]
pub trait ToolGateway: Send + Sync {
    /// 建立连接（握手）；已打开时为幂等 no-op
    async fn open(&self) -> Result<(), String>;

    /// 按名调用远程工具，返回文本结果；远端报告的工具错误以 Err 返回
    async fn call_tool(&self, name: &str, args: Value) -> Result<String, String>;

    /// 释放连接；从未打开或部分打开时也必须成功
    async fn close(&self) -> Result<(), String>;
}
