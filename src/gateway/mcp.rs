//! MCP streamable HTTP 客户端
//!
//! JSON-RPC over HTTP POST：initialize 握手捕获 Mcp-Session-Id 响应头，
//! notifications/initialized 通知，tools/call 执行；响应体兼容 JSON 与
//! text/event-stream 两种形式。close 发 best-effort DELETE 并复位状态，
//! 重连会重新握手（上层须同时复位绑定标志）。

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::gateway::ToolGateway;

const MCP_PROTOCOL_VERSION: &str = "2025-03-26";
const SESSION_HEADER: &str = "Mcp-Session-Id";
const ACCEPT_BOTH: &str = "application/json, text/event-stream";

#[derive(Debug, Default)]
struct GatewayState {
    opened: bool,
    /// 服务端分配的传输层会话头；与工具会话 id 无关
    http_session: Option<String>,
}

/// MCP streamable HTTP 网关
pub struct McpGateway {
    client: reqwest::Client,
    url: String,
    state: Mutex<GatewayState>,
    next_id: AtomicU64,
}

impl McpGateway {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: url.into(),
            state: Mutex::new(GatewayState::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// 从 text/event-stream 体中取最后一条 data 行的 JSON
    fn parse_sse_body(body: &str) -> Result<Value, String> {
        let mut last: Option<Value> = None;
        for line in body.lines() {
            if let Some(data) = line.strip_prefix("data:") {
                if let Ok(v) = serde_json::from_str::<Value>(data.trim()) {
                    last = Some(v);
                }
            }
        }
        last.ok_or_else(|| "empty event stream from gateway".to_string())
    }

    /// 发送一次 JSON-RPC 请求并取回响应消息；notification（无 id）时返回 None
    async fn post(
        &self,
        method: &str,
        params: Value,
        with_id: bool,
    ) -> Result<Option<Value>, String> {
        let mut payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        });
        if with_id {
            payload["id"] = json!(self.next_id.fetch_add(1, Ordering::Relaxed));
        }

        let http_session = self.state.lock().await.http_session.clone();
        let mut request = self
            .client
            .post(&self.url)
            .header(reqwest::header::ACCEPT, ACCEPT_BOTH)
            .json(&payload);
        if let Some(sid) = &http_session {
            request = request.header(SESSION_HEADER, sid);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| format!("gateway request failed: {}", e))?;

        // 握手时服务端在响应头里分配传输层会话
        if let Some(sid) = resp
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            self.state.lock().await.http_session = Some(sid.to_string());
        }

        let status = resp.status();
        if !status.is_success() {
            return Err(format!("gateway HTTP {}", status));
        }
        if status == reqwest::StatusCode::ACCEPTED || status == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = resp
            .text()
            .await
            .map_err(|e| format!("gateway read failed: {}", e))?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        let message = if content_type.starts_with("text/event-stream") {
            Self::parse_sse_body(&body)?
        } else {
            serde_json::from_str::<Value>(&body)
                .map_err(|e| format!("gateway decode failed: {}", e))?
        };

        if let Some(err) = message.get("error") {
            let msg = err
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            return Err(format!("gateway rpc error: {}", msg));
        }
        Ok(Some(message))
    }

    /// tools/call 结果转文本：拼接 content 里的 text 块；isError 时转 Err
    fn tool_result_text(result: &Value) -> Result<String, String> {
        let is_error = result
            .get("isError")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let mut parts: Vec<String> = Vec::new();
        if let Some(blocks) = result.get("content").and_then(|c| c.as_array()) {
            for block in blocks {
                if let Some(text) = block.get("text").and_then(|t| t.as_str()) {
                    parts.push(text.to_string());
                }
            }
        }
        if parts.is_empty() {
            if let Some(structured) = result.get("structuredContent") {
                parts.push(structured.to_string());
            }
        }
        let text = parts.join("\n");

        if is_error {
            Err(if text.is_empty() {
                "tool reported an error".to_string()
            } else {
                text
            })
        } else {
            Ok(text)
        }
    }
}

#[async_trait]
impl ToolGateway for McpGateway {
    async fn open(&self) -> Result<(), String> {
        if self.url.is_empty() {
            return Err("no gateway url configured".to_string());
        }
        if self.state.lock().await.opened {
            return Ok(());
        }

        let init = self
            .post(
                "initialize",
                json!({
                    "protocolVersion": MCP_PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": { "name": "tutor", "version": env!("CARGO_PKG_VERSION") },
                }),
                true,
            )
            .await;
        match init {
            Ok(Some(_)) => {}
            Ok(None) => {
                // 半开状态清掉，下次 open 重新握手
                *self.state.lock().await = GatewayState::default();
                return Err("gateway handshake returned no message".to_string());
            }
            Err(e) => {
                *self.state.lock().await = GatewayState::default();
                return Err(e);
            }
        }

        if let Err(e) = self.post("notifications/initialized", json!({}), false).await {
            tracing::warn!(error = %e, "initialized notification failed, continuing");
        }

        self.state.lock().await.opened = true;
        Ok(())
    }

    async fn call_tool(&self, name: &str, args: Value) -> Result<String, String> {
        self.open().await?;
        let message = self
            .post("tools/call", json!({ "name": name, "arguments": args }), true)
            .await?
            .ok_or_else(|| "gateway returned no result".to_string())?;
        let result = message
            .get("result")
            .ok_or_else(|| "gateway response missing result".to_string())?;
        Self::tool_result_text(result)
    }

    async fn close(&self) -> Result<(), String> {
        let mut state = self.state.lock().await;
        if let Some(sid) = state.http_session.take() {
            let _ = self
                .client
                .delete(&self.url)
                .header(SESSION_HEADER, &sid)
                .send()
                .await;
        }
        state.opened = false;
        Ok(())
    }
}
