//! Mock LLM 客户端（用于测试与无 Key 开发）
//!
//! 按脚本顺序弹出预置响应；脚本耗尽时回显最后一条 User 消息为
//! 「不行动」的叙述决策 JSON，保证无 Key 环境也能走通回合流程。

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::llm::LlmClient;
use crate::memory::Message;

/// Mock 客户端：脚本队列 + 回显回退
#[derive(Debug, Default)]
pub struct MockLlm {
    responses: Mutex<VecDeque<String>>,
}

impl MockLlm {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
        }
    }

    /// 追加一条脚本响应
    pub async fn push(&self, response: impl Into<String>) {
        self.responses.lock().await.push_back(response.into());
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        if let Some(next) = self.responses.lock().await.pop_front() {
            return Ok(next);
        }

        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, crate::memory::Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        Ok(serde_json::json!({
            "message": format!("Echo from Mock: {}", last_user),
            "act": false,
        })
        .to_string())
    }
}
