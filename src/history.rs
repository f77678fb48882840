//! 历史客户端：外部存储的对话历史读写
//!
//! 存储由前端 API 托管，编排器视角 append-only：fetch 取最旧在前的有序消息，
//! append 原样追加。失败以 Err(String) 上抛，由调用点降级（空历史 / 跳过追加）。

use async_trait::async_trait;

use crate::memory::Message;

/// 历史存储端口
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// 拉取某房间最近 limit 条消息，最旧在前
    async fn fetch(&self, room_id: &str, limit: usize) -> Result<Vec<Message>, String>;

    /// 追加消息，保持传入顺序
    async fn append(&self, room_id: &str, messages: &[Message]) -> Result<(), String>;
}

/// HTTP 实现：GET /api/messages/history_json、POST /api/messages/append_json
pub struct HttpHistoryStore {
    client: reqwest::Client,
    base: String,
}

impl HttpHistoryStore {
    pub fn new(base: impl Into<String>, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base: base.into(),
        }
    }
}

#[async_trait]
impl HistoryStore for HttpHistoryStore {
    async fn fetch(&self, room_id: &str, limit: usize) -> Result<Vec<Message>, String> {
        let limit = limit.to_string();
        let resp = self
            .client
            .get(format!("{}/api/messages/history_json", self.base))
            .query(&[("roomId", room_id), ("limit", limit.as_str())])
            .send()
            .await
            .map_err(|e| format!("history fetch failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("history fetch HTTP {}", resp.status()));
        }
        resp.json::<Vec<Message>>()
            .await
            .map_err(|e| format!("history decode failed: {}", e))
    }

    async fn append(&self, room_id: &str, messages: &[Message]) -> Result<(), String> {
        let resp = self
            .client
            .post(format!("{}/api/messages/append_json", self.base))
            .json(&serde_json::json!({
                "roomId": room_id,
                "messagesJson": messages,
            }))
            .send()
            .await
            .map_err(|e| format!("history append failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("history append HTTP {}", resp.status()));
        }
        Ok(())
    }
}
