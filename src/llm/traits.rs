//! LLM 客户端抽象
//!
//! 所有后端实现 LlmClient：complete（自由文本）、complete_json（结构化输出，
//! 默认回退到 complete，由后端按 JSON Schema 约束返回值）。

use async_trait::async_trait;

use crate::memory::Message;

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 自由文本完成
    async fn complete(&self, messages: &[Message]) -> Result<String, String>;

    /// 结构化完成：要求返回符合 schema 的 JSON 文本。
    /// 默认实现忽略 schema 回退到 complete，具体后端可覆盖。
    async fn complete_json(
        &self,
        messages: &[Message],
        schema_name: &str,
        schema: serde_json::Value,
    ) -> Result<String, String> {
        let _ = (schema_name, schema);
        self.complete(messages).await
    }

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
