//! 叙述智能体
//!
//! 读历史 + 新话语，产出一条结构化叙述决策：先说什么、是否需要行动。
//! 无工具访问；每回合恰好调用一次推理引擎，失败向上传播（回合致命）。

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::agent::extract_json;
use crate::agent::prompt::narration_system_prompt;
use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::Message;
use crate::tools::TurnDeps;

/// 叙述决策：message 立即播报，act 决定是否进入行动阶段
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NarrationDecision {
    /// 面向 TTS 的短句，无标记语言，≤ 2 句
    pub message: String,
    /// 是否现在就用工具行动
    pub act: bool,
}

/// 叙述阶段产物：决策 + 应追加到历史的新消息
#[derive(Debug, Clone)]
pub struct NarrationRun {
    pub decision: NarrationDecision,
    pub new_messages: Vec<Message>,
}

/// 解析推理引擎输出为叙述决策；容忍围栏与前后杂文本
pub fn parse_decision(raw: &str) -> Result<NarrationDecision, AgentError> {
    let json_str = extract_json(raw)
        .ok_or_else(|| AgentError::JsonParse(format!("no JSON in narration output: {raw}")))?;
    serde_json::from_str(json_str).map_err(|e| AgentError::JsonParse(format!("{}: {}", e, json_str)))
}

/// 叙述智能体：持有推理引擎，无工具
pub struct NarrationAgent {
    llm: Arc<dyn LlmClient>,
}

impl NarrationAgent {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn narrate(
        &self,
        history: &[Message],
        utterance: &str,
        deps: &TurnDeps,
    ) -> Result<NarrationRun, AgentError> {
        let system = narration_system_prompt(&deps.room_id, &deps.tool_session_id);
        let mut messages = vec![Message::system(system)];
        messages.extend_from_slice(history);
        messages.push(Message::user(utterance));

        let schema = serde_json::to_value(schemars::schema_for!(NarrationDecision))
            .map_err(|e| AgentError::JsonParse(e.to_string()))?;
        let raw = self
            .llm
            .complete_json(&messages, "narration_decision", schema)
            .await
            .map_err(AgentError::Llm)?;
        let decision = parse_decision(&raw)?;

        let new_messages = vec![
            Message::user(utterance),
            Message::assistant(decision.message.clone()),
        ];
        Ok(NarrationRun {
            decision,
            new_messages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;

    #[test]
    fn test_parse_decision_plain_json() {
        let d = parse_decision(r#"{"message": "On it.", "act": true}"#).unwrap();
        assert_eq!(d.message, "On it.");
        assert!(d.act);
    }

    #[test]
    fn test_parse_decision_fenced() {
        let d = parse_decision("```json\n{\"message\": \"Sure.\", \"act\": false}\n```").unwrap();
        assert_eq!(d.message, "Sure.");
        assert!(!d.act);
    }

    #[test]
    fn test_parse_decision_rejects_plain_text() {
        assert!(matches!(
            parse_decision("I will just talk"),
            Err(AgentError::JsonParse(_))
        ));
    }

    #[tokio::test]
    async fn test_narrate_collects_new_messages_in_order() {
        let llm = Arc::new(MockLlm::new(vec![
            r#"{"message": "Let's begin.", "act": false}"#.to_string(),
        ]));
        let agent = NarrationAgent::new(llm);
        let run = agent
            .narrate(&[], "hello", &TurnDeps::default())
            .await
            .unwrap();
        assert!(!run.decision.act);
        assert_eq!(run.new_messages.len(), 2);
        assert_eq!(run.new_messages[0], Message::user("hello"));
        assert_eq!(run.new_messages[1], Message::assistant("Let's begin."));
    }
}
