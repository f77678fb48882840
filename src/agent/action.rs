//! 行动智能体
//!
//! Plan -> Tool -> Observe 循环：LLM 输出要么是 {"tool","args"} 调用，要么是
//! 最终口播文本。本地课程工具走执行器，其余工具名经 SessionBinder 分发到远程
//! 网关。工具失败以 Observation 文本回喂推理引擎（由它口播道歉与下一步），
//! 不中断回合；步数有上限；取消后不再发起新调用，在途调用自然完成。

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::agent::extract_json;
use crate::agent::prompt::{action_system_prompt, ACTION_DIRECTIVE};
use crate::core::AgentError;
use crate::gateway::SessionBinder;
use crate::llm::LlmClient;
use crate::memory::Message;
use crate::observability::TurnObserver;
use crate::tools::{ToolExecutor, TurnDeps};

/// 单回合内最大行动步数，防止死循环
const MAX_ACTION_STEPS: usize = 8;

/// LLM 返回的 Tool Call（简化 JSON：{"tool": "lesson_plan_get", "args": {...}}）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    pub args: serde_json::Value,
}

/// 单步解析结果
#[derive(Debug, Clone)]
enum StepOutput {
    /// 最终口播文本
    Response(String),
    /// 需要执行工具
    ToolCall(ToolCall),
}

/// 解析 LLM 输出：有效 JSON 且 tool 非空则为 ToolCall，否则按纯文本回复处理
fn parse_step_output(output: &str) -> StepOutput {
    let trimmed = output.trim();
    let Some(json_str) = extract_json(trimmed) else {
        return StepOutput::Response(trimmed.to_string());
    };
    match serde_json::from_str::<ToolCall>(json_str) {
        Ok(call) if !call.tool.is_empty() => StepOutput::ToolCall(call),
        _ => StepOutput::Response(trimmed.to_string()),
    }
}

/// 行动阶段产物：口播文本 + 应追加到历史的新消息
#[derive(Debug, Clone)]
pub struct ActionRun {
    pub text: String,
    pub new_messages: Vec<Message>,
}

/// 行动智能体：推理引擎 + 本地工具执行器 + 远程分发绑定器
pub struct ActionAgent {
    llm: Arc<dyn LlmClient>,
    executor: Arc<ToolExecutor>,
    binder: Arc<SessionBinder>,
    observer: Arc<dyn TurnObserver>,
}

impl ActionAgent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        executor: Arc<ToolExecutor>,
        binder: Arc<SessionBinder>,
        observer: Arc<dyn TurnObserver>,
    ) -> Self {
        Self {
            llm,
            executor,
            binder,
            observer,
        }
    }

    /// 以固定指令（而非原始话语）驱动：意图来自共享历史，避免两阶段各自解读
    pub async fn act(
        &self,
        history: &[Message],
        deps: &TurnDeps,
        cancel: &CancellationToken,
    ) -> Result<ActionRun, AgentError> {
        let system = action_system_prompt(
            &self.executor.tool_descriptions(),
            &deps.room_id,
            &deps.tool_session_id,
        );
        let mut convo = vec![Message::system(system)];
        convo.extend_from_slice(history);
        convo.push(Message::user(ACTION_DIRECTIVE));

        let mut new_messages = vec![Message::user(ACTION_DIRECTIVE)];

        for _step in 0..MAX_ACTION_STEPS {
            if cancel.is_cancelled() {
                tracing::info!(room_id = %deps.room_id, "action phase cancelled");
                return Ok(ActionRun {
                    text: String::new(),
                    new_messages,
                });
            }

            let raw = self.llm.complete(&convo).await.map_err(AgentError::Llm)?;

            match parse_step_output(&raw) {
                StepOutput::Response(text) => {
                    convo.push(Message::assistant(text.clone()));
                    new_messages.push(Message::assistant(text.clone()));
                    return Ok(ActionRun { text, new_messages });
                }
                StepOutput::ToolCall(call) => {
                    convo.push(Message::assistant(raw.clone()));
                    new_messages.push(Message::assistant(raw));

                    let observation = self.run_tool(&call, deps).await;
                    let observation = Message::user(format!("Observation: {}", observation));
                    convo.push(observation.clone());
                    new_messages.push(observation);
                }
            }
        }

        // 步数耗尽：给一句可播报的收尾而不是中断回合
        let text = "I wasn't able to finish that yet, let's pick it up from here.".to_string();
        new_messages.push(Message::assistant(text.clone()));
        Ok(ActionRun { text, new_messages })
    }

    /// 执行一次工具调用；失败转为观察文本回喂引擎
    async fn run_tool(&self, call: &ToolCall, deps: &TurnDeps) -> String {
        if self.executor.get_tool(&call.tool).is_some() {
            match self.executor.execute(deps, &call.tool, call.args.clone()).await {
                Ok(out) => out,
                Err(e) => format!("Tool {} failed: {}", call.tool, e),
            }
        } else {
            let start = Instant::now();
            let result = self
                .binder
                .dispatch(&call.tool, call.args.clone(), &deps.tool_session_id)
                .await;
            self.observer.tool_called(
                &call.tool,
                result.is_ok(),
                start.elapsed().as_millis() as u64,
            );
            match result {
                Ok(out) => out,
                Err(e) => format!("Tool {} failed: {}", call.tool, e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tool_call() {
        let out = parse_step_output(r#"{"tool": "lesson_plan_get", "args": {}}"#);
        match out {
            StepOutput::ToolCall(call) => assert_eq!(call.tool, "lesson_plan_get"),
            _ => panic!("expected tool call"),
        }
    }

    #[test]
    fn test_parse_plain_response() {
        let out = parse_step_output("All done, the plan has three steps.");
        match out {
            StepOutput::Response(text) => assert!(text.starts_with("All done")),
            _ => panic!("expected response"),
        }
    }

    #[test]
    fn test_parse_braces_in_prose_falls_back_to_response() {
        let out = parse_step_output("The plan looks like {incomplete");
        assert!(matches!(out, StepOutput::Response(_)));
    }

    #[test]
    fn test_parse_empty_tool_name_is_response() {
        let out = parse_step_output(r#"{"tool": "", "args": {}}"#);
        assert!(matches!(out, StepOutput::Response(_)));
    }
}
