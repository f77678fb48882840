//! 智能体层：叙述/行动双智能体与生命周期
//!
//! 同一推理引擎、同一基础人设，按工具可用性分成两个角色：
//! - NarrationAgent：无工具，产出结构化叙述决策（说什么 + 是否行动）
//! - ActionAgent：全量工具（本地课程工具 + 经绑定器的远程工具），执行已叙述的意图
//! AgentContext 持有两者与网关连接，open/close 管理房间生命周期。

pub mod action;
pub mod context;
pub mod narration;
pub mod prompt;

pub use action::{ActionAgent, ActionRun};
pub use context::AgentContext;
pub use narration::{NarrationAgent, NarrationDecision, NarrationRun};
pub use prompt::{strict_session_fragment, ACTION_DIRECTIVE};

/// 从 LLM 输出中提取 JSON 块（```json ... ``` 围栏或首尾大括号），找不到时返回 None
pub(crate) fn extract_json(output: &str) -> Option<&str> {
    let trimmed = output.trim();
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return Some(
            rest.find("```")
                .map(|end| rest[..end].trim())
                .unwrap_or_else(|| rest.trim()),
        );
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&trimmed[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_from_fence() {
        let out = "Sure!\n```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json(out), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_extract_json_from_braces() {
        let out = "prefix {\"a\": 1} suffix";
        assert_eq!(extract_json(out), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_extract_json_absent() {
        assert_eq!(extract_json("plain text"), None);
    }
}
