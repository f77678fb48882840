//! 提示词：静态人设 + 每回合拼接的动态片段
//!
//! 会话约束片段是纯函数 (room_id, session_id) -> String，每回合算一次拼进
//! system；不做运行时钩子注册。

/// 两个智能体共用的基础人设
pub const SYSTEM_PROMPT: &str = "\
You are a friendly voice tutor guiding the user through hands-on lessons in a shared browser. \
Your replies are spoken aloud: keep them to one or two plain sentences, no markup, no lists, \
no code blocks. Track progress in the lesson plan and keep the user oriented on the current step.";

/// 叙述阶段附加指令：只说不做，输出结构化决策
pub const NARRATION_PROMPT: &str = "\
Decide how to respond to the user's latest utterance. Reply with a JSON object \
{\"message\": string, \"act\": boolean}. `message` is the short spoken reply \
(at most two sentences, TTS-safe). Set `act` to true only when fulfilling the request \
requires using tools, such as editing the lesson plan or driving the browser. \
You cannot call tools in this phase.";

/// 行动阶段的固定指令；刻意不带原始话语，意图以共享历史为准
pub const ACTION_DIRECTIVE: &str = "\
Proceed with the action you just narrated. Use tools as needed, then reply with a short \
spoken summary of what you did.";

/// 行动阶段附加指令：工具调用协议
pub const ACTION_PROTOCOL: &str = "\
To call a tool, reply with exactly one JSON object {\"tool\": name, \"args\": object} and nothing else. \
The tool result comes back as an Observation message. When you are done, reply with plain text \
(one or two spoken sentences, no JSON).";

/// 会话约束片段：把已解析的 id 写进 system，禁止智能体自造会话
pub fn strict_session_fragment(room_id: &str, session_id: &str) -> String {
    let mut fragment = String::new();
    if !room_id.is_empty() {
        fragment.push_str(&format!("The current room id is \"{}\". ", room_id));
    }
    if session_id.is_empty() {
        fragment.push_str(
            "No tool session is bound yet; do not invent one. \
             Tools that need a session may fail, say so briefly if they do.",
        );
    } else {
        fragment.push_str(&format!(
            "Use the existing tool session \"{}\" for every tool call. \
             Never create a new session id yourself.",
            session_id
        ));
    }
    fragment
}

/// 叙述智能体的完整 system
pub fn narration_system_prompt(room_id: &str, session_id: &str) -> String {
    format!(
        "{}\n\n{}\n\n{}",
        SYSTEM_PROMPT,
        NARRATION_PROMPT,
        strict_session_fragment(room_id, session_id)
    )
}

/// 行动智能体的完整 system：人设 + 协议 + 可用工具清单 + 会话约束
pub fn action_system_prompt(
    tools: &[(String, String)],
    room_id: &str,
    session_id: &str,
) -> String {
    let mut listing = String::from("Available tools:\n");
    for (name, description) in tools {
        listing.push_str(&format!("- {}: {}\n", name, description));
    }
    listing.push_str(
        "Remote browser tools (browserbase_*) are also available by the same protocol.\n",
    );
    format!(
        "{}\n\n{}\n\n{}\n{}",
        SYSTEM_PROMPT,
        ACTION_PROTOCOL,
        listing,
        strict_session_fragment(room_id, session_id)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_without_session_forbids_invention() {
        let fragment = strict_session_fragment("room-1", "");
        assert!(fragment.contains("room-1"));
        assert!(fragment.contains("do not invent"));
    }

    #[test]
    fn test_fragment_with_session_pins_id() {
        let fragment = strict_session_fragment("room-1", "bb-123");
        assert!(fragment.contains("bb-123"));
        assert!(fragment.contains("Never create a new session id"));
    }

    #[test]
    fn test_fragment_is_pure() {
        assert_eq!(
            strict_session_fragment("r", "s"),
            strict_session_fragment("r", "s")
        );
    }
}
