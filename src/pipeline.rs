//! 语音管线边界适配
//!
//! 管线方须以规范化的 TranscriptItem 列表交付转写结果；
//! extract_prompt_and_room 从中取最近一条用户文本与房间 id，不做能力探测。

use serde::{Deserialize, Serialize};

use crate::memory::Role;

/// 语音管线交付的单条转写记录
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TranscriptItem {
    pub role: Role,
    pub content: String,
    /// 产生该条记录的房间；多数管线只在首条携带
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
}

impl TranscriptItem {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            room: None,
        }
    }

    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }
}

/// 提取本回合的用户话语与房间 id
///
/// 话语取最近一条非空 user 内容；房间取首个非空 room 字段。
/// 两者都可能为空串：空话语表示无事可做，空房间进入「无房间」开发语境。
pub fn extract_prompt_and_room(items: &[TranscriptItem]) -> (String, String) {
    let mut prompt = String::new();
    let mut room_id = String::new();

    for item in items {
        if item.role == Role::User && !item.content.trim().is_empty() {
            prompt = item.content.trim().to_string();
        }
        if room_id.is_empty() {
            if let Some(room) = &item.room {
                if !room.is_empty() {
                    room_id = room.clone();
                }
            }
        }
    }

    (prompt, room_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_user_text_wins() {
        let items = vec![
            TranscriptItem::new(Role::User, "first question"),
            TranscriptItem::new(Role::Assistant, "an answer"),
            TranscriptItem::new(Role::User, "second question"),
        ];
        let (prompt, room) = extract_prompt_and_room(&items);
        assert_eq!(prompt, "second question");
        assert_eq!(room, "");
    }

    #[test]
    fn test_first_room_wins() {
        let items = vec![
            TranscriptItem::new(Role::System, "ctx").with_room("room-1"),
            TranscriptItem::new(Role::User, "hello").with_room("room-2"),
        ];
        let (prompt, room) = extract_prompt_and_room(&items);
        assert_eq!(prompt, "hello");
        assert_eq!(room, "room-1");
    }

    #[test]
    fn test_empty_input() {
        let (prompt, room) = extract_prompt_and_room(&[]);
        assert!(prompt.is_empty());
        assert!(room.is_empty());
    }

    #[test]
    fn test_whitespace_user_content_ignored() {
        let items = vec![
            TranscriptItem::new(Role::User, "real input"),
            TranscriptItem::new(Role::User, "   "),
        ];
        let (prompt, _) = extract_prompt_and_room(&items);
        assert_eq!(prompt, "real input");
    }
}
