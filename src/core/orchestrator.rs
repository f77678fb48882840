//! 回合编排器：两阶段「先说后做」协议
//!
//! 每条用户话语一个回合：解析会话上下文（容错）-> 拉历史（容错）->
//! 阶段 A 叙述（必产出一条决策，历史先落盘再进阶段 B）->
//! 按决策与取消状态进入阶段 B 行动 -> 返回 1~2 段口播文本。
//! 同一房间的回合严格串行：调用方 await handle_turn 完成后才开始下一回合，
//! &mut self 在类型层面排除同房间并发。

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::agent::AgentContext;
use crate::core::AgentError;
use crate::history::HistoryStore;
use crate::memory::Message;
use crate::observability::TurnObserver;
use crate::session::SessionResolver;
use crate::tools::TurnDeps;

pub struct TurnOrchestrator {
    ctx: AgentContext,
    history: Arc<dyn HistoryStore>,
    resolver: Arc<SessionResolver>,
    observer: Arc<dyn TurnObserver>,
    history_limit: usize,
    /// 可选：每产出一段口播即时推送（阶段 A 的段先于阶段 B 执行就已发出）
    segment_tx: Option<mpsc::UnboundedSender<String>>,
}

impl TurnOrchestrator {
    pub fn new(
        ctx: AgentContext,
        history: Arc<dyn HistoryStore>,
        resolver: Arc<SessionResolver>,
        observer: Arc<dyn TurnObserver>,
        history_limit: usize,
    ) -> Self {
        Self {
            ctx,
            history,
            resolver,
            observer,
            history_limit,
            segment_tx: None,
        }
    }

    pub fn with_segment_sink(mut self, tx: mpsc::UnboundedSender<String>) -> Self {
        self.segment_tx = Some(tx);
        self
    }

    pub async fn open(&mut self) -> Result<(), AgentError> {
        self.ctx.open().await
    }

    pub async fn close(&mut self) {
        self.ctx.close().await;
    }

    /// 处理一个回合，返回口播文本段（0~2 段，顺序即播报顺序）
    pub async fn handle_turn(
        &mut self,
        room_id: &str,
        utterance: &str,
    ) -> Result<Vec<String>, AgentError> {
        self.handle_turn_cancellable(room_id, utterance, &CancellationToken::new())
            .await
    }

    /// 带取消令牌的回合处理：阶段 B 开始前检查取消；阶段 B 内在途调用自然完成
    pub async fn handle_turn_cancellable(
        &mut self,
        room_id: &str,
        utterance: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, AgentError> {
        let turn_id = uuid::Uuid::new_v4().to_string();
        self.observer.turn_started(&turn_id, room_id);

        // 会话上下文解析失败降级为空 id，绝不让回合失败
        let session = self.resolver.resolve(room_id).await;
        let deps = TurnDeps {
            room_id: room_id.to_string(),
            backend_session_id: session.backend_session_id,
            tool_session_id: session.tool_session_id,
        };

        // 无房间（测试/开发语境）完全跳过历史读写
        let mut history: Vec<Message> = if room_id.is_empty() {
            Vec::new()
        } else {
            match self.history.fetch(room_id, self.history_limit).await {
                Ok(messages) => messages,
                Err(e) => {
                    tracing::warn!(room_id, error = %e, "history fetch failed, starting empty");
                    Vec::new()
                }
            }
        };

        let mut segments: Vec<String> = Vec::new();

        // 阶段 A：叙述。引擎失败在此向上传播：没有它就没有任何可播内容。
        let narration = self.ctx.narration.narrate(&history, utterance, &deps).await?;
        // 叙述先落历史，阶段 B 之前崩溃也不丢这一步
        self.append_history(room_id, &narration.new_messages).await;
        if !narration.decision.message.is_empty() {
            self.emit(&mut segments, narration.decision.message.clone());
        }

        // 阶段 B：行动。仅在决策要求且未取消时进入。
        if narration.decision.act && !cancel.is_cancelled() {
            history.extend(narration.new_messages.iter().cloned());
            let action = self.ctx.action.act(&history, &deps, cancel).await?;
            self.append_history(room_id, &action.new_messages).await;
            if !action.text.is_empty() {
                self.emit(&mut segments, action.text.clone());
            }
        }

        self.observer.turn_finished(&turn_id, room_id, segments.len());
        Ok(segments)
    }

    fn emit(&self, segments: &mut Vec<String>, text: String) {
        if let Some(tx) = &self.segment_tx {
            let _ = tx.send(text.clone());
        }
        segments.push(text);
    }

    async fn append_history(&self, room_id: &str, messages: &[Message]) {
        if room_id.is_empty() || messages.is_empty() {
            return;
        }
        if let Err(e) = self.history.append(room_id, messages).await {
            tracing::warn!(room_id, error = %e, "history append failed, continuing");
        }
    }
}
