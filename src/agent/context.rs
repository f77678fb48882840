//! AgentContext：房间级长生命周期资源
//!
//! 包住推理引擎、工具网关、绑定器与两个智能体。open 幂等：网关握手、
//! 解析会话并走直连路径主动绑定（失败降级，不影响叙述）；close 逆序释放，
//! 容忍半开状态，并复位绑定标志。

use std::sync::Arc;

use crate::agent::{ActionAgent, NarrationAgent};
use crate::gateway::{SessionBinder, ToolGateway};
use crate::llm::LlmClient;
use crate::observability::TurnObserver;
use crate::session::SessionResolver;
use crate::tools::{ToolExecutor, ToolRegistry};

pub struct AgentContext {
    gateway: Arc<dyn ToolGateway>,
    binder: Arc<SessionBinder>,
    resolver: Arc<SessionResolver>,
    pub narration: NarrationAgent,
    pub action: ActionAgent,
    room_id: String,
    opened: bool,
}

impl AgentContext {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        gateway: Arc<dyn ToolGateway>,
        registry: ToolRegistry,
        resolver: Arc<SessionResolver>,
        observer: Arc<dyn TurnObserver>,
        room_id: impl Into<String>,
        tool_timeout_secs: u64,
    ) -> Self {
        let room_id = room_id.into();
        let binder = Arc::new(SessionBinder::new(
            gateway.clone(),
            observer.clone(),
            room_id.clone(),
        ));
        let executor = Arc::new(ToolExecutor::new(registry, tool_timeout_secs));
        let narration = NarrationAgent::new(llm.clone());
        let action = ActionAgent::new(llm, executor, binder.clone(), observer);
        Self {
            gateway,
            binder,
            resolver,
            narration,
            action,
            room_id,
            opened: false,
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn binder(&self) -> &Arc<SessionBinder> {
        &self.binder
    }

    /// 打开房间资源；已打开时为 no-op。网关或绑定失败只降级：
    /// 叙述阶段不依赖它们，真正的工具调用会在失败处再次暴露问题。
    pub async fn open(&mut self) -> Result<(), crate::core::AgentError> {
        if self.opened {
            return Ok(());
        }

        if let Err(e) = self.gateway.open().await {
            tracing::warn!(room_id = %self.room_id, error = %e, "gateway open failed, tools degraded");
        } else {
            let ctx = self.resolver.resolve(&self.room_id).await;
            if !ctx.tool_session_id.is_empty() {
                if let Err(e) = self.binder.bind_now(&ctx.tool_session_id).await {
                    tracing::warn!(room_id = %self.room_id, error = %e, "proactive session bind failed");
                }
            }
        }

        self.opened = true;
        Ok(())
    }

    /// 关闭房间资源；从未打开或半开时也必须成功
    pub async fn close(&mut self) {
        if let Err(e) = self.gateway.close().await {
            tracing::warn!(room_id = %self.room_id, error = %e, "gateway close failed");
        }
        self.binder.mark_unbound().await;
        self.resolver.invalidate(&self.room_id).await;
        self.opened = false;
    }
}
