//! 可观测性
//!
//! init 初始化 tracing；TurnObserver 是注入编排器的事件端口
//! （回合开始/结束、工具调用、会话绑定），默认 Noop，另有 tracing 实现。

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with(fmt::layer())
        .init();
}

/// 回合事件端口：实现方决定事件去向（日志、指标、前端推送等）
pub trait TurnObserver: Send + Sync {
    fn turn_started(&self, _turn_id: &str, _room_id: &str) {}

    fn turn_finished(&self, _turn_id: &str, _room_id: &str, _segments: usize) {}

    fn tool_called(&self, _tool: &str, _ok: bool, _duration_ms: u64) {}

    fn session_bound(&self, _room_id: &str, _session_id: &str) {}
}

/// 默认实现：丢弃所有事件
#[derive(Debug, Default)]
pub struct NoopObserver;

impl TurnObserver for NoopObserver {}

/// tracing 实现：每个事件一条结构化 info 日志
#[derive(Debug, Default)]
pub struct TracingObserver;

impl TurnObserver for TracingObserver {
    fn turn_started(&self, turn_id: &str, room_id: &str) {
        tracing::info!(turn_id, room_id, "turn started");
    }

    fn turn_finished(&self, turn_id: &str, room_id: &str, segments: usize) {
        tracing::info!(turn_id, room_id, segments, "turn finished");
    }

    fn tool_called(&self, tool: &str, ok: bool, duration_ms: u64) {
        tracing::info!(tool, ok, duration_ms, "tool called");
    }

    fn session_bound(&self, room_id: &str, session_id: &str) {
        tracing::info!(room_id, session_id, "tool session bound");
    }
}
