//! Tutor - 语音助教回合编排器
//!
//! 开发入口：初始化日志与配置，装配外部协作方（历史存储、会话注册表、
//! 课程后端、工具网关），在「无房间」语境下以标准输入模拟语音管线逐行跑回合。

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use tutor::agent::AgentContext;
use tutor::config::load_config;
use tutor::core::TurnOrchestrator;
use tutor::gateway::McpGateway;
use tutor::history::HttpHistoryStore;
use tutor::lesson::HttpLessonBackend;
use tutor::llm::create_llm_from_config;
use tutor::observability::TracingObserver;
use tutor::session::{HttpSessionRegistry, SessionResolver};
use tutor::tools::lesson_tool_registry;

/// 开发 REPL 使用的房间 id；空串表示不读写外部历史
const DEV_ROOM_ID: &str = "";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tutor::observability::init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        Default::default()
    });

    let llm = create_llm_from_config(&cfg);
    let gateway = Arc::new(McpGateway::new(&cfg.gateway.url, cfg.gateway.timeout_secs));
    let registry = Arc::new(HttpSessionRegistry::new(
        &cfg.frontend.base_url,
        cfg.frontend.timeout_secs,
    ));
    let resolver = Arc::new(SessionResolver::new(registry));
    let history = Arc::new(HttpHistoryStore::new(
        &cfg.frontend.base_url,
        cfg.frontend.timeout_secs,
    ));
    let backend = Arc::new(HttpLessonBackend::new(
        &cfg.frontend.base_url,
        cfg.frontend.timeout_secs,
    ));
    let observer = Arc::new(TracingObserver);

    let ctx = AgentContext::new(
        llm,
        gateway,
        lesson_tool_registry(backend),
        resolver.clone(),
        observer.clone(),
        DEV_ROOM_ID,
        cfg.gateway.tool_timeout_secs,
    );
    let mut orchestrator =
        TurnOrchestrator::new(ctx, history, resolver, observer, cfg.app.history_limit);

    orchestrator.open().await.context("Failed to open agent context")?;

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    stdout.write_all(b"tutor> ").await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let utterance = line.trim();
        if utterance == "exit" {
            break;
        }
        if !utterance.is_empty() {
            match orchestrator.handle_turn(DEV_ROOM_ID, utterance).await {
                Ok(segments) => {
                    for segment in segments {
                        stdout
                            .write_all(format!("[spoken] {}\n", segment).as_bytes())
                            .await?;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "turn failed");
                }
            }
        }
        stdout.write_all(b"tutor> ").await?;
        stdout.flush().await?;
    }

    orchestrator.close().await;
    Ok(())
}
