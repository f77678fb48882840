//! 会话解析：房间 -> 后端会话 id + 工具会话 id
//!
//! 注册表按房间或会话 id 查询一条会话记录；SessionResolver 按房间记忆化，
//! 解析失败返回空 id（功能降级），不缓存失败结果，后续回合可恢复。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

/// 会话注册表中的一行
#[derive(Debug, Clone, Deserialize)]
pub struct SessionRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "roomId", default)]
    pub room_id: String,
    /// 远程工具执行会话 id（与后端会话 id 是两套体系）
    #[serde(rename = "bbSessionId", default)]
    pub bb_session_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "bbLiveViewUrl", default)]
    pub live_view_url: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// 会话注册表端口；非 200 或网络错误一律以 Err 表示「未解析」
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    async fn session_by_room(&self, room_id: &str) -> Result<SessionRecord, String>;

    async fn session_by_id(&self, session_id: &str) -> Result<SessionRecord, String>;
}

/// HTTP 实现：GET /api/session?roomId= | sessionId=
pub struct HttpSessionRegistry {
    client: reqwest::Client,
    base: String,
}

impl HttpSessionRegistry {
    pub fn new(base: impl Into<String>, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base: base.into(),
        }
    }

    async fn get(&self, key: &str, value: &str) -> Result<SessionRecord, String> {
        let resp = self
            .client
            .get(format!("{}/api/session", self.base))
            .query(&[(key, value)])
            .send()
            .await
            .map_err(|e| format!("session lookup failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("session lookup HTTP {}", resp.status()));
        }
        resp.json::<SessionRecord>()
            .await
            .map_err(|e| format!("session decode failed: {}", e))
    }
}

#[async_trait]
impl SessionRegistry for HttpSessionRegistry {
    async fn session_by_room(&self, room_id: &str) -> Result<SessionRecord, String> {
        self.get("roomId", room_id).await
    }

    async fn session_by_id(&self, session_id: &str) -> Result<SessionRecord, String> {
        self.get("sessionId", session_id).await
    }
}

/// 每回合使用的会话上下文；两个 id 都可能为空（解析失败或无房间）
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub backend_session_id: String,
    pub tool_session_id: String,
}

/// 按房间记忆化的解析器
pub struct SessionResolver {
    registry: Arc<dyn SessionRegistry>,
    cache: RwLock<HashMap<String, SessionContext>>,
}

impl SessionResolver {
    pub fn new(registry: Arc<dyn SessionRegistry>) -> Self {
        Self {
            registry,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// 解析房间的会话上下文；失败降级为空 id 且不入缓存
    pub async fn resolve(&self, room_id: &str) -> SessionContext {
        if room_id.is_empty() {
            return SessionContext::default();
        }
        if let Some(ctx) = self.cache.read().await.get(room_id) {
            return ctx.clone();
        }
        match self.registry.session_by_room(room_id).await {
            Ok(record) => {
                let ctx = SessionContext {
                    backend_session_id: record.id,
                    tool_session_id: record.bb_session_id,
                };
                self.cache
                    .write()
                    .await
                    .insert(room_id.to_string(), ctx.clone());
                ctx
            }
            Err(e) => {
                tracing::warn!(room_id, error = %e, "session resolution failed, continuing without ids");
                SessionContext::default()
            }
        }
    }

    /// 丢弃某房间的记忆化结果（如网关重连后）
    pub async fn invalidate(&self, room_id: &str) {
        self.cache.write().await.remove(room_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRegistry {
        lookups: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl SessionRegistry for CountingRegistry {
        async fn session_by_room(&self, room_id: &str) -> Result<SessionRecord, String> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err("session lookup HTTP 500".to_string());
            }
            Ok(SessionRecord {
                id: "sess-1".to_string(),
                room_id: room_id.to_string(),
                bb_session_id: "bb-123".to_string(),
                status: "running".to_string(),
                live_view_url: String::new(),
                extra: Default::default(),
            })
        }

        async fn session_by_id(&self, _session_id: &str) -> Result<SessionRecord, String> {
            Err("unused".to_string())
        }
    }

    #[tokio::test]
    async fn test_resolve_memoized_per_room() {
        let registry = Arc::new(CountingRegistry {
            lookups: AtomicUsize::new(0),
            fail: false,
        });
        let resolver = SessionResolver::new(registry.clone());

        let a = resolver.resolve("room-1").await;
        let b = resolver.resolve("room-1").await;
        assert_eq!(a.backend_session_id, "sess-1");
        assert_eq!(b.tool_session_id, "bb-123");
        assert_eq!(registry.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolve_failure_yields_empty_and_is_not_cached() {
        let registry = Arc::new(CountingRegistry {
            lookups: AtomicUsize::new(0),
            fail: true,
        });
        let resolver = SessionResolver::new(registry.clone());

        let a = resolver.resolve("room-1").await;
        let b = resolver.resolve("room-1").await;
        assert!(a.backend_session_id.is_empty());
        assert!(b.tool_session_id.is_empty());
        // 失败不入缓存，每次都会重试
        assert_eq!(registry.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_room_skips_lookup() {
        let registry = Arc::new(CountingRegistry {
            lookups: AtomicUsize::new(0),
            fail: false,
        });
        let resolver = SessionResolver::new(registry.clone());

        let ctx = resolver.resolve("").await;
        assert!(ctx.backend_session_id.is_empty());
        assert_eq!(registry.lookups.load(Ordering::SeqCst), 0);
    }
}
