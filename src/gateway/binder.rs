//! 会话绑定器：工具调用拦截
//!
//! 每次出站工具调用先经过 dispatch：改写参数（注入/修复工具会话 id），
//! 并保证该房间在网关连接生命周期内至多发出一次显式建会话调用。
//! 绑定标志用异步 Mutex 持锁跨过建会话 await，检查与置位对并发调用原子。

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::gateway::ToolGateway;
use crate::observability::TurnObserver;

/// 远端的建会话工具名
pub const SESSION_CREATE_TOOL: &str = "browserbase_session_create";
/// 「未绑定」占位 id 的保留前缀；带此前缀的 id 一律视为无效并改写
pub const SESSION_PLACEHOLDER_PREFIX: &str = "browserbase_session_main_";

/// 会话绑定器：每房间一个，与 AgentContext 同生命周期
pub struct SessionBinder {
    gateway: Arc<dyn ToolGateway>,
    observer: Arc<dyn TurnObserver>,
    room_id: String,
    bound: Mutex<bool>,
}

fn is_missing_or_placeholder(value: Option<&Value>) -> bool {
    match value {
        None => true,
        Some(Value::String(s)) => s.is_empty() || s.starts_with(SESSION_PLACEHOLDER_PREFIX),
        // 非字符串的 id 视为无效
        Some(_) => true,
    }
}

impl SessionBinder {
    pub fn new(
        gateway: Arc<dyn ToolGateway>,
        observer: Arc<dyn TurnObserver>,
        room_id: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            observer,
            room_id: room_id.into(),
            bound: Mutex::new(false),
        }
    }

    /// 改写参数集：注入/修复工具会话 id。纯函数且幂等。
    ///
    /// - 未解析出 id（session_id 为空）时原样返回，绝不伪造
    /// - `session_id` / `sessionId` 缺失、为空或带占位前缀时，两种拼写都覆写
    /// - 嵌套 `session` 对象存在但无 `id` 时补上
    pub fn rewrite_args(args: &Value, session_id: &str) -> Value {
        if session_id.is_empty() {
            return args.clone();
        }
        let mut out = args.clone();
        let Value::Object(map) = &mut out else {
            return out;
        };

        let current_missing = is_missing_or_placeholder(map.get("session_id"))
            && is_missing_or_placeholder(map.get("sessionId"));
        if current_missing {
            map.insert("session_id".to_string(), json!(session_id));
            map.insert("sessionId".to_string(), json!(session_id));
        }

        if let Some(Value::Object(session)) = map.get_mut("session") {
            if is_missing_or_placeholder(session.get("id")) {
                session.insert("id".to_string(), json!(session_id));
            }
        }

        out
    }

    /// 拦截路径：每次出站调用经过这里
    ///
    /// - 建会话工具本身：改写后直通，成功即标记已绑定
    /// - 其他工具：未绑定且有已解析 id 时，先发一次建会话；失败仅告警继续
    pub async fn dispatch(
        &self,
        name: &str,
        args: Value,
        session_id: &str,
    ) -> Result<String, String> {
        let args = Self::rewrite_args(&args, session_id);

        if name == SESSION_CREATE_TOOL {
            let out = self.gateway.call_tool(name, args).await?;
            self.mark_bound(session_id).await;
            return Ok(out);
        }

        if !session_id.is_empty() {
            let mut bound = self.bound.lock().await;
            if !*bound {
                match self
                    .gateway
                    .call_tool(SESSION_CREATE_TOOL, json!({ "sessionId": session_id }))
                    .await
                {
                    Ok(_) => {
                        *bound = true;
                        self.observer.session_bound(&self.room_id, session_id);
                    }
                    Err(e) => {
                        tracing::warn!(
                            tool = name,
                            error = %e,
                            "session create before tool call failed, proceeding unbound"
                        );
                    }
                }
            }
        }

        self.gateway.call_tool(name, args).await
    }

    /// 直连路径：open() 时的主动绑定，不走拦截
    pub async fn bind_now(&self, session_id: &str) -> Result<(), String> {
        if session_id.is_empty() {
            return Ok(());
        }
        {
            let bound = self.bound.lock().await;
            if *bound {
                return Ok(());
            }
        }
        self.gateway
            .call_tool(SESSION_CREATE_TOOL, json!({ "sessionId": session_id }))
            .await?;
        self.mark_bound(session_id).await;
        Ok(())
    }

    async fn mark_bound(&self, session_id: &str) {
        let mut bound = self.bound.lock().await;
        if !*bound {
            *bound = true;
            self.observer.session_bound(&self.room_id, session_id);
        }
    }

    /// 网关连接重建后调用：下一次工具调用会重新绑定
    pub async fn mark_unbound(&self) {
        *self.bound.lock().await = false;
    }

    pub async fn is_bound(&self) -> bool {
        *self.bound.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::NoopObserver;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    struct RecordingGateway {
        calls: StdMutex<Vec<(String, Value)>>,
    }

    impl RecordingGateway {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: StdMutex::new(Vec::new()),
            })
        }

        fn call_names(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(n, _)| n.clone())
                .collect()
        }
    }

    #[async_trait]
    impl ToolGateway for RecordingGateway {
        async fn open(&self) -> Result<(), String> {
            Ok(())
        }

        async fn call_tool(&self, name: &str, args: Value) -> Result<String, String> {
            self.calls
                .lock()
                .unwrap()
                .push((name.to_string(), args));
            Ok("ok".to_string())
        }

        async fn close(&self) -> Result<(), String> {
            Ok(())
        }
    }

    fn binder(gateway: Arc<RecordingGateway>) -> SessionBinder {
        SessionBinder::new(gateway, Arc::new(NoopObserver), "room-1")
    }

    #[test]
    fn test_rewrite_injects_both_spellings_when_absent() {
        let args = json!({"url": "https://example.com"});
        let out = SessionBinder::rewrite_args(&args, "S");
        assert_eq!(out["session_id"], "S");
        assert_eq!(out["sessionId"], "S");
        assert_eq!(out["url"], "https://example.com");
    }

    #[test]
    fn test_rewrite_repairs_placeholder() {
        let args = json!({"session_id": "browserbase_session_main_abc"});
        let out = SessionBinder::rewrite_args(&args, "S");
        assert_eq!(out["session_id"], "S");
        assert_eq!(out["sessionId"], "S");
    }

    #[test]
    fn test_rewrite_keeps_valid_id() {
        let args = json!({"session_id": "real-session"});
        let out = SessionBinder::rewrite_args(&args, "S");
        assert_eq!(out["session_id"], "real-session");
        assert!(out.get("sessionId").is_none());
    }

    #[test]
    fn test_rewrite_never_fabricates() {
        let args = json!({"url": "https://example.com"});
        let out = SessionBinder::rewrite_args(&args, "");
        assert_eq!(out, args);
    }

    #[test]
    fn test_rewrite_sets_nested_session_id() {
        let args = json!({"session": {"region": "us"}});
        let out = SessionBinder::rewrite_args(&args, "S");
        assert_eq!(out["session"]["id"], "S");
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let args = json!({
            "session_id": "browserbase_session_main_x",
            "session": {"region": "us"},
        });
        let once = SessionBinder::rewrite_args(&args, "S");
        let twice = SessionBinder::rewrite_args(&once, "S");
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_dispatch_binds_once_before_first_call() {
        let gateway = RecordingGateway::new();
        let binder = binder(gateway.clone());

        binder
            .dispatch("browserbase_navigate", json!({"url": "a"}), "S")
            .await
            .unwrap();
        binder
            .dispatch("browserbase_click", json!({"selector": "b"}), "S")
            .await
            .unwrap();

        assert_eq!(
            gateway.call_names(),
            vec![
                SESSION_CREATE_TOOL.to_string(),
                "browserbase_navigate".to_string(),
                "browserbase_click".to_string(),
            ]
        );
        assert!(binder.is_bound().await);
    }

    #[tokio::test]
    async fn test_dispatch_without_session_id_skips_bind() {
        let gateway = RecordingGateway::new();
        let binder = binder(gateway.clone());

        binder
            .dispatch("browserbase_navigate", json!({"url": "a"}), "")
            .await
            .unwrap();

        assert_eq!(gateway.call_names(), vec!["browserbase_navigate"]);
        assert!(!binder.is_bound().await);
    }

    #[tokio::test]
    async fn test_explicit_create_marks_bound() {
        let gateway = RecordingGateway::new();
        let binder = binder(gateway.clone());

        binder
            .dispatch(SESSION_CREATE_TOOL, json!({}), "S")
            .await
            .unwrap();
        binder
            .dispatch("browserbase_navigate", json!({}), "S")
            .await
            .unwrap();

        // 显式建会话之后不再自动补发
        assert_eq!(
            gateway.call_names(),
            vec![SESSION_CREATE_TOOL, "browserbase_navigate"]
        );
        // 建会话调用本身也被注入了 id
        let first_args = gateway.calls.lock().unwrap()[0].1.clone();
        assert_eq!(first_args["sessionId"], "S");
    }

    #[tokio::test]
    async fn test_bind_now_then_dispatch_does_not_rebind() {
        let gateway = RecordingGateway::new();
        let binder = binder(gateway.clone());

        binder.bind_now("S").await.unwrap();
        binder.bind_now("S").await.unwrap();
        binder
            .dispatch("browserbase_navigate", json!({}), "S")
            .await
            .unwrap();

        assert_eq!(
            gateway.call_names(),
            vec![SESSION_CREATE_TOOL, "browserbase_navigate"]
        );
    }
}
