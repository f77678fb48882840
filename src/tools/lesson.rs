//! 课程工具：后端的薄透传
//!
//! 五个工具只做参数整理与错误翻译：会话 id 参数缺省回落到 TurnDeps，
//! 计划不存在返回 {"error":"not_found"} 载荷（供 LLM 对话式处理），
//! 传输失败以 Err 上抛由执行器转为类型化工具错误。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::lesson::{LessonBackend, LessonPlan};
use crate::tools::{Tool, TurnDeps};

/// 取参数里的字符串，snake_case 与 camelCase 两种拼写都接受
fn arg_str(args: &Value, snake: &str, camel: &str) -> Option<String> {
    args.get(snake)
        .or_else(|| args.get(camel))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// 会话 id：参数优先，缺省回落到回合上下文
fn session_id_or_deps(args: &Value, deps: &TurnDeps) -> Option<String> {
    arg_str(args, "session_id", "sessionId")
        .or_else(|| Some(deps.backend_session_id.clone()).filter(|s| !s.is_empty()))
}

/// get_room_id：返回当前房间 id
pub struct GetRoomIdTool;

#[async_trait]
impl Tool for GetRoomIdTool {
    fn name(&self) -> &str {
        "get_room_id"
    }

    fn description(&self) -> &str {
        "Get the id of the current room. Fails when there is no active room."
    }

    async fn execute(&self, deps: &TurnDeps, _args: Value) -> Result<String, String> {
        if deps.room_id.is_empty() {
            return Err("No active room".to_string());
        }
        Ok(json!({ "room_id": deps.room_id }).to_string())
    }
}

/// session_get：按会话 id 或房间 id 查会话记录
pub struct SessionGetTool {
    backend: Arc<dyn LessonBackend>,
}

impl SessionGetTool {
    pub fn new(backend: Arc<dyn LessonBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for SessionGetTool {
    fn name(&self) -> &str {
        "session_get"
    }

    fn description(&self) -> &str {
        "Look up the session record by session_id or room_id. Defaults to the current turn's ids."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "session_id": { "type": "string" },
                "room_id": { "type": "string" }
            },
            "required": []
        })
    }

    async fn execute(&self, deps: &TurnDeps, args: Value) -> Result<String, String> {
        let session_id = session_id_or_deps(&args, deps);
        let room_id = arg_str(&args, "room_id", "roomId")
            .or_else(|| Some(deps.room_id.clone()).filter(|s| !s.is_empty()));
        if session_id.is_none() && room_id.is_none() {
            return Err("session_get requires session_id or room_id".to_string());
        }
        let record = self
            .backend
            .session_get(session_id.as_deref(), room_id.as_deref())
            .await?;
        Ok(record.to_string())
    }
}

/// lesson_plan_get：404 翻译为 {"error":"not_found"}
pub struct LessonPlanGetTool {
    backend: Arc<dyn LessonBackend>,
}

impl LessonPlanGetTool {
    pub fn new(backend: Arc<dyn LessonBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for LessonPlanGetTool {
    fn name(&self) -> &str {
        "lesson_plan_get"
    }

    fn description(&self) -> &str {
        "Fetch the lesson plan for a session. Returns {\"error\":\"not_found\"} when none exists yet."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "session_id": { "type": "string" }
            },
            "required": []
        })
    }

    async fn execute(&self, deps: &TurnDeps, args: Value) -> Result<String, String> {
        let session_id = session_id_or_deps(&args, deps)
            .ok_or_else(|| "lesson_plan_get requires session_id".to_string())?;
        match self.backend.plan_get(&session_id).await? {
            Some(plan) => serde_json::to_string(&plan).map_err(|e| e.to_string()),
            None => Ok(json!({ "error": "not_found" }).to_string()),
        }
    }
}

/// lesson_plan_upsert：写入/覆盖课程计划
pub struct LessonPlanUpsertTool {
    backend: Arc<dyn LessonBackend>,
}

impl LessonPlanUpsertTool {
    pub fn new(backend: Arc<dyn LessonBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for LessonPlanUpsertTool {
    fn name(&self) -> &str {
        "lesson_plan_upsert"
    }

    fn description(&self) -> &str {
        "Create or replace the lesson plan for a session. `plan` must contain title, description, goal, objective and steps."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "session_id": { "type": "string" },
                "plan": { "type": "object" }
            },
            "required": ["plan"]
        })
    }

    async fn execute(&self, deps: &TurnDeps, args: Value) -> Result<String, String> {
        let session_id = session_id_or_deps(&args, deps)
            .ok_or_else(|| "lesson_plan_upsert requires session_id".to_string())?;
        let plan_value = args
            .get("plan")
            .cloned()
            .ok_or_else(|| "lesson_plan_upsert requires plan".to_string())?;
        let plan: LessonPlan = serde_json::from_value(plan_value)
            .map_err(|e| format!("invalid lesson plan: {}", e))?;
        let stored = self.backend.plan_upsert(&session_id, &plan).await?;
        Ok(stored.to_string())
    }
}

/// lesson_step_toggle：切换某一步的完成状态
pub struct LessonStepToggleTool {
    backend: Arc<dyn LessonBackend>,
}

impl LessonStepToggleTool {
    pub fn new(backend: Arc<dyn LessonBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for LessonStepToggleTool {
    fn name(&self) -> &str {
        "lesson_step_toggle"
    }

    fn description(&self) -> &str {
        "Mark a lesson step done or not done. Requires step_id and done."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "session_id": { "type": "string" },
                "step_id": { "type": "string" },
                "done": { "type": "boolean" }
            },
            "required": ["step_id", "done"]
        })
    }

    async fn execute(&self, deps: &TurnDeps, args: Value) -> Result<String, String> {
        let session_id = session_id_or_deps(&args, deps)
            .ok_or_else(|| "lesson_step_toggle requires session_id".to_string())?;
        let step_id = arg_str(&args, "step_id", "stepId")
            .ok_or_else(|| "lesson_step_toggle requires step_id".to_string())?;
        let done = args
            .get("done")
            .and_then(|v| v.as_bool())
            .ok_or_else(|| "lesson_step_toggle requires done".to_string())?;
        let updated = self.backend.step_toggle(&session_id, &step_id, done).await?;
        Ok(updated.to_string())
    }
}
