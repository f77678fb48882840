//! 课程计划：领域载荷与后端端口
//!
//! LessonPlan / LessonStep 按线上 camelCase 形状原样透传，编排器不解释其内容；
//! LessonBackend 是课程后端的 HTTP 端口，404 翻译为 Ok(None) 而非错误。

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 课程中的一步
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonStep {
    pub id: String,
    pub concept_title: String,
    pub description: String,
    pub objective: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_objective: Option<String>,
    pub done: bool,
    pub order: i64,
}

/// 课程计划
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonPlan {
    pub title: String,
    pub description: String,
    pub goal: String,
    pub objective: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_objective: Option<String>,
    pub steps: Vec<LessonStep>,
}

/// 课程后端端口：会话查询与计划 CRUD 的薄透传
#[async_trait]
pub trait LessonBackend: Send + Sync {
    /// 至少提供 session_id 与 room_id 之一
    async fn session_get(
        &self,
        session_id: Option<&str>,
        room_id: Option<&str>,
    ) -> Result<Value, String>;

    /// 计划不存在时返回 Ok(None)
    async fn plan_get(&self, session_id: &str) -> Result<Option<LessonPlan>, String>;

    async fn plan_upsert(&self, session_id: &str, plan: &LessonPlan) -> Result<Value, String>;

    async fn step_toggle(
        &self,
        session_id: &str,
        step_id: &str,
        done: bool,
    ) -> Result<Value, String>;
}

/// HTTP 实现：/api/session、/api/lesson/plan、/api/lesson/step
pub struct HttpLessonBackend {
    client: reqwest::Client,
    base: String,
}

impl HttpLessonBackend {
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
}

#[async_trait]
impl LessonBackend for HttpLessonBackend {
    async fn session_get(
        &self,
        session_id: Option<&str>,
        room_id: Option<&str>,
    ) -> Result<Value, String> {
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(sid) = session_id {
            params.push(("sessionId", sid));
        }
        if let Some(rid) = room_id {
            params.push(("roomId", rid));
        }
        if params.is_empty() {
            return Err("session_get requires sessionId or roomId".to_string());
        }
        let resp = self
            .client
            .get(format!("{}/api/session", self.base))
            .query(&params)
            .send()
            .await
            .map_err(|e| format!("session_get failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("session_get HTTP {}", resp.status()));
        }
        resp.json::<Value>()
            .await
            .map_err(|e| format!("session_get decode failed: {}", e))
    }

    async fn plan_get(&self, session_id: &str) -> Result<Option<LessonPlan>, String> {
        let resp = self
            .client
            .get(format!("{}/api/lesson/plan", self.base))
            .query(&[("sessionId", session_id)])
            .send()
            .await
            .map_err(|e| format!("plan_get failed: {}", e))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(format!("plan_get HTTP {}", resp.status()));
        }
        resp.json::<LessonPlan>()
            .await
            .map(Some)
            .map_err(|e| format!("plan_get decode failed: {}", e))
    }

    async fn plan_upsert(&self, session_id: &str, plan: &LessonPlan) -> Result<Value, String> {
        let resp = self
            .client
            .post(format!("{}/api/lesson/plan", self.base))
            .json(&serde_json::json!({
                "sessionId": session_id,
                "plan": plan,
            }))
            .send()
            .await
            .map_err(|e| format!("plan_upsert failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("plan_upsert HTTP {}", resp.status()));
        }
        resp.json::<Value>()
            .await
            .map_err(|e| format!("plan_upsert decode failed: {}", e))
    }

    async fn step_toggle(
        &self,
        session_id: &str,
        step_id: &str,
        done: bool,
    ) -> Result<Value, String> {
        let resp = self
            .client
            .post(format!("{}/api/lesson/step", self.base))
            .json(&serde_json::json!({
                "sessionId": session_id,
                "stepId": step_id,
                "done": done,
            }))
            .send()
            .await
            .map_err(|e| format!("step_toggle failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("step_toggle HTTP {}", resp.status()));
        }
        resp.json::<Value>()
            .await
            .map_err(|e| format!("step_toggle decode failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_wire_shape_is_camel_case() {
        let plan = LessonPlan {
            title: "Spreadsheet basics".to_string(),
            description: "Track expenses with a spreadsheet".to_string(),
            goal: "Build a monthly expense tracker".to_string(),
            objective: "Understand rows, columns and formulas".to_string(),
            user_objective: None,
            steps: vec![LessonStep {
                id: "step-1".to_string(),
                concept_title: "Cells".to_string(),
                description: "Enter data into cells".to_string(),
                objective: "Fill a column of expenses".to_string(),
                user_objective: None,
                done: false,
                order: 1,
            }],
        };
        let v = serde_json::to_value(&plan).unwrap();
        assert!(v.get("steps").unwrap()[0].get("conceptTitle").is_some());
        // None 字段不出现在载荷里
        assert!(v.get("userObjective").is_none());
    }
}
