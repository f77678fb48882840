pub mod executor;
pub mod lesson;
pub mod registry;

pub use executor::ToolExecutor;
pub use lesson::{
    GetRoomIdTool, LessonPlanGetTool, LessonPlanUpsertTool, LessonStepToggleTool, SessionGetTool,
};
pub use registry::{Tool, ToolRegistry, TurnDeps};

use std::sync::Arc;

use crate::lesson::LessonBackend;

/// 构建标准课程工具注册表（本地工具全集）
pub fn lesson_tool_registry(backend: Arc<dyn LessonBackend>) -> ToolRegistry {
    let mut tools = ToolRegistry::new();
    tools.register(GetRoomIdTool);
    tools.register(SessionGetTool::new(backend.clone()));
    tools.register(LessonPlanGetTool::new(backend.clone()));
    tools.register(LessonPlanUpsertTool::new(backend.clone()));
    tools.register(LessonStepToggleTool::new(backend));
    tools
}
