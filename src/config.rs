//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `TUTOR__*` 覆盖（双下划线表示嵌套，
//! 如 `TUTOR__FRONTEND__BASE_URL=http://host:3000`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub frontend: FrontendSection,
    #[serde(default)]
    pub gateway: GatewaySection,
}

/// [app] 段：助手名与历史拉取条数上限
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
    /// 每回合从外部存储拉取的历史消息条数上限
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_history_limit() -> usize {
    100
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            history_limit: default_history_limit(),
        }
    }
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：openai / mock；兼容端点（DeepSeek 等）经 base_url 指定
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

/// [frontend] 段：历史存储 / 会话注册表 / 课程后端共用的 HTTP 基址与超时
#[derive(Debug, Clone, Deserialize)]
pub struct FrontendSection {
    #[serde(default = "default_frontend_base")]
    pub base_url: String,
    #[serde(default = "default_io_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_frontend_base() -> String {
    "http://localhost:3000".to_string()
}

fn default_io_timeout_secs() -> u64 {
    10
}

impl Default for FrontendSection {
    fn default() -> Self {
        Self {
            base_url: default_frontend_base(),
            timeout_secs: default_io_timeout_secs(),
        }
    }
}

/// [gateway] 段：远程工具网关地址与超时；url 为空表示无远程工具集
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySection {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_io_timeout_secs")]
    pub timeout_secs: u64,
    /// 单次工具调用超时（秒），本地课程工具与远程工具共用
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
}

fn default_tool_timeout_secs() -> u64 {
    30
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: default_io_timeout_secs(),
            tool_timeout_secs: default_tool_timeout_secs(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSection::default(),
            llm: LlmSection::default(),
            frontend: FrontendSection::default(),
            gateway: GatewaySection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 TUTOR__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 TUTOR__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("TUTOR")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
