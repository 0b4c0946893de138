use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};

/// 10 MiB，上传大小上限的默认值
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// 客户端聊天请求超时（秒），须大于服务端补全超时
pub const DEFAULT_CLIENT_REQUEST_TIMEOUT_SECS: u64 = 90;

/// 主配置结构体
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub version: String,
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub session: SessionConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub client: ClientConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            session: SessionConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
            client: ClientConfig::default(),
        }
    }
}

impl Config {
    /// 应用环境变量覆盖（APP_HOST / APP_PORT / BACKEND_URL）
    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        if let Ok(host) = std::env::var("APP_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("APP_PORT") {
            self.server.port = port.parse().map_err(|_| {
                ConfigError::Validation(format!("Invalid port number: {}", port))
            })?;
        }
        if let Ok(url) = std::env::var("BACKEND_URL") {
            self.client.backend_url = url;
        }
        Ok(())
    }

    /// 解析 LLM 凭证；缺失即为致命错误
    ///
    /// `auth = none` 时返回 `Ok(None)`。
    pub fn resolve_api_key(&self) -> ConfigResult<Option<String>> {
        match &self.llm.auth {
            AuthSettings::ApiKey { env } | AuthSettings::Bearer { env } => {
                match std::env::var(env) {
                    Ok(key) if !key.trim().is_empty() => Ok(Some(key)),
                    _ => Err(ConfigError::MissingCredential(env.clone())),
                }
            }
            AuthSettings::None => Ok(None),
        }
    }

    /// 服务监听地址，host 须为 IPv4 或 IPv6 字面量
    pub fn bind_address(&self) -> ConfigResult<SocketAddr> {
        let ip: IpAddr = self.server.host.trim().parse().map_err(|_| {
            ConfigError::Validation(format!("Invalid server host: {}", self.server.host))
        })?;
        Ok(SocketAddr::new(ip, self.server.port))
    }
}

/// Server 配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: bool,
    /// 服务端强制的单文件上传上限（字节）
    pub max_upload_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors: true,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// LLM 配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub auth: AuthSettings,
    /// 一轮对话的超时（秒），含等待会话锁与重试
    pub timeout_seconds: u64,
    /// 瞬时错误的最大重试次数
    pub max_retries: u32,
    /// 采样温度，未设置时使用服务端默认值
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4.1-mini".to_string(),
            auth: AuthSettings::default(),
            timeout_seconds: 60,
            max_retries: 3,
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Authentication settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "auth_type", rename_all = "snake_case")]
pub enum AuthSettings {
    /// API Key authentication - reads from environment variable
    ApiKey {
        env: String,
    },
    /// Bearer token authentication - reads from environment variable
    Bearer {
        env: String,
    },
    /// No authentication (local OpenAI-compatible endpoints)
    None,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self::ApiKey {
            env: "OPENAI_API_KEY".to_string(),
        }
    }
}

/// Session 配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// 空闲会话过期时间（秒），0 表示永不过期
    pub idle_ttl_secs: u64,
    /// 后台清理间隔（秒）
    pub cleanup_interval_secs: u64,
    /// 内存中最多保留的会话数
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: 86_400,
            cleanup_interval_secs: 300,
            max_sessions: 10_000,
        }
    }
}

/// Storage 配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub upload_dir: String,
    pub persist_uploads: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: "./uploaded_files".to_string(),
            persist_uploads: true,
        }
    }
}

/// 日志级别
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::Validation(format!("Invalid log level: {}", s))),
        }
    }
}

/// Logging 配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}

/// 聊天客户端配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub backend_url: String,
    /// 客户端发送前检查的文件大小上限（字节）
    pub max_file_bytes: u64,
    /// 聊天请求超时（秒）
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8000".to_string(),
            max_file_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            request_timeout_secs: DEFAULT_CLIENT_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("{0} environment variable is required")]
    MissingCredential(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
