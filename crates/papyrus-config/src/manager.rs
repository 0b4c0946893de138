use crate::config::{Config, ConfigError, ConfigResult};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// 配置管理器
#[derive(Clone)]
pub struct ConfigManager {
    path: PathBuf,
    config: Arc<RwLock<Config>>,
}

impl ConfigManager {
    /// 加载配置文件
    ///
    /// 文件不存在时使用默认配置；随后应用环境变量覆盖并校验。
    pub async fn load(path: &Path) -> ConfigResult<Self> {
        let mut config = if path.exists() {
            info!("Loading config from {:?}", path);
            let content = tokio::fs::read_to_string(path).await?;
            let content = Self::expand_env_vars(&content)?;
            serde_json::from_str(&content)?
        } else {
            info!("Config file not found at {:?}, using defaults", path);
            Config::default()
        };

        config.apply_env_overrides()?;
        Self::validate(&config)?;

        Ok(Self {
            path: path.to_path_buf(),
            config: Arc::new(RwLock::new(config)),
        })
    }

    /// 创建一个新的配置管理器（用于测试）
    pub fn new(config: Config, path: PathBuf) -> Self {
        Self {
            path,
            config: Arc::new(RwLock::new(config)),
        }
    }

    /// 当前配置的快照
    pub async fn snapshot(&self) -> Config {
        self.config.read().await.clone()
    }

    /// 更新配置（仅内存，不落盘）
    pub async fn update<F>(&self, f: F) -> ConfigResult<()>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.config.write().await;
        let mut next = config.clone();
        f(&mut next);
        Self::validate(&next)?;
        *config = next;
        debug!("Config updated in memory");
        Ok(())
    }

    /// 验证配置
    pub fn validate(config: &Config) -> ConfigResult<()> {
        if config.server.port == 0 {
            return Err(ConfigError::Validation(
                "Server port cannot be 0".to_string(),
            ));
        }

        if config.server.max_upload_bytes == 0 {
            return Err(ConfigError::Validation(
                "Server max_upload_bytes must be greater than 0".to_string(),
            ));
        }

        if config.llm.timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "LLM timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if config.client.request_timeout_secs <= config.llm.timeout_seconds {
            return Err(ConfigError::Validation(format!(
                "Client request_timeout_secs ({}) must be greater than LLM timeout_seconds ({})",
                config.client.request_timeout_secs, config.llm.timeout_seconds
            )));
        }

        if let Some(temperature) = config.llm.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::Validation(format!(
                    "LLM temperature must be between 0.0 and 2.0, got {}",
                    temperature
                )));
            }
        }

        if config.llm.max_tokens == Some(0) {
            return Err(ConfigError::Validation(
                "LLM max_tokens must be greater than 0".to_string(),
            ));
        }

        config.bind_address()?;

        if config.llm.model.trim().is_empty() {
            return Err(ConfigError::Validation(
                "LLM model cannot be empty".to_string(),
            ));
        }

        if config.session.cleanup_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "Session cleanup_interval_secs must be greater than 0".to_string(),
            ));
        }

        if config.session.max_sessions == 0 {
            return Err(ConfigError::Validation(
                "Session max_sessions must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// 展开环境变量 ${VAR} 或 ${VAR:-default}
    fn expand_env_vars(content: &str) -> ConfigResult<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| ConfigError::Validation(format!("Invalid pattern: {}", e)))?;
        let mut result = content.to_string();

        for cap in re.captures_iter(content) {
            let full_match = &cap[0];
            let var_expr = &cap[1];

            let (var_name, default_value) = match var_expr.split_once(":-") {
                Some((name, default)) => (name, Some(default)),
                None => (var_expr, None),
            };

            let replacement = match std::env::var(var_name) {
                Ok(val) => val,
                Err(_) => match default_value {
                    Some(default) => default.to_string(),
                    None => return Err(ConfigError::EnvVarNotFound(var_name.to_string())),
                },
            };

            result = result.replace(full_match, &replacement);
        }

        Ok(result)
    }

    /// 获取配置文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }
}
