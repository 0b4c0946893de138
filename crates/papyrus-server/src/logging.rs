//! 日志初始化
//!
//! 基于 tracing 的结构化日志；`RUST_LOG` 优先于配置级别。

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 构建过滤器：环境变量优先，其次为给定级别
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// 初始化全局日志；重复调用时保留已有的订阅者
pub fn init_logging(level: &str) {
    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true);

    if tracing_subscriber::registry()
        .with(build_filter(level))
        .with(layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("Global subscriber already installed");
    }
}
