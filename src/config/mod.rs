//! 配置管理模块
//!
//! 提供 TOML 配置文件的加载与保存。配置文件位于
//! `~/.pulseboard/config.toml`，所有字段均有默认值，文件缺失时
//! 使用默认配置。
//!
//! # 需求覆盖
//!
//! - 需求 5.1: 配置文件加载与保存
//! - 需求 5.2: 字段默认值

mod path_utils;

pub use path_utils::expand_tilde;

use crate::streaming::StreamConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 配置目录名（位于用户主目录下）
const CONFIG_DIR: &str = ".pulseboard";

/// 配置文件名
const CONFIG_FILE: &str = "config.toml";

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("配置文件读写失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置文件解析失败: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("配置序列化失败: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("无法确定用户主目录")]
    NoHomeDir,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（trace/debug/info/warn/error）
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// 连接配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConnectionConfig {
    /// 默认组织名（可被命令行参数覆盖）
    #[serde(default)]
    pub organization: Option<String>,

    /// 报告服务基础地址（缺省时使用内置默认值）
    #[serde(default)]
    pub base_url: Option<String>,
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// 连接配置
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// 报告流配置
    #[serde(default)]
    pub stream: StreamConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 默认配置文件路径：`~/.pulseboard/config.toml`
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// 加载配置
///
/// 文件不存在时返回默认配置（首次运行无需手动建文件），
/// 文件存在但解析失败时返回错误。
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "配置文件不存在，使用默认配置");
        return Ok(AppConfig::default());
    }
    let content = fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), "已加载配置文件");
    Ok(config)
}

/// 保存配置
///
/// 目标目录不存在时自动创建。
pub fn save_config(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    tracing::info!(path = %path.display(), "配置已保存");
    Ok(())
}

// ============================================================================
// 测试模块
// ============================================================================
