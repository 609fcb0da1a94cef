//! 配置加载器实现
//!
//! 提供TOML配置文件解析、环境变量替换以及与命令行覆盖项的合并

use crate::config::types::{validate_config, ConfigOverrides, HeartbeatConfig};
use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};

/// 配置加载器trait，定义配置加载接口
///
/// 加载结果尚未经过验证，文件中可以缺省由环境变量提供的字段。
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    /// 从文件加载配置
    ///
    /// # 参数
    /// * `path` - 配置文件路径
    ///
    /// # 返回
    /// * `Result<HeartbeatConfig>` - 加载的配置或错误
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<HeartbeatConfig>;

    /// 从字符串加载配置
    async fn load_from_string(&self, content: &str) -> Result<HeartbeatConfig>;
}

/// TOML配置加载器实现
#[derive(Debug, Clone)]
pub struct TomlConfigLoader {
    /// 是否启用环境变量替换
    enable_env_substitution: bool,
}

impl TomlConfigLoader {
    /// 创建新的TOML配置加载器
    ///
    /// # 参数
    /// * `enable_env_substitution` - 是否启用 `${VAR}` 形式的环境变量替换
    pub fn new(enable_env_substitution: bool) -> Self {
        Self {
            enable_env_substitution,
        }
    }

    /// 替换字符串中的环境变量
    fn substitute_env_vars(&self, content: &str) -> Result<String> {
        if !self.enable_env_substitution {
            return Ok(content.to_string());
        }

        let env_var_regex = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
            .map_err(|e| ConfigError::ParseError(format!("正则表达式错误: {e}")))?;

        let mut result = content.to_string();

        for captures in env_var_regex.captures_iter(content) {
            let full_match = &captures[0];
            let var_name = &captures[1];

            match std::env::var(var_name) {
                Ok(value) => {
                    result = result.replace(full_match, &value);
                }
                Err(_) => {
                    return Err(ConfigError::EnvVarError {
                        var: var_name.to_string(),
                    }
                    .into());
                }
            }
        }

        Ok(result)
    }

    fn parse_toml(&self, content: &str) -> Result<HeartbeatConfig> {
        let processed_content = self.substitute_env_vars(content)?;

        let config: HeartbeatConfig = toml::from_str(&processed_content)
            .map_err(|e| ConfigError::ParseError(format!("TOML解析失败: {e}")))?;

        Ok(config)
    }
}

impl Default for TomlConfigLoader {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl ConfigLoader for TomlConfigLoader {
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<HeartbeatConfig> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            }
            .into());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::ParseError(format!("读取文件失败: {e}")))?;

        let config = self.parse_toml(&content)?;

        log::info!("成功加载配置文件: {}", path.display());
        log::debug!("配置内容: {config:?}");

        Ok(config)
    }

    async fn load_from_string(&self, content: &str) -> Result<HeartbeatConfig> {
        let config = self.parse_toml(content)?;
        log::debug!("成功解析配置字符串");
        Ok(config)
    }
}

/// 合并配置来源并验证
///
/// 优先级：命令行/环境变量 > 配置文件 > 默认值。
///
/// # 参数
/// * `loader` - 配置加载器
/// * `config_path` - 可选的配置文件路径
/// * `overrides` - 命令行与环境变量覆盖项
///
/// # 返回
/// * `Result<HeartbeatConfig>` - 验证通过的最终配置
pub async fn resolve_config<L: ConfigLoader>(
    loader: &L,
    config_path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<HeartbeatConfig> {
    let base = match config_path {
        Some(path) => loader.load_from_file(path).await?,
        None => HeartbeatConfig::default(),
    };

    let config = base.with_overrides(overrides);
    validate_config(&config)?;
    Ok(config)
}

/// 获取默认配置文件路径
///
/// 依次查找当前目录下的 `heartbeat.toml` 与用户配置目录下的
/// `heartbeat-agent/config.toml`，都不存在时返回 `None`。
pub fn get_default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from("heartbeat.toml");
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|config_dir| config_dir.join(crate::APP_NAME).join("config.toml"))
        .filter(|path| path.exists())
}
