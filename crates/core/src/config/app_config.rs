use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use super::{
    api_observability::{ApiConfig, ObservabilityConfig},
    dispatcher_worker::{DispatcherConfig, WorkerConfig},
};
use crate::music::MusicCatalog;

/// 默认配置文件搜索路径，按顺序取第一个存在的
pub const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "config/vidqueue.toml",
    "vidqueue.toml",
    "/etc/vidqueue/config.toml",
];

/// 环境变量前缀，例如 `VIDQUEUE_DISPATCHER__WORKER_TIMEOUT_SECONDS=30`
pub const ENV_PREFIX: &str = "VIDQUEUE";

/// System configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub dispatcher: DispatcherConfig,
    pub worker: WorkerConfig,
    pub api: ApiConfig,
    pub observability: ObservabilityConfig,
    pub music: MusicCatalog,
}

impl AppConfig {
    /// Load configuration from config file and environment variables
    ///
    /// Load order:
    /// 1. Built-in defaults
    /// 2. Config file (TOML format)
    /// 3. Environment variable overrides (prefix: VIDQUEUE_)
    ///
    /// # Arguments
    ///
    /// * `config_path` - Config file path, if None use default paths
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else if let Some(path) = DEFAULT_CONFIG_PATHS
            .iter()
            .find(|path| Path::new(path).exists())
        {
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }

    /// Validate configuration effectiveness
    pub fn validate(&self) -> Result<()> {
        self.dispatcher
            .validate()
            .context("Dispatcher配置验证失败")?;

        self.worker.validate().context("Worker配置验证失败")?;

        self.api.validate().context("API配置验证失败")?;

        self.observability
            .validate()
            .context("可观测性配置验证失败")?;

        self.validate_music().context("曲库配置验证失败")?;

        Ok(())
    }

    fn validate_music(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for track in &self.music.tracks {
            if track.id.is_empty() {
                return Err(anyhow::anyhow!("曲目ID不能为空"));
            }
            if track.url.is_empty() {
                return Err(anyhow::anyhow!("曲目URL不能为空: {}", track.id));
            }
            if !seen.insert(track.id.as_str()) {
                return Err(anyhow::anyhow!("曲目ID重复: {}", track.id));
            }
        }
        Ok(())
    }
}
