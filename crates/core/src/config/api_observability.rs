use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub bind_address: String,
    pub cors_enabled: bool,
    pub cors_origins: Vec<String>,
    /// create-video 请求体上限
    pub max_request_size_mb: usize,
    /// Worker上传产物的大小上限
    pub max_artifact_size_mb: usize,
    pub auth: AuthConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            cors_enabled: true,
            cors_origins: vec!["*".to_string()],
            max_request_size_mb: 10,
            max_artifact_size_mb: 500,
            auth: AuthConfig::default(),
        }
    }
}

impl ApiConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_address.is_empty() {
            return Err(anyhow::anyhow!("绑定地址不能为空"));
        }
        if !self.bind_address.contains(':') {
            return Err(anyhow::anyhow!("绑定地址格式无效，应为 host:port"));
        }

        if self.max_request_size_mb == 0 {
            return Err(anyhow::anyhow!("最大请求大小必须大于0"));
        }

        if self.max_artifact_size_mb == 0 {
            return Err(anyhow::anyhow!("最大产物大小必须大于0"));
        }
        self.auth.validate()?;

        Ok(())
    }
}

/// 认证默认开启，关闭需显式设置 `enabled = false`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 键为 base64(SHA-256(明文密钥))
    #[serde(default)]
    pub api_keys: HashMap<String, ApiKeyConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyConfig {
    pub name: String,
    pub permissions: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_keys: HashMap::new(),
        }
    }
}

pub const VALID_PERMISSIONS: [&str; 2] = ["Submit", "Admin"];

impl AuthConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.enabled {
            return Ok(());
        }

        for (hash, key_config) in &self.api_keys {
            if hash.is_empty() {
                return Err(anyhow::anyhow!("API密钥哈希不能为空"));
            }

            if key_config.name.is_empty() {
                return Err(anyhow::anyhow!("API密钥名称不能为空"));
            }

            if key_config.permissions.is_empty() {
                return Err(anyhow::anyhow!("API密钥权限不能为空"));
            }

            for permission in &key_config.permissions {
                if !VALID_PERMISSIONS.contains(&permission.as_str()) {
                    return Err(anyhow::anyhow!(
                        "无效的权限: {}，支持的权限: {:?}",
                        permission,
                        VALID_PERMISSIONS
                    ));
                }
            }
        }

        Ok(())
    }

    /// 服务端启动前检查：启用认证时必须存在可用的密钥
    pub fn ensure_usable(&self) -> anyhow::Result<()> {
        if self.enabled && !self.api_keys.values().any(|key| key.is_active) {
            return Err(anyhow::anyhow!(
                "启用认证时至少需要配置一个有效的API密钥（或显式设置 api.auth.enabled = false）"
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
    pub metrics_endpoint: String,
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            metrics_endpoint: "/metrics".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl ObservabilityConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(anyhow::anyhow!(
                "无效的日志级别: {}，支持的级别: {:?}",
                self.log_level,
                valid_log_levels
            ));
        }

        if self.metrics_endpoint.is_empty() {
            return Err(anyhow::anyhow!("指标端点不能为空"));
        }

        if !self.metrics_endpoint.starts_with('/') {
            return Err(anyhow::anyhow!("指标端点必须以'/'开头"));
        }

        Ok(())
    }
}
