use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    middleware::Next,
    response::Response,
};
use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::warn;

use vidqueue_core::config::AuthConfig as CoreAuthConfig;

use crate::error::ApiError;

pub const API_KEY_HEADER: &str = "X-API-Key";
pub const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub enabled: bool,
    /// 键为密钥的 base64(SHA-256) 摘要
    pub api_keys: HashMap<String, ApiKeyInfo>,
}

#[derive(Debug, Clone)]
pub struct ApiKeyInfo {
    pub name: String,
    pub permissions: Vec<Permission>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Permission {
    /// 提交视频生成请求
    Submit,
    /// 查看管理统计，隐含所有权限
    Admin,
}

#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidApiKey,
    InsufficientPermissions,
    MalformedHeader,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Missing authentication credentials"),
            AuthError::InvalidApiKey => write!(f, "Invalid API key"),
            AuthError::InsufficientPermissions => write!(f, "Insufficient permissions"),
            AuthError::MalformedHeader => write!(f, "Malformed authorization header"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<&AuthError> for StatusCode {
    fn from(err: &AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::InvalidApiKey => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AuthError::MalformedHeader => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<&CoreAuthConfig> for AuthConfig {
    fn from(core_config: &CoreAuthConfig) -> Self {
        let api_keys = core_config
            .api_keys
            .iter()
            .map(|(hash, key_config)| {
                let permissions = key_config
                    .permissions
                    .iter()
                    .filter_map(|p| parse_permission(p))
                    .collect();
                (
                    hash.clone(),
                    ApiKeyInfo {
                        name: key_config.name.clone(),
                        permissions,
                        is_active: key_config.is_active,
                    },
                )
            })
            .collect();

        Self {
            enabled: core_config.enabled,
            api_keys,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub permissions: Vec<Permission>,
}

impl AuthenticatedUser {
    /// 认证关闭时注入的默认身份
    pub fn anonymous_admin() -> Self {
        Self {
            user_id: "anonymous".to_string(),
            permissions: vec![Permission::Admin],
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission) || self.permissions.contains(&Permission::Admin)
    }

    pub fn require_permission(&self, permission: Permission) -> Result<(), AuthError> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(AuthError::InsufficientPermissions)
        }
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(ApiError::Authentication(AuthError::MissingToken))
    }
}

pub struct ApiKeyService<'a> {
    keys: &'a HashMap<String, ApiKeyInfo>,
}

impl<'a> ApiKeyService<'a> {
    pub fn new(keys: &'a HashMap<String, ApiKeyInfo>) -> Self {
        Self { keys }
    }

    pub fn validate_api_key(&self, api_key: &str) -> Result<&'a ApiKeyInfo, AuthError> {
        let hashed_key = hash_api_key(api_key);
        self.keys
            .get(&hashed_key)
            .filter(|info| info.is_active)
            .ok_or(AuthError::InvalidApiKey)
    }
}

/// 配置文件中保存的密钥摘要
pub fn hash_api_key(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    general_purpose::STANDARD.encode(hasher.finalize())
}

pub fn generate_api_key() -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    let key: [u8; 32] = rng.random();
    general_purpose::URL_SAFE_NO_PAD.encode(key)
}

/// 为受保护路由解析调用方身份
///
/// 认证关闭时注入默认管理员身份，权限检查在处理器中进行。
pub async fn auth_middleware(
    State(state): State<crate::routes::AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.auth_config.enabled {
        req.extensions_mut()
            .insert(AuthenticatedUser::anonymous_admin());
        return Ok(next.run(req).await);
    }

    match extract_auth_info(&req, &state.auth_config) {
        Ok(user) => {
            req.extensions_mut().insert(user);
            Ok(next.run(req).await)
        }
        Err(err) => {
            warn!("Authentication failed: {}", err);
            Err(err.into())
        }
    }
}

fn extract_auth_info(req: &Request, config: &AuthConfig) -> Result<AuthenticatedUser, AuthError> {
    let api_key = match extract_api_key(req) {
        Some(key) => key,
        None => extract_bearer_token(req)?.ok_or(AuthError::MissingToken)?,
    };

    let key_info = ApiKeyService::new(&config.api_keys).validate_api_key(&api_key)?;
    Ok(AuthenticatedUser {
        user_id: key_info.name.clone(),
        permissions: key_info.permissions.clone(),
    })
}

fn extract_api_key(req: &Request) -> Option<String> {
    req.headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_bearer_token(req: &Request) -> Result<Option<String>, AuthError> {
    let Some(value) = req.headers().get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| AuthError::MalformedHeader)?;
    value
        .strip_prefix(BEARER_PREFIX)
        .map(|token| Some(token.trim().to_string()))
        .ok_or(AuthError::MalformedHeader)
}

pub fn parse_permission(permission_str: &str) -> Option<Permission> {
    match permission_str {
        "Submit" => Some(Permission::Submit),
        "Admin" => Some(Permission::Admin),
        _ => None,
    }
}
