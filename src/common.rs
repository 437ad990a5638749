use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::{signal, sync::broadcast};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vidqueue_core::config::AppConfig;

use crate::app::{AppMode, Application};

/// 等待应用退出的上限
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// 命令行提供的启动参数
#[derive(Debug, Clone, Default)]
pub struct StartupConfig {
    /// 未指定时按默认路径查找，找不到则使用内置默认值
    pub config_path: Option<String>,
    pub log_level: String,
    pub log_format: String,
    pub worker_id: Option<String>,
    pub server_url: Option<String>,
}

/// 初始化日志系统
pub fn init_logging(log_level: &str, log_format: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("初始化JSON日志格式失败")?;
        }
        "pretty" => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("初始化Pretty日志格式失败")?;
        }
        _ => {
            return Err(anyhow::anyhow!("不支持的日志格式: {log_format}"));
        }
    }

    Ok(())
}

/// 加载配置并应用命令行覆盖项
pub fn load_config(startup_config: &StartupConfig) -> Result<AppConfig> {
    let config_path = startup_config.config_path.as_deref();
    let mut config = AppConfig::load(config_path)
        .with_context(|| format!("加载配置文件失败: {}", config_path.unwrap_or("<默认>")))?;

    if let Some(ref worker_id) = startup_config.worker_id {
        config.worker.worker_id = Some(worker_id.clone());
    }
    if let Some(ref server_url) = startup_config.server_url {
        config.worker.server_url = server_url.clone();
    }

    Ok(config)
}

/// 启动应用并阻塞到收到关闭信号或应用自行退出
pub async fn start_application(startup_config: StartupConfig, app_mode: AppMode) -> Result<()> {
    info!("启动 vidqueue，模式: {:?}", app_mode);
    if let Some(ref path) = startup_config.config_path {
        info!("配置文件: {}", path);
    }

    let config = load_config(&startup_config)?;
    let app = Application::new(config, app_mode)?;
    run_until(app, wait_for_shutdown_signal()).await
}

/// 运行应用直到 `shutdown_signal` 完成，应用自身的错误原样返回
pub async fn run_until<F>(app: Application, shutdown_signal: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let mut app_handle = tokio::spawn(async move { app.run(shutdown_rx).await });

    tokio::select! {
        joined = &mut app_handle => {
            let result = joined.context("应用任务异常退出")?;
            if let Err(ref e) = result {
                error!("应用运行失败: {e:#}");
            }
            return result;
        }
        _ = shutdown_signal => {
            info!("收到关闭信号，开始优雅关闭...");
        }
    }

    let _ = shutdown_tx.send(());
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, app_handle).await {
        Ok(joined) => {
            joined.context("应用任务异常退出")?.context("应用关闭时发生错误")?;
            info!("应用已优雅关闭");
            Ok(())
        }
        Err(_) => {
            warn!("应用关闭超时，强制退出");
            Err(anyhow::anyhow!("应用未能在 {:?} 内关闭", SHUTDOWN_TIMEOUT))
        }
    }
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("安装Ctrl+C信号处理器失败: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("安装SIGTERM信号处理器失败: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("收到Ctrl+C信号");
        },
        _ = terminate => {
            info!("收到SIGTERM信号");
        },
    }
}

/// 解析应用运行模式
pub fn parse_app_mode(mode_str: &str) -> Result<AppMode> {
    match mode_str {
        "server" => Ok(AppMode::Server),
        "worker" => Ok(AppMode::Worker),
        _ => Err(anyhow::anyhow!("不支持的运行模式: {mode_str}")),
    }
}
