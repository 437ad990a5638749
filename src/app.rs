use std::sync::Arc;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::{net::TcpListener, sync::broadcast};
use tracing::{info, warn};

use vidqueue_api::{auth::AuthConfig, create_app, routes::AppState};
use vidqueue_core::config::AppConfig;
use vidqueue_dispatcher::{DispatchCore, DispatcherActor, DispatcherSettings};
use vidqueue_worker::{generate_worker_id, CommandRenderExecutor, DispatcherClient, WorkerRuntime};

/// 应用运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// 分发器与HTTP服务
    Server,
    /// 拉取式渲染Worker
    Worker,
}

/// 主应用程序
pub struct Application {
    config: AppConfig,
    mode: AppMode,
}

impl Application {
    pub fn new(config: AppConfig, mode: AppMode) -> Result<Self> {
        info!("初始化应用程序，模式: {:?}", mode);
        config.validate().context("配置验证失败")?;

        match mode {
            AppMode::Server => {
                config.api.auth.ensure_usable()?;
                if !config.api.auth.enabled {
                    warn!("API认证已关闭，create-video 与 admin/stats 对所有人开放");
                }
            }
            AppMode::Worker => {
                if config.worker.render_command.is_empty() {
                    return Err(anyhow::anyhow!("Worker模式需要配置 worker.render_command"));
                }
            }
        }

        Ok(Self { config, mode })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn run(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!("启动应用程序，模式: {:?}", self.mode);

        match self.mode {
            AppMode::Server => self.run_server(shutdown_rx).await,
            AppMode::Worker => self.run_worker(shutdown_rx).await,
        }
    }

    async fn run_server(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let metrics = self.install_metrics()?;

        let settings = DispatcherSettings::from(&self.config.dispatcher);
        let core = DispatchCore::new(settings, self.config.music.clone());
        let (actor, dispatcher) = DispatcherActor::new(core, shutdown_rx.resubscribe());
        let actor_handle = actor.spawn();

        let state = AppState {
            dispatcher,
            auth_config: Arc::new(AuthConfig::from(&self.config.api.auth)),
            music: Arc::new(self.config.music.clone()),
            caller_timeout: self.config.dispatcher.caller_timeout(),
            metrics,
        };
        let app = create_app(
            state,
            &self.config.api,
            &self.config.observability.metrics_endpoint,
        );

        let listener = TcpListener::bind(&self.config.api.bind_address)
            .await
            .with_context(|| format!("绑定地址失败: {}", self.config.api.bind_address))?;
        info!("API服务器监听地址: {}", self.config.api.bind_address);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("API服务器收到关闭信号");
            })
            .await
            .context("API服务器运行失败")?;

        let core = actor_handle.await.context("分发器任务异常退出")?;
        let stats = core.stats();
        info!(
            total_jobs = stats.total_jobs,
            failed = stats.failed,
            abandoned = stats.abandoned,
            "分发器已停止"
        );
        Ok(())
    }

    async fn run_worker(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let worker_config = &self.config.worker;
        let worker_id = worker_config
            .worker_id
            .clone()
            .unwrap_or_else(generate_worker_id);

        let executor = CommandRenderExecutor::from_command(&worker_config.render_command)
            .context("未配置渲染命令")?;
        let client = DispatcherClient::new(
            &worker_config.server_url,
            worker_id,
            worker_config.request_timeout(),
        )
        .context("创建HTTP客户端失败")?;

        WorkerRuntime::new(client, Arc::new(executor), worker_config.poll_interval())
            .run(shutdown_rx)
            .await;
        Ok(())
    }

    fn install_metrics(&self) -> Result<Option<PrometheusHandle>> {
        if !self.config.observability.metrics_enabled {
            warn!("指标导出已禁用");
            return Ok(None);
        }

        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("安装Prometheus指标导出器失败")?;
        Ok(Some(handle))
    }
}
