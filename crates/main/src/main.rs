//! 主应用程序入口
//!
//! 加载配置、连接数据库并启动 Axum Web API 服务。

use std::sync::Arc;

use application::SystemClock;
use config::AppConfig;
use infrastructure::Infrastructure;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, StateDependencies};

const DEFAULT_LOG_FILTER: &str = "suchat=info,web_api=info,application=info,infrastructure=info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = AppConfig::load()?;
    tracing::info!(config = %config.sanitized(), "配置加载完成");

    let infrastructure = Infrastructure::connect(&config).await?;

    let state = AppState::assemble(
        StateDependencies {
            user_repository: infrastructure.user_repository.clone(),
            message_repository: infrastructure.message_repository.clone(),
            file_store: infrastructure.file_store.clone(),
            password_hasher: infrastructure.password_hasher.clone(),
            clock: Arc::new(SystemClock),
        },
        &config,
    );

    let app = router(state);
    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!("聊天服务启动在 http://{address}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    infrastructure.pool.close().await;
    tracing::info!("聊天服务已停止");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::warn!(error = %err, "无法监听 Ctrl+C 信号");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig_term) => {
                sig_term.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "无法监听终止信号");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("接收到 Ctrl+C 信号，开始优雅停机..."),
        _ = terminate => tracing::info!("接收到终止信号，开始优雅停机..."),
    }
}
