//! # 服务启动与生命周期
//!
//! 网关与内嵌电影服务并行运行，直到收到 Ctrl+C 或任一服务退出

use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::app::context::AppContext;
use crate::config::AppConfig;
use crate::error::Result;
use crate::gateway::GatewayServer;
use crate::logging::{LogComponent, LogStage};
use crate::movie_service::MovieServer;
use crate::{lerror, linfo, lwarn};

type ServerTask = JoinHandle<Result<()>>;

/// 监听 Ctrl+C 信号
async fn handle_ctrl_c_signal() -> String {
    match tokio::signal::ctrl_c().await {
        Ok(()) => "Ctrl+C signal".to_string(),
        Err(e) => {
            lerror!(
                "system",
                LogStage::Shutdown,
                LogComponent::ServerSetup,
                "ctrl_c_error",
                &format!("Failed to listen for Ctrl+C: {e:?}")
            );
            "Ctrl+C handler error".to_string()
        }
    }
}

/// 处理服务器任务退出结果
fn handle_task_result(
    server_name: &str,
    result: std::result::Result<Result<()>, tokio::task::JoinError>,
) -> String {
    match result {
        Ok(Err(e)) => {
            lerror!(
                "system",
                LogStage::Shutdown,
                LogComponent::ServerSetup,
                &format!("{}_error", server_name.to_lowercase().replace(' ', "_")),
                &format!("{server_name} error: {e:?}")
            );
            format!("{server_name} error")
        }
        Err(e) => {
            lerror!(
                "system",
                LogStage::Shutdown,
                LogComponent::ServerSetup,
                "server_task_panic",
                &format!("{server_name} task failed: {e:?}")
            );
            format!("{server_name} task failed")
        }
        Ok(Ok(())) => {
            lwarn!(
                "system",
                LogStage::Shutdown,
                LogComponent::ServerSetup,
                "server_exited",
                &format!("{server_name} exited")
            );
            format!("{server_name} exited")
        }
    }
}

/// 等待任一退出条件
async fn wait_for_shutdown(gateway_task: &mut ServerTask, movie_task: Option<&mut ServerTask>) -> String {
    let movie_exit = async {
        match movie_task {
            Some(task) => handle_task_result("Movie service", task.await),
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        reason = handle_ctrl_c_signal() => reason,
        result = gateway_task => handle_task_result("Gateway server", result),
        reason = movie_exit => reason,
    }
}

/// 启动全部服务并阻塞到关闭
pub async fn run_servers(config: Arc<AppConfig>) -> Result<()> {
    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::ServerSetup,
        "start_servers",
        &format!(
            "Starting gateway ({} mode)",
            config.auth.verification_mode.as_str()
        )
    );

    let context = Arc::new(AppContext::new(Arc::clone(&config))?);

    let mut movie_task = if config.movie_service.embedded {
        let movie_server = MovieServer::new(
            config.movie_service.listener.clone(),
            Arc::clone(&context.movie_store),
            &config.cors,
        );
        Some(tokio::spawn(movie_server.serve()))
    } else {
        None
    };

    let gateway_server = GatewayServer::new(context)?;
    let mut gateway_task = tokio::spawn(gateway_server.serve());

    let reason = wait_for_shutdown(&mut gateway_task, movie_task.as_mut()).await;

    linfo!(
        "system",
        LogStage::Shutdown,
        LogComponent::ServerSetup,
        "shutdown_initiated",
        &format!("Graceful shutdown: {reason}")
    );

    gateway_task.abort();
    if let Some(task) = movie_task {
        task.abort();
    }

    Ok(())
}
