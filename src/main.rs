//! # Movie Gateway 主程序
//!
//! 认证网关：授权码登录、本地 JWT 登录、凭据验证，以及受保护的电影资源转发

use clap::Parser;
use std::path::PathBuf;

use movie_gateway::{
    Result,
    config::ConfigManager,
    lerror, linfo,
    logging::{self, LogComponent, LogStage},
    server_setup,
};

/// 命令行参数
#[derive(Debug, Parser)]
#[command(name = "movie-gateway", version, about)]
struct Args {
    /// 配置文件路径，缺省时读取 GATEWAY_CONFIG_PATH 或 config/config.{env}.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 日志级别，覆盖 RUST_LOG
    #[arg(long)]
    log_level: Option<String>,

    /// 打印日志配置说明后退出
    #[arg(long)]
    logging_help: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.logging_help {
        logging::print_logging_help();
        return Ok(());
    }

    logging::init_logging(args.log_level.as_deref());

    let manager = match ConfigManager::load(args.config.as_deref()) {
        Ok(manager) => manager,
        Err(e) => {
            lerror!(
                "system",
                LogStage::Startup,
                LogComponent::Config,
                "config_load_failed",
                &format!("配置加载失败: {e:?}")
            );
            std::process::exit(1);
        }
    };

    let config_source = manager
        .source()
        .map_or_else(|| "<defaults>".to_string(), |p| p.display().to_string());
    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Main,
        "service_starting",
        "服务启动",
        config_source = %config_source
    );

    if let Err(e) = server_setup::run_servers(manager.config()).await {
        lerror!(
            "system",
            LogStage::Startup,
            LogComponent::Main,
            "service_start_failed",
            &format!("服务启动失败: {e:?}")
        );
        std::process::exit(1);
    }

    linfo!(
        "system",
        LogStage::Shutdown,
        LogComponent::Main,
        "service_shutdown",
        "服务正常关闭"
    );
    Ok(())
}
