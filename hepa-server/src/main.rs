//! HepaScan服务器主程序

use anyhow::Context;
use clap::Parser;
use hepa_core::HepaConfig;
use hepa_imaging::{SegmentationModel, TfServingModel};
use hepa_web::{AppState, WebServer};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// HepaScan服务器命令行参数
#[derive(Parser, Debug)]
#[command(name = "hepa-server")]
#[command(about = "HepaScan 肝脏肿瘤筛查 Web 服务")]
struct Args {
    /// 配置文件路径 (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 监听地址，覆盖配置文件
    #[arg(long)]
    host: Option<String>,

    /// 服务器端口，覆盖配置文件
    #[arg(short, long)]
    port: Option<u16>,

    /// 日志级别，覆盖配置文件
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = HepaConfig::load(args.config.as_deref()).context("加载配置失败")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    // 初始化日志，RUST_LOG 优先
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("启动HepaScan服务器...");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("无效的监听地址")?;

    info!("HepaScan服务器配置:");
    info!("  监听地址: {}", addr);
    info!("  上传目录: {}", config.storage.uploads_dir.display());
    info!("  产物目录: {}", config.storage.static_dir.display());
    info!("  分割模型: {} @ {}", config.model.name, config.model.endpoint);

    let model = TfServingModel::new(&config.model)?;
    if let Err(e) = model.probe().await {
        warn!("分割模型暂不可用，分析请求将失败直到模型上线: {}", e);
    }

    let state = AppState::new(config, Arc::new(model))?;
    let server = WebServer::new(addr, state);

    if let Err(e) = server.run().await {
        error!("服务器启动失败: {}", e);
        return Err(e.into());
    }

    Ok(())
}
