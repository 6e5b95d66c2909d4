// src/main.rs

use axum::serve;
use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::runtime::Handle;
use tokio::signal;
use tracing::{error, info};

use inapp_bidcache::api::{self, AppState};
use inapp_bidcache::bidding::cdb_client::{HttpBidRequestSender, SenderSettings};
use inapp_bidcache::bidding::clock::SystemClock;
use inapp_bidcache::bidding::engine::BidManager;
use inapp_bidcache::bidding::in_house::InHouse;
use inapp_bidcache::bidding::listener::LoggingLifecycleListener;
use inapp_bidcache::bidding::token_cache::{TokenCache, TokenRetention};
use inapp_bidcache::config::ConfigManager;
use inapp_bidcache::logging::init_tracing;
use inapp_bidcache::logging::runtime_logger::RuntimeLogger;
use inapp_bidcache::mock_cdb::{self, MockCdbOptions};
use inapp_bidcache::model::adapters::{ConfigAdapter, FileConfigAdapter};
use inapp_bidcache::model::mapper::{AdUnitMapper, DeviceInfo};

#[derive(Parser, Debug)]
#[command(author = "whiteCcinn", version = "1.0", about = "In-app bid cache with asynchronous refill")]
struct CliArgs {
    #[arg(short, long, default_value_t = 8080)]
    port: u16,
    #[arg(long, default_value = "logs")]
    log_dir: String,
    /// CDB 竞价地址，默认指向本地 Mock CDB
    #[arg(long, default_value = "http://localhost:9001/inapp/v2")]
    cdb_url: String,
    #[arg(long, default_value = "http://localhost:9001/v1.0/api/config")]
    config_url: String,
    #[arg(long, default_value = "B-000000")]
    cp_id: String,
    #[arg(long, default_value = "com.example.app")]
    bundle_id: String,
    /// CDB 请求超时（秒）
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,
    #[arg(long, default_value = "static/ad_units.json")]
    ad_units_file: String,
    #[arg(long, default_value = "static/remote_config.json")]
    remote_config_file: String,
    /// Mock CDB 端口，0 表示不启动
    #[arg(long, default_value_t = 9001)]
    mock_cdb_port: u16,
    /// 屏幕尺寸（竖屏宽x高），用于插屏广告位
    #[arg(long, default_value_t = 360)]
    screen_width: i32,
    #[arg(long, default_value_t = 640)]
    screen_height: i32,
    /// 令牌解析后保留到过期，而不是只能使用一次
    #[arg(long)]
    reusable_tokens: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let args = CliArgs::parse();

    // 初始化全局 tracing 日志
    let _guard = init_tracing(&args.log_dir)?;
    info!("bid cache server starting on port {}", args.port);

    // 初始化运行日志记录器
    let runtime_logger = RuntimeLogger::new(&args.log_dir, "runtime", 1000, 100, 1000);
    runtime_logger.log("INFO", "bid cache server is starting...").await;

    // 启动 Mock CDB 服务器
    let mock_cdb_server = (args.mock_cdb_port != 0).then(|| {
        let port = args.mock_cdb_port;
        tokio::spawn(async move {
            if let Err(e) = mock_cdb::start_mock_cdb_server(port, MockCdbOptions::default()).await {
                error!("mock CDB stopped: {}", e);
            }
        })
    });

    // 广告位列表与上次的远程配置从文件读取
    let adapter = FileConfigAdapter::new(&args.remote_config_file, &args.ad_units_file);
    let ad_units = adapter.get_ad_units();
    let config = Arc::new(ConfigManager::with_adapter(Box::new(adapter)));

    let settings = SenderSettings {
        cdb_url: args.cdb_url.clone(),
        config_url: args.config_url.clone(),
        cp_id: args.cp_id.clone(),
        bundle_id: args.bundle_id.clone(),
        timeout: Duration::from_secs(args.timeout_secs),
        ..SenderSettings::default()
    };
    let clock = Arc::new(SystemClock);
    let bid_manager = Arc::new(BidManager::new(
        config,
        clock.clone(),
        AdUnitMapper::new(DeviceInfo::portrait(args.screen_width, args.screen_height)),
        Arc::new(HttpBidRequestSender::new(settings, Handle::current())),
        Arc::new(LoggingLifecycleListener::new(Some(runtime_logger.clone()))),
    ));
    let retention = if args.reusable_tokens {
        TokenRetention::UntilExpiry
    } else {
        TokenRetention::SingleUse
    };
    let token_cache = Arc::new(TokenCache::new(clock, retention));

    // 预取所有配置的广告位
    info!(ad_unit_count = ad_units.len(), "prefetching ad units");
    bid_manager.prefetch(&ad_units);

    let state = Arc::new(AppState {
        in_house: Arc::new(InHouse::new(bid_manager.clone(), token_cache)),
        runtime_logger: Some(runtime_logger.clone()),
    });

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = TcpListener::bind(&addr).await?;
    runtime_logger.log("INFO", &format!("bid cache server running at http://{}", addr)).await;

    let server = tokio::spawn(async move {
        if let Err(e) = serve(listener, api::router(state)).await {
            error!("server stopped: {}", e);
        }
    });

    signal::ctrl_c().await?;
    runtime_logger.log("INFO", "Shutting down gracefully...").await;

    bid_manager.on_application_stopped();
    server.abort();
    if let Some(mock_cdb_server) = mock_cdb_server {
        mock_cdb_server.abort();
    }
    runtime_logger.shutdown().await;
    info!("bid cache server shut down");
    Ok(())
}
