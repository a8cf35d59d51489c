mod common;
mod memory_log;
mod model;

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, middleware, routing::get};
use clap::Parser;
use tower_http::trace::TraceLayer;

use memory_log::{
    CaptureState, EventLogStore, MEMORY_LOG_BASE_PATH, NonceStore, ProcessMemorySource,
    capture_middleware, create_memory_log_router,
};
use model::config::Config;

/// 请求内存日志服务
#[derive(Parser, Debug)]
#[command(name = "debug-memory", version, about)]
struct Args {
    /// 配置文件路径
    #[arg(short, long, default_value_t = Config::default_config_path().to_string())]
    config: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = Config::load(&args.config).unwrap_or_else(|e| {
        tracing::error!("加载配置失败: {:#}", e);
        std::process::exit(1);
    });

    let admin_api_key = match config.admin_api_key.clone() {
        Some(key) if !key.trim().is_empty() => key,
        _ => {
            tracing::error!("配置文件中未设置 adminApiKey");
            std::process::exit(1);
        }
    };

    let store = EventLogStore::new(&config.log_path);
    let nonces = Arc::new(NonceStore::new(Duration::from_secs(config.nonce_ttl_secs)));
    start_nonce_cleanup_task(nonces.clone(), Duration::from_secs(5 * 60));

    let capture_state = CaptureState {
        store: store.clone(),
        source: Arc::new(ProcessMemorySource::new()),
        scope: config.capture_scope,
        admin_api_key: admin_api_key.clone(),
        admin_user: config.admin_user.clone(),
        memory_limit: config.memory_limit.clone(),
        active_plugins: Arc::new(config.active_plugins.clone()),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest(
            MEMORY_LOG_BASE_PATH,
            create_memory_log_router(admin_api_key, MEMORY_LOG_BASE_PATH, store, nonces),
        )
        .layer(middleware::from_fn_with_state(
            capture_state,
            capture_middleware,
        ))
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("启动服务: http://{}", addr);
    tracing::info!("内存日志文件: {}", config.log_path.display());
    tracing::info!("采样范围: {:?}", config.capture_scope);
    tracing::info!("管理页面: http://{}{}", addr, MEMORY_LOG_BASE_PATH);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("绑定地址失败 {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("服务异常退出: {}", e);
    }
}

/// 定期清理过期的防伪 token
fn start_nonce_cleanup_task(nonces: Arc<NonceStore>, interval: Duration) {
    tokio::spawn(async move {
        let mut interval_timer = tokio::time::interval(interval);
        loop {
            interval_timer.tick().await;
            let cleaned = nonces.cleanup_expired();
            if cleaned > 0 {
                tracing::debug!(cleaned = cleaned, "已清理过期防伪 token");
            }
        }
    });
}
