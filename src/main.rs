use poster_backend::config::LoggingConfig;
use poster_backend::features::poster::PosterService;
use poster_backend::shutdown::{shutdown_signal, spawn_deadline_guard};
use poster_backend::{AppConfig, AppState, ShutdownManager, build_router};

fn env_filter(logging: &LoggingConfig) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.default_directive().into())
}

fn init_tracing(logging: &LoggingConfig) {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(logging));
    if logging.format.eq_ignore_ascii_case("compact") {
        builder.compact().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() {
    // 日志格式来自配置本身；加载配置期间先挂一个默认级别的临时订阅者（RUST_LOG 可覆盖）
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(env_filter(&LoggingConfig::default()))
        .finish();
    let config = match tracing::subscriber::with_default(bootstrap, AppConfig::load) {
        Ok(cfg) => cfg,
        Err(e) => {
            init_tracing(&LoggingConfig::default());
            tracing::error!("配置加载失败: {}", e);
            std::process::exit(1);
        }
    };
    init_tracing(&config.logging);
    if let Err(e) = AppConfig::init_global_with(config) {
        tracing::error!("配置初始化失败: {}", e);
        std::process::exit(1);
    }
    let config = AppConfig::global();

    let shutdown_manager = ShutdownManager::new();
    if let Err(e) = shutdown_manager.start_signal_handler() {
        tracing::error!("信号处理器启动失败: {}", e);
        std::process::exit(1);
    }

    // 加载字体库涉及大量文件 IO，放到阻塞线程
    let service = match tokio::task::spawn_blocking(|| PosterService::from_config(AppConfig::global()))
        .await
    {
        Ok(service) => service,
        Err(e) => {
            tracing::error!("初始化海报服务失败: {}", e);
            std::process::exit(1);
        }
    };
    let state = AppState::new(service);
    let app = build_router(state.clone(), config);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("监听地址绑定失败 {}: {}", addr, e);
            std::process::exit(1);
        });

    tracing::info!("Server: http://{}", addr);
    tracing::info!("Generate: POST http://{}/ (或 /api/generate)", addr);
    tracing::info!("OpenAPI: http://{}{}", addr, poster_backend::openapi::OPENAPI_JSON_PATH);
    tracing::info!("Health: http://{}/health", addr);

    let drain_state = state.clone();
    spawn_deadline_guard(
        shutdown_manager.clone(),
        config.shutdown.clone(),
        async move { drain_state.service.wait_idle().await },
    );

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_manager))
        .await
    {
        tracing::error!("服务器运行错误: {}", e);
        std::process::exit(1);
    }

    tracing::info!("服务器已优雅关闭");
}
