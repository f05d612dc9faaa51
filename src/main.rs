use actix_web::{App, HttpServer, middleware::Logger, web};
use anyhow::Context;
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use dspice_client::{
    AppContext,
    config::Config,
    middlewares::{SessionGuard, create_cors},
    storage::LocalStore,
    swagger::swagger_config,
    tasks,
    utils::AnchoredClock,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().context("Failed to load configuration")?;

    // 打开本地存储（会话 + 缓存）
    let store = LocalStore::open(&config.storage.path)
        .await
        .with_context(|| format!("Failed to open local store {}", config.storage.path))?;

    // 倒计时使用单调时钟推进，不受系统时间调整影响
    let clock = Arc::new(AnchoredClock::from_system());
    let ctx = AppContext::build(&config, store, clock).context("Failed to build services")?;

    if ctx.session.is_authenticated().await {
        ctx.app_state.init().await;
    }

    tasks::spawn_all(
        ctx.session.clone(),
        ctx.rental_service.clone(),
        ctx.app_state.clone(),
    );

    log::info!(
        "Starting HTTP server at {}:{} (remote API {})",
        config.server.host,
        config.server.port,
        config.api.base_url
    );

    HttpServer::new(move || {
        let ctx = ctx.clone();
        App::new()
            .wrap(SessionGuard::new(ctx.session.clone()))
            .wrap(create_cors())
            .wrap(Logger::default())
            .configure(swagger_config)
            .configure(move |cfg: &mut web::ServiceConfig| ctx.configure(cfg))
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await?;

    Ok(())
}
