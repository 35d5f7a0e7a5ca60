use std::sync::Arc;
use tokio::sync::Notify;

mod config;
mod handler;
mod http;
mod logger;
mod server;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = match config::Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            logger::log_error(&format!("Invalid configuration: {e}"));
            return Err(e.into());
        }
    };
    logger::init(&cfg)?;

    // Tokio runtime; worker count from config when set
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers.filter(|w| *w > 0) {
        runtime_builder.worker_threads(workers);
    }

    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let listener = match server::bind(&cfg) {
        Ok(listener) => listener,
        Err(e) => {
            logger::log_error(&format!("Server failed to start: {e}"));
            return Err(e.into());
        }
    };
    let addr = listener.local_addr()?;

    let state = Arc::new(config::AppState::new(&cfg));
    let shutdown = Arc::new(Notify::new());
    server::signal::start_signal_handler(Arc::clone(&shutdown));

    logger::log_server_start(&addr, &cfg);

    server::start_server_loop(listener, state, shutdown).await;

    logger::log_server_stopped();
    Ok(())
}
