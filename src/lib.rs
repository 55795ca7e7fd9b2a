pub mod api;
pub mod config;
pub mod core;

/// 初始化日志，`RUST_LOG` 优先
pub fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .try_init();
}
