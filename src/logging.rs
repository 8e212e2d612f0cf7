use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// 初始化日志 - 本地时间格式, RUST_LOG 控制级别 (默认 info)
pub fn init() {
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
        .with_target(true)
        .with_level(true)
        .with_env_filter(env_filter())
        .init();
}

/// 测试用: 可重复调用, 输出交给测试框架捕获
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
        .with_env_filter(env_filter())
        .with_test_writer()
        .try_init();
}
