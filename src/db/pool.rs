use crate::config::DatabaseConfig;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;
use std::time::Duration;

/// 解析连接串, 设置慢查询日志阈值为 5秒
pub fn connect_options(database_url: &str) -> Result<PgConnectOptions, sqlx::Error> {
    let connect_options = PgConnectOptions::from_str(database_url)?;
    Ok(connect_options.log_slow_statements(tracing::log::LevelFilter::Warn, Duration::from_secs(5)))
}

/// 用已构建的连接参数创建连接池
pub async fn create_pool_with(
    connect_options: PgConnectOptions,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(connect_options)
        .await
}

/// 创建数据库连接池
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    create_pool_with(connect_options(&config.url)?, config.max_connections).await
}
