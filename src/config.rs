use crate::decoder::DecodePolicy;
use crate::error::ConfigError;
use config::{Config, Environment, Map};
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "NFE";
const DATABASE_URL_VAR: &str = "DATABASE_URL";

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(skip_serializing)]
    pub url: String,
    pub max_connections: u32,
}

/// 导入参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// 上传包大小上限 (MB)
    pub max_upload_mb: usize,
    /// 单个成员解压后大小上限 (MB)
    pub max_member_mb: u64,
    #[serde(default)]
    pub policy: DecodePolicy,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_upload_mb: 200,
            max_member_mb: 100,
            policy: DecodePolicy::default(),
        }
    }
}

impl IngestConfig {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }

    pub fn max_member_bytes(&self) -> u64 {
        self.max_member_mb.saturating_mul(1024 * 1024)
    }
}

impl AppConfig {
    /// 从环境变量加载配置 (先读取 .env)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_map(std::env::vars().collect())
    }

    /// 从给定变量表加载: 默认值 -> NFE_ 前缀变量 -> DATABASE_URL
    ///
    /// 例: `NFE_SERVER__PORT=9000`, `NFE_INGEST__MAX_UPLOAD_MB=50`
    pub fn from_map(vars: Map<String, String>) -> Result<Self, ConfigError> {
        let database_url = vars
            .get(DATABASE_URL_VAR)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingDatabaseUrl)?
            .to_string();

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080_i64)?
            .set_default("database.max_connections", 10_i64)?
            .set_default("ingest.max_upload_mb", 200_i64)?
            .set_default("ingest.max_member_mb", 100_i64)?
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(vars)),
            )
            .set_override("database.url", database_url)?
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_map(vars(&[("DATABASE_URL", "postgres://localhost/nfe")])).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.url, "postgres://localhost/nfe");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.ingest.max_upload_mb, 200);
        assert_eq!(config.ingest.max_upload_bytes(), 200 * 1024 * 1024);
        assert_eq!(config.ingest.max_member_bytes(), 100 * 1024 * 1024);
        assert_eq!(config.ingest.policy, DecodePolicy::default());
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::from_map(vars(&[
            ("DATABASE_URL", "postgres://db/nfe"),
            ("NFE_SERVER__HOST", "0.0.0.0"),
            ("NFE_SERVER__PORT", "9000"),
            ("NFE_DATABASE__MAX_CONNECTIONS", "3"),
            ("NFE_INGEST__MAX_UPLOAD_MB", "5"),
            ("NFE_INGEST__MAX_MEMBER_MB", "2"),
        ]))
        .unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.max_connections, 3);
        assert_eq!(config.ingest.max_upload_mb, 5);
        assert_eq!(config.ingest.max_member_mb, 2);
    }

    #[test]
    fn test_missing_database_url() {
        let err = AppConfig::from_map(vars(&[("NFE_SERVER__PORT", "9000")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingDatabaseUrl));

        let err = AppConfig::from_map(vars(&[("DATABASE_URL", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingDatabaseUrl));
    }

    #[test]
    fn test_url_not_serialized() {
        let config = AppConfig::from_map(vars(&[("DATABASE_URL", "postgres://user:secret@db/nfe")])).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
