use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub pix: PixConfig,
    #[serde(default)]
    pub kitchen: KitchenConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64, // seconds
}

/// PIX 网关回调校验
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PixConfig {
    #[serde(default)]
    pub webhook_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KitchenConfig {
    /// 厨房事件广播缓冲区大小，慢消费者超出后丢弃旧事件
    pub channel_capacity: usize,
}

impl Default for KitchenConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

fn get_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse::<T>().ok())
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let mut config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => Self::from_toml_str(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // 数据库 URL 在无配置文件时必须提供
                let database_url = get_env("DATABASE_URL")
                    .ok_or("缺少 DATABASE_URL 环境变量，且未找到配置文件 config.toml")?;
                Self::with_defaults(database_url)
            }
            Err(e) => {
                return Err(format!("无法读取配置文件 {config_path}: {e}").into());
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Config =
            toml::from_str(config_str).map_err(|e| format!("解析配置文件失败: {e}"))?;
        Ok(config)
    }

    fn with_defaults(database_url: String) -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: 10,
            },
            jwt: JwtConfig {
                secret: "change-me-in-production".to_string(),
                access_token_expires_in: 7200,
            },
            pix: PixConfig::default(),
            kitchen: KitchenConfig::default(),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = get_env("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(p) = get_env_parse("SERVER_PORT") {
            self.server.port = p;
        }
        if let Some(v) = get_env("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(mc) = get_env_parse("DB_MAX_CONNECTIONS") {
            self.database.max_connections = mc;
        }
        if let Some(v) = get_env("JWT_SECRET") {
            self.jwt.secret = v;
        }
        if let Some(n) = get_env_parse("JWT_ACCESS_EXPIRES_IN") {
            self.jwt.access_token_expires_in = n;
        }
        if let Some(v) = get_env("PIX_WEBHOOK_SECRET") {
            self.pix.webhook_secret = v;
        }
        if let Some(n) = get_env_parse("KITCHEN_CHANNEL_CAPACITY") {
            self.kitchen.channel_capacity = n;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = Config::from_toml_str(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [database]
            url = "postgres://localhost/comanda"
            max_connections = 5

            [jwt]
            secret = "s3cret"
            access_token_expires_in = 3600

            [pix]
            webhook_secret = "pix-secret"

            [kitchen]
            channel_capacity = 64
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.jwt.access_token_expires_in, 3600);
        assert_eq!(config.pix.webhook_secret, "pix-secret");
        assert_eq!(config.kitchen.channel_capacity, 64);
    }

    #[test]
    fn test_optional_sections_default() {
        let config = Config::from_toml_str(
            r#"
            [server]
            host = "0.0.0.0"
            port = 8080

            [database]
            url = "postgres://localhost/comanda"
            max_connections = 10

            [jwt]
            secret = "s3cret"
            access_token_expires_in = 7200
            "#,
        )
        .unwrap();

        assert!(config.pix.webhook_secret.is_empty());
        assert_eq!(config.kitchen.channel_capacity, 256);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(Config::from_toml_str("[server]\nport = \"not a number\"").is_err());
    }

    #[test]
    fn test_defaults_without_file() {
        let config = Config::with_defaults("postgres://db".to_string());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.url, "postgres://db");
    }
}
