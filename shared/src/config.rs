use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub line: LineConfig,
    pub web: WebConfig,
    pub admin: AdminConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self> {
        let database = DatabaseConfig {
            host: env::var("DATABASE_HOST").context("DATABASE_HOST is not set")?,
            port: env::var("DATABASE_PORT")
                .context("DATABASE_PORT is not set")?
                .parse()
                .context("DATABASE_PORT must be a port number")?,
            username: env::var("DATABASE_USERNAME").context("DATABASE_USERNAME is not set")?,
            password: env::var("DATABASE_PASSWORD").context("DATABASE_PASSWORD is not set")?,
            database: env::var("DATABASE_NAME").context("DATABASE_NAME is not set")?,
        };
        let redis = RedisConfig {
            host: env::var("REDIS_HOST").context("REDIS_HOST is not set")?,
            port: env::var("REDIS_PORT")
                .context("REDIS_PORT is not set")?
                .parse()
                .context("REDIS_PORT must be a port number")?,
        };
        let auth = AuthConfig {
            ttl: env::var("AUTH_TOKEN_TTL")
                .unwrap_or_else(|_| "86400".into())
                .parse()
                .context("AUTH_TOKEN_TTL must be seconds")?,
        };
        // LINE の資格情報は未設定でも起動できるようにする
        // （トークンが空のときは push をスキップする）
        let line = LineConfig {
            channel_access_token: env::var("LINE_CHANNEL_ACCESS_TOKEN").unwrap_or_default(),
            client_id: env::var("LINE_CLIENT_ID").unwrap_or_default(),
        };
        let web = WebConfig {
            base_url: env::var("APP_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".into()),
        };
        let admin = AdminConfig {
            user_ids: parse_admin_user_ids(&env::var("ADMIN_USER_IDS").unwrap_or_default()),
        };
        Ok(Self {
            database,
            redis,
            auth,
            line,
            web,
            admin,
        })
    }
}

// ADMIN_USER_IDS="line:Uaaaa, line:Ubbbb" のようにカンマ・空白・改行区切りで設定する
fn parse_admin_user_ids(raw: &str) -> Vec<String> {
    raw.split([',', ' ', '\n', '\t'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub ttl: u64,
}

#[derive(Debug, Clone)]
pub struct LineConfig {
    pub channel_access_token: String,
    pub client_id: String,
}

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub user_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_user_ids_accept_comma_and_whitespace_separators() {
        let ids = parse_admin_user_ids("line:Uaaa, line:Ubbb\nline:Uccc");
        assert_eq!(ids, vec!["line:Uaaa", "line:Ubbb", "line:Uccc"]);
    }

    #[test]
    fn admin_user_ids_empty_when_unset() {
        assert!(parse_admin_user_ids("").is_empty());
    }
}
