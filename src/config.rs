// src/config.rs

use std::env;
use dotenvy::dotenv;

const MB: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    /// Public root used when building report and pagination links.
    pub wwwroot: String,
    pub listen_addr: String,
    /// Rows per page when the request does not ask for a page size.
    pub default_page_size: u32,
    /// Output ceiling for ordinary pages, in bytes.
    pub page_memory_limit: usize,
    /// Output ceiling once a download has raised the limit, in bytes.
    pub export_memory_limit: usize,
    /// Extra user fields shown next to the name (e.g. `idnumber`, `email`).
    pub show_user_identity: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let wwwroot = env::var("WWWROOT")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let listen_addr = env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let default_page_size = env::var("REPORT_PAGE_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        let page_memory_limit = env::var("PAGE_MEMORY_LIMIT_MB")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(16)
            * MB;

        let export_memory_limit = env::var("EXPORT_MEMORY_LIMIT_MB")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(256)
            * MB;

        let show_user_identity = env::var("SHOW_USER_IDENTITY")
            .map(|v| parse_identity_fields(&v))
            .unwrap_or_else(|_| vec!["idnumber".to_string()]);

        Self {
            database_url,
            jwt_secret,
            rust_log,
            wwwroot,
            listen_addr,
            default_page_size,
            page_memory_limit,
            export_memory_limit,
            show_user_identity,
        }
    }
}

/// Only `idnumber` and `email` are known identity fields; anything else is dropped.
fn parse_identity_fields(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|f| f.trim().to_lowercase())
        .filter(|f| f == "idnumber" || f == "email")
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_fields_drop_unknown_entries() {
        assert_eq!(
            parse_identity_fields(" email, phone ,IDNUMBER"),
            vec!["email".to_string(), "idnumber".to_string()]
        );
        assert!(parse_identity_fields("").is_empty());
    }
}
