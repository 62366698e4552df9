//! Configuration module for the ID card backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret gating the admin routes (required in production)
    pub admin_password: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Prefix of allocated employee identifiers (`AT` in `AT-001`)
    pub id_prefix: String,
    /// Title printed in the card header band
    pub card_title: String,
    /// Company logo used when an employee has no uploaded logo
    pub logo_path: Option<PathBuf>,
    /// Outline font for card text; the built-in bitmap font is used otherwise
    pub font_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let admin_password = env::var("IDCARD_ADMIN_PASSWORD").ok();

        let db_path = env::var("IDCARD_DB_PATH")
            .unwrap_or_else(|_| "./data/idcard.sqlite".to_string())
            .into();

        let bind_addr = env::var("IDCARD_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid IDCARD_BIND_ADDR format");

        let log_level = env::var("IDCARD_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let id_prefix = env::var("IDCARD_ID_PREFIX").unwrap_or_else(|_| "AT".to_string());

        let card_title =
            env::var("IDCARD_CARD_TITLE").unwrap_or_else(|_| "ALPHA TECH EMPLOYEE CARD".to_string());

        let logo_path = env::var("IDCARD_LOGO_PATH").ok().map(PathBuf::from);
        let font_path = env::var("IDCARD_FONT_PATH").ok().map(PathBuf::from);

        Self {
            admin_password,
            db_path,
            bind_addr,
            log_level,
            id_prefix,
            card_title,
            logo_path,
            font_path,
        }
    }
}
