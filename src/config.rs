use std::path::PathBuf;

use serde::Deserialize;
use sqlx::SqlitePool;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://torneos.db";

/// Site settings, extracted from Rocket's figment (`Rocket.toml` or
/// `ROCKET_*` variables) alongside Rocket's own configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub site_title: String,
    pub static_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub default_popup: String,
    pub max_upload_bytes: u64,
    pub admin_username: String,
    pub admin_password: Option<String>,
    pub seed_sample_data: bool,
    pub session_hours: i64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_title: "InterCards TCG Hub".to_string(),
            static_dir: PathBuf::from("static"),
            upload_dir: PathBuf::from("static/uploads"),
            default_popup: "popup_dummy.svg".to_string(),
            max_upload_bytes: 5 * 1024 * 1024,
            admin_username: "admin".to_string(),
            admin_password: None,
            seed_sample_data: true,
            session_hours: 8,
        }
    }
}

impl SiteConfig {
    /// Public URL under which stored uploads are served.
    pub fn upload_url(&self, filename: &str) -> String {
        format!("/uploads/{}", filename)
    }
}

pub fn database_url() -> String {
    dotenvy::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Everything a handler needs, built once at startup and managed by Rocket.
pub struct AppContext {
    pub db: SqlitePool,
    pub config: SiteConfig,
}

impl AppContext {
    pub fn new(db: SqlitePool, config: SiteConfig) -> Self {
        Self { db, config }
    }
}
