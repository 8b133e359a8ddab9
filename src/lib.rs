#[macro_use]
extern crate rocket;

pub mod api;
pub mod assets;
pub mod auth;
pub mod bootstrap;
pub mod cards;
pub mod config;
pub mod db;
pub mod env;
pub mod error;
pub mod models;
pub mod routes;
pub mod telemetry;
pub mod uploads;
pub mod validation;
#[cfg(test)]
mod test;

use std::time::Duration;

use chrono::Local;
use rocket::data::{Limits, ToByteUnit};
use rocket::figment::Figment;
use rocket::fs::FileServer;
use rocket::{Build, Rocket};
use rocket_dyn_templates::Template;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{error, info};

use crate::config::{AppContext, SiteConfig};
use crate::error::AppError;
use crate::telemetry::TelemetryFairing;

const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Anyhow(anyhow::Error),
    #[error("{0}")]
    Figment(rocket::figment::Error),
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Application error: {0}")]
    App(#[from] AppError),
    #[error("Server error: {0}")]
    Rocket(Box<rocket::Error>),
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Error::Anyhow(value)
    }
}

impl From<rocket::figment::Error> for Error {
    fn from(value: rocket::figment::Error) -> Self {
        Error::Figment(value)
    }
}

impl From<rocket::Error> for Error {
    fn from(value: rocket::Error) -> Self {
        Error::Rocket(Box::new(value))
    }
}

/// Assembles the server around an already bootstrapped context. `figment`
/// is usually `rocket::Config::figment()`; upload limits are layered on top
/// from the site config.
pub fn build_rocket(ctx: AppContext, figment: Figment) -> Result<Rocket<Build>, Error> {
    let max_upload = ctx.config.max_upload_bytes;
    let limits = Limits::default()
        .limit("file", max_upload.bytes())
        .limit("data-form", max_upload.bytes());
    let figment = figment.merge(("limits", limits));

    std::fs::create_dir_all(&ctx.config.upload_dir).map_err(AppError::from)?;
    let static_dir = ctx.config.static_dir.clone();
    let upload_dir = ctx.config.upload_dir.clone();

    info!(site = %ctx.config.site_title, "Starting tournament site");

    Ok(rocket::custom(figment)
        .manage(ctx)
        .mount(
            "/",
            routes![
                routes::index,
                routes::admin_panel,
                auth::login_page,
                auth::login,
                auth::logout,
            ],
        )
        .mount(
            "/api",
            routes![
                api::api_get_tournaments,
                api::api_filter_tournaments,
                api::api_filter_fragment,
                api::api_create_tournament,
                api::api_update_tournament,
                api::api_delete_tournament,
                api::api_init_dummy,
                api::health,
            ],
        )
        .mount(
            "/admin",
            routes![
                assets::get_logo_info,
                assets::upload_logo,
                assets::remove_logo,
                assets::get_popup_info,
                assets::upload_popup,
                assets::toggle_popup,
                assets::reset_popup,
            ],
        )
        .mount("/static", FileServer::from(static_dir))
        .mount("/uploads", FileServer::from(upload_dir))
        .register("/", catchers![auth::unauthorized])
        .register("/api", catchers![auth::unauthorized_api, auth::api_error])
        .register("/admin/logo", catchers![auth::unauthorized_api, auth::api_error])
        .register("/admin/popup", catchers![auth::unauthorized_api, auth::api_error])
        .attach(Template::fairing())
        .attach(TelemetryFairing))
}

fn spawn_session_cleanup(pool: SqlitePool) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);

        loop {
            interval.tick().await;

            match db::clean_expired_sessions(&pool).await {
                Ok(count) if count > 0 => info!("Cleaned up {} expired sessions", count),
                Ok(_) => {}
                Err(e) => error!("Failed to clean expired sessions: {}", e),
            }
        }
    });
}

pub async fn run() -> Result<(), Error> {
    env::load_environment()?;
    let _otel_guard = telemetry::init_tracing();

    let figment = rocket::Config::figment();
    let site: SiteConfig = figment.extract()?;
    let profile = figment.profile().clone();

    let pool = db::connect(&config::database_url()).await?;
    bootstrap::bootstrap(&pool, &site, &profile, Local::now().date_naive()).await?;

    spawn_session_cleanup(pool.clone());

    build_rocket(AppContext::new(pool, site), figment)?
        .launch()
        .await?;

    Ok(())
}
