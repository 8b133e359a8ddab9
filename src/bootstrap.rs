use chrono::{Datelike, Days, NaiveDate, NaiveTime, Weekday};
use rocket::figment::Profile;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument, warn};

use crate::config::SiteConfig;
use crate::db::{create_user, find_user_by_username, insert_tournaments_if_empty, run_migrations};
use crate::error::AppError;
use crate::models::NewTournament;
use crate::uploads::UploadStore;

/// Only ever used under the debug profile.
pub const DEVELOPMENT_ADMIN_PASSWORD: &str = "admin123";

const STORES: [&str; 10] = [
    "Card Shop Madrid",
    "Pokemon World Barcelona",
    "Trading Zone Valencia",
    "One Piece Store Bilbao",
    "Game Master Sevilla",
    "Card Kingdom Malaga",
    "Collector Alicante",
    "Gaming Hub Zaragoza",
    "TCG Arena Madrid",
    "Dragon Shield Barcelona",
];
const TIMES: [(u32, u32); 10] = [
    (10, 0),
    (14, 0),
    (18, 0),
    (11, 0),
    (15, 0),
    (19, 0),
    (12, 0),
    (16, 0),
    (13, 0),
    (17, 0),
];
const PRIZES: [&str; 10] = [
    "$100",
    "$200",
    "$50",
    "Booster Box",
    "Cartas Promocionales",
    "$150",
    "Playmat",
    "Sleeves",
    "$75",
    "Deck Box",
];
const CATEGORIES: [&str; 3] = ["Junior", "Senior", "Master"];
const FORMATS: [&str; 4] = [
    "League Cup",
    "League Challenge",
    "Liga Casual",
    "Liga Competitiva",
];
const IMAGES: [Option<&str>; 10] = [
    Some("https://images.unsplash.com/photo-1611068813580-c0fbba03d6cd?w=400"),
    Some("https://images.unsplash.com/photo-1612404730960-5c71577fca11?w=400"),
    None,
    Some("https://images.unsplash.com/photo-1606503153255-59d8b8b82176?w=400"),
    None,
    Some("https://images.unsplash.com/photo-1566073771259-6a8506099945?w=400"),
    None,
    Some("https://images.unsplash.com/photo-1621259182978-fbf93132d53d?w=400"),
    None,
    None,
];

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Four weekend dates in the past followed by six in the future.
pub fn sample_dates(today: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(10);

    for weeks in 2..6u64 {
        let mut date = today - Days::new(weeks * 7);
        while !is_weekend(date) {
            date = date - Days::new(1);
        }
        dates.push(date);
    }

    for weeks in 1..7u64 {
        let mut date = today + Days::new(weeks * 7);
        while !is_weekend(date) {
            date = date + Days::new(1);
        }
        dates.push(date);
    }

    dates
}

pub fn sample_tournaments(today: NaiveDate) -> Vec<NewTournament> {
    sample_dates(today)
        .into_iter()
        .enumerate()
        .map(|(i, date)| {
            let store = STORES[i];
            let (hour, minute) = TIMES[i];

            NewTournament {
                store_name: store.to_string(),
                location: store.rsplit(' ').next().unwrap_or(store).to_string(),
                time: NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default(),
                date,
                prize: Some(PRIZES[i].to_string()),
                game: if i % 2 == 0 { "Pokemon" } else { "One Piece" }.to_string(),
                category: CATEGORIES[i % CATEGORIES.len()].to_string(),
                format: FORMATS[i % FORMATS.len()].to_string(),
                image: IMAGES[i].map(String::from),
            }
        })
        .collect()
}

/// Seeds the sample tournaments when the table is empty. Returns the number
/// of rows created, zero once any tournament exists.
#[instrument(skip(pool))]
pub async fn seed_sample_tournaments(
    pool: &Pool<Sqlite>,
    today: NaiveDate,
) -> Result<usize, AppError> {
    let created = insert_tournaments_if_empty(pool, &sample_tournaments(today)).await?;

    if created > 0 {
        info!(created, "Sample tournaments created");
    }

    Ok(created)
}

/// Creates the admin account when it does not exist yet. Outside the debug
/// profile a password must be configured.
#[instrument(skip(pool, config))]
pub async fn ensure_admin(
    pool: &Pool<Sqlite>,
    config: &SiteConfig,
    profile: &Profile,
) -> Result<bool, AppError> {
    if find_user_by_username(pool, &config.admin_username)
        .await?
        .is_some()
    {
        return Ok(false);
    }

    let password = match &config.admin_password {
        Some(password) if !password.is_empty() => password.clone(),
        _ if *profile == rocket::Config::DEBUG_PROFILE => {
            warn!(
                username = %config.admin_username,
                "No admin password configured, using the development default. Set ROCKET_ADMIN_PASSWORD before deploying"
            );
            DEVELOPMENT_ADMIN_PASSWORD.to_string()
        }
        _ => {
            return Err(AppError::Internal(format!(
                "No admin account exists and no admin password is configured for the '{}' profile",
                profile
            )));
        }
    };

    create_user(pool, &config.admin_username, &password).await?;
    info!(username = %config.admin_username, "Admin user created");

    Ok(true)
}

/// Startup sequence: schema, admin account, default popup image, sample data.
#[instrument(skip_all)]
pub async fn bootstrap(
    pool: &Pool<Sqlite>,
    config: &SiteConfig,
    profile: &Profile,
    today: NaiveDate,
) -> Result<(), AppError> {
    run_migrations(pool).await?;
    ensure_admin(pool, config, profile).await?;

    UploadStore::from_config(config)
        .ensure_default_popup(&config.default_popup)
        .await?;

    if config.seed_sample_data {
        seed_sample_tournaments(pool, today).await?;
    }

    Ok(())
}
