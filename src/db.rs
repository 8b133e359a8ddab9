use std::str::FromStr;

use chrono::{NaiveDateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, QueryBuilder, Sqlite, SqlitePool};
use tracing::{info, instrument};

use crate::auth::{DbUser, DbUserSession, User, UserSession, hash_password};
use crate::error::AppError;
use crate::models::{
    DATE_FORMAT, DbLogo, DbPopup, DbTournament, Logo, NewTournament, Popup, TIME_FORMAT,
    Tournament, TournamentFilter,
};

const TOURNAMENT_COLUMNS: &str = "id, nombre_tienda, ubicacion, hora, fecha, premio, tipo_juego, \
     categoria, tipo_torneo, imagen, created_at";

const TOURNAMENT_ORDER: &str = " ORDER BY fecha ASC, hora ASC, id ASC";

pub const TOURNAMENT_NOT_FOUND: &str = "Torneo no encontrado";

#[instrument]
pub async fn connect(database_url: &str) -> Result<SqlitePool, AppError> {
    info!("Connecting to database");
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

#[instrument(skip(pool))]
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<(), AppError> {
    info!("Running database migrations");
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn rows_to_tournaments(rows: Vec<DbTournament>) -> Result<Vec<Tournament>, AppError> {
    rows.into_iter().map(Tournament::try_from).collect()
}

#[instrument(skip(pool))]
pub async fn get_all_tournaments(pool: &Pool<Sqlite>) -> Result<Vec<Tournament>, AppError> {
    info!("Getting all tournaments");
    let query = format!("SELECT {} FROM torneos{}", TOURNAMENT_COLUMNS, TOURNAMENT_ORDER);

    let rows = sqlx::query_as::<_, DbTournament>(&query)
        .fetch_all(pool)
        .await?;

    rows_to_tournaments(rows)
}

#[instrument(skip(pool))]
pub async fn filter_tournaments(
    pool: &Pool<Sqlite>,
    filter: &TournamentFilter,
) -> Result<Vec<Tournament>, AppError> {
    info!("Filtering tournaments");
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM torneos WHERE 1 = 1", TOURNAMENT_COLUMNS));

    if let Some(date) = filter.date {
        builder
            .push(" AND fecha = ")
            .push_bind(date.format(DATE_FORMAT).to_string());
    }

    if let Some(location) = &filter.location {
        builder.push(" AND ubicacion = ").push_bind(location.clone());
    }

    if let Some(game) = &filter.game {
        builder.push(" AND tipo_juego = ").push_bind(game.clone());
    }

    builder.push(TOURNAMENT_ORDER);

    let rows = builder
        .build_query_as::<DbTournament>()
        .fetch_all(pool)
        .await?;

    rows_to_tournaments(rows)
}

#[instrument(skip(pool))]
pub async fn get_tournament(pool: &Pool<Sqlite>, id: i64) -> Result<Tournament, AppError> {
    info!("Getting tournament by ID");
    let query = format!("SELECT {} FROM torneos WHERE id = ?", TOURNAMENT_COLUMNS);

    let row = sqlx::query_as::<_, DbTournament>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Tournament::try_from(row),
        _ => Err(AppError::NotFound(TOURNAMENT_NOT_FOUND.to_string())),
    }
}

#[instrument(skip(pool))]
pub async fn count_tournaments(pool: &Pool<Sqlite>) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM torneos")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

async fn insert_tournament<'e, E>(executor: E, tournament: &NewTournament) -> Result<i64, AppError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let res = sqlx::query(
        "INSERT INTO torneos
         (nombre_tienda, ubicacion, hora, fecha, premio, tipo_juego, categoria, tipo_torneo, imagen)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&tournament.store_name)
    .bind(&tournament.location)
    .bind(tournament.time.format(TIME_FORMAT).to_string())
    .bind(tournament.date.format(DATE_FORMAT).to_string())
    .bind(&tournament.prize)
    .bind(&tournament.game)
    .bind(&tournament.category)
    .bind(&tournament.format)
    .bind(&tournament.image)
    .execute(executor)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool))]
pub async fn create_tournament(
    pool: &Pool<Sqlite>,
    tournament: &NewTournament,
) -> Result<Tournament, AppError> {
    info!("Creating tournament");
    let id = insert_tournament(pool, tournament).await?;
    get_tournament(pool, id).await
}

/// Inserts every tournament in one transaction, but only while the table is
/// still empty. Returns how many rows were written.
#[instrument(skip_all, fields(count = tournaments.len()))]
pub async fn insert_tournaments_if_empty(
    pool: &Pool<Sqlite>,
    tournaments: &[NewTournament],
) -> Result<usize, AppError> {
    let mut tx = pool.begin().await?;

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM torneos")
        .fetch_one(&mut *tx)
        .await?;

    if existing > 0 {
        info!(existing, "Tournaments already present, skipping insert");
        return Ok(0);
    }

    for tournament in tournaments {
        insert_tournament(&mut *tx, tournament).await?;
    }

    tx.commit().await?;
    info!("Inserted tournaments");

    Ok(tournaments.len())
}

#[instrument(skip(pool))]
pub async fn update_tournament(
    pool: &Pool<Sqlite>,
    id: i64,
    tournament: &NewTournament,
) -> Result<Tournament, AppError> {
    info!("Updating tournament");
    let res = sqlx::query(
        "UPDATE torneos
         SET nombre_tienda = ?, ubicacion = ?, hora = ?, fecha = ?, premio = ?,
             tipo_juego = ?, categoria = ?, tipo_torneo = ?, imagen = ?
         WHERE id = ?",
    )
    .bind(&tournament.store_name)
    .bind(&tournament.location)
    .bind(tournament.time.format(TIME_FORMAT).to_string())
    .bind(tournament.date.format(DATE_FORMAT).to_string())
    .bind(&tournament.prize)
    .bind(&tournament.game)
    .bind(&tournament.category)
    .bind(&tournament.format)
    .bind(&tournament.image)
    .bind(id)
    .execute(pool)
    .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(TOURNAMENT_NOT_FOUND.to_string()));
    }

    get_tournament(pool, id).await
}

#[instrument(skip(pool))]
pub async fn delete_tournament(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting tournament");
    let res = sqlx::query("DELETE FROM torneos WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(TOURNAMENT_NOT_FOUND.to_string()));
    }

    Ok(())
}

#[instrument(skip(pool))]
pub async fn get_user(pool: &Pool<Sqlite>, id: i64) -> Result<User, AppError> {
    info!("Fetching user by ID");
    let row = sqlx::query_as::<_, DbUser>("SELECT id, username FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(user) => Ok(User::from(user)),
        _ => Err(AppError::NotFound(format!(
            "User with id {} not found in database",
            id
        ))),
    }
}

#[instrument(skip(pool))]
pub async fn find_user_by_username(
    pool: &Pool<Sqlite>,
    username: &str,
) -> Result<Option<User>, AppError> {
    info!("Finding user by username");
    let row = sqlx::query_as::<_, DbUser>("SELECT id, username FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(User::from))
}

#[instrument(skip_all, fields(username))]
pub async fn create_user(
    pool: &Pool<Sqlite>,
    username: &str,
    password: &str,
) -> Result<i64, AppError> {
    info!("Creating new user");

    if find_user_by_username(pool, username).await?.is_some() {
        return Err(AppError::Validation(format!(
            "Username '{}' already exists",
            username
        )));
    }

    let hashed_password = hash_password(password)?;

    let res = sqlx::query("INSERT INTO users (username, password) VALUES (?, ?)")
        .bind(username)
        .bind(hashed_password)
        .execute(pool)
        .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip_all, fields(username))]
pub async fn authenticate_user(
    pool: &Pool<Sqlite>,
    username: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    info!("Authenticating user");
    let row: Option<(i64, String, String)> =
        sqlx::query_as("SELECT id, username, password FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(pool)
            .await?;

    match row {
        Some((id, username, hash)) => match bcrypt::verify(password, &hash) {
            Ok(true) => Ok(Some(User { id, username })),
            _ => Ok(None),
        },
        _ => Ok(None),
    }
}

#[instrument(skip(pool, token))]
pub async fn create_user_session(
    pool: &Pool<Sqlite>,
    user_id: i64,
    token: &str,
    expires_at: NaiveDateTime,
) -> Result<i64, AppError> {
    info!("Creating user session");

    let res =
        sqlx::query("INSERT INTO user_sessions (user_id, token, expires_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(token)
            .bind(expires_at)
            .execute(pool)
            .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool, token))]
pub async fn get_session_by_token(
    pool: &Pool<Sqlite>,
    token: &str,
) -> Result<UserSession, AppError> {
    info!("Getting session by token");

    let session = sqlx::query_as::<_, DbUserSession>(
        "SELECT id, user_id, token, created_at, expires_at FROM user_sessions WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    match session {
        Some(session) => Ok(UserSession::from(session)),
        _ => Err(AppError::Authentication(
            "Invalid session token".to_string(),
        )),
    }
}

#[instrument(skip(pool, token))]
pub async fn invalidate_session(pool: &Pool<Sqlite>, token: &str) -> Result<(), AppError> {
    info!("Invalidating session");

    sqlx::query("DELETE FROM user_sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn clean_expired_sessions(pool: &Pool<Sqlite>) -> Result<u64, AppError> {
    info!("Cleaning expired sessions");

    let now = Utc::now().naive_utc();

    let result = sqlx::query("DELETE FROM user_sessions WHERE expires_at < ?")
        .bind(now)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

#[instrument(skip(pool))]
pub async fn get_logo(pool: &Pool<Sqlite>) -> Result<Option<Logo>, AppError> {
    let row = sqlx::query_as::<_, DbLogo>("SELECT filename, uploaded_at FROM logo WHERE id = 1")
        .fetch_optional(pool)
        .await?;

    Ok(row.map(Logo::from))
}

#[instrument(skip(pool))]
pub async fn upsert_logo(pool: &Pool<Sqlite>, filename: &str) -> Result<Logo, AppError> {
    info!("Storing logo");
    let now = Utc::now().naive_utc();

    let row = sqlx::query_as::<_, DbLogo>(
        "INSERT INTO logo (id, filename, uploaded_at) VALUES (1, ?, ?)
         ON CONFLICT(id) DO UPDATE SET filename = excluded.filename, uploaded_at = excluded.uploaded_at
         RETURNING filename, uploaded_at",
    )
    .bind(filename)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(Logo::from(row))
}

#[instrument(skip(pool))]
pub async fn delete_logo(pool: &Pool<Sqlite>) -> Result<bool, AppError> {
    info!("Deleting logo");
    let res = sqlx::query("DELETE FROM logo WHERE id = 1")
        .execute(pool)
        .await?;

    Ok(res.rows_affected() > 0)
}

#[instrument(skip(pool))]
pub async fn get_popup(pool: &Pool<Sqlite>) -> Result<Option<Popup>, AppError> {
    let row = sqlx::query_as::<_, DbPopup>(
        "SELECT filename, active, updated_at FROM popup WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Popup::from))
}

#[instrument(skip(pool))]
pub async fn upsert_popup(
    pool: &Pool<Sqlite>,
    filename: &str,
    active: bool,
) -> Result<Popup, AppError> {
    info!("Storing popup");
    let now = Utc::now().naive_utc();

    let row = sqlx::query_as::<_, DbPopup>(
        "INSERT INTO popup (id, filename, active, updated_at) VALUES (1, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
             filename = excluded.filename,
             active = excluded.active,
             updated_at = excluded.updated_at
         RETURNING filename, active, updated_at",
    )
    .bind(filename)
    .bind(active)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(Popup::from(row))
}

/// Sets the popup's active flag, flipping it when `active` is `None`.
#[instrument(skip(pool))]
pub async fn set_popup_active(
    pool: &Pool<Sqlite>,
    active: Option<bool>,
) -> Result<Option<Popup>, AppError> {
    info!("Updating popup active flag");
    let now = Utc::now().naive_utc();

    let row = match active {
        Some(active) => {
            sqlx::query_as::<_, DbPopup>(
                "UPDATE popup SET active = ?, updated_at = ? WHERE id = 1
                 RETURNING filename, active, updated_at",
            )
            .bind(active)
            .bind(now)
            .fetch_optional(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, DbPopup>(
                "UPDATE popup SET active = NOT active, updated_at = ? WHERE id = 1
                 RETURNING filename, active, updated_at",
            )
            .bind(now)
            .fetch_optional(pool)
            .await?
        }
    };

    Ok(row.map(Popup::from))
}
