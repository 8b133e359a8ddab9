use chrono::Utc;
use rocket::State;
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::response::Redirect;
use rocket::response::status::Custom;
use rocket::serde::json::{self, Json};
use rocket_dyn_templates::{Template, context};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use crate::config::AppContext;
use crate::db::{authenticate_user, create_user_session, invalidate_session};
use crate::error::AppError;
use crate::validation::JsonValidateExt;

use super::{SESSION_COOKIE, User, UserSession};

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username is required"))]
    username: String,
    #[validate(length(min = 1, message = "password is required"))]
    password: String,
}

#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub mensaje: String,
}

#[get("/admin")]
pub fn login_page(user: Option<User>, ctx: &State<AppContext>) -> Result<Template, Redirect> {
    if user.is_some() {
        return Err(Redirect::to("/"));
    }

    Ok(Template::render(
        "login",
        context! {
            title: format!("Admin - {}", ctx.config.site_title),
        },
    ))
}

#[post("/admin", data = "<login>")]
pub async fn login(
    login: Result<Json<LoginRequest>, json::Error<'_>>,
    cookies: &CookieJar<'_>,
    ctx: &State<AppContext>,
) -> Result<Custom<Json<LoginResponse>>, AppError> {
    let validated = login.validated()?;
    info!(username = %validated.username, "Login attempt");

    let Some(user) = authenticate_user(&ctx.db, &validated.username, &validated.password).await?
    else {
        warn!(username = %validated.username, "Login failed");
        return Ok(Custom(
            Status::Unauthorized,
            Json(LoginResponse {
                success: false,
                mensaje: "Usuario o contraseña incorrectos".to_string(),
            }),
        ));
    };

    let hours = ctx.config.session_hours;
    let token = UserSession::generate_token();
    let expires_at = Utc::now() + chrono::Duration::hours(hours);

    create_user_session(&ctx.db, user.id, &token, expires_at.naive_utc()).await?;

    cookies.add_private(
        Cookie::build((SESSION_COOKIE, token))
            .same_site(SameSite::Lax)
            .http_only(true)
            .max_age(rocket::time::Duration::hours(hours)),
    );

    info!(username = %user.username, "Authentication successful");

    Ok(Custom(
        Status::Ok,
        Json(LoginResponse {
            success: true,
            mensaje: "Login exitoso".to_string(),
        }),
    ))
}

#[get("/logout")]
pub async fn logout(user: User, cookies: &CookieJar<'_>, ctx: &State<AppContext>) -> Redirect {
    if let Some(cookie) = cookies.get_private(SESSION_COOKIE) {
        if let Err(err) = invalidate_session(&ctx.db, cookie.value()).await {
            warn!(error = ?err, "Failed to invalidate session on logout");
        }
    }

    cookies.remove_private(Cookie::build(SESSION_COOKIE));
    info!(username = %user.username, "Logged out");

    Redirect::to("/")
}
