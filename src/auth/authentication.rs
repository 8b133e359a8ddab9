use rocket::Request;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::response::Redirect;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use tracing::Instrument;

use crate::config::AppContext;
use crate::db::{get_session_by_token, get_user};
use crate::error::AppError;
use crate::validation::ErrorResponse;

use super::User;

pub const SESSION_COOKIE: &str = "session_token";

#[rocket::async_trait]
impl<'r> FromRequest<'r> for User {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        session_user(request)
            .instrument(tracing::info_span!("user_auth_guard"))
            .await
    }
}

async fn session_user(request: &Request<'_>) -> Outcome<User, ()> {
    let token = match request.cookies().get_private(SESSION_COOKIE) {
        Some(cookie) => cookie.value().to_string(),
        None => return Outcome::Error((Status::Unauthorized, ())),
    };

    let ctx = match request.rocket().state::<AppContext>() {
        Some(ctx) => ctx,
        _ => {
            tracing::error!("Application context not found in managed state");
            return Outcome::Error((Status::InternalServerError, ()));
        }
    };

    let session = match get_session_by_token(&ctx.db, &token).await {
        Ok(session) => session,
        Err(AppError::Authentication(_)) => {
            tracing::warn!("Unknown session token");
            return Outcome::Error((Status::Unauthorized, ()));
        }
        Err(err) => {
            tracing::error!(error = ?err, "Failed to look up session");
            return Outcome::Error((Status::InternalServerError, ()));
        }
    };

    if !session.is_valid() {
        tracing::warn!(user_id = %session.user_id, "Session token expired");
        return Outcome::Error((Status::Unauthorized, ()));
    }

    match get_user(&ctx.db, session.user_id).await {
        Ok(user) => {
            tracing::info!(username = %user.username, "User authenticated via session token");
            Outcome::Success(user)
        }
        Err(err) => {
            tracing::error!(user_id = %session.user_id, error = ?err, "Failed to fetch user for valid session");
            Outcome::Error((Status::Unauthorized, ()))
        }
    }
}

#[catch(401)]
pub fn unauthorized(_req: &Request) -> Redirect {
    tracing::warn!("Unauthorized access attempt");
    Redirect::to(uri!("/admin"))
}

#[catch(401)]
pub fn unauthorized_api(_req: &Request) -> Custom<Json<ErrorResponse>> {
    Custom(
        Status::Unauthorized,
        Json(ErrorResponse::new("Authentication required")),
    )
}

#[catch(default)]
pub fn api_error(status: Status, _req: &Request) -> Custom<Json<ErrorResponse>> {
    let reason = status.reason().unwrap_or("Request failed");
    Custom(status, Json(ErrorResponse::new(reason)))
}
