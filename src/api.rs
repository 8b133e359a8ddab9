use chrono::Local;
use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::{self, Json};
use rocket_dyn_templates::{Template, context};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::User;
use crate::bootstrap::seed_sample_tournaments;
use crate::cards::build_cards;
use crate::config::AppContext;
use crate::db::{
    create_tournament, delete_tournament, filter_tournaments, get_all_tournaments,
    get_tournament, update_tournament,
};
use crate::error::AppError;
use crate::models::{Tournament, TournamentFilter, TournamentPayload, parse_date};
use crate::validation::{JsonValidateExt, MessageResponse};

#[derive(Serialize, Deserialize)]
pub struct TournamentSaved {
    pub mensaje: String,
    pub torneo: Tournament,
}

/// Query string of the listing filters; blank values mean "any".
#[derive(FromForm, Default, Debug)]
pub struct FilterParams {
    #[field(name = "filtro-fecha")]
    date: Option<String>,
    #[field(name = "filtro-ubicacion")]
    location: Option<String>,
    #[field(name = "filtro-juego")]
    game: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl TryFrom<FilterParams> for TournamentFilter {
    type Error = AppError;

    fn try_from(params: FilterParams) -> Result<Self, Self::Error> {
        Ok(Self {
            date: non_blank(params.date)
                .map(|raw| parse_date(&raw))
                .transpose()?,
            location: non_blank(params.location),
            game: non_blank(params.game),
        })
    }
}

#[get("/torneos")]
pub async fn api_get_tournaments(
    ctx: &State<AppContext>,
) -> Result<Json<Vec<Tournament>>, AppError> {
    Ok(Json(get_all_tournaments(&ctx.db).await?))
}

#[get("/torneos/filtrar?<params..>")]
pub async fn api_filter_tournaments(
    params: FilterParams,
    ctx: &State<AppContext>,
) -> Result<Json<Vec<Tournament>>, AppError> {
    let filter = TournamentFilter::try_from(params)?;
    Ok(Json(filter_tournaments(&ctx.db, &filter).await?))
}

#[get("/filtrar?<params..>")]
pub async fn api_filter_fragment(
    params: FilterParams,
    ctx: &State<AppContext>,
) -> Result<Template, AppError> {
    let filter = TournamentFilter::try_from(params)?;
    let tournaments = filter_tournaments(&ctx.db, &filter).await?;
    let cards = build_cards(&tournaments, Local::now().date_naive());

    info!(matches = cards.len(), "Rendering tournament grid");

    Ok(Template::render(
        "partials/tournament_grid",
        context! { cards: cards },
    ))
}

#[post("/torneos", data = "<payload>")]
pub async fn api_create_tournament(
    _user: User,
    payload: Result<Json<TournamentPayload>, json::Error<'_>>,
    ctx: &State<AppContext>,
) -> Result<Custom<Json<TournamentSaved>>, AppError> {
    let new = payload.validated()?.into_new()?;
    let torneo = create_tournament(&ctx.db, &new).await?;

    info!(id = torneo.id, store = %torneo.store_name, "Tournament created");

    Ok(Custom(
        Status::Created,
        Json(TournamentSaved {
            mensaje: "Torneo creado exitosamente".to_string(),
            torneo,
        }),
    ))
}

#[put("/torneos/<id>", data = "<payload>")]
pub async fn api_update_tournament(
    id: i64,
    _user: User,
    payload: Result<Json<TournamentPayload>, json::Error<'_>>,
    ctx: &State<AppContext>,
) -> Result<Json<TournamentSaved>, AppError> {
    let current = get_tournament(&ctx.db, id).await?;
    let merged = payload.validated()?.merge_into(current)?;
    let torneo = update_tournament(&ctx.db, id, &merged).await?;

    Ok(Json(TournamentSaved {
        mensaje: "Torneo actualizado exitosamente".to_string(),
        torneo,
    }))
}

#[delete("/torneos/<id>")]
pub async fn api_delete_tournament(
    id: i64,
    _user: User,
    ctx: &State<AppContext>,
) -> Result<Json<MessageResponse>, AppError> {
    delete_tournament(&ctx.db, id).await?;
    info!(id, "Tournament deleted");

    Ok(Json(MessageResponse::new("Torneo eliminado exitosamente")))
}

#[post("/init-dummy")]
pub async fn api_init_dummy(
    ctx: &State<AppContext>,
) -> Result<Custom<Json<MessageResponse>>, AppError> {
    let created = seed_sample_tournaments(&ctx.db, Local::now().date_naive()).await?;

    if created == 0 {
        return Ok(Custom(
            Status::Ok,
            Json(MessageResponse::new("Ya existen torneos en la base de datos")),
        ));
    }

    Ok(Custom(
        Status::Created,
        Json(MessageResponse::new("Torneos dummy creados exitosamente")),
    ))
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}
