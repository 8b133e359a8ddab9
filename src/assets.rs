use rocket::State;
use rocket::form::{Errors, Form};
use rocket::fs::TempFile;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::User;
use crate::config::{AppContext, SiteConfig};
use crate::db::{delete_logo, get_logo, get_popup, set_popup_active, upsert_logo, upsert_popup};
use crate::error::AppError;
use crate::models::{Logo, Popup};
use crate::uploads::UploadStore;
use crate::validation::MessageResponse;

const LOGO_NOT_FOUND: &str = "No hay logo configurado";
const POPUP_NOT_FOUND: &str = "No hay popup configurado";

#[derive(FromForm)]
pub struct ImageUpload<'r> {
    file: TempFile<'r>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssetResponse {
    pub filename: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activo: Option<bool>,
}

impl AssetResponse {
    fn logo(logo: &Logo, config: &SiteConfig) -> Self {
        Self {
            filename: logo.filename.clone(),
            url: config.upload_url(&logo.filename),
            activo: None,
        }
    }

    fn popup(popup: &Popup, config: &SiteConfig) -> Self {
        Self {
            filename: popup.filename.clone(),
            url: config.upload_url(&popup.filename),
            activo: Some(popup.active),
        }
    }
}

#[derive(Deserialize)]
pub struct PopupToggleRequest {
    activo: Option<bool>,
}

/// Size overruns from either the `file` or `data-form` limit are reported
/// as 413; any other form failure is a plain validation error.
fn rejected_upload(errors: Errors<'_>, config: &SiteConfig) -> AppError {
    if errors.iter().any(|e| e.status() == Status::PayloadTooLarge) {
        return AppError::PayloadTooLarge(format!(
            "El archivo supera el tamaño máximo de {} bytes",
            config.max_upload_bytes
        ));
    }

    let reasons: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    AppError::Validation(format!("Formulario inválido: {}", reasons.join("; ")))
}

/// Drops a replaced file once the new row is in place. A failure here only
/// leaves an orphaned file, so it is logged rather than returned.
async fn discard_replaced(store: &UploadStore, previous: Option<String>, current: &str) {
    if let Some(previous) = previous.filter(|p| p != current) {
        if let Err(err) = store.remove(&previous).await {
            warn!(error = ?err, filename = %previous, "Failed to remove replaced upload");
        }
    }
}

#[get("/logo")]
pub async fn get_logo_info(
    _user: User,
    ctx: &State<AppContext>,
) -> Result<Json<AssetResponse>, AppError> {
    let logo = get_logo(&ctx.db)
        .await?
        .ok_or_else(|| AppError::NotFound(LOGO_NOT_FOUND.to_string()))?;

    Ok(Json(AssetResponse::logo(&logo, &ctx.config)))
}

#[post("/logo", data = "<upload>")]
pub async fn upload_logo(
    _user: User,
    upload: Result<Form<ImageUpload<'_>>, Errors<'_>>,
    ctx: &State<AppContext>,
) -> Result<Custom<Json<AssetResponse>>, AppError> {
    let mut upload = upload.map_err(|errors| rejected_upload(errors, &ctx.config))?;
    let store = UploadStore::from_config(&ctx.config);
    let previous = get_logo(&ctx.db).await?.map(|logo| logo.filename);

    let filename = store.save(&mut upload.file, "logo").await?;

    let logo = match upsert_logo(&ctx.db, &filename).await {
        Ok(logo) => logo,
        Err(err) => {
            store.remove(&filename).await?;
            return Err(err);
        }
    };

    discard_replaced(&store, previous, &logo.filename).await;
    info!(filename = %logo.filename, "Logo replaced");

    Ok(Custom(
        Status::Created,
        Json(AssetResponse::logo(&logo, &ctx.config)),
    ))
}

#[delete("/logo")]
pub async fn remove_logo(
    _user: User,
    ctx: &State<AppContext>,
) -> Result<Json<MessageResponse>, AppError> {
    let logo = get_logo(&ctx.db)
        .await?
        .ok_or_else(|| AppError::NotFound(LOGO_NOT_FOUND.to_string()))?;

    delete_logo(&ctx.db).await?;
    UploadStore::from_config(&ctx.config)
        .remove(&logo.filename)
        .await?;

    info!(filename = %logo.filename, "Logo removed");
    Ok(Json(MessageResponse::new("Logo eliminado exitosamente")))
}

#[get("/popup")]
pub async fn get_popup_info(
    _user: User,
    ctx: &State<AppContext>,
) -> Result<Json<AssetResponse>, AppError> {
    let popup = get_popup(&ctx.db)
        .await?
        .ok_or_else(|| AppError::NotFound(POPUP_NOT_FOUND.to_string()))?;

    Ok(Json(AssetResponse::popup(&popup, &ctx.config)))
}

/// Replaces the popup image. The active flag is kept; a first upload starts
/// active.
#[post("/popup", data = "<upload>")]
pub async fn upload_popup(
    _user: User,
    upload: Result<Form<ImageUpload<'_>>, Errors<'_>>,
    ctx: &State<AppContext>,
) -> Result<Custom<Json<AssetResponse>>, AppError> {
    let mut upload = upload.map_err(|errors| rejected_upload(errors, &ctx.config))?;
    let store = UploadStore::from_config(&ctx.config);
    let previous = get_popup(&ctx.db).await?;
    let active = previous.as_ref().map(|p| p.active).unwrap_or(true);

    let filename = store.save(&mut upload.file, "popup").await?;

    let popup = match upsert_popup(&ctx.db, &filename, active).await {
        Ok(popup) => popup,
        Err(err) => {
            store.remove(&filename).await?;
            return Err(err);
        }
    };

    let replaced = previous
        .map(|p| p.filename)
        .filter(|f| *f != ctx.config.default_popup);
    discard_replaced(&store, replaced, &popup.filename).await;
    info!(filename = %popup.filename, active, "Popup replaced");

    Ok(Custom(
        Status::Created,
        Json(AssetResponse::popup(&popup, &ctx.config)),
    ))
}

/// Flips the active flag, or sets it when the body carries `activo`.
#[put("/popup", data = "<toggle>")]
pub async fn toggle_popup(
    _user: User,
    toggle: Option<Json<PopupToggleRequest>>,
    ctx: &State<AppContext>,
) -> Result<Json<AssetResponse>, AppError> {
    let requested = toggle.and_then(|t| t.activo);

    let popup = set_popup_active(&ctx.db, requested)
        .await?
        .ok_or_else(|| AppError::NotFound(POPUP_NOT_FOUND.to_string()))?;

    info!(active = popup.active, "Popup toggled");
    Ok(Json(AssetResponse::popup(&popup, &ctx.config)))
}

/// Reverts to the bundled default image and deactivates the popup, whatever
/// state it was in.
#[delete("/popup")]
pub async fn reset_popup(
    _user: User,
    ctx: &State<AppContext>,
) -> Result<Json<AssetResponse>, AppError> {
    let store = UploadStore::from_config(&ctx.config);
    let default_popup = ctx.config.default_popup.clone();
    let previous = get_popup(&ctx.db).await?.map(|p| p.filename);

    let popup = upsert_popup(&ctx.db, &default_popup, false).await?;
    discard_replaced(&store, previous, &default_popup).await;

    info!("Popup reset to default");
    Ok(Json(AssetResponse::popup(&popup, &ctx.config)))
}
