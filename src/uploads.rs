use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rocket::fs::TempFile;
use tracing::{info, instrument, warn};

use crate::config::SiteConfig;
use crate::error::AppError;

pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg"];

const DEFAULT_POPUP_IMAGE: &[u8] = include_bytes!("../static/img/popup_dummy.svg");

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]").expect("valid regex"));

/// Reduces an uploaded file name to a flat ASCII name safe to join onto the
/// upload directory.
pub fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let spaced = WHITESPACE.replace_all(base.trim(), "_");
    let cleaned = UNSAFE_CHARS.replace_all(&spaced, "");

    cleaned.trim_start_matches(['.', '_']).to_string()
}

pub fn allowed_extension(filename: &str) -> Result<String, AppError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(ext),
        _ => Err(AppError::Validation(format!(
            "Tipo de archivo no permitido. Formatos válidos: {}",
            ALLOWED_EXTENSIONS.join(", ")
        ))),
    }
}

/// `<prefix>_<timestamp>_<sanitized stem>.<ext>`
pub fn stored_filename(
    prefix: &str,
    original: &str,
    now: NaiveDateTime,
) -> Result<String, AppError> {
    let base = original.rsplit(['/', '\\']).next().unwrap_or(original).trim();
    let extension = allowed_extension(base)?;

    let stem = Path::new(base)
        .file_stem()
        .and_then(|s| s.to_str())
        .map(sanitize_filename)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "imagen".to_string());

    Ok(format!(
        "{}_{}_{}.{}",
        prefix,
        now.format("%Y%m%d%H%M%S%3f"),
        stem,
        extension
    ))
}

fn is_flat_name(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.contains(['/', '\\'])
        && filename != "."
        && filename != ".."
}

/// The directory uploaded images are written to and served from.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_config(config: &SiteConfig) -> Self {
        Self::new(&config.upload_dir)
    }

    pub fn path(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Validates and persists an upload, returning the stored file name.
    /// Nothing is written when validation fails.
    #[instrument(skip(self, file))]
    pub async fn save(&self, file: &mut TempFile<'_>, prefix: &str) -> Result<String, AppError> {
        let original = file
            .raw_name()
            .map(|name| name.dangerous_unsafe_unsanitized_raw().as_str().to_string())
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| AppError::Validation("No se seleccionó ningún archivo".to_string()))?;

        let filename = stored_filename(prefix, &original, Utc::now().naive_utc())?;

        if file.len() == 0 {
            return Err(AppError::Validation("El archivo está vacío".to_string()));
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        file.move_copy_to(self.path(&filename)).await?;
        info!(%filename, "Stored upload");

        Ok(filename)
    }

    /// Removes a stored file; a file that is already gone is not an error.
    #[instrument(skip(self))]
    pub async fn remove(&self, filename: &str) -> Result<(), AppError> {
        if !is_flat_name(filename) {
            warn!(%filename, "Refusing to remove file outside the upload directory");
            return Ok(());
        }

        match tokio::fs::remove_file(self.path(filename)).await {
            Ok(()) => {
                info!(%filename, "Removed upload");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(%filename, "Upload already missing from disk");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Writes the bundled default popup image if it is not on disk yet.
    pub async fn ensure_default_popup(&self, filename: &str) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path(filename);
        if tokio::fs::try_exists(&path).await? {
            return Ok(());
        }

        tokio::fs::write(&path, DEFAULT_POPUP_IMAGE).await?;
        info!(path = %path.display(), "Wrote default popup image");
        Ok(())
    }
}
