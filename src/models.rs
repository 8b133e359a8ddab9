use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

use crate::error::AppError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// `HH:MM` on the wire instead of chrono's default `HH:MM:SS`.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(super::TIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_time(&raw).map_err(serde::de::Error::custom)
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|e| AppError::Validation(format!("Fecha inválida '{}': {}", raw, e)))
}

/// Accepts `HH:MM`, and the `HH:MM:00` some browsers send from time inputs.
/// Times are kept to the minute, so non-zero seconds are refused.
pub fn parse_time(raw: &str) -> Result<NaiveTime, AppError> {
    let raw = raw.trim();
    let invalid =
        |reason: String| AppError::Validation(format!("Hora inválida '{}': {}", raw, reason));

    match NaiveTime::parse_from_str(raw, TIME_FORMAT) {
        Ok(time) => Ok(time),
        Err(e) => {
            let time = NaiveTime::parse_from_str(raw, "%H:%M:%S")
                .map_err(|_| invalid(e.to_string()))?;
            if time.second() != 0 {
                return Err(invalid("los segundos deben ser 00".to_string()));
            }
            Ok(time)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: i64,
    #[serde(rename = "nombre_tienda")]
    pub store_name: String,
    #[serde(rename = "ubicacion")]
    pub location: String,
    #[serde(rename = "hora", with = "hhmm")]
    pub time: NaiveTime,
    #[serde(rename = "fecha")]
    pub date: NaiveDate,
    #[serde(rename = "premio")]
    pub prize: Option<String>,
    #[serde(rename = "tipo_juego")]
    pub game: String,
    #[serde(rename = "categoria")]
    pub category: String,
    #[serde(rename = "tipo_torneo")]
    pub format: String,
    #[serde(rename = "imagen")]
    pub image: Option<String>,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbTournament {
    pub id: Option<i64>,
    pub nombre_tienda: Option<String>,
    pub ubicacion: Option<String>,
    pub hora: Option<String>,
    pub fecha: Option<String>,
    pub premio: Option<String>,
    pub tipo_juego: Option<String>,
    pub categoria: Option<String>,
    pub tipo_torneo: Option<String>,
    pub imagen: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

impl TryFrom<DbTournament> for Tournament {
    type Error = AppError;

    fn try_from(row: DbTournament) -> Result<Self, Self::Error> {
        let id = row.id.unwrap_or_default();
        let corrupt = |field: &str| {
            AppError::Internal(format!("Tournament {} has an unreadable {} column", id, field))
        };

        let date = row.fecha.as_deref().ok_or_else(|| corrupt("fecha"))?;
        let time = row.hora.as_deref().ok_or_else(|| corrupt("hora"))?;

        Ok(Self {
            id,
            store_name: row.nombre_tienda.unwrap_or_default(),
            location: row.ubicacion.unwrap_or_default(),
            time: parse_time(time).map_err(|_| corrupt("hora"))?,
            date: parse_date(date).map_err(|_| corrupt("fecha"))?,
            prize: row.premio.filter(|p| !p.is_empty()),
            game: row.tipo_juego.unwrap_or_default(),
            category: row.categoria.unwrap_or_default(),
            format: row.tipo_torneo.unwrap_or_default(),
            image: row.imagen.filter(|i| !i.is_empty()),
            created_at: row
                .created_at
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
                .unwrap_or_else(Utc::now),
        })
    }
}

/// A fully validated tournament ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTournament {
    pub store_name: String,
    pub location: String,
    pub time: NaiveTime,
    pub date: NaiveDate,
    pub prize: Option<String>,
    pub game: String,
    pub category: String,
    pub format: String,
    pub image: Option<String>,
}

impl From<Tournament> for NewTournament {
    fn from(t: Tournament) -> Self {
        Self {
            store_name: t.store_name,
            location: t.location,
            time: t.time,
            date: t.date,
            prize: t.prize,
            game: t.game,
            category: t.category,
            format: t.format,
            image: t.image,
        }
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("must not be empty".into()));
    }
    Ok(())
}

/// Keeps an explicit `null` apart from an absent field: absent is `None`,
/// `null` is `Some(None)`.
fn nullable<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Request body for both create and update. Every field is optional so a
/// missing required field surfaces as a validation error rather than a
/// deserialization failure.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct TournamentPayload {
    #[validate(custom(function = "not_blank"))]
    pub nombre_tienda: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub ubicacion: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub hora: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub fecha: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub premio: Option<Option<String>>,
    #[validate(custom(function = "not_blank"))]
    pub tipo_juego: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub categoria: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub tipo_torneo: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub imagen: Option<Option<String>>,
}

fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("Falta el campo obligatorio '{}'", field)))
}

fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl TournamentPayload {
    pub fn into_new(self) -> Result<NewTournament, AppError> {
        Ok(NewTournament {
            store_name: required(self.nombre_tienda, "nombre_tienda")?,
            location: required(self.ubicacion, "ubicacion")?,
            time: parse_time(&required(self.hora, "hora")?)?,
            date: parse_date(&required(self.fecha, "fecha")?)?,
            prize: optional(self.premio.flatten()),
            game: required(self.tipo_juego, "tipo_juego")?,
            category: required(self.categoria, "categoria")?,
            format: required(self.tipo_torneo, "tipo_torneo")?,
            image: optional(self.imagen.flatten()),
        })
    }

    /// Fields absent from the payload keep their current value; an empty or
    /// `null` `premio` or `imagen` clears it.
    pub fn merge_into(self, current: Tournament) -> Result<NewTournament, AppError> {
        let keep = |value: Option<String>, field: &str, prior: String| match value {
            Some(v) => required(Some(v), field),
            None => Ok(prior),
        };

        Ok(NewTournament {
            store_name: keep(self.nombre_tienda, "nombre_tienda", current.store_name)?,
            location: keep(self.ubicacion, "ubicacion", current.location)?,
            time: match self.hora {
                Some(raw) => parse_time(&raw)?,
                None => current.time,
            },
            date: match self.fecha {
                Some(raw) => parse_date(&raw)?,
                None => current.date,
            },
            prize: match self.premio {
                Some(v) => optional(v),
                None => current.prize,
            },
            game: keep(self.tipo_juego, "tipo_juego", current.game)?,
            category: keep(self.categoria, "categoria", current.category)?,
            format: keep(self.tipo_torneo, "tipo_torneo", current.format)?,
            image: match self.imagen {
                Some(v) => optional(v),
                None => current.image,
            },
        })
    }
}

/// Equality filters; `None` means the field is not filtered on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TournamentFilter {
    pub date: Option<NaiveDate>,
    pub location: Option<String>,
    pub game: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Logo {
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbLogo {
    pub filename: Option<String>,
    pub uploaded_at: Option<NaiveDateTime>,
}

impl From<DbLogo> for Logo {
    fn from(row: DbLogo) -> Self {
        Self {
            filename: row.filename.unwrap_or_default(),
            uploaded_at: row
                .uploaded_at
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
                .unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Popup {
    pub filename: String,
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbPopup {
    pub filename: Option<String>,
    pub active: Option<bool>,
    pub updated_at: Option<NaiveDateTime>,
}

impl From<DbPopup> for Popup {
    fn from(row: DbPopup) -> Self {
        Self {
            filename: row.filename.unwrap_or_default(),
            active: row.active.unwrap_or_default(),
            updated_at: row
                .updated_at
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
                .unwrap_or_else(Utc::now),
        }
    }
}
