use rocket::serde::json::{self, Json};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use validator::{Validate, ValidationErrors};

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MessageResponse {
    pub mensaje: String,
}

impl MessageResponse {
    pub fn new(mensaje: impl Into<String>) -> Self {
        Self {
            mensaje: mensaje.into(),
        }
    }
}

impl From<ValidationErrors> for AppError {
    #[instrument]
    fn from(errors: ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, field_errors)| {
                let reasons: Vec<String> = field_errors
                    .iter()
                    .map(|error| {
                        error
                            .message
                            .clone()
                            .unwrap_or_else(|| "Invalid value".into())
                            .to_string()
                    })
                    .collect();
                format!("{}: {}", field, reasons.join(", "))
            })
            .collect();

        messages.sort();

        AppError::Validation(messages.join("; "))
    }
}

/// A JSON body that failed to deserialize is a client error like any other
/// validation failure, carrying serde's explanation.
impl From<json::Error<'_>> for AppError {
    fn from(error: json::Error<'_>) -> Self {
        match error {
            json::Error::Io(err) => {
                AppError::Validation(format!("No se pudo leer el cuerpo: {}", err))
            }
            json::Error::Parse(_, err) => AppError::Validation(format!("JSON inválido: {}", err)),
        }
    }
}

pub trait JsonValidateExt<T> {
    fn validated(self) -> Result<T, AppError>;
}

impl<T: Validate> JsonValidateExt<T> for Json<T> {
    fn validated(self) -> Result<T, AppError> {
        let inner = self.into_inner();
        inner.validate()?;
        Ok(inner)
    }
}

impl<T: Validate> JsonValidateExt<T> for Result<Json<T>, json::Error<'_>> {
    fn validated(self) -> Result<T, AppError> {
        self?.validated()
    }
}
