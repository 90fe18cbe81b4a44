use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

// Nuestro tipo de error, con `thiserror` para mejor ergonomía.
// Taxonomía: Validacion / NoEncontrado / Conflicto se reportan al caller
// con el invariante violado; el resto se vuelve un 500 genérico y la
// transacción en curso se revierte completa.
#[derive(Debug, Error)]
pub enum AppError {
    // Entrada malformada o cantidad/monto fuera del saldo pendiente.
    #[error("Error de validación: {0}")]
    Validacion(String),

    #[error("No encontrado: {0}")]
    NoEncontrado(String),

    // Operación ilegal para el estado actual (ya recibida, ya pagado,
    // devolución no aprobada). El mensaje nombra el estado actual y la
    // transición intentada.
    #[error("Conflicto de estado: {0}")]
    Conflicto(String),

    #[error("Error de validación")]
    ValidationError(#[from] validator::ValidationErrors),

    // Variante para errores de base de datos (sqlx)
    #[error("Error de base de datos")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para cualquier otro error inesperado.
    #[error("Error interno del servidor")]
    Interno(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Devolvemos todos los detalles de la validación de payloads.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Uno o más campos son inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::Validacion(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NoEncontrado(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflicto(msg) => (StatusCode::CONFLICT, msg),

            // Todo lo demás (DatabaseError, Interno) se vuelve 500.
            // `tracing` registra el detalle; el caller recibe un mensaje genérico.
            ref e => {
                tracing::error!("Error interno del servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocurrió un error inesperado.".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
