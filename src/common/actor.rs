// src/common/actor.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::common::error::AppError;

/// Usuario que ejecuta la operación, tomado de la cabecera
/// `x-usuario-id` que el gateway de autenticación inyecta. Todo camino
/// que escribe en el libro mayor o en pagos lo exige: el asiento sin
/// autor no existe.
pub struct UsuarioActual(pub Uuid);

impl<S> FromRequestParts<S> for UsuarioActual
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let valor = parts
            .headers
            .get("x-usuario-id")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Validacion("Falta la cabecera 'x-usuario-id'.".into())
            })?;

        let id = valor.parse::<Uuid>().map_err(|_| {
            AppError::Validacion("La cabecera 'x-usuario-id' debe ser un UUID.".into())
        })?;

        Ok(UsuarioActual(id))
    }
}
