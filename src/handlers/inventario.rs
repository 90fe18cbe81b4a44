// src/handlers/inventario.rs

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{actor::UsuarioActual, error::AppError},
    config::AppState,
};

// ---
// Payload: ajuste manual de stock
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AjusteStockPayload {
    pub variante_id: Uuid,

    /// Delta con signo: positivo suma, negativo resta.
    pub cantidad: i32,

    #[validate(length(min = 1, message = "El motivo es obligatorio."))]
    pub motivo: String,

    /// Autoriza dejar el stock por debajo de cero (conteo físico).
    #[serde(default)]
    pub permitir_negativo: bool,
}

#[utoipa::path(
    post,
    path = "/api/inventario/ajustes",
    tag = "Inventario",
    request_body = AjusteStockPayload,
    responses(
        (status = 201, description = "Ajuste aplicado y movimiento registrado", body = crate::models::inventario::MovimientoInventario),
        (status = 400, description = "Cantidad cero, motivo vacío o stock insuficiente")
    ),
    params(
        ("x-usuario-id" = Uuid, Header, description = "Usuario que ejecuta el ajuste")
    )
)]
pub async fn ajustar_stock(
    State(app_state): State<AppState>,
    UsuarioActual(usuario_id): UsuarioActual,
    Json(payload): Json<AjusteStockPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let movimiento = app_state
        .inventario_service
        .ajustar_stock(
            &app_state.db_pool,
            payload.variante_id,
            payload.cantidad,
            &payload.motivo,
            usuario_id,
            payload.permitir_negativo,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(movimiento)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiltroMovimientos {
    pub variante_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/api/inventario/movimientos",
    tag = "Inventario",
    responses(
        (status = 200, description = "Movimientos del libro mayor en orden cronológico", body = [crate::models::inventario::MovimientoInventario])
    ),
    params(
        ("varianteId" = Option<Uuid>, Query, description = "Limita a una variante")
    )
)]
pub async fn listar_movimientos(
    State(app_state): State<AppState>,
    Query(filtro): Query<FiltroMovimientos>,
) -> Result<impl IntoResponse, AppError> {
    let movimientos = app_state
        .inventario_service
        .listar_movimientos(filtro.variante_id)
        .await?;

    Ok((StatusCode::OK, Json(movimientos)))
}
