// src/handlers/devoluciones.rs

use axum::{
    Json,
    extract::{Path, State},
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
    models::devoluciones::{EstadoDevolucion, TipoDevolucion},
    services::devoluciones_service::LineaDevolucionEntrada,
};

// ---
// Payload: solicitud de devolución
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CrearDevolucionPayload {
    pub venta_id: Uuid,
    pub cliente_id: Uuid,
    pub tipo: TipoDevolucion,

    #[validate(length(min = 1, message = "El motivo es obligatorio."))]
    pub motivo: String,

    #[validate(length(min = 1, message = "La devolución debe incluir al menos una línea."))]
    pub lineas: Vec<LineaDevolucionEntrada>,
}

#[utoipa::path(
    post,
    path = "/api/devoluciones",
    tag = "Devoluciones",
    request_body = CrearDevolucionPayload,
    responses(
        (status = 201, description = "Solicitud creada en 'pendiente', sin efectos aún", body = crate::models::devoluciones::DevolucionConDetalles),
        (status = 400, description = "Cantidad que supera lo vendido menos lo ya devuelto"),
        (status = 404, description = "Venta inexistente")
    )
)]
pub async fn crear_devolucion(
    State(app_state): State<AppState>,
    Json(payload): Json<CrearDevolucionPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let devolucion = app_state
        .devoluciones_service
        .crear(
            &app_state.db_pool,
            payload.venta_id,
            payload.cliente_id,
            &payload.motivo,
            &payload.lineas,
            payload.tipo,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(devolucion)))
}

#[utoipa::path(
    get,
    path = "/api/devoluciones/{id}",
    tag = "Devoluciones",
    responses(
        (status = 200, description = "Devolución con sus líneas", body = crate::models::devoluciones::DevolucionConDetalles),
        (status = 404, description = "Devolución inexistente")
    ),
    params(("id" = Uuid, Path, description = "ID de la devolución"))
)]
pub async fn obtener_devolucion(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let devolucion = app_state.devoluciones_service.obtener(id).await?;
    Ok((StatusCode::OK, Json(devolucion)))
}

#[utoipa::path(
    post,
    path = "/api/devoluciones/{id}/procesar",
    tag = "Devoluciones",
    responses(
        (status = 200, description = "Stock repuesto, crédito ajustado y estado 'procesada'", body = crate::models::devoluciones::DevolucionConDetalles),
        (status = 409, description = "La devolución no está aprobada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID de la devolución"),
        ("x-usuario-id" = Uuid, Header, description = "Usuario que procesa")
    )
)]
pub async fn procesar_devolucion(
    State(app_state): State<AppState>,
    UsuarioActual(usuario_id): UsuarioActual,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let devolucion = app_state
        .devoluciones_service
        .procesar(&app_state.db_pool, id, usuario_id)
        .await?;
    Ok((StatusCode::OK, Json(devolucion)))
}

// ---
// Payload: aprobación / rechazo
// ---
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CambiarEstadoPayload {
    pub estado: EstadoDevolucion,
}

#[utoipa::path(
    put,
    path = "/api/devoluciones/{id}/estado",
    tag = "Devoluciones",
    request_body = CambiarEstadoPayload,
    responses(
        (status = 200, description = "Estado actualizado", body = crate::models::devoluciones::Devolucion),
        (status = 400, description = "'procesada' solo se alcanza procesando"),
        (status = 409, description = "La devolución ya está en un estado terminal")
    ),
    params(("id" = Uuid, Path, description = "ID de la devolución"))
)]
pub async fn cambiar_estado_devolucion(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CambiarEstadoPayload>,
) -> Result<impl IntoResponse, AppError> {
    let devolucion = app_state
        .devoluciones_service
        .cambiar_estado(&app_state.db_pool, id, payload.estado)
        .await?;
    Ok((StatusCode::OK, Json(devolucion)))
}
