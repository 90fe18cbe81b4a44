// src/handlers/compras.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{actor::UsuarioActual, error::AppError},
    config::AppState,
    services::compras_service::{LineaCompraEntrada, LineaRecepcion},
};

// ---
// Payload: crear orden de compra
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CrearCompraPayload {
    pub proveedor_id: Uuid,

    #[validate(length(min = 1, message = "La compra debe tener al menos una línea."))]
    pub lineas: Vec<LineaCompraEntrada>,

    #[serde(default)]
    pub impuesto: Decimal,

    pub fecha_orden: Option<NaiveDate>,
    pub fecha_entrega_esperada: Option<NaiveDate>,
}

#[utoipa::path(
    post,
    path = "/api/compras",
    tag = "Compras",
    request_body = CrearCompraPayload,
    responses(
        (status = 201, description = "Orden creada en estado 'pendiente'", body = crate::models::compras::CompraConDetalles),
        (status = 400, description = "Líneas inválidas o variante de otro proveedor"),
        (status = 404, description = "Proveedor inexistente")
    ),
    params(
        ("x-usuario-id" = Uuid, Header, description = "Usuario que crea la orden")
    )
)]
pub async fn crear_compra(
    State(app_state): State<AppState>,
    UsuarioActual(usuario_id): UsuarioActual,
    Json(payload): Json<CrearCompraPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let compra = app_state
        .compras_service
        .crear(
            &app_state.db_pool,
            payload.proveedor_id,
            usuario_id,
            &payload.lineas,
            payload.impuesto,
            payload.fecha_orden,
            payload.fecha_entrega_esperada,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(compra)))
}

#[utoipa::path(
    get,
    path = "/api/compras/{id}",
    tag = "Compras",
    responses(
        (status = 200, description = "Orden con sus líneas", body = crate::models::compras::CompraConDetalles),
        (status = 404, description = "Orden inexistente")
    ),
    params(("id" = Uuid, Path, description = "ID de la orden"))
)]
pub async fn obtener_compra(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let compra = app_state.compras_service.obtener(id).await?;
    Ok((StatusCode::OK, Json(compra)))
}

// ---
// Payload: recepción (total si no vienen líneas)
// ---
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecibirCompraPayload {
    /// Ausente: se recibe todo lo pendiente de todas las líneas.
    pub lineas: Option<Vec<LineaRecepcion>>,
}

#[utoipa::path(
    post,
    path = "/api/compras/{id}/recibir",
    tag = "Compras",
    request_body = RecibirCompraPayload,
    responses(
        (status = 200, description = "Stock ingresado y estado recalculado", body = crate::models::compras::CompraConDetalles),
        (status = 400, description = "Cantidad que supera lo pendiente de una línea"),
        (status = 409, description = "La orden está en un estado terminal")
    ),
    params(
        ("id" = Uuid, Path, description = "ID de la orden"),
        ("x-usuario-id" = Uuid, Header, description = "Usuario que recibe la mercadería")
    )
)]
pub async fn recibir_compra(
    State(app_state): State<AppState>,
    UsuarioActual(usuario_id): UsuarioActual,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecibirCompraPayload>,
) -> Result<impl IntoResponse, AppError> {
    let compra = app_state
        .compras_service
        .recibir(&app_state.db_pool, id, usuario_id, payload.lineas)
        .await?;

    Ok((StatusCode::OK, Json(compra)))
}

#[utoipa::path(
    post,
    path = "/api/compras/{id}/cancelar",
    tag = "Compras",
    responses(
        (status = 200, description = "Orden cancelada", body = crate::models::compras::Compra),
        (status = 409, description = "La orden ya recibió mercadería o está terminal")
    ),
    params(("id" = Uuid, Path, description = "ID de la orden"))
)]
pub async fn cancelar_compra(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let compra = app_state.compras_service.cancelar(&app_state.db_pool, id).await?;
    Ok((StatusCode::OK, Json(compra)))
}
