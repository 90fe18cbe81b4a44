// src/handlers/ventas.rs

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
    models::ventas::TipoVenta,
    services::ventas_service::LineaVentaEntrada,
};

// ---
// Payload: crear venta (contado o crédito)
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CrearVentaPayload {
    pub cliente_id: Uuid,
    pub tipo_venta: TipoVenta,

    #[validate(length(min = 1, message = "La venta debe incluir al menos una línea."))]
    pub lineas: Vec<LineaVentaEntrada>,

    #[serde(default)]
    pub impuesto: Decimal,

    /// Obligatorio para ventas de contado.
    pub metodo_pago_id: Option<Uuid>,

    /// Obligatorio para ventas a crédito.
    pub fecha_vencimiento: Option<NaiveDate>,

    /// Autoriza vender por debajo del stock disponible.
    #[serde(default)]
    pub permitir_stock_negativo: bool,
}

#[utoipa::path(
    post,
    path = "/api/ventas",
    tag = "Ventas",
    request_body = CrearVentaPayload,
    responses(
        (status = 201, description = "Venta creada, stock descontado y crédito abierto si aplica", body = crate::models::ventas::VentaConDetalles),
        (status = 400, description = "Líneas inválidas, stock insuficiente o falta el método de pago / la fecha de vencimiento"),
        (status = 404, description = "Cliente, variante o método de pago inexistente")
    ),
    params(
        ("x-usuario-id" = Uuid, Header, description = "Usuario que registra la venta")
    )
)]
pub async fn crear_venta(
    State(app_state): State<AppState>,
    UsuarioActual(usuario_id): UsuarioActual,
    Json(payload): Json<CrearVentaPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let venta = app_state
        .ventas_service
        .crear(
            &app_state.db_pool,
            payload.cliente_id,
            usuario_id,
            payload.tipo_venta,
            &payload.lineas,
            payload.impuesto,
            payload.metodo_pago_id,
            payload.fecha_vencimiento,
            payload.permitir_stock_negativo,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(venta)))
}

#[utoipa::path(
    get,
    path = "/api/ventas/{id}",
    tag = "Ventas",
    responses(
        (status = 200, description = "Venta con sus líneas", body = crate::models::ventas::VentaConDetalles),
        (status = 404, description = "Venta inexistente")
    ),
    params(("id" = Uuid, Path, description = "ID de la venta"))
)]
pub async fn obtener_venta(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let venta = app_state.ventas_service.obtener(id).await?;
    Ok((StatusCode::OK, Json(venta)))
}
