// src/handlers/creditos.rs

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
    services::creditos_service::AbonoEntrada,
};

#[utoipa::path(
    get,
    path = "/api/creditos/{id}",
    tag = "Créditos",
    responses(
        (status = 200, description = "Crédito con sus saldos", body = crate::models::creditos::Credito),
        (status = 404, description = "Crédito inexistente")
    ),
    params(("id" = Uuid, Path, description = "ID del crédito"))
)]
pub async fn obtener_credito(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let credito = app_state.creditos_service.obtener_credito(id).await?;
    Ok((StatusCode::OK, Json(credito)))
}

// ---
// Payload: lote de abonos (puede repartirse entre varios métodos)
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrarAbonosPayload {
    #[validate(length(min = 1, message = "El abono debe incluir al menos un pago."))]
    pub abonos: Vec<AbonoEntrada>,

    pub observaciones: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/creditos/{id}/abonos",
    tag = "Créditos",
    request_body = RegistrarAbonosPayload,
    responses(
        (status = 200, description = "Abonos aplicados; crédito, venta y resumen actualizados", body = crate::models::creditos::Credito),
        (status = 400, description = "Monto no positivo o que supera el saldo pendiente"),
        (status = 409, description = "El crédito ya está pagado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID del crédito"),
        ("x-usuario-id" = Uuid, Header, description = "Usuario que cobra el abono")
    )
)]
pub async fn registrar_abonos(
    State(app_state): State<AppState>,
    UsuarioActual(usuario_id): UsuarioActual,
    Path(id): Path<Uuid>,
    Json(payload): Json<RegistrarAbonosPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let credito = app_state
        .creditos_service
        .registrar_abonos(
            &app_state.db_pool,
            id,
            &payload.abonos,
            payload.observaciones.as_deref(),
            usuario_id,
        )
        .await?;

    Ok((StatusCode::OK, Json(credito)))
}

#[utoipa::path(
    get,
    path = "/api/clientes/{id}/resumen-credito",
    tag = "Créditos",
    responses(
        (status = 200, description = "Resumen denormalizado del cliente, materializado a demanda", body = crate::models::creditos::ResumenCreditoCliente)
    ),
    params(("id" = Uuid, Path, description = "ID del cliente"))
)]
pub async fn obtener_resumen_credito(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let resumen = app_state
        .creditos_service
        .obtener_resumen(&app_state.db_pool, id)
        .await?;
    Ok((StatusCode::OK, Json(resumen)))
}

#[utoipa::path(
    get,
    path = "/api/clientes/{id}/credito-disponible",
    tag = "Créditos",
    responses(
        (status = 200, description = "Cupo restante contra el límite configurado")
    ),
    params(("id" = Uuid, Path, description = "ID del cliente"))
)]
pub async fn obtener_credito_disponible(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let disponible = app_state
        .creditos_service
        .credito_disponible(&app_state.db_pool, id)
        .await?;
    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "clienteId": id, "creditoDisponible": disponible })),
    ))
}
