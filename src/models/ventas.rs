// src/models/ventas.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "estado_pago_venta", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EstadoPagoVenta {
    Pagado,
    Parcial,
    Pendiente,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "tipo_venta", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TipoVenta {
    Contado,
    Credito,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "tipo_pago", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TipoPago {
    Abono,
    Contado,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Venta {
    pub id: Uuid,
    pub cliente_id: Uuid,
    pub usuario_id: Uuid,
    pub numero: String,
    pub tipo_venta: TipoVenta,
    pub subtotal: Decimal,
    pub impuesto: Decimal,
    pub total: Decimal,
    pub total_pagado: Decimal,
    pub saldo_pendiente: Decimal,
    pub estado_pago: EstadoPagoVenta,
    pub creado_en: DateTime<Utc>,
    pub actualizado_en: DateTime<Utc>,
}

// Inmutable una vez creada la venta: fuente de verdad para la cantidad
// originalmente vendida al validar devoluciones.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VentaDetalle {
    pub id: Uuid,
    pub venta_id: Uuid,
    pub variante_id: Uuid,
    pub cantidad: i32,
    pub precio_unitario: Decimal,
    pub subtotal: Decimal,
}

// --- Pago ---
// Inmutable: captura saldo_anterior / saldo_nuevo de la venta en el
// momento exacto del pago (pista de auditoría).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pago {
    pub id: Uuid,
    pub venta_id: Uuid,
    pub metodo_pago_id: Uuid,
    pub tipo_pago: TipoPago,
    pub monto: Decimal,
    pub saldo_anterior: Decimal,
    pub saldo_nuevo: Decimal,
    pub referencia: Option<String>,
    pub usuario_id: Uuid,
    pub creado_en: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VentaConDetalles {
    #[serde(flatten)]
    pub venta: Venta,
    pub detalles: Vec<VentaDetalle>,
}
