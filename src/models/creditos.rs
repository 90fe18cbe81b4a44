// src/models/creditos.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// `vencido` es una marca derivada (fecha de vencimiento superada sin estar
// pagado), ortogonal al estado de pago: un crédito vencido sigue aceptando
// abonos y pasa a `pagado` al saldarse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "estado_credito", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EstadoCredito {
    Activo,
    Pagado,
    Vencido,
}

impl EstadoCredito {
    pub fn nombre(&self) -> &'static str {
        match self {
            EstadoCredito::Activo => "activo",
            EstadoCredito::Pagado => "pagado",
            EstadoCredito::Vencido => "vencido",
        }
    }
}

// --- Crédito ---
// 1:1 con su Venta, creado al vender a crédito, nunca huérfano.
// Invariante: saldo_pendiente = monto_total - total_abonado, nunca negativo.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Credito {
    pub id: Uuid,
    pub venta_id: Uuid,
    pub cliente_id: Uuid,
    pub monto_total: Decimal,
    pub total_abonado: Decimal,
    pub saldo_pendiente: Decimal,
    pub estado: EstadoCredito,
    pub fecha_vencimiento: NaiveDate,
    pub fecha_ultimo_pago: Option<DateTime<Utc>>,
    pub observaciones: Option<String>,
    pub creado_en: DateTime<Utc>,
    pub actualizado_en: DateTime<Utc>,
}

/// Resultado puro del plegado de los créditos de un cliente, previo al
/// UPSERT de la fila de resumen.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumenCalculado {
    pub credito_total: Decimal,
    pub total_abonado: Decimal,
    pub saldo_total: Decimal,
    pub creditos_activos: i32,
    pub creditos_vencidos: i32,
    pub creditos_pagados: i32,
    pub fecha_ultimo_credito: Option<DateTime<Utc>>,
    pub fecha_ultimo_pago: Option<DateTime<Utc>>,
}

// --- Resumen de crédito por cliente ---
// Caché denormalizada: siempre re-derivable plegando los créditos vivos
// del cliente. Se recalcula completa, nunca se parchea incrementalmente.
// `limite_credito` se configura aparte y sobrevive a los recálculos.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResumenCreditoCliente {
    pub id: Uuid,
    pub cliente_id: Uuid,
    pub credito_total: Decimal,
    pub total_abonado: Decimal,
    pub saldo_total: Decimal,
    pub creditos_activos: i32,
    pub creditos_vencidos: i32,
    pub creditos_pagados: i32,
    pub limite_credito: Decimal,
    pub fecha_ultimo_credito: Option<DateTime<Utc>>,
    pub fecha_ultimo_pago: Option<DateTime<Utc>>,
    pub actualizado_en: DateTime<Utc>,
}
