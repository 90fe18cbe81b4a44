// src/models/compras.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Máquina de estados de recepción:
// pendiente -> parcialmente_recibido -> recibido (terminal)
// pendiente | parcialmente_recibido -> cancelado (terminal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "estado_compra", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EstadoCompra {
    Pendiente,
    ParcialmenteRecibido,
    Recibido,
    Cancelado,
}

impl EstadoCompra {
    /// Un estado terminal no admite más recepciones ni cancelación.
    pub fn es_terminal(&self) -> bool {
        matches!(self, EstadoCompra::Recibido | EstadoCompra::Cancelado)
    }

    pub fn nombre(&self) -> &'static str {
        match self {
            EstadoCompra::Pendiente => "pendiente",
            EstadoCompra::ParcialmenteRecibido => "parcialmente_recibido",
            EstadoCompra::Recibido => "recibido",
            EstadoCompra::Cancelado => "cancelado",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Compra {
    pub id: Uuid,
    pub proveedor_id: Uuid,
    pub usuario_id: Uuid,
    pub numero: String,
    pub estado: EstadoCompra,
    pub subtotal: Decimal,
    pub descuento: Decimal,
    pub impuesto: Decimal,
    pub total: Decimal,
    pub fecha_orden: NaiveDate,
    pub fecha_entrega_esperada: Option<NaiveDate>,
    pub fecha_entrega: Option<DateTime<Utc>>,
    pub creado_en: DateTime<Utc>,
    pub actualizado_en: DateTime<Utc>,
}

// Las cantidades pedidas y los precios son fijos tras la creación;
// solo cantidad_recibida se muta (durante la recepción).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompraDetalle {
    pub id: Uuid,
    pub compra_id: Uuid,
    pub variante_id: Uuid,
    pub cantidad: i32,
    pub cantidad_recibida: i32,
    pub precio_unitario: Decimal,
    pub descuento: Decimal,
    pub subtotal: Decimal,
    pub total: Decimal,
}

impl CompraDetalle {
    pub fn cantidad_pendiente(&self) -> i32 {
        self.cantidad - self.cantidad_recibida
    }
}

// Compra + detalles, tal como la exponen los accesores de lectura.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompraConDetalles {
    #[serde(flatten)]
    pub compra: Compra,
    pub detalles: Vec<CompraDetalle>,
}
