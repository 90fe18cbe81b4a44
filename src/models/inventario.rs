// src/models/inventario.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Variante (SKU vendible) ---
// El stock solo se muta vía InventarioService, dentro de una transacción
// que también escribe el movimiento correspondiente.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Variante {
    pub id: Uuid,
    pub proveedor_id: Uuid,
    pub sku: String,
    pub nombre: String,
    pub stock: i32,
    pub precio_costo: Decimal,
    pub precio_venta: Decimal,
    pub stock_minimo: i32,
    pub creado_en: DateTime<Utc>,
    pub actualizado_en: DateTime<Utc>,
}

// --- Tipos de movimiento (mapea el enum de Postgres) ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "tipo_movimiento", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TipoMovimiento {
    Entrada,
    Salida,
    Ajuste,
    Devolucion,
}

// El documento que originó un movimiento: unión etiquetada (tipo + id),
// no tres foreign keys nullables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "origen_movimiento", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrigenTipo {
    Compra,
    Venta,
    Devolucion,
    Ajuste,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrigenMovimiento {
    pub tipo: OrigenTipo,
    pub id: Uuid,
}

// --- Movimiento de inventario (libro mayor, append-only) ---
// Inmutable una vez creado: nunca se actualiza ni se borra.
// Invariante: stock_despues - stock_antes == cantidad (con signo).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MovimientoInventario {
    pub id: Uuid,
    pub variante_id: Uuid,
    pub tipo: TipoMovimiento,
    pub cantidad: i32,
    pub stock_antes: i32,
    pub stock_despues: i32,
    pub origen_tipo: Option<OrigenTipo>,
    pub origen_id: Option<Uuid>,
    pub usuario_id: Uuid,
    pub motivo: Option<String>,
    pub creado_en: DateTime<Utc>,
}

impl MovimientoInventario {
    pub fn origen(&self) -> Option<OrigenMovimiento> {
        match (self.origen_tipo, self.origen_id) {
            (Some(tipo), Some(id)) => Some(OrigenMovimiento { tipo, id }),
            _ => None,
        }
    }
}
