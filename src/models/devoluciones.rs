// src/models/devoluciones.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "tipo_devolucion", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TipoDevolucion {
    Total,
    Parcial,
}

// pendiente -> aprobada -> procesada (terminal)
// pendiente -> rechazada (terminal)
// Los efectos sobre stock y crédito ocurren únicamente al procesar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "estado_devolucion", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EstadoDevolucion {
    Pendiente,
    Aprobada,
    Procesada,
    Rechazada,
}

impl EstadoDevolucion {
    pub fn es_terminal(&self) -> bool {
        matches!(self, EstadoDevolucion::Procesada | EstadoDevolucion::Rechazada)
    }

    pub fn nombre(&self) -> &'static str {
        match self {
            EstadoDevolucion::Pendiente => "pendiente",
            EstadoDevolucion::Aprobada => "aprobada",
            EstadoDevolucion::Procesada => "procesada",
            EstadoDevolucion::Rechazada => "rechazada",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Devolucion {
    pub id: Uuid,
    pub venta_id: Uuid,
    pub cliente_id: Uuid,
    pub numero: String,
    pub tipo: TipoDevolucion,
    pub estado: EstadoDevolucion,
    pub motivo: String,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub fecha_procesada: Option<DateTime<Utc>>,
    pub creado_en: DateTime<Utc>,
    pub actualizado_en: DateTime<Utc>,
}

// Cada línea referencia el VentaDetalle original: la suma de cantidades
// devueltas contra ese detalle (en solicitudes no rechazadas) no puede
// superar la cantidad vendida.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DevolucionDetalle {
    pub id: Uuid,
    pub devolucion_id: Uuid,
    pub venta_detalle_id: Uuid,
    pub variante_id: Uuid,
    pub cantidad: i32,
    pub precio_unitario: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DevolucionConDetalles {
    #[serde(flatten)]
    pub devolucion: Devolucion,
    pub detalles: Vec<DevolucionDetalle>,
}
