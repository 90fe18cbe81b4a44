// src/services/ventas_service.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, Executor, Postgres};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CreditosRepository, VentasRepository},
    models::{
        inventario::{OrigenMovimiento, OrigenTipo, TipoMovimiento},
        ventas::{EstadoPagoVenta, TipoPago, TipoVenta, VentaConDetalles},
    },
    services::{creditos_service::CreditosService, inventario_service::InventarioService},
};

// --- Entradas ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineaVentaEntrada {
    pub variante_id: Uuid,
    pub cantidad: i32,
    /// Precio pactado; si falta se toma el precio de venta de la variante.
    pub precio_unitario: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineaVentaCalculada {
    pub variante_id: Uuid,
    pub cantidad: i32,
    pub precio_unitario: Decimal,
    pub subtotal: Decimal,
}

// --- Decisiones puras ---

/// Resuelve precio y subtotal por línea. `precios` trae el precio de
/// venta vigente de cada variante pedida, ya leído por el service.
pub fn calcular_lineas_venta(
    lineas: &[LineaVentaEntrada],
    precios: &[(Uuid, Decimal)],
) -> Result<(Vec<LineaVentaCalculada>, Decimal), AppError> {
    if lineas.is_empty() {
        return Err(AppError::Validacion(
            "La venta debe incluir al menos una línea.".into(),
        ));
    }

    let mut calculadas = Vec::with_capacity(lineas.len());
    let mut subtotal = Decimal::ZERO;
    for linea in lineas {
        if linea.cantidad <= 0 {
            return Err(AppError::Validacion(format!(
                "La cantidad de la variante {} debe ser positiva.",
                linea.variante_id
            )));
        }

        let precio = match linea.precio_unitario {
            Some(precio) => precio,
            None => precios
                .iter()
                .find(|(id, _)| *id == linea.variante_id)
                .map(|(_, precio)| *precio)
                .ok_or_else(|| {
                    AppError::Validacion(format!(
                        "La variante {} no tiene precio resuelto.",
                        linea.variante_id
                    ))
                })?,
        };
        if precio < Decimal::ZERO {
            return Err(AppError::Validacion(format!(
                "El precio de la variante {} no puede ser negativo.",
                linea.variante_id
            )));
        }

        let subtotal_linea = precio * Decimal::from(linea.cantidad);
        subtotal += subtotal_linea;
        calculadas.push(LineaVentaCalculada {
            variante_id: linea.variante_id,
            cantidad: linea.cantidad,
            precio_unitario: precio,
            subtotal: subtotal_linea,
        });
    }

    Ok((calculadas, subtotal))
}

/// Una venta de contado cobra su total en el acto: un total en cero no
/// tiene pago que registrar y se rechaza antes de tocar la base.
pub fn validar_total_venta(tipo_venta: TipoVenta, total: Decimal) -> Result<(), AppError> {
    if tipo_venta == TipoVenta::Contado && total <= Decimal::ZERO {
        return Err(AppError::Validacion(
            "La venta de contado debe tener un total mayor a cero.".into(),
        ));
    }
    Ok(())
}

// --- Service ---

/// Creación de ventas: descuenta stock por el libro mayor y, cuando la
/// venta es a crédito, abre el crédito 1:1 y deja el resumen del cliente
/// al día, todo en una transacción.
#[derive(Clone)]
pub struct VentasService {
    repo: VentasRepository,
    creditos_repo: CreditosRepository,
    inventario: InventarioService,
    creditos: CreditosService,
}

impl VentasService {
    pub fn new(
        repo: VentasRepository,
        creditos_repo: CreditosRepository,
        inventario: InventarioService,
        creditos: CreditosService,
    ) -> Self {
        Self {
            repo,
            creditos_repo,
            inventario,
            creditos,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn crear<'e, E>(
        &self,
        executor: E,
        cliente_id: Uuid,
        usuario_id: Uuid,
        tipo_venta: TipoVenta,
        lineas: &[LineaVentaEntrada],
        impuesto: Decimal,
        metodo_pago_id: Option<Uuid>,
        fecha_vencimiento: Option<NaiveDate>,
        permitir_stock_negativo: bool,
    ) -> Result<VentaConDetalles, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        if impuesto < Decimal::ZERO {
            return Err(AppError::Validacion(
                "El impuesto no puede ser negativo.".into(),
            ));
        }
        let metodo_contado = match tipo_venta {
            TipoVenta::Contado => Some(metodo_pago_id.ok_or_else(|| {
                AppError::Validacion("La venta de contado requiere un método de pago.".into())
            })?),
            TipoVenta::Credito => None,
        };
        let vencimiento_credito = match tipo_venta {
            TipoVenta::Credito => Some(fecha_vencimiento.ok_or_else(|| {
                AppError::Validacion(
                    "La venta a crédito requiere una fecha de vencimiento.".into(),
                )
            })?),
            TipoVenta::Contado => None,
        };

        let mut tx = executor.begin().await?;

        if !self.repo.existe_cliente(&mut *tx, cliente_id).await? {
            return Err(AppError::NoEncontrado(format!(
                "El cliente {} no existe.",
                cliente_id
            )));
        }
        if let Some(metodo) = metodo_pago_id {
            if !self.repo.existe_metodo_pago(&mut *tx, metodo).await? {
                return Err(AppError::NoEncontrado(format!(
                    "El método de pago {} no existe.",
                    metodo
                )));
            }
        }

        let mut precios = Vec::with_capacity(lineas.len());
        for linea in lineas {
            let variante = self
                .inventario
                .obtener_variante(&mut *tx, linea.variante_id)
                .await?;
            precios.push((variante.id, variante.precio_venta));
        }

        let (calculadas, subtotal) = calcular_lineas_venta(lineas, &precios)?;
        let total = subtotal + impuesto;
        validar_total_venta(tipo_venta, total)?;
        let (total_pagado, saldo_pendiente, estado_pago) = match tipo_venta {
            TipoVenta::Contado => (total, Decimal::ZERO, EstadoPagoVenta::Pagado),
            TipoVenta::Credito => (Decimal::ZERO, total, EstadoPagoVenta::Pendiente),
        };

        let venta = self
            .repo
            .crear_venta(
                &mut *tx,
                cliente_id,
                usuario_id,
                tipo_venta,
                subtotal,
                impuesto,
                total,
                total_pagado,
                saldo_pendiente,
                estado_pago,
            )
            .await?;

        let mut detalles = Vec::with_capacity(calculadas.len());
        let motivo = format!("Venta {}", venta.numero);
        for linea in &calculadas {
            let detalle = self
                .repo
                .crear_detalle(
                    &mut *tx,
                    venta.id,
                    linea.variante_id,
                    linea.cantidad,
                    linea.precio_unitario,
                    linea.subtotal,
                )
                .await?;

            self.inventario
                .mover_stock(
                    &mut *tx,
                    linea.variante_id,
                    TipoMovimiento::Salida,
                    -linea.cantidad,
                    Some(OrigenMovimiento {
                        tipo: OrigenTipo::Venta,
                        id: venta.id,
                    }),
                    usuario_id,
                    Some(&motivo),
                    permitir_stock_negativo,
                )
                .await?;

            detalles.push(detalle);
        }

        if let Some(metodo) = metodo_contado {
            // Un único pago de contado por el total, saldo queda en cero.
            self.repo
                .crear_pago(
                    &mut *tx,
                    venta.id,
                    metodo,
                    TipoPago::Contado,
                    total,
                    total,
                    Decimal::ZERO,
                    None,
                    usuario_id,
                )
                .await?;
        }
        if let Some(vencimiento) = vencimiento_credito {
            self.creditos_repo
                .crear_credito(&mut *tx, venta.id, cliente_id, total, vencimiento)
                .await?;
            self.creditos
                .recomputar_resumen(&mut *tx, cliente_id)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            venta = %venta.numero,
            cliente = %cliente_id,
            total = %total,
            tipo = ?tipo_venta,
            "venta creada"
        );
        Ok(VentaConDetalles { venta, detalles })
    }

    pub async fn obtener(&self, venta_id: Uuid) -> Result<VentaConDetalles, AppError> {
        self.repo
            .obtener_con_detalles(venta_id)
            .await?
            .ok_or_else(|| AppError::NoEncontrado(format!("La venta {} no existe.", venta_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linea(variante: u8, cantidad: i32, precio: Option<i64>) -> LineaVentaEntrada {
        LineaVentaEntrada {
            variante_id: Uuid::from_bytes([variante; 16]),
            cantidad,
            precio_unitario: precio.map(Decimal::from),
        }
    }

    #[test]
    fn lineas_sin_precio_toman_el_precio_de_la_variante() {
        let lineas = vec![linea(1, 2, None), linea(2, 1, None)];
        let precios = vec![
            (Uuid::from_bytes([1; 16]), Decimal::from(15_000)),
            (Uuid::from_bytes([2; 16]), Decimal::from(8_000)),
        ];

        let (calculadas, subtotal) = calcular_lineas_venta(&lineas, &precios).unwrap();
        assert_eq!(calculadas[0].precio_unitario, Decimal::from(15_000));
        assert_eq!(calculadas[0].subtotal, Decimal::from(30_000));
        assert_eq!(calculadas[1].subtotal, Decimal::from(8_000));
        assert_eq!(subtotal, Decimal::from(38_000));
    }

    #[test]
    fn el_precio_pactado_pisa_al_de_la_variante() {
        let lineas = vec![linea(1, 3, Some(10_000))];
        let precios = vec![(Uuid::from_bytes([1; 16]), Decimal::from(15_000))];

        let (calculadas, subtotal) = calcular_lineas_venta(&lineas, &precios).unwrap();
        assert_eq!(calculadas[0].precio_unitario, Decimal::from(10_000));
        assert_eq!(subtotal, Decimal::from(30_000));
    }

    #[test]
    fn venta_sin_lineas_o_cantidad_no_positiva_se_rechazan() {
        assert!(calcular_lineas_venta(&[], &[]).is_err());

        let lineas = vec![linea(1, 0, Some(100))];
        assert!(calcular_lineas_venta(&lineas, &[]).is_err());
        let lineas = vec![linea(1, -2, Some(100))];
        assert!(calcular_lineas_venta(&lineas, &[]).is_err());
    }

    #[test]
    fn venta_de_contado_con_total_cero_se_rechaza() {
        // Líneas a precio cero son válidas (bonificaciones), pero de
        // contado el total debe dejar un pago registrable.
        let err = validar_total_venta(TipoVenta::Contado, Decimal::ZERO).unwrap_err();
        match err {
            AppError::Validacion(msg) => assert!(msg.contains("mayor a cero")),
            otro => panic!("se esperaba Validacion, vino {:?}", otro),
        }
        assert!(validar_total_venta(TipoVenta::Contado, Decimal::from(100)).is_ok());
        assert!(validar_total_venta(TipoVenta::Credito, Decimal::ZERO).is_ok());
    }

    #[test]
    fn precio_negativo_se_rechaza() {
        let lineas = vec![linea(1, 1, Some(-500))];
        assert!(matches!(
            calcular_lineas_venta(&lineas, &[]),
            Err(AppError::Validacion(_))
        ));
    }
}
