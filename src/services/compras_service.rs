// src/services/compras_service.rs

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, Executor, Postgres};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ComprasRepository,
    models::{
        compras::{Compra, CompraConDetalles, CompraDetalle, EstadoCompra},
        inventario::{OrigenMovimiento, OrigenTipo, TipoMovimiento},
    },
    services::inventario_service::InventarioService,
};

// --- Entradas ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineaCompraEntrada {
    pub variante_id: Uuid,
    pub cantidad: i32,
    pub precio_unitario: Decimal,
    #[serde(default)]
    pub descuento: Decimal,
}

/// Cantidad a recibir para una línea concreta (recepción parcial/selectiva).
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineaRecepcion {
    pub detalle_id: Uuid,
    pub cantidad: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineaCompraCalculada {
    pub variante_id: Uuid,
    pub cantidad: i32,
    pub precio_unitario: Decimal,
    pub descuento: Decimal,
    pub subtotal: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecepcionLinea {
    pub detalle_id: Uuid,
    pub variante_id: Uuid,
    pub cantidad: i32,
}

// --- Decisiones puras ---

/// Valida y totaliza las líneas de una compra nueva. El descuento por
/// línea no puede superar el subtotal de esa línea.
pub fn calcular_lineas_compra(
    lineas: &[LineaCompraEntrada],
) -> Result<(Vec<LineaCompraCalculada>, Decimal, Decimal), AppError> {
    if lineas.is_empty() {
        return Err(AppError::Validacion(
            "La compra debe tener al menos una línea.".into(),
        ));
    }

    let mut calculadas = Vec::with_capacity(lineas.len());
    let mut subtotal_orden = Decimal::ZERO;
    let mut descuento_orden = Decimal::ZERO;

    for (i, linea) in lineas.iter().enumerate() {
        if linea.cantidad <= 0 {
            return Err(AppError::Validacion(format!(
                "La línea {} debe pedir una cantidad positiva.",
                i + 1
            )));
        }
        if linea.precio_unitario < Decimal::ZERO || linea.descuento < Decimal::ZERO {
            return Err(AppError::Validacion(format!(
                "La línea {} tiene precio o descuento negativo.",
                i + 1
            )));
        }

        let subtotal = linea.precio_unitario * Decimal::from(linea.cantidad);
        if linea.descuento > subtotal {
            return Err(AppError::Validacion(format!(
                "El descuento de la línea {} ({}) supera su subtotal ({}).",
                i + 1,
                linea.descuento,
                subtotal
            )));
        }

        let total = subtotal - linea.descuento;
        subtotal_orden += subtotal;
        descuento_orden += linea.descuento;
        calculadas.push(LineaCompraCalculada {
            variante_id: linea.variante_id,
            cantidad: linea.cantidad,
            precio_unitario: linea.precio_unitario,
            descuento: linea.descuento,
            subtotal,
            total,
        });
    }

    Ok((calculadas, subtotal_orden, descuento_orden))
}

/// Resuelve qué cantidad recibir por línea: la indicada por el caller, o
/// todo el saldo pendiente cuando no hay lista explícita. Rechaza pedir
/// más de lo que queda pendiente en una línea.
pub fn resolver_recepcion(
    detalles: &[CompraDetalle],
    solicitud: Option<&[LineaRecepcion]>,
) -> Result<Vec<RecepcionLinea>, AppError> {
    match solicitud {
        Some(lineas) => {
            if lineas.is_empty() {
                return Err(AppError::Validacion(
                    "La recepción parcial debe indicar al menos una línea.".into(),
                ));
            }

            let mut resultado = Vec::with_capacity(lineas.len());
            for linea in lineas {
                let detalle = detalles
                    .iter()
                    .find(|d| d.id == linea.detalle_id)
                    .ok_or_else(|| {
                        AppError::Validacion(format!(
                            "La línea {} no pertenece a esta compra.",
                            linea.detalle_id
                        ))
                    })?;

                if linea.cantidad <= 0 {
                    return Err(AppError::Validacion(format!(
                        "La cantidad a recibir en la línea {} debe ser positiva.",
                        detalle.id
                    )));
                }

                // Si la misma línea aparece repetida en la solicitud, el
                // acumulado tampoco puede superar lo pendiente.
                let ya_solicitado: i32 = resultado
                    .iter()
                    .filter(|r: &&RecepcionLinea| r.detalle_id == detalle.id)
                    .map(|r| r.cantidad)
                    .sum();
                let pendiente = detalle.cantidad_pendiente() - ya_solicitado;
                if linea.cantidad > pendiente {
                    return Err(AppError::Validacion(format!(
                        "La cantidad solicitada ({}) supera el saldo pendiente ({}) de la línea {}.",
                        linea.cantidad, pendiente, detalle.id
                    )));
                }

                resultado.push(RecepcionLinea {
                    detalle_id: detalle.id,
                    variante_id: detalle.variante_id,
                    cantidad: linea.cantidad,
                });
            }
            Ok(resultado)
        }
        None => {
            // Recepción total: cada línea recibe su saldo restante.
            let resultado: Vec<RecepcionLinea> = detalles
                .iter()
                .filter(|d| d.cantidad_pendiente() > 0)
                .map(|d| RecepcionLinea {
                    detalle_id: d.id,
                    variante_id: d.variante_id,
                    cantidad: d.cantidad_pendiente(),
                })
                .collect();

            if resultado.is_empty() {
                return Err(AppError::Validacion(
                    "No queda nada pendiente por recibir en esta compra.".into(),
                ));
            }
            Ok(resultado)
        }
    }
}

// --- Service ---

#[derive(Clone)]
pub struct ComprasService {
    repo: ComprasRepository,
    inventario: InventarioService,
}

impl ComprasService {
    pub fn new(repo: ComprasRepository, inventario: InventarioService) -> Self {
        Self { repo, inventario }
    }

    /// Crea la orden de compra en estado `pendiente`. El stock NO se toca
    /// acá: incluso una compra "recibida el día uno" pasa por `recibir`.
    pub async fn crear<'e, E>(
        &self,
        executor: E,
        proveedor_id: Uuid,
        usuario_id: Uuid,
        lineas: &[LineaCompraEntrada],
        impuesto: Decimal,
        fecha_orden: Option<NaiveDate>,
        fecha_entrega_esperada: Option<NaiveDate>,
    ) -> Result<CompraConDetalles, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        if impuesto < Decimal::ZERO {
            return Err(AppError::Validacion("El impuesto no puede ser negativo.".into()));
        }
        let (calculadas, subtotal, descuento) = calcular_lineas_compra(lineas)?;
        let total = subtotal - descuento + impuesto;

        let mut tx = executor.begin().await?;

        if !self.repo.existe_proveedor(&mut *tx, proveedor_id).await? {
            return Err(AppError::NoEncontrado(format!(
                "El proveedor {} no existe.",
                proveedor_id
            )));
        }

        // Cada variante pedida debe pertenecer al proveedor de la orden.
        for linea in &calculadas {
            let variante = self
                .inventario
                .obtener_variante(&mut *tx, linea.variante_id)
                .await?;
            if variante.proveedor_id != proveedor_id {
                return Err(AppError::Validacion(format!(
                    "La variante '{}' no pertenece al proveedor {}.",
                    variante.sku, proveedor_id
                )));
            }
        }

        let compra = self
            .repo
            .crear_compra(
                &mut *tx,
                proveedor_id,
                usuario_id,
                subtotal,
                descuento,
                impuesto,
                total,
                fecha_orden.unwrap_or_else(|| Utc::now().date_naive()),
                fecha_entrega_esperada,
            )
            .await?;

        let mut detalles = Vec::with_capacity(calculadas.len());
        for linea in &calculadas {
            let detalle = self
                .repo
                .crear_detalle(
                    &mut *tx,
                    compra.id,
                    linea.variante_id,
                    linea.cantidad,
                    linea.precio_unitario,
                    linea.descuento,
                    linea.subtotal,
                    linea.total,
                )
                .await?;
            detalles.push(detalle);
        }

        tx.commit().await?;

        tracing::info!(compra = %compra.numero, "orden de compra creada");
        Ok(CompraConDetalles { compra, detalles })
    }

    /// Recibe mercadería contra la orden, total o parcialmente. Todo el
    /// efecto (stock, libro mayor, cantidades recibidas, estado) queda en
    /// una sola transacción; la compra se lee con bloqueo de fila.
    pub async fn recibir<'e, E>(
        &self,
        executor: E,
        compra_id: Uuid,
        usuario_id: Uuid,
        lineas: Option<Vec<LineaRecepcion>>,
    ) -> Result<CompraConDetalles, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let compra = self
            .repo
            .obtener_compra_bloqueada(&mut *tx, compra_id)
            .await?
            .ok_or_else(|| AppError::NoEncontrado(format!("La compra {} no existe.", compra_id)))?;

        if compra.estado.es_terminal() {
            return Err(AppError::Conflicto(format!(
                "La compra {} está '{}' y no admite recepciones.",
                compra.numero,
                compra.estado.nombre()
            )));
        }

        let detalles = self.repo.listar_detalles(&mut *tx, compra_id).await?;
        let recepcion = resolver_recepcion(&detalles, lineas.as_deref())?;

        let motivo = format!("Recepción compra {}", compra.numero);
        for linea in &recepcion {
            self.inventario
                .mover_stock(
                    &mut *tx,
                    linea.variante_id,
                    TipoMovimiento::Entrada,
                    linea.cantidad,
                    Some(OrigenMovimiento {
                        tipo: OrigenTipo::Compra,
                        id: compra.id,
                    }),
                    usuario_id,
                    Some(&motivo),
                    false,
                )
                .await?;
            self.repo
                .incrementar_recibido(&mut *tx, linea.detalle_id, linea.cantidad)
                .await?;
        }

        // Releemos las líneas ya incrementadas para decidir el estado final.
        let detalles = self.repo.listar_detalles(&mut *tx, compra_id).await?;
        let completa = detalles.iter().all(|d| d.cantidad_recibida >= d.cantidad);
        let nuevo_estado = if completa {
            EstadoCompra::Recibido
        } else {
            EstadoCompra::ParcialmenteRecibido
        };

        let compra = self
            .repo
            .actualizar_estado(&mut *tx, compra_id, nuevo_estado, Some(Utc::now()))
            .await?;

        tx.commit().await?;

        tracing::info!(
            compra = %compra.numero,
            estado = compra.estado.nombre(),
            "recepción registrada"
        );
        Ok(CompraConDetalles { compra, detalles })
    }

    /// Cancela una orden aún no recibida por completo.
    pub async fn cancelar<'e, E>(
        &self,
        executor: E,
        compra_id: Uuid,
    ) -> Result<Compra, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let compra = self
            .repo
            .obtener_compra_bloqueada(&mut *tx, compra_id)
            .await?
            .ok_or_else(|| AppError::NoEncontrado(format!("La compra {} no existe.", compra_id)))?;

        if compra.estado.es_terminal() {
            return Err(AppError::Conflicto(format!(
                "La compra {} está '{}' y no puede cancelarse.",
                compra.numero,
                compra.estado.nombre()
            )));
        }

        let compra = self
            .repo
            .actualizar_estado(&mut *tx, compra_id, EstadoCompra::Cancelado, None)
            .await?;

        tx.commit().await?;
        Ok(compra)
    }

    pub async fn obtener(&self, compra_id: Uuid) -> Result<CompraConDetalles, AppError> {
        self.repo
            .obtener_con_detalles(compra_id)
            .await?
            .ok_or_else(|| AppError::NoEncontrado(format!("La compra {} no existe.", compra_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detalle(id_byte: u8, cantidad: i32, recibida: i32) -> CompraDetalle {
        CompraDetalle {
            id: Uuid::from_bytes([id_byte; 16]),
            compra_id: Uuid::from_bytes([0xAA; 16]),
            variante_id: Uuid::from_bytes([id_byte.wrapping_add(100); 16]),
            cantidad,
            cantidad_recibida: recibida,
            precio_unitario: Decimal::from(100),
            descuento: Decimal::ZERO,
            subtotal: Decimal::from(100) * Decimal::from(cantidad),
            total: Decimal::from(100) * Decimal::from(cantidad),
        }
    }

    #[test]
    fn recepcion_total_toma_el_saldo_restante_de_cada_linea() {
        let detalles = vec![detalle(1, 10, 0), detalle(2, 5, 3)];
        let plan = resolver_recepcion(&detalles, None).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].cantidad, 10);
        assert_eq!(plan[1].cantidad, 2);
    }

    #[test]
    fn recepcion_sin_pendientes_y_sin_lista_explicita_falla() {
        let detalles = vec![detalle(1, 10, 10)];
        let err = resolver_recepcion(&detalles, None).unwrap_err();
        assert!(matches!(err, AppError::Validacion(_)));
    }

    #[test]
    fn recepcion_parcial_respeta_el_override() {
        let detalles = vec![detalle(1, 10, 0)];
        let solicitud = vec![LineaRecepcion {
            detalle_id: detalles[0].id,
            cantidad: 4,
        }];
        let plan = resolver_recepcion(&detalles, Some(&solicitud)).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].cantidad, 4);
        assert_eq!(plan[0].variante_id, detalles[0].variante_id);
    }

    #[test]
    fn recibir_mas_de_lo_pendiente_falla_nombrando_la_linea() {
        let detalles = vec![detalle(1, 10, 7)];
        let solicitud = vec![LineaRecepcion {
            detalle_id: detalles[0].id,
            cantidad: 4,
        }];
        let err = resolver_recepcion(&detalles, Some(&solicitud)).unwrap_err();
        match err {
            AppError::Validacion(msg) => {
                assert!(msg.contains(&detalles[0].id.to_string()));
                assert!(msg.contains("supera el saldo pendiente"));
            }
            otro => panic!("se esperaba Validacion, vino {:?}", otro),
        }
    }

    #[test]
    fn lineas_repetidas_en_la_solicitud_acumulan_contra_el_pendiente() {
        let detalles = vec![detalle(1, 10, 0)];
        let solicitud = vec![
            LineaRecepcion {
                detalle_id: detalles[0].id,
                cantidad: 6,
            },
            LineaRecepcion {
                detalle_id: detalles[0].id,
                cantidad: 6,
            },
        ];
        assert!(resolver_recepcion(&detalles, Some(&solicitud)).is_err());
    }

    #[test]
    fn linea_ajena_a_la_compra_se_rechaza() {
        let detalles = vec![detalle(1, 10, 0)];
        let solicitud = vec![LineaRecepcion {
            detalle_id: Uuid::from_bytes([0xEE; 16]),
            cantidad: 1,
        }];
        assert!(matches!(
            resolver_recepcion(&detalles, Some(&solicitud)),
            Err(AppError::Validacion(_))
        ));
    }

    #[test]
    fn una_compra_terminal_no_admite_recepciones_ni_cancelacion() {
        // `recibir` y `cancelar` cortan con Conflicto sobre esta guardia:
        // una segunda recepción sobre una orden ya recibida no pasa.
        assert!(EstadoCompra::Recibido.es_terminal());
        assert!(EstadoCompra::Cancelado.es_terminal());
        assert!(!EstadoCompra::Pendiente.es_terminal());
        assert!(!EstadoCompra::ParcialmenteRecibido.es_terminal());
    }

    #[test]
    fn descuento_por_linea_no_puede_superar_su_subtotal() {
        let lineas = vec![LineaCompraEntrada {
            variante_id: Uuid::from_bytes([1; 16]),
            cantidad: 2,
            precio_unitario: Decimal::from(50),
            descuento: Decimal::from(150),
        }];
        assert!(matches!(
            calcular_lineas_compra(&lineas),
            Err(AppError::Validacion(_))
        ));
    }

    #[test]
    fn totales_de_compra_suman_lineas_y_descuentos() {
        let lineas = vec![
            LineaCompraEntrada {
                variante_id: Uuid::from_bytes([1; 16]),
                cantidad: 2,
                precio_unitario: Decimal::from(50),
                descuento: Decimal::from(10),
            },
            LineaCompraEntrada {
                variante_id: Uuid::from_bytes([2; 16]),
                cantidad: 1,
                precio_unitario: Decimal::from(30),
                descuento: Decimal::ZERO,
            },
        ];
        let (calculadas, subtotal, descuento) = calcular_lineas_compra(&lineas).unwrap();
        assert_eq!(subtotal, Decimal::from(130));
        assert_eq!(descuento, Decimal::from(10));
        assert_eq!(calculadas[0].total, Decimal::from(90));
        assert_eq!(calculadas[1].total, Decimal::from(30));
    }
}
