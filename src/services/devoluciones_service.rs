// src/services/devoluciones_service.rs

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, Executor, Postgres};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{DevolucionesRepository, VentasRepository},
    models::{
        devoluciones::{
            Devolucion, DevolucionConDetalles, EstadoDevolucion, TipoDevolucion,
        },
        inventario::{OrigenMovimiento, OrigenTipo, TipoMovimiento},
        ventas::VentaDetalle,
    },
    services::{creditos_service::CreditosService, inventario_service::InventarioService},
};

// --- Entradas ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineaDevolucionEntrada {
    pub venta_detalle_id: Uuid,
    pub cantidad: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineaDevolucionCalculada {
    pub venta_detalle_id: Uuid,
    pub variante_id: Uuid,
    pub cantidad: i32,
    pub precio_unitario: Decimal,
    pub subtotal: Decimal,
}

// --- Decisiones puras ---

/// Valida las líneas solicitadas contra la venta original y lo ya
/// devuelto en solicitudes anteriores no rechazadas: la suma acumulada
/// por línea nunca supera la cantidad vendida. Calcula los subtotales con
/// el precio unitario original (sin recalcular impuestos).
pub fn validar_lineas_devolucion(
    detalles_venta: &[VentaDetalle],
    ya_devueltas: &[(Uuid, i64)],
    solicitud: &[LineaDevolucionEntrada],
) -> Result<(Vec<LineaDevolucionCalculada>, Decimal), AppError> {
    if solicitud.is_empty() {
        return Err(AppError::Validacion(
            "La devolución debe incluir al menos una línea.".into(),
        ));
    }

    let mut calculadas: Vec<LineaDevolucionCalculada> = Vec::with_capacity(solicitud.len());
    let mut subtotal = Decimal::ZERO;

    for linea in solicitud {
        let detalle = detalles_venta
            .iter()
            .find(|d| d.id == linea.venta_detalle_id)
            .ok_or_else(|| {
                AppError::Validacion(format!(
                    "La línea {} no pertenece a la venta.",
                    linea.venta_detalle_id
                ))
            })?;

        if linea.cantidad <= 0 {
            return Err(AppError::Validacion(format!(
                "La cantidad a devolver en la línea {} debe ser positiva.",
                detalle.id
            )));
        }

        let devuelto_previo: i64 = ya_devueltas
            .iter()
            .find(|(id, _)| *id == detalle.id)
            .map(|(_, cantidad)| *cantidad)
            .unwrap_or(0);
        // Líneas repetidas dentro de la misma solicitud también acumulan.
        let en_esta_solicitud: i64 = calculadas
            .iter()
            .filter(|c| c.venta_detalle_id == detalle.id)
            .map(|c| i64::from(c.cantidad))
            .sum();

        let disponible = i64::from(detalle.cantidad) - devuelto_previo - en_esta_solicitud;
        if i64::from(linea.cantidad) > disponible {
            return Err(AppError::Validacion(format!(
                "La cantidad solicitada ({}) supera lo disponible para devolver ({}) en la línea {}.",
                linea.cantidad, disponible.max(0), detalle.id
            )));
        }

        let subtotal_linea = detalle.precio_unitario * Decimal::from(linea.cantidad);
        subtotal += subtotal_linea;
        calculadas.push(LineaDevolucionCalculada {
            venta_detalle_id: detalle.id,
            variante_id: detalle.variante_id,
            cantidad: linea.cantidad,
            precio_unitario: detalle.precio_unitario,
            subtotal: subtotal_linea,
        });
    }

    Ok((calculadas, subtotal))
}

// --- Service ---

#[derive(Clone)]
pub struct DevolucionesService {
    repo: DevolucionesRepository,
    ventas_repo: VentasRepository,
    inventario: InventarioService,
    creditos: CreditosService,
}

impl DevolucionesService {
    pub fn new(
        repo: DevolucionesRepository,
        ventas_repo: VentasRepository,
        inventario: InventarioService,
        creditos: CreditosService,
    ) -> Self {
        Self {
            repo,
            ventas_repo,
            inventario,
            creditos,
        }
    }

    /// Crea la solicitud en `pendiente`. Sin efectos sobre stock ni
    /// crédito: esos ocurren recién al procesar.
    pub async fn crear<'e, E>(
        &self,
        executor: E,
        venta_id: Uuid,
        cliente_id: Uuid,
        motivo: &str,
        lineas: &[LineaDevolucionEntrada],
        tipo: TipoDevolucion,
    ) -> Result<DevolucionConDetalles, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        if motivo.trim().is_empty() {
            return Err(AppError::Validacion(
                "La devolución requiere un motivo.".into(),
            ));
        }

        let mut tx = executor.begin().await?;

        // La venta se bloquea: dos solicitudes concurrentes sobre la misma
        // venta se serializan, y la segunda ve las líneas ya insertadas por
        // la primera al sumar lo devuelto.
        let venta = self
            .ventas_repo
            .obtener_venta_bloqueada(&mut *tx, venta_id)
            .await?
            .ok_or_else(|| AppError::NoEncontrado(format!("La venta {} no existe.", venta_id)))?;

        if venta.cliente_id != cliente_id {
            return Err(AppError::Validacion(format!(
                "La venta {} no pertenece al cliente {}.",
                venta.numero, cliente_id
            )));
        }

        let detalles_venta = self.ventas_repo.listar_detalles(&mut *tx, venta_id).await?;
        let ya_devueltas = self.repo.cantidades_devueltas(&mut *tx, venta_id).await?;
        let (calculadas, subtotal) =
            validar_lineas_devolucion(&detalles_venta, &ya_devueltas, lineas)?;

        let devolucion = self
            .repo
            .crear_devolucion(
                &mut *tx,
                venta_id,
                cliente_id,
                tipo,
                motivo,
                subtotal,
                subtotal,
            )
            .await?;

        let mut detalles = Vec::with_capacity(calculadas.len());
        for linea in &calculadas {
            let detalle = self
                .repo
                .crear_detalle(
                    &mut *tx,
                    devolucion.id,
                    linea.venta_detalle_id,
                    linea.variante_id,
                    linea.cantidad,
                    linea.precio_unitario,
                    linea.subtotal,
                )
                .await?;
            detalles.push(detalle);
        }

        tx.commit().await?;

        tracing::info!(devolucion = %devolucion.numero, venta = %venta.numero, "devolución creada");
        Ok(DevolucionConDetalles { devolucion, detalles })
    }

    /// Procesa una devolución aprobada: repone stock vía el libro mayor,
    /// reduce el principal del crédito de la venta (si lo hay) y deja el
    /// resumen del cliente resincronizado. Una sola transacción.
    pub async fn procesar<'e, E>(
        &self,
        executor: E,
        devolucion_id: Uuid,
        usuario_id: Uuid,
    ) -> Result<DevolucionConDetalles, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let devolucion = self
            .repo
            .obtener_devolucion_bloqueada(&mut *tx, devolucion_id)
            .await?
            .ok_or_else(|| {
                AppError::NoEncontrado(format!("La devolución {} no existe.", devolucion_id))
            })?;

        if devolucion.estado != EstadoDevolucion::Aprobada {
            return Err(AppError::Conflicto(format!(
                "La devolución {} está '{}'; solo puede procesarse desde 'aprobada'.",
                devolucion.numero,
                devolucion.estado.nombre()
            )));
        }

        let detalles = self.repo.listar_detalles(&mut *tx, devolucion_id).await?;
        let motivo = format!("Devolución {}", devolucion.numero);
        for detalle in &detalles {
            self.inventario
                .mover_stock(
                    &mut *tx,
                    detalle.variante_id,
                    TipoMovimiento::Devolucion,
                    detalle.cantidad,
                    Some(OrigenMovimiento {
                        tipo: OrigenTipo::Devolucion,
                        id: devolucion.id,
                    }),
                    usuario_id,
                    Some(&motivo),
                    false,
                )
                .await?;
        }

        self.creditos
            .aplicar_devolucion(&mut *tx, devolucion.venta_id, devolucion.total)
            .await?;

        let devolucion = self
            .repo
            .actualizar_estado(
                &mut *tx,
                devolucion_id,
                EstadoDevolucion::Procesada,
                Some(Utc::now()),
            )
            .await?;

        tx.commit().await?;

        tracing::info!(devolucion = %devolucion.numero, "devolución procesada");
        Ok(DevolucionConDetalles { devolucion, detalles })
    }

    /// Cambia la bandera de estado sin efectos colaterales (aprobación y
    /// rechazo). Procesar tiene su propia operación.
    pub async fn cambiar_estado<'e, E>(
        &self,
        executor: E,
        devolucion_id: Uuid,
        nuevo_estado: EstadoDevolucion,
    ) -> Result<Devolucion, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        if nuevo_estado == EstadoDevolucion::Procesada {
            return Err(AppError::Validacion(
                "El estado 'procesada' solo se alcanza procesando la devolución.".into(),
            ));
        }

        let mut tx = executor.begin().await?;

        let devolucion = self
            .repo
            .obtener_devolucion_bloqueada(&mut *tx, devolucion_id)
            .await?
            .ok_or_else(|| {
                AppError::NoEncontrado(format!("La devolución {} no existe.", devolucion_id))
            })?;

        if devolucion.estado.es_terminal() {
            return Err(AppError::Conflicto(format!(
                "La devolución {} está '{}' (terminal); no puede pasar a '{}'.",
                devolucion.numero,
                devolucion.estado.nombre(),
                nuevo_estado.nombre()
            )));
        }

        let devolucion = self
            .repo
            .actualizar_estado(&mut *tx, devolucion_id, nuevo_estado, None)
            .await?;

        tx.commit().await?;
        Ok(devolucion)
    }

    pub async fn obtener(&self, devolucion_id: Uuid) -> Result<DevolucionConDetalles, AppError> {
        self.repo
            .obtener_con_detalles(devolucion_id)
            .await?
            .ok_or_else(|| {
                AppError::NoEncontrado(format!("La devolución {} no existe.", devolucion_id))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detalle_venta(id_byte: u8, cantidad: i32, precio: i64) -> VentaDetalle {
        VentaDetalle {
            id: Uuid::from_bytes([id_byte; 16]),
            venta_id: Uuid::from_bytes([0xAB; 16]),
            variante_id: Uuid::from_bytes([id_byte.wrapping_add(50); 16]),
            cantidad,
            precio_unitario: Decimal::from(precio),
            subtotal: Decimal::from(precio) * Decimal::from(cantidad),
        }
    }

    #[test]
    fn devolucion_valida_calcula_subtotales_con_el_precio_original() {
        let detalles = vec![detalle_venta(1, 5, 20_000)];
        let solicitud = vec![LineaDevolucionEntrada {
            venta_detalle_id: detalles[0].id,
            cantidad: 2,
        }];

        let (calculadas, subtotal) =
            validar_lineas_devolucion(&detalles, &[], &solicitud).unwrap();
        assert_eq!(calculadas.len(), 1);
        assert_eq!(calculadas[0].cantidad, 2);
        assert_eq!(calculadas[0].subtotal, Decimal::from(40_000));
        assert_eq!(subtotal, Decimal::from(40_000));
    }

    #[test]
    fn lo_ya_devuelto_en_solicitudes_previas_descuenta_lo_disponible() {
        let detalles = vec![detalle_venta(1, 5, 10_000)];
        let previas = vec![(detalles[0].id, 4_i64)];
        let solicitud = vec![LineaDevolucionEntrada {
            venta_detalle_id: detalles[0].id,
            cantidad: 2,
        }];

        let err = validar_lineas_devolucion(&detalles, &previas, &solicitud).unwrap_err();
        match err {
            AppError::Validacion(msg) => assert!(msg.contains("supera lo disponible")),
            otro => panic!("se esperaba Validacion, vino {:?}", otro),
        }

        // Con 1 unidad sí alcanza.
        let solicitud = vec![LineaDevolucionEntrada {
            venta_detalle_id: detalles[0].id,
            cantidad: 1,
        }];
        assert!(validar_lineas_devolucion(&detalles, &previas, &solicitud).is_ok());
    }

    #[test]
    fn solicitudes_serializadas_no_pueden_sobregirar_la_linea() {
        // Vendidas 5; una primera solicitud de 3 ya quedó registrada. La
        // siguiente, que al correr tras el bloqueo de la venta ve esas
        // líneas, no puede pedir otras 3.
        let detalles = vec![detalle_venta(1, 5, 10_000)];
        let previas = vec![(detalles[0].id, 3_i64)];
        let solicitud = vec![LineaDevolucionEntrada {
            venta_detalle_id: detalles[0].id,
            cantidad: 3,
        }];
        let err = validar_lineas_devolucion(&detalles, &previas, &solicitud).unwrap_err();
        match err {
            AppError::Validacion(msg) => assert!(msg.contains("supera lo disponible")),
            otro => panic!("se esperaba Validacion, vino {:?}", otro),
        }
    }

    #[test]
    fn lineas_repetidas_en_la_misma_solicitud_acumulan() {
        let detalles = vec![detalle_venta(1, 5, 10_000)];
        let solicitud = vec![
            LineaDevolucionEntrada {
                venta_detalle_id: detalles[0].id,
                cantidad: 3,
            },
            LineaDevolucionEntrada {
                venta_detalle_id: detalles[0].id,
                cantidad: 3,
            },
        ];
        assert!(validar_lineas_devolucion(&detalles, &[], &solicitud).is_err());
    }

    #[test]
    fn linea_ajena_a_la_venta_se_rechaza() {
        let detalles = vec![detalle_venta(1, 5, 10_000)];
        let solicitud = vec![LineaDevolucionEntrada {
            venta_detalle_id: Uuid::from_bytes([0xEE; 16]),
            cantidad: 1,
        }];
        assert!(matches!(
            validar_lineas_devolucion(&detalles, &[], &solicitud),
            Err(AppError::Validacion(_))
        ));
    }

    #[test]
    fn estados_terminales_de_devolucion_bloquean_transiciones() {
        // `procesar` exige 'aprobada'; `cambiar_estado` corta con Conflicto
        // sobre los terminales. Aprobada no es terminal: desde ahí se procesa.
        assert!(EstadoDevolucion::Procesada.es_terminal());
        assert!(EstadoDevolucion::Rechazada.es_terminal());
        assert!(!EstadoDevolucion::Pendiente.es_terminal());
        assert!(!EstadoDevolucion::Aprobada.es_terminal());
    }

    #[test]
    fn solicitud_vacia_o_cantidad_no_positiva_se_rechazan() {
        let detalles = vec![detalle_venta(1, 5, 10_000)];
        assert!(validar_lineas_devolucion(&detalles, &[], &[]).is_err());

        let solicitud = vec![LineaDevolucionEntrada {
            venta_detalle_id: detalles[0].id,
            cantidad: 0,
        }];
        assert!(validar_lineas_devolucion(&detalles, &[], &solicitud).is_err());
    }
}
