// src/services/creditos_service.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, Executor, Postgres};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CreditosRepository, VentasRepository},
    models::creditos::{Credito, EstadoCredito, ResumenCalculado, ResumenCreditoCliente},
};

// --- Entradas ---

/// Una parte de un abono: un mismo pago puede repartirse entre varios
/// métodos (parte efectivo, parte transferencia).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AbonoEntrada {
    pub monto: Decimal,
    pub metodo_pago_id: Uuid,
    pub referencia: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AbonoPlaneado {
    pub monto: Decimal,
    pub metodo_pago_id: Uuid,
    pub referencia: Option<String>,
    pub saldo_anterior: Decimal,
    pub saldo_nuevo: Decimal,
}

// --- Decisiones puras ---

/// Valida el lote de abonos contra el saldo del crédito y encadena los
/// snapshots saldo_anterior/saldo_nuevo partiendo del saldo actual de la
/// venta, en el orden de entrada.
pub fn planear_abonos(
    saldo_venta: Decimal,
    saldo_credito: Decimal,
    abonos: &[AbonoEntrada],
) -> Result<Vec<AbonoPlaneado>, AppError> {
    if abonos.is_empty() {
        return Err(AppError::Validacion(
            "El abono debe incluir al menos un pago.".into(),
        ));
    }
    for (i, abono) in abonos.iter().enumerate() {
        if abono.monto <= Decimal::ZERO {
            return Err(AppError::Validacion(format!(
                "El monto del pago {} debe ser positivo.",
                i + 1
            )));
        }
    }

    let total: Decimal = abonos.iter().map(|a| a.monto).sum();
    if total > saldo_credito {
        return Err(AppError::Validacion(format!(
            "El monto abonado ({}) supera el saldo pendiente del crédito ({}).",
            total, saldo_credito
        )));
    }

    let mut saldo_corriente = saldo_venta;
    let mut plan = Vec::with_capacity(abonos.len());
    for abono in abonos {
        let saldo_anterior = saldo_corriente;
        saldo_corriente -= abono.monto;
        plan.push(AbonoPlaneado {
            monto: abono.monto,
            metodo_pago_id: abono.metodo_pago_id,
            referencia: abono.referencia.clone(),
            saldo_anterior,
            saldo_nuevo: saldo_corriente,
        });
    }
    Ok(plan)
}

/// Pliega todos los créditos de un cliente en su resumen. Recalculo
/// completo e idempotente: dos corridas seguidas sin cambios intermedios
/// dan exactamente el mismo resultado.
pub fn resumir_creditos(creditos: &[Credito]) -> ResumenCalculado {
    let mut resumen = ResumenCalculado {
        credito_total: Decimal::ZERO,
        total_abonado: Decimal::ZERO,
        saldo_total: Decimal::ZERO,
        creditos_activos: 0,
        creditos_vencidos: 0,
        creditos_pagados: 0,
        fecha_ultimo_credito: None,
        fecha_ultimo_pago: None,
    };

    for credito in creditos {
        resumen.credito_total += credito.monto_total;
        resumen.total_abonado += credito.total_abonado;
        match credito.estado {
            EstadoCredito::Activo => resumen.creditos_activos += 1,
            EstadoCredito::Vencido => resumen.creditos_vencidos += 1,
            EstadoCredito::Pagado => resumen.creditos_pagados += 1,
        }
        if resumen
            .fecha_ultimo_credito
            .is_none_or(|f| credito.creado_en > f)
        {
            resumen.fecha_ultimo_credito = Some(credito.creado_en);
        }
        if let Some(pago) = credito.fecha_ultimo_pago {
            if resumen.fecha_ultimo_pago.is_none_or(|f| pago > f) {
                resumen.fecha_ultimo_pago = Some(pago);
            }
        }
    }

    resumen.saldo_total = resumen.credito_total - resumen.total_abonado;
    resumen
}

/// Reducción de principal por una devolución procesada: el saldo
/// resultante tiene piso en cero, lo que equivale a pisar el principal en
/// total_abonado (así `saldo = monto_total - total_abonado` se sostiene).
pub fn reducir_principal_por_devolucion(
    credito: &Credito,
    total_devolucion: Decimal,
) -> (Decimal, Decimal, EstadoCredito) {
    let nuevo_saldo = (credito.saldo_pendiente - total_devolucion).max(Decimal::ZERO);
    let nuevo_monto = credito.total_abonado + nuevo_saldo;
    let estado = if nuevo_saldo <= Decimal::ZERO {
        EstadoCredito::Pagado
    } else {
        credito.estado
    };
    (nuevo_monto, nuevo_saldo, estado)
}

// --- Service ---

#[derive(Clone)]
pub struct CreditosService {
    repo: CreditosRepository,
    ventas_repo: VentasRepository,
}

impl CreditosService {
    pub fn new(repo: CreditosRepository, ventas_repo: VentasRepository) -> Self {
        Self { repo, ventas_repo }
    }

    pub async fn obtener_credito(&self, credito_id: Uuid) -> Result<Credito, AppError> {
        self.repo
            .obtener_credito(credito_id)
            .await?
            .ok_or_else(|| AppError::NoEncontrado(format!("El crédito {} no existe.", credito_id)))
    }

    /// Aplica un lote de abonos al crédito y a su venta. Crédito, venta,
    /// pagos y resumen quedan en la misma transacción: ningún caller ve
    /// un abono aplicado a medias.
    pub async fn registrar_abonos<'e, E>(
        &self,
        executor: E,
        credito_id: Uuid,
        abonos: &[AbonoEntrada],
        observaciones: Option<&str>,
        usuario_id: Uuid,
    ) -> Result<Credito, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let credito = self
            .repo
            .obtener_credito_bloqueado(&mut *tx, credito_id)
            .await?
            .ok_or_else(|| {
                AppError::NoEncontrado(format!("El crédito {} no existe.", credito_id))
            })?;

        if credito.estado == EstadoCredito::Pagado {
            return Err(AppError::Conflicto(format!(
                "El crédito {} ya está '{}' y no admite más abonos.",
                credito_id,
                credito.estado.nombre()
            )));
        }

        // La venta dueña del crédito también se bloquea: sus contadores
        // de pago se actualizan junto con los del crédito.
        let venta = self
            .ventas_repo
            .obtener_venta_bloqueada(&mut *tx, credito.venta_id)
            .await?
            .ok_or_else(|| {
                AppError::NoEncontrado(format!("La venta {} del crédito no existe.", credito.venta_id))
            })?;

        for abono in abonos {
            if !self
                .ventas_repo
                .existe_metodo_pago(&mut *tx, abono.metodo_pago_id)
                .await?
            {
                return Err(AppError::NoEncontrado(format!(
                    "El método de pago {} no existe.",
                    abono.metodo_pago_id
                )));
            }
        }

        let plan = planear_abonos(venta.saldo_pendiente, credito.saldo_pendiente, abonos)?;
        let total: Decimal = plan.iter().map(|p| p.monto).sum();

        for pago in &plan {
            self.ventas_repo
                .crear_pago(
                    &mut *tx,
                    venta.id,
                    pago.metodo_pago_id,
                    crate::models::ventas::TipoPago::Abono,
                    pago.monto,
                    pago.saldo_anterior,
                    pago.saldo_nuevo,
                    pago.referencia.as_deref(),
                    usuario_id,
                )
                .await?;
        }

        self.ventas_repo.aplicar_pago(&mut *tx, venta.id, total).await?;
        let credito = self
            .repo
            .aplicar_abono(&mut *tx, credito_id, total, observaciones)
            .await?;

        // El resumen del cliente se resincroniza en cada camino que toca
        // un crédito, no solo en las devoluciones.
        self.recomputar_resumen(&mut *tx, credito.cliente_id).await?;

        tx.commit().await?;

        tracing::info!(
            credito = %credito_id,
            monto = %total,
            pagos = plan.len(),
            estado = credito.estado.nombre(),
            "abono registrado"
        );
        Ok(credito)
    }

    /// Recalcula el resumen denormalizado del cliente desde sus créditos
    /// vivos. Acepta el executor del caller para correr dentro de su
    /// transacción. Sin créditos, deja una fila en cero (conservando el
    /// límite de crédito configurado) en vez de borrarla.
    pub async fn recomputar_resumen<'e, E>(
        &self,
        executor: E,
        cliente_id: Uuid,
    ) -> Result<ResumenCreditoCliente, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        // La marca `vencido` es derivada; se refresca antes de plegar.
        self.repo.marcar_vencidos(&mut *tx, cliente_id).await?;

        let creditos = self.repo.listar_por_cliente(&mut *tx, cliente_id).await?;
        let calculo = resumir_creditos(&creditos);
        let resumen = self
            .repo
            .upsert_resumen(&mut *tx, cliente_id, &calculo)
            .await?;

        tx.commit().await?;
        Ok(resumen)
    }

    /// Lectura del resumen, materializándolo a demanda si aún no existe.
    pub async fn obtener_resumen<'e, E>(
        &self,
        executor: E,
        cliente_id: Uuid,
    ) -> Result<ResumenCreditoCliente, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        let resumen = match self.repo.obtener_resumen(&mut *tx, cliente_id).await? {
            Some(resumen) => resumen,
            None => self.recomputar_resumen(&mut *tx, cliente_id).await?,
        };
        tx.commit().await?;
        Ok(resumen)
    }

    pub async fn credito_disponible<'e, E>(
        &self,
        executor: E,
        cliente_id: Uuid,
    ) -> Result<Decimal, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let resumen = self.obtener_resumen(executor, cliente_id).await?;
        Ok((resumen.limite_credito - resumen.saldo_total).max(Decimal::ZERO))
    }

    /// Camino de devoluciones: si la venta fue a crédito, reduce el
    /// principal (saldo con piso en cero) y resincroniza el resumen.
    /// Devuelve None si la venta no tenía crédito asociado.
    pub async fn aplicar_devolucion<'e, E>(
        &self,
        executor: E,
        venta_id: Uuid,
        total_devolucion: Decimal,
    ) -> Result<Option<Credito>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let Some(credito) = self
            .repo
            .obtener_por_venta_bloqueado(&mut *tx, venta_id)
            .await?
        else {
            tx.commit().await?;
            return Ok(None);
        };

        let (nuevo_monto, nuevo_saldo, estado) =
            reducir_principal_por_devolucion(&credito, total_devolucion);
        let credito = self
            .repo
            .reducir_principal(&mut *tx, credito.id, nuevo_monto, nuevo_saldo, estado)
            .await?;

        self.recomputar_resumen(&mut *tx, credito.cliente_id).await?;

        tx.commit().await?;
        Ok(Some(credito))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn abono(monto: i64, metodo: u8) -> AbonoEntrada {
        AbonoEntrada {
            monto: Decimal::from(monto),
            metodo_pago_id: Uuid::from_bytes([metodo; 16]),
            referencia: None,
        }
    }

    fn credito(monto_total: i64, abonado: i64, estado: EstadoCredito) -> Credito {
        let creado = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        Credito {
            id: Uuid::from_bytes([1; 16]),
            venta_id: Uuid::from_bytes([2; 16]),
            cliente_id: Uuid::from_bytes([3; 16]),
            monto_total: Decimal::from(monto_total),
            total_abonado: Decimal::from(abonado),
            saldo_pendiente: Decimal::from(monto_total - abonado),
            estado,
            fecha_vencimiento: creado.date_naive(),
            fecha_ultimo_pago: None,
            observaciones: None,
            creado_en: creado,
            actualizado_en: creado,
        }
    }

    #[test]
    fn abonos_multiples_encadenan_saldo_anterior_y_nuevo() {
        // Crédito 100000 sin abonos: 30000 + 20000 en una sola llamada.
        let plan = planear_abonos(
            Decimal::from(100_000),
            Decimal::from(100_000),
            &[abono(30_000, 1), abono(20_000, 2)],
        )
        .unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].saldo_anterior, Decimal::from(100_000));
        assert_eq!(plan[0].saldo_nuevo, Decimal::from(70_000));
        assert_eq!(plan[1].saldo_anterior, Decimal::from(70_000));
        assert_eq!(plan[1].saldo_nuevo, Decimal::from(50_000));
        let total: Decimal = plan.iter().map(|p| p.monto).sum();
        assert_eq!(total, Decimal::from(50_000));
    }

    #[test]
    fn abono_que_supera_el_saldo_se_rechaza() {
        let err = planear_abonos(
            Decimal::from(40_000),
            Decimal::from(40_000),
            &[abono(60_000, 1)],
        )
        .unwrap_err();
        match err {
            AppError::Validacion(msg) => assert!(msg.contains("supera el saldo pendiente")),
            otro => panic!("se esperaba Validacion, vino {:?}", otro),
        }
    }

    #[test]
    fn lote_vacio_o_monto_no_positivo_se_rechazan() {
        assert!(planear_abonos(Decimal::from(100), Decimal::from(100), &[]).is_err());
        assert!(
            planear_abonos(Decimal::from(100), Decimal::from(100), &[abono(0, 1)]).is_err()
        );
        assert!(
            planear_abonos(Decimal::from(100), Decimal::from(100), &[abono(-5, 1)]).is_err()
        );
    }

    #[test]
    fn un_credito_pagado_no_admite_mas_abonos() {
        // `registrar_abonos` corta con Conflicto sobre el estado pagado;
        // aun sin esa guardia, el saldo en cero rechaza cualquier monto.
        let c = credito(100_000, 100_000, EstadoCredito::Pagado);
        assert_eq!(c.saldo_pendiente, Decimal::ZERO);
        let err = planear_abonos(Decimal::ZERO, c.saldo_pendiente, &[abono(1, 1)]).unwrap_err();
        match err {
            AppError::Validacion(msg) => assert!(msg.contains("supera el saldo pendiente")),
            otro => panic!("se esperaba Validacion, vino {:?}", otro),
        }
    }

    #[test]
    fn resumen_pliega_totales_estados_y_fechas() {
        let mut c1 = credito(100_000, 50_000, EstadoCredito::Activo);
        c1.fecha_ultimo_pago = Some(Utc.with_ymd_and_hms(2025, 4, 2, 9, 0, 0).unwrap());
        let mut c2 = credito(80_000, 80_000, EstadoCredito::Pagado);
        c2.creado_en = Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap();
        c2.fecha_ultimo_pago = Some(Utc.with_ymd_and_hms(2025, 5, 3, 9, 0, 0).unwrap());
        let c3 = credito(20_000, 0, EstadoCredito::Vencido);

        let resumen = resumir_creditos(&[c1, c2.clone(), c3]);
        assert_eq!(resumen.credito_total, Decimal::from(200_000));
        assert_eq!(resumen.total_abonado, Decimal::from(130_000));
        assert_eq!(resumen.saldo_total, Decimal::from(70_000));
        assert_eq!(resumen.creditos_activos, 1);
        assert_eq!(resumen.creditos_pagados, 1);
        assert_eq!(resumen.creditos_vencidos, 1);
        assert_eq!(resumen.fecha_ultimo_credito, Some(c2.creado_en));
        assert_eq!(resumen.fecha_ultimo_pago, c2.fecha_ultimo_pago);
    }

    #[test]
    fn resumen_es_idempotente() {
        let creditos = vec![
            credito(100_000, 30_000, EstadoCredito::Activo),
            credito(50_000, 50_000, EstadoCredito::Pagado),
        ];
        assert_eq!(resumir_creditos(&creditos), resumir_creditos(&creditos));
    }

    #[test]
    fn resumen_de_cliente_sin_creditos_queda_en_cero() {
        let resumen = resumir_creditos(&[]);
        assert_eq!(resumen.credito_total, Decimal::ZERO);
        assert_eq!(resumen.saldo_total, Decimal::ZERO);
        assert_eq!(resumen.creditos_activos, 0);
        assert_eq!(resumen.fecha_ultimo_credito, None);
    }

    #[test]
    fn devolucion_reduce_principal_sosteniendo_el_invariante() {
        // saldo 40000, devolución 15000 -> saldo 25000, monto = abonado + saldo
        let c = credito(100_000, 60_000, EstadoCredito::Activo);
        let (monto, saldo, estado) =
            reducir_principal_por_devolucion(&c, Decimal::from(15_000));
        assert_eq!(saldo, Decimal::from(25_000));
        assert_eq!(monto, Decimal::from(85_000));
        assert_eq!(monto - c.total_abonado, saldo);
        assert_eq!(estado, EstadoCredito::Activo);
    }

    #[test]
    fn devolucion_mayor_al_saldo_pisa_en_cero_y_paga_el_credito() {
        let c = credito(100_000, 60_000, EstadoCredito::Vencido);
        let (monto, saldo, estado) =
            reducir_principal_por_devolucion(&c, Decimal::from(55_000));
        assert_eq!(saldo, Decimal::ZERO);
        assert_eq!(monto, c.total_abonado);
        assert_eq!(estado, EstadoCredito::Pagado);
    }
}
