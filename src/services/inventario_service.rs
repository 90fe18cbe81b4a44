// src/services/inventario_service.rs

use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::InventarioRepository,
    models::inventario::{MovimientoInventario, OrigenMovimiento, TipoMovimiento, Variante},
};

/// Accesor de stock + libro mayor de inventario.
///
/// Toda mutación de stock pasa por aquí: el delta atómico y el asiento en
/// movimientos_inventario se escriben dentro de la misma transacción que
/// el resto de los cambios del caller (los otros services nos pasan su
/// `&mut *tx`; el begin() interno crea un savepoint sobre ella).
#[derive(Clone)]
pub struct InventarioService {
    repo: InventarioRepository,
}

impl InventarioService {
    pub fn new(repo: InventarioRepository) -> Self {
        Self { repo }
    }

    pub async fn obtener_variante<'e, E>(
        &self,
        executor: E,
        variante_id: Uuid,
    ) -> Result<Variante, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .obtener_variante(executor, variante_id)
            .await?
            .ok_or_else(|| AppError::NoEncontrado(format!("La variante {} no existe.", variante_id)))
    }

    /// Aplica `delta` al stock de la variante y registra el movimiento
    /// correspondiente, todo en una unidad atómica.
    ///
    /// Un delta que dejaría el stock por debajo de cero se rechaza con
    /// `Validacion`, salvo que `permitir_negativo` venga explícito.
    pub async fn mover_stock<'e, E>(
        &self,
        executor: E,
        variante_id: Uuid,
        tipo: TipoMovimiento,
        delta: i32,
        origen: Option<OrigenMovimiento>,
        usuario_id: Uuid,
        motivo: Option<&str>,
        permitir_negativo: bool,
    ) -> Result<MovimientoInventario, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        // La lectura es solo para diagnóstico (nombre y stock actual en el
        // mensaje): el guardián real es el UPDATE atómico de abajo.
        let variante = self
            .repo
            .obtener_variante(&mut *tx, variante_id)
            .await?
            .ok_or_else(|| {
                AppError::NoEncontrado(format!("La variante {} no existe.", variante_id))
            })?;

        let (stock_antes, stock_despues) = self
            .repo
            .aplicar_delta_stock(&mut *tx, variante_id, delta, permitir_negativo)
            .await?
            .ok_or_else(|| {
                AppError::Validacion(format!(
                    "Stock insuficiente para '{}': stock actual {}, delta solicitado {}.",
                    variante.nombre, variante.stock, delta
                ))
            })?;

        let movimiento = self
            .repo
            .registrar_movimiento(
                &mut *tx,
                variante_id,
                tipo,
                delta,
                stock_antes,
                stock_despues,
                origen,
                usuario_id,
                motivo,
            )
            .await?;

        tx.commit().await?;
        Ok(movimiento)
    }

    /// Ajuste manual de stock (tipo `ajuste`, sin documento de origen).
    /// El motivo es obligatorio: es lo único que explica el asiento.
    pub async fn ajustar_stock<'e, E>(
        &self,
        executor: E,
        variante_id: Uuid,
        delta: i32,
        motivo: &str,
        usuario_id: Uuid,
        permitir_negativo: bool,
    ) -> Result<MovimientoInventario, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        if delta == 0 {
            return Err(AppError::Validacion(
                "El ajuste debe tener una cantidad distinta de cero.".into(),
            ));
        }
        if motivo.trim().is_empty() {
            return Err(AppError::Validacion(
                "El ajuste manual requiere un motivo.".into(),
            ));
        }

        let movimiento = self
            .mover_stock(
                executor,
                variante_id,
                TipoMovimiento::Ajuste,
                delta,
                None,
                usuario_id,
                Some(motivo),
                permitir_negativo,
            )
            .await?;

        tracing::info!(
            variante = %variante_id,
            delta,
            "ajuste manual de stock registrado"
        );
        Ok(movimiento)
    }

    pub async fn listar_movimientos(
        &self,
        variante_id: Option<Uuid>,
    ) -> Result<Vec<MovimientoInventario>, AppError> {
        self.repo.listar_movimientos(variante_id).await
    }
}
