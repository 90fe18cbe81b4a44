// src/db/inventario_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::inventario::{MovimientoInventario, OrigenMovimiento, TipoMovimiento, Variante},
};

#[derive(Clone)]
pub struct InventarioRepository {
    pool: PgPool,
}

impl InventarioRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn obtener_variante<'e, E>(
        &self,
        executor: E,
        variante_id: Uuid,
    ) -> Result<Option<Variante>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let variante = sqlx::query_as::<_, Variante>("SELECT * FROM variantes WHERE id = $1")
            .bind(variante_id)
            .fetch_optional(executor)
            .await?;
        Ok(variante)
    }

    /// Aplica un delta de stock en UNA sola sentencia atómica
    /// (`stock = stock + delta`), sin ventana de lectura-escritura.
    /// Devuelve el par (stock_antes, stock_despues), o None si el UPDATE
    /// no tocó fila alguna: variante inexistente, o delta que dejaría el
    /// stock negativo sin `permitir_negativo`.
    pub async fn aplicar_delta_stock<'e, E>(
        &self,
        executor: E,
        variante_id: Uuid,
        delta: i32,
        permitir_negativo: bool,
    ) -> Result<Option<(i32, i32)>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let stock_despues = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE variantes
            SET stock = stock + $2, actualizado_en = NOW()
            WHERE id = $1 AND ($3 OR stock + $2 >= 0)
            RETURNING stock
            "#,
        )
        .bind(variante_id)
        .bind(delta)
        .bind(permitir_negativo)
        .fetch_optional(executor)
        .await?;

        Ok(stock_despues.map(|despues| (despues - delta, despues)))
    }

    /// Inserta una fila en el libro mayor (auditoría). Append-only:
    /// no existe UPDATE ni DELETE sobre movimientos_inventario.
    pub async fn registrar_movimiento<'e, E>(
        &self,
        executor: E,
        variante_id: Uuid,
        tipo: TipoMovimiento,
        cantidad: i32,
        stock_antes: i32,
        stock_despues: i32,
        origen: Option<OrigenMovimiento>,
        usuario_id: Uuid,
        motivo: Option<&str>,
    ) -> Result<MovimientoInventario, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let movimiento = sqlx::query_as::<_, MovimientoInventario>(
            r#"
            INSERT INTO movimientos_inventario (
                variante_id, tipo, cantidad, stock_antes, stock_despues,
                origen_tipo, origen_id, usuario_id, motivo
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(variante_id)
        .bind(tipo)
        .bind(cantidad)
        .bind(stock_antes)
        .bind(stock_despues)
        .bind(origen.map(|o| o.tipo))
        .bind(origen.map(|o| o.id))
        .bind(usuario_id)
        .bind(motivo)
        .fetch_one(executor)
        .await?;

        Ok(movimiento)
    }

    /// Historial completo del libro mayor, opcionalmente de una sola
    /// variante. Lectura plana: va directo al pool, sin transacción.
    pub async fn listar_movimientos(
        &self,
        variante_id: Option<Uuid>,
    ) -> Result<Vec<MovimientoInventario>, AppError> {
        let movimientos = sqlx::query_as::<_, MovimientoInventario>(
            r#"
            SELECT * FROM movimientos_inventario
            WHERE ($1::UUID IS NULL OR variante_id = $1)
            ORDER BY creado_en ASC, id ASC
            "#,
        )
        .bind(variante_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movimientos)
    }
}
