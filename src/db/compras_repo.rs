// src/db/compras_repo.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::compras::{Compra, CompraConDetalles, CompraDetalle, EstadoCompra},
};

#[derive(Clone)]
pub struct ComprasRepository {
    pool: PgPool,
}

impl ComprasRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn existe_proveedor<'e, E>(
        &self,
        executor: E,
        proveedor_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let existe = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM proveedores WHERE id = $1)",
        )
        .bind(proveedor_id)
        .fetch_one(executor)
        .await?;
        Ok(existe)
    }

    /// El número legible (OC-000123) sale de una secuencia del banco:
    /// cualquier generador que garantice unicidad es suficiente.
    pub async fn crear_compra<'e, E>(
        &self,
        executor: E,
        proveedor_id: Uuid,
        usuario_id: Uuid,
        subtotal: Decimal,
        descuento: Decimal,
        impuesto: Decimal,
        total: Decimal,
        fecha_orden: NaiveDate,
        fecha_entrega_esperada: Option<NaiveDate>,
    ) -> Result<Compra, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let compra = sqlx::query_as::<_, Compra>(
            r#"
            INSERT INTO compras (
                proveedor_id, usuario_id, numero, estado,
                subtotal, descuento, impuesto, total,
                fecha_orden, fecha_entrega_esperada
            )
            VALUES (
                $1, $2,
                'OC-' || LPAD(nextval('numero_compra_seq')::TEXT, 6, '0'),
                'pendiente',
                $3, $4, $5, $6, $7, $8
            )
            RETURNING *
            "#,
        )
        .bind(proveedor_id)
        .bind(usuario_id)
        .bind(subtotal)
        .bind(descuento)
        .bind(impuesto)
        .bind(total)
        .bind(fecha_orden)
        .bind(fecha_entrega_esperada)
        .fetch_one(executor)
        .await?;

        Ok(compra)
    }

    pub async fn crear_detalle<'e, E>(
        &self,
        executor: E,
        compra_id: Uuid,
        variante_id: Uuid,
        cantidad: i32,
        precio_unitario: Decimal,
        descuento: Decimal,
        subtotal: Decimal,
        total: Decimal,
    ) -> Result<CompraDetalle, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let detalle = sqlx::query_as::<_, CompraDetalle>(
            r#"
            INSERT INTO compra_detalles (
                compra_id, variante_id, cantidad, precio_unitario,
                descuento, subtotal, total
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(compra_id)
        .bind(variante_id)
        .bind(cantidad)
        .bind(precio_unitario)
        .bind(descuento)
        .bind(subtotal)
        .bind(total)
        .fetch_one(executor)
        .await?;

        Ok(detalle)
    }

    /// Lectura plana de la orden con sus líneas, directo al pool.
    pub async fn obtener_con_detalles(
        &self,
        compra_id: Uuid,
    ) -> Result<Option<CompraConDetalles>, AppError> {
        let compra = sqlx::query_as::<_, Compra>("SELECT * FROM compras WHERE id = $1")
            .bind(compra_id)
            .fetch_optional(&self.pool)
            .await?;

        match compra {
            Some(compra) => {
                let detalles = self.listar_detalles(&self.pool, compra_id).await?;
                Ok(Some(CompraConDetalles { compra, detalles }))
            }
            None => Ok(None),
        }
    }

    /// Lectura con bloqueo de fila: dos recepciones concurrentes de la
    /// misma compra se serializan en vez de correr sobre valores viejos.
    pub async fn obtener_compra_bloqueada<'e, E>(
        &self,
        executor: E,
        compra_id: Uuid,
    ) -> Result<Option<Compra>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let compra =
            sqlx::query_as::<_, Compra>("SELECT * FROM compras WHERE id = $1 FOR UPDATE")
                .bind(compra_id)
                .fetch_optional(executor)
                .await?;
        Ok(compra)
    }

    pub async fn listar_detalles<'e, E>(
        &self,
        executor: E,
        compra_id: Uuid,
    ) -> Result<Vec<CompraDetalle>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let detalles = sqlx::query_as::<_, CompraDetalle>(
            "SELECT * FROM compra_detalles WHERE compra_id = $1 ORDER BY id ASC",
        )
        .bind(compra_id)
        .fetch_all(executor)
        .await?;
        Ok(detalles)
    }

    pub async fn incrementar_recibido<'e, E>(
        &self,
        executor: E,
        detalle_id: Uuid,
        cantidad: i32,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE compra_detalles SET cantidad_recibida = cantidad_recibida + $2 WHERE id = $1",
        )
        .bind(detalle_id)
        .bind(cantidad)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn actualizar_estado<'e, E>(
        &self,
        executor: E,
        compra_id: Uuid,
        estado: EstadoCompra,
        fecha_entrega: Option<DateTime<Utc>>,
    ) -> Result<Compra, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let compra = sqlx::query_as::<_, Compra>(
            r#"
            UPDATE compras
            SET estado = $2,
                fecha_entrega = COALESCE($3, fecha_entrega),
                actualizado_en = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(compra_id)
        .bind(estado)
        .bind(fecha_entrega)
        .fetch_one(executor)
        .await?;

        Ok(compra)
    }
}
