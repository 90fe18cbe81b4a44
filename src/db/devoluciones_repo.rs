// src/db/devoluciones_repo.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::devoluciones::{
        Devolucion, DevolucionConDetalles, DevolucionDetalle, EstadoDevolucion, TipoDevolucion,
    },
};

#[derive(Clone)]
pub struct DevolucionesRepository {
    pool: PgPool,
}

impl DevolucionesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn crear_devolucion<'e, E>(
        &self,
        executor: E,
        venta_id: Uuid,
        cliente_id: Uuid,
        tipo: TipoDevolucion,
        motivo: &str,
        subtotal: Decimal,
        total: Decimal,
    ) -> Result<Devolucion, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let devolucion = sqlx::query_as::<_, Devolucion>(
            r#"
            INSERT INTO devoluciones (venta_id, cliente_id, numero, tipo, estado, motivo, subtotal, total)
            VALUES (
                $1, $2,
                'DEV-' || LPAD(nextval('numero_devolucion_seq')::TEXT, 6, '0'),
                $3, 'pendiente', $4, $5, $6
            )
            RETURNING *
            "#,
        )
        .bind(venta_id)
        .bind(cliente_id)
        .bind(tipo)
        .bind(motivo)
        .bind(subtotal)
        .bind(total)
        .fetch_one(executor)
        .await?;

        Ok(devolucion)
    }

    pub async fn crear_detalle<'e, E>(
        &self,
        executor: E,
        devolucion_id: Uuid,
        venta_detalle_id: Uuid,
        variante_id: Uuid,
        cantidad: i32,
        precio_unitario: Decimal,
        subtotal: Decimal,
    ) -> Result<DevolucionDetalle, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let detalle = sqlx::query_as::<_, DevolucionDetalle>(
            r#"
            INSERT INTO devolucion_detalles (
                devolucion_id, venta_detalle_id, variante_id,
                cantidad, precio_unitario, subtotal
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(devolucion_id)
        .bind(venta_detalle_id)
        .bind(variante_id)
        .bind(cantidad)
        .bind(precio_unitario)
        .bind(subtotal)
        .fetch_one(executor)
        .await?;

        Ok(detalle)
    }

    /// Lectura plana de la devolución con sus líneas, directo al pool.
    pub async fn obtener_con_detalles(
        &self,
        devolucion_id: Uuid,
    ) -> Result<Option<DevolucionConDetalles>, AppError> {
        let devolucion =
            sqlx::query_as::<_, Devolucion>("SELECT * FROM devoluciones WHERE id = $1")
                .bind(devolucion_id)
                .fetch_optional(&self.pool)
                .await?;

        match devolucion {
            Some(devolucion) => {
                let detalles = self.listar_detalles(&self.pool, devolucion_id).await?;
                Ok(Some(DevolucionConDetalles { devolucion, detalles }))
            }
            None => Ok(None),
        }
    }

    pub async fn obtener_devolucion_bloqueada<'e, E>(
        &self,
        executor: E,
        devolucion_id: Uuid,
    ) -> Result<Option<Devolucion>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let devolucion =
            sqlx::query_as::<_, Devolucion>("SELECT * FROM devoluciones WHERE id = $1 FOR UPDATE")
                .bind(devolucion_id)
                .fetch_optional(executor)
                .await?;
        Ok(devolucion)
    }

    pub async fn listar_detalles<'e, E>(
        &self,
        executor: E,
        devolucion_id: Uuid,
    ) -> Result<Vec<DevolucionDetalle>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let detalles = sqlx::query_as::<_, DevolucionDetalle>(
            "SELECT * FROM devolucion_detalles WHERE devolucion_id = $1 ORDER BY id ASC",
        )
        .bind(devolucion_id)
        .fetch_all(executor)
        .await?;
        Ok(detalles)
    }

    /// Cuánto ya se devolvió contra cada línea de la venta, sumando las
    /// solicitudes no rechazadas. Impide devolver dos veces las mismas
    /// unidades repartidas en varias solicitudes.
    pub async fn cantidades_devueltas<'e, E>(
        &self,
        executor: E,
        venta_id: Uuid,
    ) -> Result<Vec<(Uuid, i64)>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let filas = sqlx::query_as::<_, (Uuid, i64)>(
            r#"
            SELECT dd.venta_detalle_id, COALESCE(SUM(dd.cantidad), 0)
            FROM devolucion_detalles dd
            JOIN devoluciones d ON d.id = dd.devolucion_id
            WHERE d.venta_id = $1 AND d.estado <> 'rechazada'
            GROUP BY dd.venta_detalle_id
            "#,
        )
        .bind(venta_id)
        .fetch_all(executor)
        .await?;
        Ok(filas)
    }

    pub async fn actualizar_estado<'e, E>(
        &self,
        executor: E,
        devolucion_id: Uuid,
        estado: EstadoDevolucion,
        fecha_procesada: Option<DateTime<Utc>>,
    ) -> Result<Devolucion, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let devolucion = sqlx::query_as::<_, Devolucion>(
            r#"
            UPDATE devoluciones
            SET estado = $2,
                fecha_procesada = COALESCE($3, fecha_procesada),
                actualizado_en = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(devolucion_id)
        .bind(estado)
        .bind(fecha_procesada)
        .fetch_one(executor)
        .await?;

        Ok(devolucion)
    }
}
