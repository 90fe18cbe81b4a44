// src/db/ventas_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::ventas::{
        EstadoPagoVenta, Pago, TipoPago, TipoVenta, Venta, VentaConDetalles, VentaDetalle,
    },
};

#[derive(Clone)]
pub struct VentasRepository {
    pool: PgPool,
}

impl VentasRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn existe_cliente<'e, E>(
        &self,
        executor: E,
        cliente_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let existe =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM clientes WHERE id = $1)")
                .bind(cliente_id)
                .fetch_one(executor)
                .await?;
        Ok(existe)
    }

    /// El método de pago es una foreign key opaca: solo validamos que exista.
    pub async fn existe_metodo_pago<'e, E>(
        &self,
        executor: E,
        metodo_pago_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let existe = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM metodos_pago WHERE id = $1)",
        )
        .bind(metodo_pago_id)
        .fetch_one(executor)
        .await?;
        Ok(existe)
    }

    pub async fn crear_venta<'e, E>(
        &self,
        executor: E,
        cliente_id: Uuid,
        usuario_id: Uuid,
        tipo_venta: TipoVenta,
        subtotal: Decimal,
        impuesto: Decimal,
        total: Decimal,
        total_pagado: Decimal,
        saldo_pendiente: Decimal,
        estado_pago: EstadoPagoVenta,
    ) -> Result<Venta, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let venta = sqlx::query_as::<_, Venta>(
            r#"
            INSERT INTO ventas (
                cliente_id, usuario_id, numero, tipo_venta,
                subtotal, impuesto, total,
                total_pagado, saldo_pendiente, estado_pago
            )
            VALUES (
                $1, $2,
                'VT-' || LPAD(nextval('numero_venta_seq')::TEXT, 6, '0'),
                $3, $4, $5, $6, $7, $8, $9
            )
            RETURNING *
            "#,
        )
        .bind(cliente_id)
        .bind(usuario_id)
        .bind(tipo_venta)
        .bind(subtotal)
        .bind(impuesto)
        .bind(total)
        .bind(total_pagado)
        .bind(saldo_pendiente)
        .bind(estado_pago)
        .fetch_one(executor)
        .await?;

        Ok(venta)
    }

    pub async fn crear_detalle<'e, E>(
        &self,
        executor: E,
        venta_id: Uuid,
        variante_id: Uuid,
        cantidad: i32,
        precio_unitario: Decimal,
        subtotal: Decimal,
    ) -> Result<VentaDetalle, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let detalle = sqlx::query_as::<_, VentaDetalle>(
            r#"
            INSERT INTO venta_detalles (venta_id, variante_id, cantidad, precio_unitario, subtotal)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(venta_id)
        .bind(variante_id)
        .bind(cantidad)
        .bind(precio_unitario)
        .bind(subtotal)
        .fetch_one(executor)
        .await?;

        Ok(detalle)
    }

    /// Lectura plana de la venta con sus líneas, directo al pool.
    pub async fn obtener_con_detalles(
        &self,
        venta_id: Uuid,
    ) -> Result<Option<VentaConDetalles>, AppError> {
        let venta = sqlx::query_as::<_, Venta>("SELECT * FROM ventas WHERE id = $1")
            .bind(venta_id)
            .fetch_optional(&self.pool)
            .await?;

        match venta {
            Some(venta) => {
                let detalles = self.listar_detalles(&self.pool, venta_id).await?;
                Ok(Some(VentaConDetalles { venta, detalles }))
            }
            None => Ok(None),
        }
    }

    pub async fn obtener_venta_bloqueada<'e, E>(
        &self,
        executor: E,
        venta_id: Uuid,
    ) -> Result<Option<Venta>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let venta = sqlx::query_as::<_, Venta>("SELECT * FROM ventas WHERE id = $1 FOR UPDATE")
            .bind(venta_id)
            .fetch_optional(executor)
            .await?;
        Ok(venta)
    }

    pub async fn listar_detalles<'e, E>(
        &self,
        executor: E,
        venta_id: Uuid,
    ) -> Result<Vec<VentaDetalle>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let detalles = sqlx::query_as::<_, VentaDetalle>(
            "SELECT * FROM venta_detalles WHERE venta_id = $1 ORDER BY id ASC",
        )
        .bind(venta_id)
        .fetch_all(executor)
        .await?;
        Ok(detalles)
    }

    pub async fn crear_pago<'e, E>(
        &self,
        executor: E,
        venta_id: Uuid,
        metodo_pago_id: Uuid,
        tipo_pago: TipoPago,
        monto: Decimal,
        saldo_anterior: Decimal,
        saldo_nuevo: Decimal,
        referencia: Option<&str>,
        usuario_id: Uuid,
    ) -> Result<Pago, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let pago = sqlx::query_as::<_, Pago>(
            r#"
            INSERT INTO pagos (
                venta_id, metodo_pago_id, tipo_pago, monto,
                saldo_anterior, saldo_nuevo, referencia, usuario_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(venta_id)
        .bind(metodo_pago_id)
        .bind(tipo_pago)
        .bind(monto)
        .bind(saldo_anterior)
        .bind(saldo_nuevo)
        .bind(referencia)
        .bind(usuario_id)
        .fetch_one(executor)
        .await?;

        Ok(pago)
    }

    /// Aplica el agregado de un lote de pagos sobre los contadores de la
    /// venta, y recalcula el estado de pago en la misma sentencia.
    pub async fn aplicar_pago<'e, E>(
        &self,
        executor: E,
        venta_id: Uuid,
        monto: Decimal,
    ) -> Result<Venta, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let venta = sqlx::query_as::<_, Venta>(
            r#"
            UPDATE ventas
            SET total_pagado = total_pagado + $2,
                saldo_pendiente = saldo_pendiente - $2,
                estado_pago = CASE
                    WHEN saldo_pendiente - $2 <= 0 THEN 'pagado'::estado_pago_venta
                    ELSE 'parcial'::estado_pago_venta
                END,
                actualizado_en = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(venta_id)
        .bind(monto)
        .fetch_one(executor)
        .await?;

        Ok(venta)
    }
}
