// src/db/creditos_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::creditos::{Credito, EstadoCredito, ResumenCalculado, ResumenCreditoCliente},
};

#[derive(Clone)]
pub struct CreditosRepository {
    pool: PgPool,
}

impl CreditosRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn crear_credito<'e, E>(
        &self,
        executor: E,
        venta_id: Uuid,
        cliente_id: Uuid,
        monto_total: Decimal,
        fecha_vencimiento: NaiveDate,
    ) -> Result<Credito, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // saldo_pendiente arranca igual al principal (total_abonado = 0).
        let credito = sqlx::query_as::<_, Credito>(
            r#"
            INSERT INTO creditos (venta_id, cliente_id, monto_total, saldo_pendiente, fecha_vencimiento)
            VALUES ($1, $2, $3, $3, $4)
            RETURNING *
            "#,
        )
        .bind(venta_id)
        .bind(cliente_id)
        .bind(monto_total)
        .bind(fecha_vencimiento)
        .fetch_one(executor)
        .await?;

        Ok(credito)
    }

    /// Lectura plana, directo al pool. Los caminos que mutan usan la
    /// variante bloqueada.
    pub async fn obtener_credito(&self, credito_id: Uuid) -> Result<Option<Credito>, AppError> {
        let credito = sqlx::query_as::<_, Credito>("SELECT * FROM creditos WHERE id = $1")
            .bind(credito_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(credito)
    }

    /// Bloqueo de fila: dos abonos concurrentes al mismo crédito se
    /// serializan, sosteniendo el invariante saldo_pendiente >= 0.
    pub async fn obtener_credito_bloqueado<'e, E>(
        &self,
        executor: E,
        credito_id: Uuid,
    ) -> Result<Option<Credito>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let credito =
            sqlx::query_as::<_, Credito>("SELECT * FROM creditos WHERE id = $1 FOR UPDATE")
                .bind(credito_id)
                .fetch_optional(executor)
                .await?;
        Ok(credito)
    }

    pub async fn obtener_por_venta_bloqueado<'e, E>(
        &self,
        executor: E,
        venta_id: Uuid,
    ) -> Result<Option<Credito>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let credito =
            sqlx::query_as::<_, Credito>("SELECT * FROM creditos WHERE venta_id = $1 FOR UPDATE")
                .bind(venta_id)
                .fetch_optional(executor)
                .await?;
        Ok(credito)
    }

    pub async fn listar_por_cliente<'e, E>(
        &self,
        executor: E,
        cliente_id: Uuid,
    ) -> Result<Vec<Credito>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let creditos = sqlx::query_as::<_, Credito>(
            "SELECT * FROM creditos WHERE cliente_id = $1 ORDER BY creado_en ASC",
        )
        .bind(cliente_id)
        .fetch_all(executor)
        .await?;
        Ok(creditos)
    }

    /// Aplica el agregado de un lote de abonos sobre los contadores del
    /// crédito. El estado pasa a `pagado` si el saldo llega a cero;
    /// si no, conserva el que tenía (activo o vencido).
    pub async fn aplicar_abono<'e, E>(
        &self,
        executor: E,
        credito_id: Uuid,
        monto: Decimal,
        observaciones: Option<&str>,
    ) -> Result<Credito, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let credito = sqlx::query_as::<_, Credito>(
            r#"
            UPDATE creditos
            SET total_abonado = total_abonado + $2,
                saldo_pendiente = saldo_pendiente - $2,
                estado = CASE
                    WHEN saldo_pendiente - $2 <= 0 THEN 'pagado'::estado_credito
                    ELSE estado
                END,
                fecha_ultimo_pago = NOW(),
                observaciones = CASE
                    WHEN $3::TEXT IS NULL THEN observaciones
                    WHEN observaciones IS NULL OR observaciones = '' THEN $3
                    ELSE observaciones || E'\n' || $3
                END,
                actualizado_en = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(credito_id)
        .bind(monto)
        .bind(observaciones)
        .fetch_one(executor)
        .await?;

        Ok(credito)
    }

    /// Reducción de principal por devolución procesada. Los valores ya
    /// vienen calculados por el service (piso en total_abonado).
    pub async fn reducir_principal<'e, E>(
        &self,
        executor: E,
        credito_id: Uuid,
        nuevo_monto_total: Decimal,
        nuevo_saldo: Decimal,
        estado: EstadoCredito,
    ) -> Result<Credito, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let credito = sqlx::query_as::<_, Credito>(
            r#"
            UPDATE creditos
            SET monto_total = $2,
                saldo_pendiente = $3,
                estado = $4,
                actualizado_en = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(credito_id)
        .bind(nuevo_monto_total)
        .bind(nuevo_saldo)
        .bind(estado)
        .fetch_one(executor)
        .await?;

        Ok(credito)
    }

    /// Marca como vencidos los créditos activos con fecha superada.
    /// La marca es derivada: se refresca perezosamente antes de cada
    /// recálculo de resumen.
    pub async fn marcar_vencidos<'e, E>(
        &self,
        executor: E,
        cliente_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let resultado = sqlx::query(
            r#"
            UPDATE creditos
            SET estado = 'vencido', actualizado_en = NOW()
            WHERE cliente_id = $1 AND estado = 'activo' AND fecha_vencimiento < CURRENT_DATE
            "#,
        )
        .bind(cliente_id)
        .execute(executor)
        .await?;
        Ok(resultado.rows_affected())
    }

    pub async fn obtener_resumen<'e, E>(
        &self,
        executor: E,
        cliente_id: Uuid,
    ) -> Result<Option<ResumenCreditoCliente>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let resumen = sqlx::query_as::<_, ResumenCreditoCliente>(
            "SELECT * FROM resumen_credito_clientes WHERE cliente_id = $1",
        )
        .bind(cliente_id)
        .fetch_optional(executor)
        .await?;
        Ok(resumen)
    }

    /// UPSERT del resumen recalculado. `limite_credito` no aparece en el
    /// SET: se configura aparte y sobrevive a los recálculos.
    pub async fn upsert_resumen<'e, E>(
        &self,
        executor: E,
        cliente_id: Uuid,
        calculo: &ResumenCalculado,
    ) -> Result<ResumenCreditoCliente, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let resumen = sqlx::query_as::<_, ResumenCreditoCliente>(
            r#"
            INSERT INTO resumen_credito_clientes (
                cliente_id, credito_total, total_abonado, saldo_total,
                creditos_activos, creditos_vencidos, creditos_pagados,
                fecha_ultimo_credito, fecha_ultimo_pago, actualizado_en
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())
            ON CONFLICT (cliente_id)
            DO UPDATE SET
                credito_total = $2,
                total_abonado = $3,
                saldo_total = $4,
                creditos_activos = $5,
                creditos_vencidos = $6,
                creditos_pagados = $7,
                fecha_ultimo_credito = $8,
                fecha_ultimo_pago = $9,
                actualizado_en = NOW()
            RETURNING *
            "#,
        )
        .bind(cliente_id)
        .bind(calculo.credito_total)
        .bind(calculo.total_abonado)
        .bind(calculo.saldo_total)
        .bind(calculo.creditos_activos)
        .bind(calculo.creditos_vencidos)
        .bind(calculo.creditos_pagados)
        .bind(calculo.fecha_ultimo_credito)
        .bind(calculo.fecha_ultimo_pago)
        .fetch_one(executor)
        .await?;

        Ok(resumen)
    }
}
