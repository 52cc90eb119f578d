// src/db/receipt_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::receipt::DeliveryReceipt};

#[derive(Clone)]
pub struct ReceiptRepository {
    pool: PgPool,
}

impl ReceiptRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Grava o comprovante. O UNIQUE em delivery_id garante "um por
    // entrega" mesmo se dois finalizadores disputarem.
    pub async fn insert<'e, E>(
        &self,
        executor: E,
        receipt: &DeliveryReceipt,
    ) -> Result<DeliveryReceipt, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let saved = sqlx::query_as::<_, DeliveryReceipt>(
            r#"
            INSERT INTO delivery_receipts (
                id, delivery_id, loja_id, motoboy_id, loja_name, motoboy_name,
                recipient_info, product_description, pickup_address, delivery_address,
                matched_at, pickup_confirmed_at, delivered_at,
                matched_to_pickup_minutes, pickup_to_delivery_minutes,
                distance_km, base_price, distance_fee, waiting_fee,
                platform_fee, total_price, motoboy_earnings, created_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                $14, $15, $16, $17, $18, $19, $20, $21, $22, $23
            )
            RETURNING *
            "#,
        )
        .bind(receipt.id)
        .bind(receipt.delivery_id)
        .bind(receipt.loja_id)
        .bind(receipt.motoboy_id)
        .bind(&receipt.loja_name)
        .bind(&receipt.motoboy_name)
        .bind(&receipt.recipient_info)
        .bind(receipt.product_description.as_deref())
        .bind(&receipt.pickup_address)
        .bind(&receipt.delivery_address)
        .bind(receipt.matched_at)
        .bind(receipt.pickup_confirmed_at)
        .bind(receipt.delivered_at)
        .bind(receipt.matched_to_pickup_minutes)
        .bind(receipt.pickup_to_delivery_minutes)
        .bind(receipt.distance_km)
        .bind(receipt.base_price)
        .bind(receipt.distance_fee)
        .bind(receipt.waiting_fee)
        .bind(receipt.platform_fee)
        .bind(receipt.total_price)
        .bind(receipt.motoboy_earnings)
        .bind(receipt.created_at)
        .fetch_one(executor)
        .await?;
        Ok(saved)
    }

    pub async fn find_by_delivery_id(
        &self,
        delivery_id: Uuid,
    ) -> Result<Option<DeliveryReceipt>, AppError> {
        let maybe_receipt = sqlx::query_as::<_, DeliveryReceipt>(
            "SELECT * FROM delivery_receipts WHERE delivery_id = $1",
        )
        .bind(delivery_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_receipt)
    }
}
