// src/db/delivery_repo.rs

use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        auth::{User, UserType},
        delivery::{Address, Delivery, RecipientInfo},
    },
};

#[derive(Clone)]
pub struct DeliveryRepository {
    pool: PgPool,
}

impl DeliveryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create<'e, E>(
        &self,
        executor: E,
        lojista_id: Uuid,
        pickup_address: &Address,
        delivery_address: &Address,
        recipient_info: &RecipientInfo,
        product_description: Option<&str>,
        distance_km: Decimal,
        base_price: Decimal,
        distance_fee: Decimal,
        total_price: Decimal,
        platform_fee: Decimal,
        motoboy_earnings: Decimal,
    ) -> Result<Delivery, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let delivery = sqlx::query_as::<_, Delivery>(
            r#"
            INSERT INTO deliveries (
                lojista_id, pickup_address, delivery_address, recipient_info,
                product_description, distance_km, base_price, distance_fee,
                total_price, platform_fee, motoboy_earnings
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(lojista_id)
        .bind(Json(pickup_address))
        .bind(Json(delivery_address))
        .bind(Json(recipient_info))
        .bind(product_description)
        .bind(distance_km)
        .bind(base_price)
        .bind(distance_fee)
        .bind(total_price)
        .bind(platform_fee)
        .bind(motoboy_earnings)
        .fetch_one(executor)
        .await?;
        Ok(delivery)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Delivery>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let maybe_delivery =
            sqlx::query_as::<_, Delivery>("SELECT * FROM deliveries WHERE id = $1")
                .bind(id)
                .fetch_optional(executor)
                .await?;
        Ok(maybe_delivery)
    }

    // Leitura com lock de linha: toda mutação de entrega (status, PIN,
    // espera) passa por aqui dentro de uma transação, de modo que dois
    // chamadores simultâneos se serializam por entrega.
    pub async fn find_by_id_for_update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<Delivery>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let maybe_delivery =
            sqlx::query_as::<_, Delivery>("SELECT * FROM deliveries WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(executor)
                .await?;
        Ok(maybe_delivery)
    }

    // Persiste o estado mutável de uma entrega de uma vez só (status,
    // atribuição, valores e bloco de PIN). Um único UPDATE: ou grava
    // tudo, ou nada.
    pub async fn update_state<'e, E>(
        &self,
        executor: E,
        delivery: &Delivery,
    ) -> Result<Delivery, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let updated = sqlx::query_as::<_, Delivery>(
            r#"
            UPDATE deliveries SET
                motoboy_id = $2,
                status = $3,
                matched_at = $4,
                pickup_confirmed_at = $5,
                delivered_at = $6,
                waiting_minutes = $7,
                base_price = $8,
                distance_fee = $9,
                waiting_fee = $10,
                total_price = $11,
                platform_fee = $12,
                motoboy_earnings = $13,
                pin_completo = $14,
                pin_confirmacao = $15,
                pin_tentativas = $16,
                pin_bloqueado = $17,
                pin_validado_com_sucesso = $18,
                pin_validado_em = $19
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(delivery.id)
        .bind(delivery.motoboy_id)
        .bind(delivery.status)
        .bind(delivery.matched_at)
        .bind(delivery.pickup_confirmed_at)
        .bind(delivery.delivered_at)
        .bind(delivery.waiting_minutes)
        .bind(delivery.base_price)
        .bind(delivery.distance_fee)
        .bind(delivery.waiting_fee)
        .bind(delivery.total_price)
        .bind(delivery.platform_fee)
        .bind(delivery.motoboy_earnings)
        .bind(delivery.pin_completo.as_deref())
        .bind(delivery.pin_confirmacao.as_deref())
        .bind(delivery.pin_tentativas)
        .bind(delivery.pin_bloqueado)
        .bind(delivery.pin_validado_com_sucesso)
        .bind(delivery.pin_validado_em)
        .fetch_one(executor)
        .await?;
        Ok(updated)
    }

    // Listagem por papel: lojista vê o que criou, motoboy o que lhe foi
    // atribuído, admin vê tudo. Mais recentes primeiro.
    pub async fn list_for_user(&self, user: &User) -> Result<Vec<Delivery>, AppError> {
        let deliveries = match user.user_type {
            UserType::Lojista => {
                sqlx::query_as::<_, Delivery>(
                    "SELECT * FROM deliveries WHERE lojista_id = $1 ORDER BY created_at DESC LIMIT 50",
                )
                .bind(user.id)
                .fetch_all(&self.pool)
                .await?
            }
            UserType::Motoboy => {
                sqlx::query_as::<_, Delivery>(
                    "SELECT * FROM deliveries WHERE motoboy_id = $1 ORDER BY created_at DESC LIMIT 50",
                )
                .bind(user.id)
                .fetch_all(&self.pool)
                .await?
            }
            UserType::Admin => {
                sqlx::query_as::<_, Delivery>(
                    "SELECT * FROM deliveries ORDER BY created_at DESC LIMIT 50",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(deliveries)
    }
}
