// src/db/user_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::auth::{CourierCandidate, User},
};

// O repositório de usuários, responsável por todas as interações com a
// tabela 'users'. O cadastro em si é do serviço de identidade; aqui só
// lemos e ajustamos os campos que o núcleo de entregas controla
// (disponibilidade, carteira, contadores).
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca um usuário pelo seu ID (usa a pool principal)
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let maybe_user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(maybe_user)
    }

    // Mesma busca, mas dentro de uma transação em andamento
    pub async fn find_by_id_tx<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let maybe_user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(maybe_user)
    }

    // Motoboys disponíveis na cidade, com a carga atual de entregas.
    // A ordenação final (mérito) é responsabilidade do MatchingService.
    pub async fn find_available_couriers<'e, E>(
        &self,
        executor: E,
        city: &str,
    ) -> Result<Vec<CourierCandidate>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let candidates = sqlx::query_as::<_, CourierCandidate>(
            r#"
            SELECT
                u.id,
                u.name,
                u.ranking_score,
                u.created_at,
                (
                    SELECT COUNT(*)
                    FROM deliveries d
                    WHERE d.motoboy_id = u.id
                      AND d.status NOT IN ('delivered', 'cancelled', 'client_not_found')
                ) AS active_deliveries
            FROM users u
            WHERE u.user_type = 'motoboy'
              AND u.is_available = TRUE
              AND u.base_city = $1
            "#,
        )
        .bind(city)
        .fetch_all(executor)
        .await?;
        Ok(candidates)
    }

    // Reserva atômica do motoboy (compare-and-swap na disponibilidade).
    // Retorna false quando outra entrega levou o motoboy primeiro.
    pub async fn try_reserve<'e, E>(&self, executor: E, motoboy_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_available = FALSE, updated_at = NOW()
            WHERE id = $1 AND is_available = TRUE
            "#,
        )
        .bind(motoboy_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn set_availability<'e, E>(
        &self,
        executor: E,
        motoboy_id: Uuid,
        available: bool,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE users SET is_available = $2, updated_at = NOW() WHERE id = $1")
            .bind(motoboy_id)
            .bind(available)
            .execute(executor)
            .await?;
        Ok(())
    }

    // Débito condicionado ao saldo: retorna false quando a carteira não
    // cobre o valor (o saldo pode ter mudado entre a checagem e o débito).
    pub async fn debit_wallet<'e, E>(
        &self,
        executor: E,
        lojista_id: Uuid,
        amount: Decimal,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET wallet_balance = wallet_balance - $2, updated_at = NOW()
            WHERE id = $1 AND wallet_balance >= $2
            "#,
        )
        .bind(lojista_id)
        .bind(amount)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn increment_total_deliveries<'e, E>(
        &self,
        executor: E,
        motoboy_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE users SET total_deliveries = total_deliveries + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(motoboy_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    // Ranking público de motoboys, opcionalmente filtrado por cidade
    pub async fn top_ranked(&self, city: Option<&str>, limit: i64) -> Result<Vec<User>, AppError> {
        let users = match city {
            Some(city) => {
                sqlx::query_as::<_, User>(
                    r#"
                    SELECT * FROM users
                    WHERE user_type = 'motoboy' AND base_city = $1
                    ORDER BY ranking_score DESC
                    LIMIT $2
                    "#,
                )
                .bind(city)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, User>(
                    r#"
                    SELECT * FROM users
                    WHERE user_type = 'motoboy'
                    ORDER BY ranking_score DESC
                    LIMIT $1
                    "#,
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(users)
    }
}
