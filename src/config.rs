// src/config.rs

use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{env, time::Duration};

use crate::{
    db::{DeliveryRepository, ReceiptRepository, UserRepository},
    services::{
        auth::AuthService,
        delivery_service::DeliveryService,
        matching_service::MatchingService,
        pricing::{PricingConfig, PricingService},
        receipt_service::ReceiptService,
    },
};

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_secret: String,
    pub auth_service: AuthService,
    pub delivery_service: DeliveryService,
    pub user_repo: UserRepository,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET deve ser definido");

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let user_repo = UserRepository::new(db_pool.clone());
        let delivery_repo = DeliveryRepository::new(db_pool.clone());
        let receipt_repo = ReceiptRepository::new(db_pool.clone());

        let auth_service = AuthService::new(user_repo.clone(), jwt_secret.clone());
        let pricing_service = PricingService::new(PricingConfig::from_env());
        let matching_service = MatchingService::new(user_repo.clone());
        let receipt_service = ReceiptService::new();

        let delivery_service = DeliveryService::new(
            delivery_repo,
            receipt_repo,
            user_repo.clone(),
            matching_service,
            pricing_service,
            receipt_service,
            db_pool.clone(),
        );

        Ok(Self {
            db_pool,
            jwt_secret,
            auth_service,
            delivery_service,
            user_repo,
        })
    }
}
