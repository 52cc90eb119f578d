// src/models/auth.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Papel do usuário na plataforma. O cadastro/emissão de token é feito
// pelo serviço de identidade; aqui só consumimos o papel já atribuído.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Lojista,
    Motoboy,
    Admin,
}

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub user_type: UserType,

    // Campos de motoboy
    pub base_city: Option<String>,
    pub ranking_score: i32,
    pub total_deliveries: i32,
    pub is_available: bool,

    // Campos de lojista (carteira simples, sem razão contábil)
    pub wallet_balance: Decimal,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do usuário)
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}

// Foto instantânea de um motoboy candidato ao matching: além dos dados
// cadastrais, traz a carga atual (entregas não-terminais atribuídas).
#[derive(Debug, Clone, FromRow)]
pub struct CourierCandidate {
    pub id: Uuid,
    pub name: String,
    pub ranking_score: i32,
    pub active_deliveries: i64,
    pub created_at: DateTime<Utc>,
}

// Entrada do ranking público de motoboys
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    pub position: i32,
    pub id: Uuid,
    pub name: String,
    pub ranking_score: i32,
    pub total_deliveries: i32,
    pub base_city: Option<String>,
}
