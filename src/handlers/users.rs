// src/handlers/users.rs

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::auth::{RankingEntry, User, UserType},
};

// GET /api/users/profile
#[utoipa::path(
    get,
    path = "/api/users/profile",
    tag = "Users",
    responses(
        (status = 200, description = "Perfil do usuário autenticado", body = User)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_profile(user: AuthenticatedUser) -> Result<impl IntoResponse, AppError> {
    Ok((StatusCode::OK, Json(user.0)))
}

// ---
// Payload: UpdateAvailability
// ---
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAvailabilityPayload {
    #[schema(example = true)]
    pub available: bool,
}

// PUT /api/users/availability
#[utoipa::path(
    put,
    path = "/api/users/availability",
    tag = "Users",
    request_body = UpdateAvailabilityPayload,
    responses(
        (status = 200, description = "Disponibilidade atualizada"),
        (status = 403, description = "Apenas motoboys controlam disponibilidade")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_availability(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdateAvailabilityPayload>,
) -> Result<impl IntoResponse, AppError> {
    if user.0.user_type != UserType::Motoboy {
        return Err(AppError::Forbidden(
            "Apenas motoboys controlam a própria disponibilidade.".to_string(),
        ));
    }

    app_state
        .user_repo
        .set_availability(&app_state.db_pool, user.0.id, payload.available)
        .await?;

    Ok(StatusCode::OK)
}

// ---
// Query: Rankings
// ---
#[derive(Debug, Deserialize, IntoParams)]
pub struct RankingQuery {
    // Filtra o ranking por cidade base
    pub city: Option<String>,
}

// GET /api/rankings
//
// Leitura pública: é a mesma pontuação que o matching usa para
// priorizar motoboys, exposta para dar transparência ao rodízio.
#[utoipa::path(
    get,
    path = "/api/rankings",
    tag = "Users",
    params(RankingQuery),
    responses(
        (status = 200, description = "Top motoboys por pontuação", body = [RankingEntry])
    )
)]
pub async fn get_rankings(
    State(app_state): State<AppState>,
    Query(query): Query<RankingQuery>,
) -> Result<impl IntoResponse, AppError> {
    let motoboys = app_state
        .user_repo
        .top_ranked(query.city.as_deref(), 20)
        .await?;

    let rankings: Vec<RankingEntry> = motoboys
        .into_iter()
        .enumerate()
        .map(|(i, motoboy)| RankingEntry {
            position: i as i32 + 1,
            id: motoboy.id,
            name: motoboy.name,
            ranking_score: motoboy.ranking_score,
            total_deliveries: motoboy.total_deliveries,
            base_city: motoboy.base_city,
        })
        .collect();

    Ok((StatusCode::OK, Json(rankings)))
}
