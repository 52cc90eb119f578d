// src/handlers/deliveries.rs

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::delivery::{Address, Delivery, DeliveryStatus, RecipientInfo},
    services::{delivery_service::CreateDeliveryOutcome, pin::PinValidationResult},
};

// ---
// Validação Customizada
// ---
fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

// ---
// Payload: CreateDelivery
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeliveryPayload {
    #[validate(nested)]
    pub pickup_address: Address,

    #[validate(nested)]
    pub delivery_address: Address,

    #[validate(nested)]
    pub recipient_info: RecipientInfo,

    #[schema(example = "Caixa com 2 marmitas")]
    pub product_description: Option<String>,

    // A distância vem calculada pelo cliente (não somos um motor de
    // rotas); aqui só validamos que é um número plausível.
    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = "4.0")]
    pub distance_km: Decimal,
}

// POST /api/deliveries
#[utoipa::path(
    post,
    path = "/api/deliveries",
    tag = "Deliveries",
    request_body = CreateDeliveryPayload,
    responses(
        (status = 201, description = "Entrega criada (com ou sem matching automático)", body = CreateDeliveryOutcome),
        (status = 400, description = "Dados inválidos ou saldo insuficiente"),
        (status = 403, description = "Apenas lojistas podem criar entregas")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_delivery(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateDeliveryPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let outcome = app_state
        .delivery_service
        .create_delivery(
            &user.0,
            payload.pickup_address,
            payload.delivery_address,
            payload.recipient_info,
            payload.product_description,
            payload.distance_km,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

// GET /api/deliveries
#[utoipa::path(
    get,
    path = "/api/deliveries",
    tag = "Deliveries",
    responses(
        (status = 200, description = "Entregas visíveis ao usuário (50 mais recentes)", body = [Delivery])
    ),
    security(("api_jwt" = []))
)]
pub async fn list_deliveries(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let deliveries = app_state.delivery_service.list_deliveries(&user.0).await?;
    Ok((StatusCode::OK, Json(deliveries)))
}

// POST /api/deliveries/{delivery_id}/accept
#[utoipa::path(
    post,
    path = "/api/deliveries/{delivery_id}/accept",
    tag = "Deliveries",
    responses(
        (status = 200, description = "Entrega aceita; PIN gerado", body = Delivery),
        (status = 400, description = "Entrega não está mais pendente"),
        (status = 409, description = "Motoboy não está mais disponível")
    ),
    params(
        ("delivery_id" = Uuid, Path, description = "ID da Entrega")
    ),
    security(("api_jwt" = []))
)]
pub async fn accept_delivery(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(delivery_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut delivery = app_state
        .delivery_service
        .accept_delivery(&user.0, delivery_id)
        .await?;

    delivery.sanitize_for(user.0.user_type);
    Ok((StatusCode::OK, Json(delivery)))
}

// ---
// Payload: UpdateStatus
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusPayload {
    #[schema(example = "in_transit")]
    pub status: DeliveryStatus,
}

// PUT /api/deliveries/{delivery_id}/status
#[utoipa::path(
    put,
    path = "/api/deliveries/{delivery_id}/status",
    tag = "Deliveries",
    request_body = UpdateStatusPayload,
    responses(
        (status = 200, description = "Status atualizado", body = Delivery),
        (status = 400, description = "Transição inválida ou PIN não validado"),
        (status = 403, description = "A entrega não pertence ao usuário")
    ),
    params(
        ("delivery_id" = Uuid, Path, description = "ID da Entrega")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_status(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(delivery_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    let mut delivery = app_state
        .delivery_service
        .update_status(&user.0, delivery_id, payload.status)
        .await?;

    delivery.sanitize_for(user.0.user_type);
    Ok((StatusCode::OK, Json(delivery)))
}

// ---
// Payload: UpdateWaiting
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWaitingPayload {
    // Minutos acumulados desde o início da espera (monotônico)
    #[validate(range(min = 0, message = "O tempo de espera não pode ser negativo."))]
    #[schema(example = 15)]
    pub waiting_minutes: i32,
}

// PUT /api/deliveries/{delivery_id}/waiting
#[utoipa::path(
    put,
    path = "/api/deliveries/{delivery_id}/waiting",
    tag = "Deliveries",
    request_body = UpdateWaitingPayload,
    responses(
        (status = 200, description = "Tempo de espera e valores recalculados", body = Delivery),
        (status = 400, description = "Valor menor que o acumulado ou status incompatível")
    ),
    params(
        ("delivery_id" = Uuid, Path, description = "ID da Entrega")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_waiting(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(delivery_id): Path<Uuid>,
    Json(payload): Json<UpdateWaitingPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut delivery = app_state
        .delivery_service
        .update_waiting(&user.0, delivery_id, payload.waiting_minutes)
        .await?;

    delivery.sanitize_for(user.0.user_type);
    Ok((StatusCode::OK, Json(delivery)))
}

// ---
// Payload: ValidatePin
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ValidatePinPayload {
    #[validate(length(min = 1, message = "O PIN é obrigatório."))]
    #[schema(example = "C3D4")]
    pub pin: String,
}

// POST /api/deliveries/{delivery_id}/validate-pin
//
// Os três desfechos (PIN_VALID, PIN_INCORRECT, PIN_BLOCKED) voltam como
// resultado estruturado com status 200; o app trata tudo na mesma tela.
#[utoipa::path(
    post,
    path = "/api/deliveries/{delivery_id}/validate-pin",
    tag = "Deliveries",
    request_body = ValidatePinPayload,
    responses(
        (status = 200, description = "Resultado da tentativa de validação", body = PinValidationResult),
        (status = 403, description = "A entrega não pertence ao usuário")
    ),
    params(
        ("delivery_id" = Uuid, Path, description = "ID da Entrega")
    ),
    security(("api_jwt" = []))
)]
pub async fn validate_pin(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(delivery_id): Path<Uuid>,
    Json(payload): Json<ValidatePinPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let result = app_state
        .delivery_service
        .validate_pin(&user.0, delivery_id, &payload.pin)
        .await?;

    Ok((StatusCode::OK, Json(result)))
}

// GET /api/deliveries/{delivery_id}/receipt
#[utoipa::path(
    get,
    path = "/api/deliveries/{delivery_id}/receipt",
    tag = "Deliveries",
    responses(
        (status = 200, description = "Comprovante da entrega", body = crate::models::receipt::DeliveryReceipt),
        (status = 404, description = "Comprovante não encontrado")
    ),
    params(
        ("delivery_id" = Uuid, Path, description = "ID da Entrega")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_receipt(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(delivery_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let receipt = app_state
        .delivery_service
        .get_receipt(&user.0, delivery_id)
        .await?;
    Ok((StatusCode::OK, Json(receipt)))
}

// GET /api/deliveries/{delivery_id}/receipt/pdf
#[utoipa::path(
    get,
    path = "/api/deliveries/{delivery_id}/receipt/pdf",
    tag = "Deliveries",
    responses(
        (status = 200, description = "Comprovante em PDF", body = Vec<u8>, content_type = "application/pdf"),
        (status = 404, description = "Comprovante não encontrado")
    ),
    params(
        ("delivery_id" = Uuid, Path, description = "ID da Entrega")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_receipt_pdf(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(delivery_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let pdf_bytes = app_state
        .delivery_service
        .get_receipt_pdf(&user.0, delivery_id)
        .await?;

    // Configura os Headers para o navegador baixar ou mostrar o PDF
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"comprovante_{}.pdf\"", delivery_id),
        ),
    ];

    Ok((headers, pdf_bytes).into_response())
}
