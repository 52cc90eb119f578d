use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::models::delivery::DeliveryStatus;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
// Nenhum erro aqui é fatal para o processo: tudo é escopado a uma requisição.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Transição de status inválida: {from} -> {to}")]
    InvalidTransition {
        from: DeliveryStatus,
        to: DeliveryStatus,
    },

    // A trava de segurança do fluxo de finalização. A mensagem é contrato
    // com o app do motoboy; não alterar sem combinar com o front.
    #[error("PIN de confirmação deve ser validado antes de finalizar a entrega")]
    PinNotValidated,

    #[error("Saldo insuficiente na carteira")]
    InsufficientBalance,

    #[error("Entrega não encontrada")]
    DeliveryNotFound,

    #[error("Comprovante não encontrado")]
    ReceiptNotFound,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("{0}")]
    Forbidden(String),

    #[error("Token inválido")]
    InvalidToken,

    // Reserva de motoboy perdida para outra entrega simultânea.
    #[error("Motoboy não está mais disponível")]
    CourierUnavailable,

    #[error("Fonte não encontrada: {0}")]
    FontNotFound(String),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::InvalidTransition { from, to } => (
                StatusCode::BAD_REQUEST,
                format!("Transição de status inválida: {} -> {}", from, to),
            ),
            AppError::PinNotValidated => (
                StatusCode::BAD_REQUEST,
                "PIN de confirmação deve ser validado antes de finalizar a entrega".to_string(),
            ),
            AppError::InsufficientBalance => (
                StatusCode::BAD_REQUEST,
                "Saldo insuficiente na carteira".to_string(),
            ),
            AppError::DeliveryNotFound => {
                (StatusCode::NOT_FOUND, "Entrega não encontrada".to_string())
            }
            AppError::ReceiptNotFound => (
                StatusCode::NOT_FOUND,
                "Comprovante não encontrado".to_string(),
            ),
            AppError::UserNotFound => {
                (StatusCode::NOT_FOUND, "Usuário não encontrado".to_string())
            }
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Token de autenticação inválido ou ausente.".to_string(),
            ),
            AppError::CourierUnavailable => (
                StatusCode::CONFLICT,
                "Motoboy não está mais disponível. Tente novamente.".to_string(),
            ),

            // Todos os outros erros (DatabaseError, InternalServerError, ...) viram 500.
            // O `tracing` loga a mensagem detalhada que `thiserror` nos deu.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.".to_string(),
                )
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
