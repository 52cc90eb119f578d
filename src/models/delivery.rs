// src/models/delivery.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;
use crate::models::auth::UserType;

// --- 1. Status da Entrega ---
// O status é um enum fechado: a tabela de transições vive em um único
// lugar (`can_transition_to`), nada de `if` espalhado pelos handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "delivery_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Matched,
    PickupConfirmed,
    InTransit,
    Waiting,
    Delivered,
    Cancelled,
    ClientNotFound,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Matched => "matched",
            DeliveryStatus::PickupConfirmed => "pickup_confirmed",
            DeliveryStatus::InTransit => "in_transit",
            DeliveryStatus::Waiting => "waiting",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Cancelled => "cancelled",
            DeliveryStatus::ClientNotFound => "client_not_found",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeliveryStatus::Delivered | DeliveryStatus::Cancelled | DeliveryStatus::ClientNotFound
        )
    }

    // Tabela central de transições do ciclo de vida.
    pub fn can_transition_to(&self, novo: DeliveryStatus) -> bool {
        use DeliveryStatus::*;

        // Cancelamento e "cliente não encontrado" valem a partir de
        // qualquer estado não-terminal (ação do motoboy ou do admin).
        if matches!(novo, Cancelled | ClientNotFound) {
            return !self.is_terminal();
        }

        matches!(
            (self, novo),
            (Pending, Matched)
                | (Matched, PickupConfirmed)
                | (PickupConfirmed, InTransit)
                | (InTransit, Waiting)
                | (Waiting, InTransit)
                | (InTransit, Delivered)
                | (Waiting, Delivered)
        )
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- 2. Endereço e destinatário (colunas JSONB) ---

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct Address {
    #[validate(length(min = 1, message = "A cidade é obrigatória."))]
    pub city: String,
    #[validate(length(min = 1, message = "O endereço é obrigatório."))]
    pub address: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipientInfo {
    #[validate(length(min = 1, message = "O nome do destinatário é obrigatório."))]
    pub name: String,
    #[validate(length(min = 1, message = "O documento do destinatário é obrigatório."))]
    pub document: String,
    // Pessoa alternativa autorizada a receber em nome do destinatário
    pub authorized_recipient: Option<String>,
}

// --- 3. Entrega ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub id: Uuid,
    pub lojista_id: Uuid,
    pub motoboy_id: Option<Uuid>,

    #[schema(value_type = Address)]
    pub pickup_address: Json<Address>,
    #[schema(value_type = Address)]
    pub delivery_address: Json<Address>,
    #[schema(value_type = RecipientInfo)]
    pub recipient_info: Json<RecipientInfo>,
    pub product_description: Option<String>,

    pub distance_km: Decimal,
    pub base_price: Decimal,
    pub distance_fee: Decimal,
    pub waiting_fee: Decimal,
    pub total_price: Decimal,
    pub platform_fee: Decimal,
    pub motoboy_earnings: Decimal,

    pub status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
    pub matched_at: Option<DateTime<Utc>>,
    pub pickup_confirmed_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub waiting_minutes: i32,

    // Bloco de segurança do PIN. Os nomes históricos `pin_*` são mantidos
    // no JSON. O PIN completo jamais sai da API.
    #[serde(skip_serializing)]
    pub pin_completo: Option<String>,
    #[serde(rename = "pin_confirmacao")]
    pub pin_confirmacao: Option<String>,
    #[serde(rename = "pin_tentativas")]
    pub pin_tentativas: i32,
    #[serde(rename = "pin_bloqueado")]
    pub pin_bloqueado: bool,
    #[serde(rename = "pin_validado_com_sucesso")]
    pub pin_validado_com_sucesso: bool,
    #[serde(rename = "pin_validado_em")]
    pub pin_validado_em: Option<DateTime<Utc>>,
}

impl Delivery {
    // Valida a transição solicitada, incluindo a trava de PIN.
    //
    // Finalizar exige `pin_validado_com_sucesso == true`. O contador de
    // tentativas NUNCA participa desta decisão: uma validação correta
    // zera o contador, então "tentativas == 0" não diz nada.
    pub fn ensure_can_transition(&self, novo: DeliveryStatus) -> Result<(), AppError> {
        if !self.status.can_transition_to(novo) {
            return Err(AppError::InvalidTransition {
                from: self.status,
                to: novo,
            });
        }

        if novo == DeliveryStatus::Delivered && !self.pin_validado_com_sucesso {
            return Err(AppError::PinNotValidated);
        }

        Ok(())
    }

    // Remove campos sensíveis conforme o papel de quem consulta.
    // O código de confirmação só é revelado ao lojista, que o repassa
    // ao cliente final.
    pub fn sanitize_for(&mut self, viewer_type: UserType) {
        if viewer_type != UserType::Lojista {
            self.pin_confirmacao = None;
        }
    }
}

#[cfg(test)]
impl Delivery {
    // Entrega de laboratório para os testes de domínio.
    pub(crate) fn fixture(status: DeliveryStatus) -> Self {
        let agora = Utc::now();
        Delivery {
            id: Uuid::new_v4(),
            lojista_id: Uuid::new_v4(),
            motoboy_id: Some(Uuid::new_v4()),
            pickup_address: Json(Address {
                city: "São Roque".to_string(),
                address: "Rua Comercial, 123".to_string(),
                lat: -23.5320,
                lng: -47.1360,
            }),
            delivery_address: Json(Address {
                city: "São Roque".to_string(),
                address: "Av. Principal, 456".to_string(),
                lat: -23.5450,
                lng: -47.1680,
            }),
            recipient_info: Json(RecipientInfo {
                name: "João Silva".to_string(),
                document: "12.345.678-9".to_string(),
                authorized_recipient: None,
            }),
            product_description: Some("Caixa de documentos".to_string()),
            distance_km: Decimal::new(400, 2),
            base_price: Decimal::new(1000, 2),
            distance_fee: Decimal::new(800, 2),
            waiting_fee: Decimal::ZERO,
            total_price: Decimal::new(1800, 2),
            platform_fee: Decimal::new(200, 2),
            motoboy_earnings: Decimal::new(1600, 2),
            status,
            created_at: agora,
            matched_at: Some(agora),
            pickup_confirmed_at: None,
            delivered_at: None,
            waiting_minutes: 0,
            pin_completo: Some("A1B2C3D4".to_string()),
            pin_confirmacao: Some("C3D4".to_string()),
            pin_tentativas: 0,
            pin_bloqueado: false,
            pin_validado_com_sucesso: false,
            pin_validado_em: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_are_allowed() {
        use DeliveryStatus::*;
        assert!(Pending.can_transition_to(Matched));
        assert!(Matched.can_transition_to(PickupConfirmed));
        assert!(PickupConfirmed.can_transition_to(InTransit));
        assert!(InTransit.can_transition_to(Waiting));
        assert!(Waiting.can_transition_to(InTransit));
        assert!(InTransit.can_transition_to(Delivered));
        assert!(Waiting.can_transition_to(Delivered));
    }

    #[test]
    fn shortcuts_are_rejected() {
        use DeliveryStatus::*;
        assert!(!Pending.can_transition_to(Delivered));
        assert!(!Pending.can_transition_to(InTransit));
        assert!(!Matched.can_transition_to(Delivered));
        assert!(!Matched.can_transition_to(Waiting));
        assert!(!PickupConfirmed.can_transition_to(Delivered));
        assert!(!PickupConfirmed.can_transition_to(Matched));
    }

    #[test]
    fn cancellation_works_from_any_non_terminal_state() {
        use DeliveryStatus::*;
        for status in [Pending, Matched, PickupConfirmed, InTransit, Waiting] {
            assert!(status.can_transition_to(Cancelled), "{status}");
            assert!(status.can_transition_to(ClientNotFound), "{status}");
        }
    }

    #[test]
    fn terminal_states_accept_nothing() {
        use DeliveryStatus::*;
        for terminal in [Delivered, Cancelled, ClientNotFound] {
            for target in [
                Pending,
                Matched,
                PickupConfirmed,
                InTransit,
                Waiting,
                Delivered,
                Cancelled,
                ClientNotFound,
            ] {
                assert!(!terminal.can_transition_to(target), "{terminal} -> {target}");
            }
        }
    }

    #[test]
    fn delivered_requires_validated_pin() {
        let entrega = Delivery::fixture(DeliveryStatus::InTransit);
        let resultado = entrega.ensure_can_transition(DeliveryStatus::Delivered);
        assert!(matches!(resultado, Err(AppError::PinNotValidated)));
    }

    // Regressão do bug histórico: "tentativas == 0" era usado como
    // sinônimo de "PIN não exigido". O contador não pode influenciar
    // a finalização em nenhuma hipótese.
    #[test]
    fn attempt_counter_never_substitutes_the_validation_flag() {
        for tentativas in 0..=2 {
            let mut entrega = Delivery::fixture(DeliveryStatus::InTransit);
            entrega.pin_tentativas = tentativas;
            entrega.pin_validado_com_sucesso = false;
            let resultado = entrega.ensure_can_transition(DeliveryStatus::Delivered);
            assert!(
                matches!(resultado, Err(AppError::PinNotValidated)),
                "tentativas = {tentativas}"
            );
        }
    }

    #[test]
    fn delivered_is_allowed_after_pin_validation() {
        let mut entrega = Delivery::fixture(DeliveryStatus::Waiting);
        entrega.pin_validado_com_sucesso = true;
        assert!(
            entrega
                .ensure_can_transition(DeliveryStatus::Delivered)
                .is_ok()
        );
    }

    #[test]
    fn invalid_transition_reports_both_states() {
        let entrega = Delivery::fixture(DeliveryStatus::Pending);
        match entrega.ensure_can_transition(DeliveryStatus::Delivered) {
            Err(AppError::InvalidTransition { from, to }) => {
                assert_eq!(from, DeliveryStatus::Pending);
                assert_eq!(to, DeliveryStatus::Delivered);
            }
            other => panic!("esperava InvalidTransition, veio {other:?}"),
        }
    }

    #[test]
    fn sanitize_hides_the_confirmation_code_from_non_lojistas() {
        let mut entrega = Delivery::fixture(DeliveryStatus::Matched);
        entrega.sanitize_for(UserType::Motoboy);
        assert!(entrega.pin_confirmacao.is_none());

        let mut entrega = Delivery::fixture(DeliveryStatus::Matched);
        entrega.sanitize_for(UserType::Lojista);
        assert_eq!(entrega.pin_confirmacao.as_deref(), Some("C3D4"));
    }
}
