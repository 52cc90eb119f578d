// src/services/pin.rs

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::delivery::Delivery;

const PIN_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const PIN_LENGTH: usize = 8;
const CONFIRMATION_LENGTH: usize = 4;

pub const MAX_ATTEMPTS: i32 = 3;

const BLOCKED_MESSAGE: &str =
    "PIN bloqueado após 3 tentativas incorretas. Entre em contato com o suporte.";

// PIN recém-sorteado para uma entrega. O código de confirmação (os 4
// últimos caracteres) é o que o lojista repassa ao cliente; o motoboy
// precisa apresentá-lo na porta para finalizar.
#[derive(Debug, Clone)]
pub struct GeneratedPin {
    pub pin_completo: String,
    pub pin_confirmacao: String,
}

// Sorteia o PIN de 8 caracteres alfanuméricos e deriva o código de
// confirmação. Chamado exatamente uma vez, na transição para `matched`.
// Unicidade global não importa: o escopo do PIN é a própria entrega.
pub fn generate() -> GeneratedPin {
    let mut rng = rand::rng();
    let pin_completo: String = (0..PIN_LENGTH)
        .map(|_| PIN_CHARSET[rng.random_range(0..PIN_CHARSET.len())] as char)
        .collect();
    let pin_confirmacao = pin_completo[PIN_LENGTH - CONFIRMATION_LENGTH..].to_string();

    GeneratedPin {
        pin_completo,
        pin_confirmacao,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PinValidationCode {
    PinValid,
    PinIncorrect,
    PinBlocked,
}

// Resultado estruturado de uma tentativa de validação. Não é um erro
// HTTP: o app do motoboy trata os três desfechos na mesma tela.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PinValidationResult {
    pub success: bool,
    pub code: PinValidationCode,
    pub attempts_used: i32,
    pub attempts_remaining: i32,
    pub can_complete_delivery: bool,
    pub message: String,
}

// Aplica uma tentativa de validação sobre a entrega, em memória.
// O chamador persiste o resultado dentro da mesma transação que leu a
// entrega com lock, então duas tentativas simultâneas nunca observam o
// mesmo contador.
pub fn validate(delivery: &mut Delivery, submitted: &str) -> PinValidationResult {
    // PIN já bloqueado: nada muda, nem o contador.
    if delivery.pin_bloqueado {
        return PinValidationResult {
            success: false,
            code: PinValidationCode::PinBlocked,
            attempts_used: delivery.pin_tentativas,
            attempts_remaining: 0,
            can_complete_delivery: false,
            message: BLOCKED_MESSAGE.to_string(),
        };
    }

    let submitted = submitted.trim().to_uppercase();
    let esperado = delivery.pin_confirmacao.as_deref().unwrap_or_default();

    if !esperado.is_empty() && submitted == esperado {
        // Revalidar um PIN já validado é um no-op de sucesso
        if !delivery.pin_validado_com_sucesso {
            delivery.pin_validado_com_sucesso = true;
            delivery.pin_validado_em = Some(Utc::now());
        }
        delivery.pin_tentativas = 0;

        return PinValidationResult {
            success: true,
            code: PinValidationCode::PinValid,
            attempts_used: 0,
            attempts_remaining: MAX_ATTEMPTS,
            can_complete_delivery: true,
            message: "PIN validado com sucesso. Entrega liberada para finalização.".to_string(),
        };
    }

    delivery.pin_tentativas += 1;

    if delivery.pin_tentativas >= MAX_ATTEMPTS {
        delivery.pin_bloqueado = true;
        return PinValidationResult {
            success: false,
            code: PinValidationCode::PinBlocked,
            attempts_used: delivery.pin_tentativas,
            attempts_remaining: 0,
            can_complete_delivery: false,
            message: BLOCKED_MESSAGE.to_string(),
        };
    }

    PinValidationResult {
        success: false,
        code: PinValidationCode::PinIncorrect,
        attempts_used: delivery.pin_tentativas,
        attempts_remaining: MAX_ATTEMPTS - delivery.pin_tentativas,
        can_complete_delivery: false,
        message: format!(
            "PIN incorreto. Tentativa {} de {}.",
            delivery.pin_tentativas, MAX_ATTEMPTS
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::delivery::DeliveryStatus;

    #[test]
    fn generated_pin_has_the_expected_shape() {
        for _ in 0..50 {
            let pin = generate();
            assert_eq!(pin.pin_completo.len(), 8);
            assert_eq!(pin.pin_confirmacao.len(), 4);
            assert_eq!(&pin.pin_completo[4..], pin.pin_confirmacao);
            assert!(
                pin.pin_completo
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
            );
        }
    }

    #[test]
    fn correct_pin_validates_and_resets_the_counter() {
        // Uma validação correta funciona com 0, 1 ou 2 tentativas gastas
        for tentativas_previas in 0..=2 {
            let mut entrega = Delivery::fixture(DeliveryStatus::Matched);
            entrega.pin_tentativas = tentativas_previas;

            let resultado = validate(&mut entrega, "C3D4");

            assert!(resultado.success, "tentativas = {tentativas_previas}");
            assert_eq!(resultado.code, PinValidationCode::PinValid);
            assert!(resultado.can_complete_delivery);
            assert!(entrega.pin_validado_com_sucesso);
            assert!(entrega.pin_validado_em.is_some());
            assert_eq!(entrega.pin_tentativas, 0);
        }
    }

    #[test]
    fn comparison_ignores_case_and_whitespace() {
        let mut entrega = Delivery::fixture(DeliveryStatus::Matched);
        let resultado = validate(&mut entrega, "  c3d4 ");
        assert!(resultado.success);
    }

    #[test]
    fn revalidating_a_correct_pin_is_an_idempotent_success() {
        let mut entrega = Delivery::fixture(DeliveryStatus::Matched);
        let primeira = validate(&mut entrega, "C3D4");
        let quando_validou = entrega.pin_validado_em;

        let segunda = validate(&mut entrega, "C3D4");

        assert!(primeira.success && segunda.success);
        assert_eq!(segunda.code, PinValidationCode::PinValid);
        // O timestamp da primeira validação é preservado
        assert_eq!(entrega.pin_validado_em, quando_validou);
    }

    #[test]
    fn wrong_pin_counts_attempts_and_reports_the_remaining() {
        let mut entrega = Delivery::fixture(DeliveryStatus::Matched);

        let primeira = validate(&mut entrega, "XXXX");
        assert_eq!(primeira.code, PinValidationCode::PinIncorrect);
        assert_eq!(primeira.attempts_used, 1);
        assert_eq!(primeira.attempts_remaining, 2);

        let segunda = validate(&mut entrega, "YYYY");
        assert_eq!(segunda.code, PinValidationCode::PinIncorrect);
        assert_eq!(segunda.attempts_used, 2);
        assert_eq!(segunda.attempts_remaining, 1);
        assert!(!entrega.pin_bloqueado);
    }

    #[test]
    fn third_wrong_attempt_blocks_the_pin() {
        let mut entrega = Delivery::fixture(DeliveryStatus::Matched);

        validate(&mut entrega, "ERR1");
        validate(&mut entrega, "ERR2");
        let terceira = validate(&mut entrega, "ERR3");

        assert_eq!(terceira.code, PinValidationCode::PinBlocked);
        assert!(entrega.pin_bloqueado);
        assert_eq!(entrega.pin_tentativas, 3);
    }

    #[test]
    fn blocked_pin_stays_blocked_without_incrementing() {
        let mut entrega = Delivery::fixture(DeliveryStatus::Matched);
        for codigo in ["ERR1", "ERR2", "ERR3"] {
            validate(&mut entrega, codigo);
        }

        // Quarta tentativa: segue bloqueado, contador parado
        let quarta = validate(&mut entrega, "C3D4");
        assert_eq!(quarta.code, PinValidationCode::PinBlocked);
        assert!(!quarta.success);
        assert_eq!(entrega.pin_tentativas, 3);
        // Nem o PIN correto passa depois do bloqueio
        assert!(!entrega.pin_validado_com_sucesso);
    }
}
