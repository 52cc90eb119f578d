// src/services/delivery_service.rs

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{DeliveryRepository, ReceiptRepository, UserRepository},
    models::{
        auth::{User, UserType},
        delivery::{Address, Delivery, DeliveryStatus, RecipientInfo},
        receipt::DeliveryReceipt,
    },
    services::{
        matching_service::MatchingService,
        pin::{self, PinValidationResult},
        pricing::{PriceBreakdown, PricingService},
        receipt_service::ReceiptService,
    },
};

// Resumo do motoboy escolhido, devolvido ao lojista na criação
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchedMotoboy {
    pub id: Uuid,
    pub name: String,
    pub ranking_score: i32,
}

// Desfecho da criação: com matching automático ou aguardando aceite
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeliveryOutcome {
    pub delivery: Delivery,
    pub pricing: PriceBreakdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_motoboy: Option<MatchedMotoboy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// Orquestra o ciclo de vida da entrega. Cada operação pública é uma
// transação única: lê a entrega com lock de linha, aplica a regra de
// negócio em memória e grava tudo de volta (ou nada, em caso de erro).
#[derive(Clone)]
pub struct DeliveryService {
    delivery_repo: DeliveryRepository,
    receipt_repo: ReceiptRepository,
    user_repo: UserRepository,
    matching: MatchingService,
    pricing: PricingService,
    receipts: ReceiptService,
    pool: PgPool,
}

impl DeliveryService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        delivery_repo: DeliveryRepository,
        receipt_repo: ReceiptRepository,
        user_repo: UserRepository,
        matching: MatchingService,
        pricing: PricingService,
        receipts: ReceiptService,
        pool: PgPool,
    ) -> Self {
        Self {
            delivery_repo,
            receipt_repo,
            user_repo,
            matching,
            pricing,
            receipts,
            pool,
        }
    }

    // --- CRIAÇÃO (com matching automático) ---
    #[allow(clippy::too_many_arguments)]
    pub async fn create_delivery(
        &self,
        lojista: &User,
        pickup_address: Address,
        delivery_address: Address,
        recipient_info: RecipientInfo,
        product_description: Option<String>,
        distance_km: Decimal,
    ) -> Result<CreateDeliveryOutcome, AppError> {
        if lojista.user_type != UserType::Lojista {
            return Err(AppError::Forbidden(
                "Apenas lojistas podem criar entregas.".to_string(),
            ));
        }

        let pricing = self.pricing.calculate(distance_km, 0)?;

        // Checagem otimista do saldo; o débito definitivo acontece no
        // matching, condicionado ao saldo daquele momento.
        if lojista.wallet_balance < pricing.total_price {
            return Err(AppError::InsufficientBalance);
        }

        let mut tx = self.pool.begin().await?;

        let mut delivery = self
            .delivery_repo
            .create(
                &mut *tx,
                lojista.id,
                &pickup_address,
                &delivery_address,
                &recipient_info,
                product_description.as_deref(),
                pricing.distance_km,
                pricing.base_price,
                pricing.distance_fee,
                pricing.total_price,
                pricing.platform_fee,
                pricing.motoboy_earnings,
            )
            .await?;

        // Tenta o matching automático na mesma transação
        let matched = self
            .matching
            .reserve_best_courier(&mut *tx, &pickup_address.city)
            .await?;

        let matched_motoboy = match matched {
            Some(courier) => {
                if !self
                    .user_repo
                    .debit_wallet(&mut *tx, lojista.id, delivery.total_price)
                    .await?
                {
                    return Err(AppError::InsufficientBalance);
                }

                self.assign_courier(&mut delivery, courier.id)?;
                delivery = self.delivery_repo.update_state(&mut *tx, &delivery).await?;

                Some(MatchedMotoboy {
                    id: courier.id,
                    name: courier.name,
                    ranking_score: courier.ranking_score,
                })
            }
            None => None,
        };

        tx.commit().await?;

        let message = match matched_motoboy {
            Some(_) => None,
            None => Some("Entrega criada, procurando motoboy disponível...".to_string()),
        };

        tracing::info!(
            "📦 Entrega {} criada pelo lojista {} ({})",
            delivery.id,
            lojista.id,
            if matched_motoboy.is_some() {
                "matching automático"
            } else {
                "aguardando aceite"
            }
        );

        Ok(CreateDeliveryOutcome {
            delivery,
            pricing,
            matched_motoboy,
            message,
        })
    }

    // --- ACEITE MANUAL ---
    pub async fn accept_delivery(
        &self,
        motoboy: &User,
        delivery_id: Uuid,
    ) -> Result<Delivery, AppError> {
        if motoboy.user_type != UserType::Motoboy {
            return Err(AppError::Forbidden(
                "Apenas motoboys podem aceitar entregas.".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let mut delivery = self
            .delivery_repo
            .find_by_id_for_update(&mut *tx, delivery_id)
            .await?
            .ok_or(AppError::DeliveryNotFound)?;

        delivery.ensure_can_transition(DeliveryStatus::Matched)?;

        // Reserva do próprio motoboy: se ele já está em outra corrida
        // (ou se desativou a disponibilidade), o aceite falha.
        if !self.user_repo.try_reserve(&mut *tx, motoboy.id).await? {
            return Err(AppError::CourierUnavailable);
        }

        if !self
            .user_repo
            .debit_wallet(&mut *tx, delivery.lojista_id, delivery.total_price)
            .await?
        {
            return Err(AppError::InsufficientBalance);
        }

        self.assign_courier(&mut delivery, motoboy.id)?;
        let delivery = self.delivery_repo.update_state(&mut *tx, &delivery).await?;

        tx.commit().await?;

        tracing::info!("🛵 Entrega {} aceita pelo motoboy {}", delivery.id, motoboy.id);
        Ok(delivery)
    }

    // Efeitos colaterais de `pending -> matched`: atribuição, timestamp
    // e geração do PIN (exatamente uma vez por entrega).
    fn assign_courier(&self, delivery: &mut Delivery, motoboy_id: Uuid) -> Result<(), AppError> {
        delivery.ensure_can_transition(DeliveryStatus::Matched)?;

        let pin = pin::generate();
        delivery.motoboy_id = Some(motoboy_id);
        delivery.status = DeliveryStatus::Matched;
        delivery.matched_at = Some(Utc::now());
        delivery.pin_completo = Some(pin.pin_completo);
        delivery.pin_confirmacao = Some(pin.pin_confirmacao);
        delivery.pin_tentativas = 0;
        delivery.pin_bloqueado = false;
        delivery.pin_validado_com_sucesso = false;
        delivery.pin_validado_em = None;

        Ok(())
    }

    // --- TRANSIÇÃO DE STATUS ---
    pub async fn update_status(
        &self,
        actor: &User,
        delivery_id: Uuid,
        new_status: DeliveryStatus,
    ) -> Result<Delivery, AppError> {
        // O matching tem fluxo próprio (aceite/criação), com geração de
        // PIN e débito de carteira; não pode entrar por aqui.
        if new_status == DeliveryStatus::Matched {
            return Err(AppError::InvalidInput(
                "Use a operação de aceite para assumir uma entrega.".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let mut delivery = self
            .delivery_repo
            .find_by_id_for_update(&mut *tx, delivery_id)
            .await?
            .ok_or(AppError::DeliveryNotFound)?;

        self.ensure_actor_can_mutate(actor, &delivery)?;
        delivery.ensure_can_transition(new_status)?;

        delivery.status = new_status;
        match new_status {
            DeliveryStatus::PickupConfirmed => {
                delivery.pickup_confirmed_at = Some(Utc::now());
            }
            DeliveryStatus::Delivered => {
                delivery.delivered_at = Some(Utc::now());
                self.finalize_delivery(&mut tx, &mut delivery).await?;
            }
            DeliveryStatus::Cancelled | DeliveryStatus::ClientNotFound => {
                // Libera o motoboy para novas corridas
                if let Some(motoboy_id) = delivery.motoboy_id {
                    self.user_repo
                        .set_availability(&mut *tx, motoboy_id, true)
                        .await?;
                }
            }
            _ => {}
        }

        let delivery = self.delivery_repo.update_state(&mut *tx, &delivery).await?;
        tx.commit().await?;

        tracing::info!(
            "🚦 Entrega {} movida para {} por {}",
            delivery.id,
            delivery.status,
            actor.id
        );
        Ok(delivery)
    }

    // Efeitos de entrada em `delivered`: preço final, comprovante,
    // estatísticas e liberação do motoboy. Roda dentro da transação da
    // transição: o comprovante e o status gravam juntos.
    async fn finalize_delivery(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        delivery: &mut Delivery,
    ) -> Result<(), AppError> {
        // Recalcula com o tempo de espera acumulado até aqui
        let pricing = self
            .pricing
            .calculate(delivery.distance_km, delivery.waiting_minutes)?;
        delivery.base_price = pricing.base_price;
        delivery.distance_fee = pricing.distance_fee;
        delivery.waiting_fee = pricing.waiting_fee;
        delivery.total_price = pricing.total_price;
        delivery.platform_fee = pricing.platform_fee;
        delivery.motoboy_earnings = pricing.motoboy_earnings;

        let motoboy_id = delivery
            .motoboy_id
            .ok_or_else(|| anyhow::anyhow!("Entrega {} finalizada sem motoboy", delivery.id))?;

        let lojista = self
            .user_repo
            .find_by_id_tx(&mut **tx, delivery.lojista_id)
            .await?
            .ok_or(AppError::UserNotFound)?;
        let motoboy = self
            .user_repo
            .find_by_id_tx(&mut **tx, motoboy_id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        let receipt = self.receipts.build(delivery, &lojista, &motoboy);
        self.receipt_repo.insert(&mut **tx, &receipt).await?;

        self.user_repo
            .increment_total_deliveries(&mut **tx, motoboy_id)
            .await?;
        self.user_repo
            .set_availability(&mut **tx, motoboy_id, true)
            .await?;

        tracing::info!(
            "🧾 Comprovante {} emitido para a entrega {}",
            receipt.id,
            delivery.id
        );
        Ok(())
    }

    // --- TEMPO DE ESPERA ---
    pub async fn update_waiting(
        &self,
        actor: &User,
        delivery_id: Uuid,
        waiting_minutes: i32,
    ) -> Result<Delivery, AppError> {
        if waiting_minutes < 0 {
            return Err(AppError::InvalidInput(
                "O tempo de espera não pode ser negativo.".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let mut delivery = self
            .delivery_repo
            .find_by_id_for_update(&mut *tx, delivery_id)
            .await?
            .ok_or(AppError::DeliveryNotFound)?;

        self.ensure_actor_can_mutate(actor, &delivery)?;

        if !matches!(
            delivery.status,
            DeliveryStatus::InTransit | DeliveryStatus::Waiting
        ) {
            return Err(AppError::InvalidInput(format!(
                "Tempo de espera só pode ser atualizado em trânsito ou em espera (status atual: {}).",
                delivery.status
            )));
        }

        // O contador representa tempo decorrido: só anda para frente
        if waiting_minutes < delivery.waiting_minutes {
            return Err(AppError::InvalidInput(format!(
                "O tempo de espera não pode diminuir ({} -> {} min).",
                delivery.waiting_minutes, waiting_minutes
            )));
        }

        delivery.waiting_minutes = waiting_minutes;

        let pricing = self
            .pricing
            .calculate(delivery.distance_km, waiting_minutes)?;
        delivery.waiting_fee = pricing.waiting_fee;
        delivery.total_price = pricing.total_price;
        delivery.platform_fee = pricing.platform_fee;
        delivery.motoboy_earnings = pricing.motoboy_earnings;

        let delivery = self.delivery_repo.update_state(&mut *tx, &delivery).await?;
        tx.commit().await?;

        Ok(delivery)
    }

    // --- VALIDAÇÃO DE PIN ---
    pub async fn validate_pin(
        &self,
        actor: &User,
        delivery_id: Uuid,
        submitted_code: &str,
    ) -> Result<PinValidationResult, AppError> {
        let mut tx = self.pool.begin().await?;

        let mut delivery = self
            .delivery_repo
            .find_by_id_for_update(&mut *tx, delivery_id)
            .await?
            .ok_or(AppError::DeliveryNotFound)?;

        self.ensure_actor_can_mutate(actor, &delivery)?;

        if delivery.pin_confirmacao.is_none() {
            return Err(AppError::InvalidInput(
                "A entrega ainda não possui PIN gerado.".to_string(),
            ));
        }

        let result = pin::validate(&mut delivery, submitted_code);
        self.delivery_repo.update_state(&mut *tx, &delivery).await?;
        tx.commit().await?;

        Ok(result)
    }

    // --- CONSULTAS ---
    pub async fn list_deliveries(&self, actor: &User) -> Result<Vec<Delivery>, AppError> {
        let mut deliveries = self.delivery_repo.list_for_user(actor).await?;
        for delivery in &mut deliveries {
            delivery.sanitize_for(actor.user_type);
        }
        Ok(deliveries)
    }

    pub async fn get_receipt(
        &self,
        actor: &User,
        delivery_id: Uuid,
    ) -> Result<DeliveryReceipt, AppError> {
        let receipt = self
            .receipt_repo
            .find_by_delivery_id(delivery_id)
            .await?
            .ok_or(AppError::ReceiptNotFound)?;

        let is_party = receipt.loja_id == actor.id || receipt.motoboy_id == actor.id;
        if !is_party && actor.user_type != UserType::Admin {
            return Err(AppError::Forbidden(
                "O comprovante só é visível às partes da entrega.".to_string(),
            ));
        }

        Ok(receipt)
    }

    pub async fn get_receipt_pdf(
        &self,
        actor: &User,
        delivery_id: Uuid,
    ) -> Result<Vec<u8>, AppError> {
        let receipt = self.get_receipt(actor, delivery_id).await?;
        self.receipts.render_pdf(&receipt)
    }

    // Admin mexe em qualquer entrega; motoboy, só na que é dele.
    fn ensure_actor_can_mutate(&self, actor: &User, delivery: &Delivery) -> Result<(), AppError> {
        match actor.user_type {
            UserType::Admin => Ok(()),
            UserType::Motoboy if delivery.motoboy_id == Some(actor.id) => Ok(()),
            UserType::Motoboy => Err(AppError::Forbidden(
                "A entrega não pertence a você.".to_string(),
            )),
            UserType::Lojista => Err(AppError::Forbidden(
                "Lojistas não alteram o andamento da entrega.".to_string(),
            )),
        }
    }
}
