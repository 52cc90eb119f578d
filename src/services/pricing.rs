// src/services/pricing.rs

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::env;
use utoipa::ToSchema;

use crate::common::error::AppError;

// Constantes de precificação da plataforma. Injetadas no serviço (nada
// de constante global): os valores podem ser sobrescritos por variável
// de ambiente SRBOY_* na subida do processo.
#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub base_price: Decimal,
    pub price_per_km: Decimal,
    pub waiting_fee_per_minute: Decimal,
    pub free_waiting_minutes: i32,
    pub platform_fee_minimum: Decimal,
    pub platform_fee_percent: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            base_price: Decimal::new(1000, 2),            // R$ 10,00
            price_per_km: Decimal::new(200, 2),           // R$ 2,00 por km
            waiting_fee_per_minute: Decimal::new(100, 2), // R$ 1,00 por minuto
            free_waiting_minutes: 10,                     // franquia de espera
            platform_fee_minimum: Decimal::new(200, 2),   // R$ 2,00
            platform_fee_percent: Decimal::new(2, 2),     // 2% do total
        }
    }
}

impl PricingConfig {
    // Carrega do ambiente, caindo nos padrões da plataforma quando ausente.
    pub fn from_env() -> Self {
        let padrao = Self::default();
        Self {
            base_price: env_decimal("SRBOY_BASE_PRICE", padrao.base_price),
            price_per_km: env_decimal("SRBOY_PRICE_PER_KM", padrao.price_per_km),
            waiting_fee_per_minute: env_decimal(
                "SRBOY_WAITING_FEE_PER_MINUTE",
                padrao.waiting_fee_per_minute,
            ),
            free_waiting_minutes: env_i32("SRBOY_FREE_WAITING_MINUTES", padrao.free_waiting_minutes),
            platform_fee_minimum: env_decimal(
                "SRBOY_PLATFORM_FEE_MINIMUM",
                padrao.platform_fee_minimum,
            ),
            platform_fee_percent: env_decimal(
                "SRBOY_PLATFORM_FEE_PERCENT",
                padrao.platform_fee_percent,
            ),
        }
    }
}

fn env_decimal(key: &str, fallback: Decimal) -> Decimal {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(fallback)
}

fn env_i32(key: &str, fallback: i32) -> i32 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(fallback)
}

// Decomposição do preço de uma entrega.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub distance_km: Decimal,
    pub base_price: Decimal,
    pub distance_fee: Decimal,
    pub waiting_fee: Decimal,
    pub total_price: Decimal,
    pub platform_fee: Decimal,
    pub motoboy_earnings: Decimal,
}

#[derive(Clone)]
pub struct PricingService {
    config: PricingConfig,
}

impl PricingService {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    // Calcula o preço de uma entrega.
    //
    // Função pura e determinística. As contas intermediárias rodam na
    // precisão cheia do Decimal; o arredondamento (meio-para-cima, 2
    // casas) acontece só na saída, para não acumular erro.
    pub fn calculate(
        &self,
        distance_km: Decimal,
        waiting_minutes: i32,
    ) -> Result<PriceBreakdown, AppError> {
        if distance_km.is_sign_negative() {
            return Err(AppError::InvalidInput(
                "A distância não pode ser negativa.".to_string(),
            ));
        }
        if waiting_minutes < 0 {
            return Err(AppError::InvalidInput(
                "O tempo de espera não pode ser negativo.".to_string(),
            ));
        }

        let cfg = &self.config;

        let distance_fee = cfg.price_per_km * distance_km;

        // Os primeiros `free_waiting_minutes` são franquia
        let minutos_excedentes = (waiting_minutes - cfg.free_waiting_minutes).max(0);
        let waiting_fee = cfg.waiting_fee_per_minute * Decimal::from(minutos_excedentes);

        let total_price = cfg.base_price + distance_fee + waiting_fee;

        // Taxa da plataforma: o que for maior entre o piso fixo e o percentual
        let platform_fee = (total_price * cfg.platform_fee_percent).max(cfg.platform_fee_minimum);

        // Arredonda total e taxa primeiro para que o repasse feche
        // exatamente: motoboy_earnings == total_price - platform_fee
        let total_price = round2(total_price);
        let platform_fee = round2(platform_fee);
        let motoboy_earnings = total_price - platform_fee;

        Ok(PriceBreakdown {
            distance_km: round2(distance_km),
            base_price: round2(cfg.base_price),
            distance_fee: round2(distance_fee),
            waiting_fee: round2(waiting_fee),
            total_price,
            platform_fee,
            motoboy_earnings,
        })
    }
}

fn round2(v: Decimal) -> Decimal {
    v.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> PricingService {
        PricingService::new(PricingConfig::default())
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn four_km_without_waiting() {
        let preco = service().calculate(dec("4"), 0).unwrap();
        assert_eq!(preco.base_price, dec("10.00"));
        assert_eq!(preco.distance_fee, dec("8.00"));
        assert_eq!(preco.waiting_fee, dec("0.00"));
        assert_eq!(preco.total_price, dec("18.00"));
        assert_eq!(preco.platform_fee, dec("2.00"));
        assert_eq!(preco.motoboy_earnings, dec("16.00"));
    }

    #[test]
    fn fifteen_minutes_waiting_charges_five() {
        let preco = service().calculate(dec("4"), 15).unwrap();
        assert_eq!(preco.waiting_fee, dec("5.00"));
        assert_eq!(preco.total_price, dec("23.00"));
    }

    #[test]
    fn waiting_inside_the_free_allowance_is_not_charged() {
        let preco = service().calculate(dec("2"), 10).unwrap();
        assert_eq!(preco.waiting_fee, dec("0.00"));
        assert_eq!(preco.total_price, dec("14.00"));
    }

    #[test]
    fn percentage_fee_beats_the_floor_on_large_totals() {
        // 50 km: total = 10 + 100 = 110,00; 2% = 2,20 > piso de 2,00
        let preco = service().calculate(dec("50"), 0).unwrap();
        assert_eq!(preco.total_price, dec("110.00"));
        assert_eq!(preco.platform_fee, dec("2.20"));
        assert_eq!(preco.motoboy_earnings, dec("107.80"));
    }

    #[test]
    fn rounding_is_half_up() {
        // 46,125 km: frete = 92,25; total = 102,25; 2% = 2,045 -> 2,05
        let preco = service().calculate(dec("46.125"), 0).unwrap();
        assert_eq!(preco.total_price, dec("102.25"));
        assert_eq!(preco.platform_fee, dec("2.05"));
        assert_eq!(preco.motoboy_earnings, dec("100.20"));
    }

    #[test]
    fn earnings_always_close_the_account() {
        for (km, minutos) in [("0", 0), ("1.5", 3), ("12.33", 17), ("46.125", 90)] {
            let preco = service().calculate(dec(km), minutos).unwrap();
            assert_eq!(
                preco.motoboy_earnings,
                preco.total_price - preco.platform_fee,
                "km={km} minutos={minutos}"
            );
        }
    }

    #[test]
    fn zero_distance_still_charges_the_base_price() {
        let preco = service().calculate(Decimal::ZERO, 0).unwrap();
        assert_eq!(preco.total_price, dec("10.00"));
        assert_eq!(preco.platform_fee, dec("2.00"));
        assert_eq!(preco.motoboy_earnings, dec("8.00"));
    }

    #[test]
    fn negative_distance_is_rejected() {
        let erro = service().calculate(dec("-1"), 0);
        assert!(matches!(erro, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn negative_waiting_is_rejected() {
        let erro = service().calculate(dec("1"), -5);
        assert!(matches!(erro, Err(AppError::InvalidInput(_))));
    }
}
