// src/models/receipt.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use sqlx::types::Json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::delivery::{Address, RecipientInfo};

// Comprovante digital de entrega. Gravado uma única vez quando a entrega
// chega em `delivered` e nunca mais alterado.
//
// As durações são opcionais de propósito: uma entrega finalizada por
// override administrativo pode não ter `pickup_confirmed_at`, e o
// comprovante precisa sair mesmo assim.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReceipt {
    pub id: Uuid,
    pub delivery_id: Uuid,
    pub loja_id: Uuid,
    pub motoboy_id: Uuid,

    pub loja_name: String,
    pub motoboy_name: String,
    #[schema(value_type = RecipientInfo)]
    pub recipient_info: Json<RecipientInfo>,
    pub product_description: Option<String>,

    #[schema(value_type = Address)]
    pub pickup_address: Json<Address>,
    #[schema(value_type = Address)]
    pub delivery_address: Json<Address>,

    pub matched_at: Option<DateTime<Utc>>,
    pub pickup_confirmed_at: Option<DateTime<Utc>>,
    pub delivered_at: DateTime<Utc>,
    pub matched_to_pickup_minutes: Option<i64>,
    pub pickup_to_delivery_minutes: Option<i64>,

    pub distance_km: Decimal,
    pub base_price: Decimal,
    pub distance_fee: Decimal,
    pub waiting_fee: Decimal,
    pub platform_fee: Decimal,
    pub total_price: Decimal,
    pub motoboy_earnings: Decimal,

    pub created_at: DateTime<Utc>,
}
