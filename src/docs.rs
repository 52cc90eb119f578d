// src/docs.rs

use crate::handlers;
use crate::models;
use crate::services;
use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Deliveries ---
        handlers::deliveries::create_delivery,
        handlers::deliveries::list_deliveries,
        handlers::deliveries::accept_delivery,
        handlers::deliveries::update_status,
        handlers::deliveries::update_waiting,
        handlers::deliveries::validate_pin,
        handlers::deliveries::get_receipt,
        handlers::deliveries::get_receipt_pdf,

        // --- Users ---
        handlers::users::get_profile,
        handlers::users::update_availability,
        handlers::users::get_rankings,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::UserType,
            models::auth::User,
            models::auth::RankingEntry,

            // --- Deliveries ---
            models::delivery::DeliveryStatus,
            models::delivery::Address,
            models::delivery::RecipientInfo,
            models::delivery::Delivery,
            models::receipt::DeliveryReceipt,

            // --- Pricing / PIN ---
            services::pricing::PriceBreakdown,
            services::pin::PinValidationCode,
            services::pin::PinValidationResult,
            services::delivery_service::MatchedMotoboy,
            services::delivery_service::CreateDeliveryOutcome,

            // --- Payloads ---
            handlers::deliveries::CreateDeliveryPayload,
            handlers::deliveries::UpdateStatusPayload,
            handlers::deliveries::UpdateWaitingPayload,
            handlers::deliveries::ValidatePinPayload,
            handlers::users::UpdateAvailabilityPayload,
        )
    ),
    tags(
        (name = "Deliveries", description = "Ciclo de vida das entregas, PIN e comprovantes"),
        (name = "Users", description = "Perfil, disponibilidade e ranking de motoboys")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
