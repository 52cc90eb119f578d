pub mod auth;
pub mod delivery_service;
pub mod matching_service;
pub mod pin;
pub mod pricing;
pub mod receipt_service;
