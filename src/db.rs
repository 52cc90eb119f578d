pub mod delivery_repo;
pub use delivery_repo::DeliveryRepository;
pub mod receipt_repo;
pub use receipt_repo::ReceiptRepository;
pub mod user_repo;
pub use user_repo::UserRepository;
