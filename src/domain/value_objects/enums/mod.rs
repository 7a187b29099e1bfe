pub mod cover_types;
pub mod payment_statuses;
pub mod payment_types;
