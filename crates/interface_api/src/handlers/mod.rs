pub mod accounting;
pub mod collections;
pub mod health;
pub mod renewals;
pub mod settlements;
