//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the directory, settlement and renewal domains
//! using SQLx. Repositories load domain aggregates, let the domain decide,
//! and write the result back; multi-row workflows (creating, confirming or
//! cancelling a settlement, recording a renewal decision) run in a single
//! transaction.
//!
//! ```rust,ignore
//! use infra_db::{create_pool, DatabaseConfig, SettlementRepository};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/greenpages")).await?;
//! let settlements = SettlementRepository::new(pool, Currency::IQD);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;

pub use pool::{
    DatabasePool, DatabaseConfig, create_pool, create_lazy_pool, run_migrations, check_health,
};
pub use error::DatabaseError;
pub use repositories::{
    DirectoryRepository, SettlementRepository, RenewalRepository, AccountingRepository,
    Page,
};
pub use repositories::settlement::{ListFilter, NewCollection};
pub use repositories::renewal::{DecisionResult, NewContact, NewDecision, RenewalFilter};
