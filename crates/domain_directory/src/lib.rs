//! Directory Domain
//!
//! The directory records the settlement and renewal workflows hang off:
//! the geography businesses live in, the packages they subscribe to, and the
//! staff (agents and governorate managers) who sell and reconcile them.
//!
//! # Subscription lifecycle
//!
//! ```text
//! ACTIVE -> RENEWED (successor period created)
//!        -> EXPIRED (end date passed without renewal)
//!        -> CANCELLED
//! ```

pub mod governorate;
pub mod business;
pub mod package;
pub mod staff;
pub mod error;

pub use governorate::Governorate;
pub use business::Business;
pub use package::{Package, BusinessPackage, BusinessPackageStatus};
pub use staff::{Role, Actor, AgentProfile, ManagerProfile};
pub use error::DirectoryError;
