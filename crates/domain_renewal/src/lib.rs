//! Renewal Domain
//!
//! Follows up businesses whose subscription is about to end. A daily job
//! opens a renewal record for each expiring business package; agents then
//! log contacts and record the owner's decision.
//!
//! # Record lifecycle
//!
//! ```text
//! PENDING -> CONTACTED -> VISITED -> RENEWED | DECLINED | POSTPONED
//!     \__________\___________\_______________________________/
//!                              |
//!                           EXPIRED (end date passed)
//! ```
//!
//! RENEWED, DECLINED and EXPIRED are terminal. POSTPONED records keep being
//! refreshed and can still be contacted or decided.
//!
//! # Priority
//!
//! | Days remaining | Priority |
//! |----------------|----------|
//! | <= 3           | 3        |
//! | <= 7           | 2        |
//! | <= 14          | 1        |
//! | otherwise      | 0        |

pub mod status;
pub mod record;
pub mod contact;
pub mod planner;
pub mod ports;
pub mod jobs;
pub mod error;

pub use status::{RenewalStatus, RenewalStats, priority_for};
pub use record::{RenewalRecord, RefreshOutcome, DecisionOutcome};
pub use contact::{ContactType, RenewalContact, RenewalDecision};
pub use planner::{ExpiringPackage, CreationPlan, JobSummary, plan_new_records};
pub use ports::RenewalStore;
pub use jobs::RenewalJobs;
pub use error::RenewalError;
