//! Settlement state machine shared by both reconciliation levels

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SettlementError;

/// Which link of the chain a settlement reconciles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementLevel {
    /// Agent settles with their governorate manager
    Agent,
    /// Governorate manager settles with the admin
    Manager,
}

impl SettlementLevel {
    /// The pending status awaiting the counterparty at this level
    pub fn pending_status(&self) -> SettlementStatus {
        match self {
            SettlementLevel::Agent => SettlementStatus::PendingManager,
            SettlementLevel::Manager => SettlementStatus::PendingAdmin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementStatus {
    Draft,
    PendingManager,
    PendingAdmin,
    Confirmed,
    Cancelled,
}

impl SettlementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementStatus::Draft => "DRAFT",
            SettlementStatus::PendingManager => "PENDING_MANAGER",
            SettlementStatus::PendingAdmin => "PENDING_ADMIN",
            SettlementStatus::Confirmed => "CONFIRMED",
            SettlementStatus::Cancelled => "CANCELLED",
        }
    }

    /// Draft or awaiting the counterparty
    pub fn is_open(&self) -> bool {
        !self.is_terminal()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SettlementStatus::Confirmed | SettlementStatus::Cancelled)
    }

    /// Validates a transition for a settlement at `level`
    pub fn transition(
        self,
        level: SettlementLevel,
        target: SettlementStatus,
        settlement: &str,
    ) -> Result<SettlementStatus, SettlementError> {
        use SettlementStatus::*;

        if self == Confirmed {
            return Err(SettlementError::AlreadyConfirmed(settlement.to_string()));
        }

        let pending = level.pending_status();
        let allowed = match (self, target) {
            (Draft, t) if t == pending => true,
            (Draft, Cancelled) => true,
            (s, Confirmed) if s == pending => true,
            (s, Cancelled) if s == pending => true,
            _ => false,
        };

        if !allowed {
            return Err(SettlementError::InvalidStatusTransition {
                from: self.to_string(),
                to: target.to_string(),
            });
        }
        Ok(target)
    }
}

impl fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettlementStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(SettlementStatus::Draft),
            "PENDING_MANAGER" => Ok(SettlementStatus::PendingManager),
            "PENDING_ADMIN" => Ok(SettlementStatus::PendingAdmin),
            "CONFIRMED" => Ok(SettlementStatus::Confirmed),
            "CANCELLED" => Ok(SettlementStatus::Cancelled),
            other => Err(format!("unknown settlement status '{}'", other)),
        }
    }
}
