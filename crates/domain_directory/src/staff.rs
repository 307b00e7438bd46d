//! Staff roles and the profiles that carry commission data

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{GovernorateId, Money, MoneyError, Rate, UserId};
use crate::error::DirectoryError;

/// Platform roles carried in the access token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Supervisor,
    Agent,
    GovernorateManager,
    Accountant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Supervisor => "SUPERVISOR",
            Role::Agent => "AGENT",
            Role::GovernorateManager => "GOVERNORATE_MANAGER",
            Role::Accountant => "ACCOUNTANT",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "SUPERVISOR" => Ok(Role::Supervisor),
            "AGENT" => Ok(Role::Agent),
            "GOVERNORATE_MANAGER" => Ok(Role::GovernorateManager),
            "ACCOUNTANT" => Ok(Role::Accountant),
            other => Err(DirectoryError::UnknownRole(other.to_string())),
        }
    }
}

/// The authenticated user performing an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins and supervisors may act on records they do not own
    pub fn is_back_office(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Supervisor)
    }
}

/// Field agent: collects money and earns commission on it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub user_id: UserId,
    pub full_name: String,
    pub governorate_id: GovernorateId,
    /// Governorate manager who reconciles this agent
    pub manager_id: Option<UserId>,
    pub commission_rate: Rate,
    pub lifetime_earnings: Money,
}

impl AgentProfile {
    /// Adds paid commissions to the running total
    pub fn credit_earnings(&mut self, paid: &Money) -> Result<(), MoneyError> {
        self.lifetime_earnings = self.lifetime_earnings.checked_add(paid)?;
        Ok(())
    }
}

/// Governorate manager: reconciles agents and settles with the admin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerProfile {
    pub user_id: UserId,
    pub full_name: String,
    pub governorate_id: GovernorateId,
    /// Share of governorate revenue owed to the company
    pub company_commission_rate: Rate,
    pub lifetime_earnings: Money,
}

impl ManagerProfile {
    pub fn credit_earnings(&mut self, share: &Money) -> Result<(), MoneyError> {
        self.lifetime_earnings = self.lifetime_earnings.checked_add(share)?;
        Ok(())
    }
}
