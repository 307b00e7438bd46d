//! Contact attempts and owner decisions

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{RenewalContactId, RenewalId, UserId};

use crate::status::RenewalStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContactType {
    Call,
    Visit,
    Whatsapp,
    Sms,
    Email,
}

impl ContactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactType::Call => "CALL",
            ContactType::Visit => "VISIT",
            ContactType::Whatsapp => "WHATSAPP",
            ContactType::Sms => "SMS",
            ContactType::Email => "EMAIL",
        }
    }
}

impl fmt::Display for ContactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContactType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CALL" => Ok(ContactType::Call),
            "VISIT" => Ok(ContactType::Visit),
            "WHATSAPP" => Ok(ContactType::Whatsapp),
            "SMS" => Ok(ContactType::Sms),
            "EMAIL" => Ok(ContactType::Email),
            other => Err(format!("unknown contact type '{}'", other)),
        }
    }
}

/// What the business owner decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenewalDecision {
    Accepted,
    Declined,
    Thinking,
    Upgrade,
    Downgrade,
}

impl RenewalDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenewalDecision::Accepted => "ACCEPTED",
            RenewalDecision::Declined => "DECLINED",
            RenewalDecision::Thinking => "THINKING",
            RenewalDecision::Upgrade => "UPGRADE",
            RenewalDecision::Downgrade => "DOWNGRADE",
        }
    }

    /// Record status after this decision
    pub fn target_status(&self) -> RenewalStatus {
        match self {
            RenewalDecision::Accepted | RenewalDecision::Upgrade | RenewalDecision::Downgrade => {
                RenewalStatus::Renewed
            }
            RenewalDecision::Declined => RenewalStatus::Declined,
            RenewalDecision::Thinking => RenewalStatus::Postponed,
        }
    }

    /// Whether the decision produces a successor business package
    pub fn is_renewing(&self) -> bool {
        self.target_status() == RenewalStatus::Renewed
    }

    /// Changing package requires naming the new one
    pub fn requires_package(&self) -> bool {
        matches!(self, RenewalDecision::Upgrade | RenewalDecision::Downgrade)
    }
}

impl fmt::Display for RenewalDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenewalDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACCEPTED" => Ok(RenewalDecision::Accepted),
            "DECLINED" => Ok(RenewalDecision::Declined),
            "THINKING" => Ok(RenewalDecision::Thinking),
            "UPGRADE" => Ok(RenewalDecision::Upgrade),
            "DOWNGRADE" => Ok(RenewalDecision::Downgrade),
            other => Err(format!("unknown renewal decision '{}'", other)),
        }
    }
}

/// One logged contact attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewalContact {
    pub id: RenewalContactId,
    pub renewal_id: RenewalId,
    pub agent_id: UserId,
    pub contact_type: ContactType,
    pub notes: Option<String>,
    pub outcome: Option<String>,
    pub next_follow_up: Option<NaiveDate>,
    pub contacted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_targets() {
        assert_eq!(RenewalDecision::Accepted.target_status(), RenewalStatus::Renewed);
        assert_eq!(RenewalDecision::Upgrade.target_status(), RenewalStatus::Renewed);
        assert_eq!(RenewalDecision::Downgrade.target_status(), RenewalStatus::Renewed);
        assert_eq!(RenewalDecision::Declined.target_status(), RenewalStatus::Declined);
        assert_eq!(RenewalDecision::Thinking.target_status(), RenewalStatus::Postponed);
    }

    #[test]
    fn test_only_package_changes_require_package() {
        assert!(RenewalDecision::Upgrade.requires_package());
        assert!(RenewalDecision::Downgrade.requires_package());
        assert!(!RenewalDecision::Accepted.requires_package());
    }

    #[test]
    fn test_contact_type_serde() {
        let json = serde_json::to_string(&ContactType::Whatsapp).unwrap();
        assert_eq!(json, "\"WHATSAPP\"");
    }
}
