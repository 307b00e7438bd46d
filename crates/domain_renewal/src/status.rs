//! Renewal status and priority rules

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenewalStatus {
    Pending,
    Contacted,
    Visited,
    Renewed,
    Declined,
    Postponed,
    Expired,
}

impl RenewalStatus {
    pub const ALL: [RenewalStatus; 7] = [
        RenewalStatus::Pending,
        RenewalStatus::Contacted,
        RenewalStatus::Visited,
        RenewalStatus::Renewed,
        RenewalStatus::Declined,
        RenewalStatus::Postponed,
        RenewalStatus::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RenewalStatus::Pending => "PENDING",
            RenewalStatus::Contacted => "CONTACTED",
            RenewalStatus::Visited => "VISITED",
            RenewalStatus::Renewed => "RENEWED",
            RenewalStatus::Declined => "DECLINED",
            RenewalStatus::Postponed => "POSTPONED",
            RenewalStatus::Expired => "EXPIRED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RenewalStatus::Renewed | RenewalStatus::Declined | RenewalStatus::Expired
        )
    }
}

impl fmt::Display for RenewalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenewalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RenewalStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown renewal status '{}'", s))
    }
}

/// Follow-up priority for a package with `days_remaining` days left
///
/// Lapsed packages (negative days) are the most urgent.
pub fn priority_for(days_remaining: i64) -> u8 {
    match days_remaining {
        d if d <= 3 => 3,
        d if d <= 7 => 2,
        d if d <= 14 => 1,
        _ => 0,
    }
}

/// Dashboard counters for the renewal pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewalStats {
    pub total: i64,
    pub pending: i64,
    pub contacted: i64,
    pub visited: i64,
    pub postponed: i64,
    pub renewed: i64,
    pub declined: i64,
    pub expired: i64,
    /// Open records at the highest priority
    pub urgent: i64,
    /// Open records with no agent assigned
    pub unassigned: i64,
}

impl RenewalStats {
    /// Adds `count` records in `status` to the tallies
    pub fn add(&mut self, status: RenewalStatus, count: i64) {
        self.total += count;
        let slot = match status {
            RenewalStatus::Pending => &mut self.pending,
            RenewalStatus::Contacted => &mut self.contacted,
            RenewalStatus::Visited => &mut self.visited,
            RenewalStatus::Postponed => &mut self.postponed,
            RenewalStatus::Renewed => &mut self.renewed,
            RenewalStatus::Declined => &mut self.declined,
            RenewalStatus::Expired => &mut self.expired,
        };
        *slot += count;
    }

    /// Share of decided records that renewed, as a percentage
    pub fn renewal_rate(&self) -> f64 {
        let decided = self.renewed + self.declined + self.expired;
        if decided == 0 {
            return 0.0;
        }
        self.renewed as f64 * 100.0 / decided as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_boundaries() {
        assert_eq!(priority_for(-5), 3);
        assert_eq!(priority_for(0), 3);
        assert_eq!(priority_for(3), 3);
        assert_eq!(priority_for(4), 2);
        assert_eq!(priority_for(7), 2);
        assert_eq!(priority_for(8), 1);
        assert_eq!(priority_for(14), 1);
        assert_eq!(priority_for(15), 0);
        assert_eq!(priority_for(30), 0);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(RenewalStatus::Renewed.is_terminal());
        assert!(RenewalStatus::Declined.is_terminal());
        assert!(RenewalStatus::Expired.is_terminal());
        assert!(!RenewalStatus::Postponed.is_terminal());
        assert!(!RenewalStatus::Pending.is_terminal());
    }

    #[test]
    fn test_status_round_trip_through_str() {
        for status in RenewalStatus::ALL {
            assert_eq!(status.as_str().parse::<RenewalStatus>(), Ok(status));
        }
        assert!("LOST".parse::<RenewalStatus>().is_err());
    }

    #[test]
    fn test_stats_tally() {
        let mut stats = RenewalStats::default();
        stats.add(RenewalStatus::Renewed, 3);
        stats.add(RenewalStatus::Declined, 1);
        stats.add(RenewalStatus::Pending, 6);

        assert_eq!(stats.total, 10);
        assert_eq!(stats.renewal_rate(), 75.0);
    }
}
