//! Subscription packages and the periods businesses hold them for

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{days_between, BusinessId, BusinessPackageId, Money, PackageId};
use crate::error::DirectoryError;

/// A subscription tier a business can buy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: PackageId,
    pub name: String,
    pub price: Money,
    pub duration_days: u32,
    /// The free tier every business falls back to; never followed up for renewal
    pub is_default: bool,
    pub is_active: bool,
}

impl Package {
    pub fn new(name: impl Into<String>, price: Money, duration_days: u32) -> Result<Self, DirectoryError> {
        if duration_days == 0 {
            return Err(DirectoryError::InvalidPackage(
                "duration must be at least one day".to_string(),
            ));
        }
        if price.is_negative() {
            return Err(DirectoryError::InvalidPackage(format!(
                "price {} is negative",
                price
            )));
        }
        Ok(Self {
            id: PackageId::new_v7(),
            name: name.into(),
            price,
            duration_days,
            is_default: false,
            is_active: true,
        })
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Fails when the package can no longer be sold
    pub fn ensure_sellable(&self) -> Result<(), DirectoryError> {
        if !self.is_active {
            return Err(DirectoryError::PackageInactive(self.id.to_string()));
        }
        Ok(())
    }
}

/// Status of a business's subscription period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BusinessPackageStatus {
    Active,
    Expired,
    Cancelled,
    /// Superseded by a successor period
    Renewed,
}

impl BusinessPackageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessPackageStatus::Active => "ACTIVE",
            BusinessPackageStatus::Expired => "EXPIRED",
            BusinessPackageStatus::Cancelled => "CANCELLED",
            BusinessPackageStatus::Renewed => "RENEWED",
        }
    }
}

impl fmt::Display for BusinessPackageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BusinessPackageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(BusinessPackageStatus::Active),
            "EXPIRED" => Ok(BusinessPackageStatus::Expired),
            "CANCELLED" => Ok(BusinessPackageStatus::Cancelled),
            "RENEWED" => Ok(BusinessPackageStatus::Renewed),
            other => Err(format!("unknown business package status '{}'", other)),
        }
    }
}

/// One subscription period of a business on a package
///
/// `end_date` is exclusive, but it is also the last day the period can be
/// renewed without a gap: a successor bought on that day starts on it. The
/// period lapses the day after, when `days_remaining` turns negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessPackage {
    pub id: BusinessPackageId,
    pub business_id: BusinessId,
    pub package_id: PackageId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: BusinessPackageStatus,
    pub created_at: DateTime<Utc>,
}

impl BusinessPackage {
    /// Starts a new period on `package` beginning at `start_date`
    pub fn start(business_id: BusinessId, package: &Package, start_date: NaiveDate) -> Self {
        let end_date = start_date
            .checked_add_days(Days::new(u64::from(package.duration_days)))
            .unwrap_or(NaiveDate::MAX);

        Self {
            id: BusinessPackageId::new_v7(),
            business_id,
            package_id: package.id,
            start_date,
            end_date,
            status: BusinessPackageStatus::Active,
            created_at: Utc::now(),
        }
    }

    /// Whole days until the period ends; negative once it has lapsed
    pub fn days_remaining(&self, today: NaiveDate) -> i64 {
        days_between(today, self.end_date)
    }

    /// True once the renewal window has closed
    pub fn has_lapsed(&self, today: NaiveDate) -> bool {
        self.days_remaining(today) < 0
    }

    /// Marks an ACTIVE period EXPIRED once it has lapsed; returns whether
    /// the status changed
    pub fn expire(&mut self, today: NaiveDate) -> bool {
        if self.status == BusinessPackageStatus::Active && self.has_lapsed(today) {
            self.status = BusinessPackageStatus::Expired;
            true
        } else {
            false
        }
    }

    /// Closes this period and returns its successor on `package`
    ///
    /// The successor starts where this period ends, or today when the
    /// period has already lapsed, so paid time is never lost or doubled.
    pub fn renew_with(
        &mut self,
        package: &Package,
        today: NaiveDate,
    ) -> Result<BusinessPackage, DirectoryError> {
        if !matches!(
            self.status,
            BusinessPackageStatus::Active | BusinessPackageStatus::Expired
        ) {
            return Err(DirectoryError::NotRenewable {
                id: self.id.to_string(),
                status: self.status.to_string(),
            });
        }
        package.ensure_sellable()?;

        let start = self.end_date.max(today);
        self.status = BusinessPackageStatus::Renewed;
        Ok(BusinessPackage::start(self.business_id, package, start))
    }
}
