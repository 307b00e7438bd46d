//! Accounting DTOs

use rust_decimal::Decimal;
use serde::Serialize;

use domain_settlement::{TrialBalance, TrialBalanceEntry};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialBalanceLine {
    pub code: &'static str,
    pub name: &'static str,
    pub kind: &'static str,
    pub debit: Decimal,
    pub credit: Decimal,
}

impl From<&TrialBalanceEntry> for TrialBalanceLine {
    fn from(e: &TrialBalanceEntry) -> Self {
        Self {
            code: e.code,
            name: e.name,
            kind: e.kind.as_str(),
            debit: e.debit.amount(),
            credit: e.credit.amount(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialBalanceResponse {
    pub currency: String,
    pub accounts: Vec<TrialBalanceLine>,
    pub total_debits: Decimal,
    pub total_credits: Decimal,
    pub difference: Decimal,
    pub is_balanced: bool,
}

impl From<&TrialBalance> for TrialBalanceResponse {
    fn from(tb: &TrialBalance) -> Self {
        Self {
            currency: tb.total_debits.currency().code().to_string(),
            accounts: tb.entries.iter().map(TrialBalanceLine::from).collect(),
            total_debits: tb.total_debits.amount(),
            total_credits: tb.total_credits.amount(),
            difference: tb.difference,
            is_balanced: tb.is_balanced,
        }
    }
}
