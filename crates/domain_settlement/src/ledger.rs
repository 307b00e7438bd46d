//! Double-entry ledger for the accountant's trial balance
//!
//! The ledger is not stored; it is rebuilt from confirmed settlements each
//! time a report is requested. Every posted transaction must balance.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::BTreeMap;

use core_kernel::{Currency, Money};

use crate::agent_settlement::AgentFinancialSettlement;
use crate::error::SettlementError;
use crate::manager_settlement::ManagerFinancialSettlement;
use crate::status::SettlementStatus;

/// Largest debit/credit difference still reported as balanced
pub const BALANCE_TOLERANCE: Decimal = dec!(0.01);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountKind {
    Asset,
    Revenue,
    Expense,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Asset => "ASSET",
            AccountKind::Revenue => "REVENUE",
            AccountKind::Expense => "EXPENSE",
        }
    }
}

/// Fixed chart of accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerAccount {
    Cash,
    SubscriptionRevenue,
    CommissionExpense,
    ManagerShareExpense,
}

impl LedgerAccount {
    pub fn code(&self) -> &'static str {
        match self {
            LedgerAccount::Cash => "1000",
            LedgerAccount::SubscriptionRevenue => "4000",
            LedgerAccount::CommissionExpense => "5000",
            LedgerAccount::ManagerShareExpense => "5100",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LedgerAccount::Cash => "Cash",
            LedgerAccount::SubscriptionRevenue => "Subscription Revenue",
            LedgerAccount::CommissionExpense => "Commission Expense",
            LedgerAccount::ManagerShareExpense => "Manager Share Expense",
        }
    }

    pub fn kind(&self) -> AccountKind {
        match self {
            LedgerAccount::Cash => AccountKind::Asset,
            LedgerAccount::SubscriptionRevenue => AccountKind::Revenue,
            LedgerAccount::CommissionExpense | LedgerAccount::ManagerShareExpense => {
                AccountKind::Expense
            }
        }
    }

    fn is_debit_normal(&self) -> bool {
        matches!(self.kind(), AccountKind::Asset | AccountKind::Expense)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostingType {
    Debit,
    Credit,
}

#[derive(Debug, Clone)]
pub struct Posting {
    pub account: LedgerAccount,
    /// Always non-negative
    pub amount: Money,
    pub posting_type: PostingType,
}

/// A balanced set of postings
#[derive(Debug, Clone)]
pub struct Transaction {
    pub description: String,
    pub reference: Option<String>,
    pub postings: Vec<Posting>,
}

impl Transaction {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            reference: None,
            postings: Vec::new(),
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn debit(mut self, account: LedgerAccount, amount: Money) -> Self {
        self.postings.push(Posting {
            account,
            amount,
            posting_type: PostingType::Debit,
        });
        self
    }

    pub fn credit(mut self, account: LedgerAccount, amount: Money) -> Self {
        self.postings.push(Posting {
            account,
            amount,
            posting_type: PostingType::Credit,
        });
        self
    }
}

#[derive(Debug, Clone)]
pub struct JournalEntry {
    pub description: String,
    pub reference: Option<String>,
    pub postings: Vec<Posting>,
    pub posted_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct Ledger {
    currency: Currency,
    balances: BTreeMap<LedgerAccount, Money>,
    entries: Vec<JournalEntry>,
}

impl Ledger {
    pub fn new(currency: Currency) -> Self {
        Self {
            currency,
            balances: BTreeMap::new(),
            entries: Vec::new(),
        }
    }

    /// Builds the ledger from confirmed settlements
    ///
    /// Settlements in any other status are ignored.
    pub fn from_confirmed(
        agent_settlements: &[AgentFinancialSettlement],
        manager_settlements: &[ManagerFinancialSettlement],
        currency: Currency,
    ) -> Result<Self, SettlementError> {
        let mut ledger = Ledger::new(currency);

        for s in agent_settlements
            .iter()
            .filter(|s| s.status == SettlementStatus::Confirmed)
        {
            ledger.post(
                Transaction::new("Agent settlement cash received")
                    .with_reference(s.settlement_number.clone())
                    .debit(LedgerAccount::Cash, s.total_collected)
                    .credit(LedgerAccount::SubscriptionRevenue, s.total_collected),
            )?;
            ledger.post(
                Transaction::new("Agent commissions paid")
                    .with_reference(s.settlement_number.clone())
                    .debit(LedgerAccount::CommissionExpense, s.total_commissions)
                    .credit(LedgerAccount::Cash, s.total_commissions),
            )?;
        }

        for s in manager_settlements
            .iter()
            .filter(|s| s.status == SettlementStatus::Confirmed)
        {
            ledger.post(
                Transaction::new("Manager share paid")
                    .with_reference(s.settlement_number.clone())
                    .debit(LedgerAccount::ManagerShareExpense, s.manager_share_amount)
                    .credit(LedgerAccount::Cash, s.manager_share_amount),
            )?;
        }

        Ok(ledger)
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn balance(&self, account: LedgerAccount) -> Money {
        self.balances
            .get(&account)
            .copied()
            .unwrap_or_else(|| Money::zero(self.currency))
    }

    /// Posts a balanced transaction
    ///
    /// Every posting is validated and every new balance computed before any
    /// is stored, so a rejected transaction leaves the ledger untouched.
    pub fn post(&mut self, transaction: Transaction) -> Result<(), SettlementError> {
        self.validate_postings(&transaction)?;

        let mut updated: BTreeMap<LedgerAccount, Money> = BTreeMap::new();
        for posting in &transaction.postings {
            let change = match (posting.account.is_debit_normal(), posting.posting_type) {
                (true, PostingType::Debit) | (false, PostingType::Credit) => posting.amount,
                (true, PostingType::Credit) | (false, PostingType::Debit) => -posting.amount,
            };
            let current = updated
                .get(&posting.account)
                .copied()
                .unwrap_or_else(|| self.balance(posting.account));
            updated.insert(posting.account, current.checked_add(&change)?);
        }

        self.balances.extend(updated);
        self.entries.push(JournalEntry {
            description: transaction.description,
            reference: transaction.reference,
            postings: transaction.postings,
            posted_at: Utc::now(),
        });
        Ok(())
    }

    fn validate_postings(&self, transaction: &Transaction) -> Result<(), SettlementError> {
        for posting in &transaction.postings {
            if posting.amount.is_negative() {
                return Err(SettlementError::InvalidAmount(format!(
                    "negative posting {} to {}",
                    posting.amount,
                    posting.account.name()
                )));
            }
            if posting.amount.currency() != self.currency {
                return Err(SettlementError::InvalidAmount(format!(
                    "posting {} to {} is not in {}",
                    posting.amount,
                    posting.account.name(),
                    self.currency
                )));
            }
        }
        self.validate_balance(transaction)
    }

    fn validate_balance(&self, transaction: &Transaction) -> Result<(), SettlementError> {
        let mut debits = Money::zero(self.currency);
        let mut credits = Money::zero(self.currency);

        for posting in &transaction.postings {
            match posting.posting_type {
                PostingType::Debit => debits = debits.checked_add(&posting.amount)?,
                PostingType::Credit => credits = credits.checked_add(&posting.amount)?,
            }
        }

        if debits != credits {
            return Err(SettlementError::UnbalancedTransaction {
                debits: debits.amount(),
                credits: credits.amount(),
            });
        }
        Ok(())
    }

    /// Account balances on their normal side, with totals
    ///
    /// A balance that has gone against its normal side (e.g. cash paid out
    /// exceeding cash received) is reported on the opposite column.
    pub fn trial_balance(&self) -> TrialBalance {
        let zero = Money::zero(self.currency);
        let mut entries = Vec::new();
        let mut total_debits = zero;
        let mut total_credits = zero;

        for (account, balance) in &self.balances {
            if balance.is_zero() {
                continue;
            }
            let on_normal_side = !balance.is_negative();
            let (debit, credit) = match (account.is_debit_normal(), on_normal_side) {
                (true, true) | (false, false) => (balance.abs(), zero),
                (true, false) | (false, true) => (zero, balance.abs()),
            };

            total_debits = total_debits + debit;
            total_credits = total_credits + credit;
            entries.push(TrialBalanceEntry {
                account: *account,
                code: account.code(),
                name: account.name(),
                kind: account.kind(),
                debit,
                credit,
            });
        }

        let difference = (total_debits.amount() - total_credits.amount()).abs();
        TrialBalance {
            entries,
            total_debits,
            total_credits,
            difference,
            is_balanced: difference <= BALANCE_TOLERANCE,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrialBalance {
    pub entries: Vec<TrialBalanceEntry>,
    pub total_debits: Money,
    pub total_credits: Money,
    pub difference: Decimal,
    pub is_balanced: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrialBalanceEntry {
    pub account: LedgerAccount,
    pub code: &'static str,
    pub name: &'static str,
    pub kind: AccountKind,
    pub debit: Money,
    pub credit: Money,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iqd(amount: Decimal) -> Money {
        Money::new(amount, Currency::IQD)
    }

    #[test]
    fn test_balanced_transaction_posts() {
        let mut ledger = Ledger::new(Currency::IQD);
        let tx = Transaction::new("Cash in")
            .debit(LedgerAccount::Cash, iqd(dec!(1000)))
            .credit(LedgerAccount::SubscriptionRevenue, iqd(dec!(1000)));

        assert!(ledger.post(tx).is_ok());
        assert_eq!(ledger.balance(LedgerAccount::Cash).amount(), dec!(1000));
        assert_eq!(ledger.entries().len(), 1);
    }

    #[test]
    fn test_unbalanced_transaction_rejected() {
        let mut ledger = Ledger::new(Currency::IQD);
        let tx = Transaction::new("Unbalanced")
            .debit(LedgerAccount::Cash, iqd(dec!(1000)))
            .credit(LedgerAccount::SubscriptionRevenue, iqd(dec!(500)));

        assert!(matches!(
            ledger.post(tx),
            Err(SettlementError::UnbalancedTransaction { .. })
        ));
        assert!(ledger.balance(LedgerAccount::Cash).is_zero());
    }

    #[test]
    fn test_negative_posting_leaves_ledger_untouched() {
        let mut ledger = Ledger::new(Currency::IQD);
        // debits and credits agree, but one credit is negative
        let tx = Transaction::new("Bad split")
            .debit(LedgerAccount::Cash, iqd(dec!(100)))
            .credit(LedgerAccount::SubscriptionRevenue, iqd(dec!(150)))
            .credit(LedgerAccount::SubscriptionRevenue, iqd(dec!(-50)));

        assert!(matches!(ledger.post(tx), Err(SettlementError::InvalidAmount(_))));
        assert!(ledger.balance(LedgerAccount::Cash).is_zero());
        assert!(ledger.balance(LedgerAccount::SubscriptionRevenue).is_zero());
        assert!(ledger.entries().is_empty());
        assert!(ledger.trial_balance().is_balanced);
    }

    #[test]
    fn test_foreign_currency_posting_rejected() {
        let mut ledger = Ledger::new(Currency::IQD);
        let usd = Money::new(dec!(10), Currency::USD);
        let tx = Transaction::new("Dollars")
            .debit(LedgerAccount::Cash, usd)
            .credit(LedgerAccount::SubscriptionRevenue, usd);

        assert!(ledger.post(tx).is_err());
        assert!(ledger.entries().is_empty());
    }

    #[test]
    fn test_trial_balance_normal_sides() {
        let mut ledger = Ledger::new(Currency::IQD);
        ledger
            .post(
                Transaction::new("Cash in")
                    .debit(LedgerAccount::Cash, iqd(dec!(1000)))
                    .credit(LedgerAccount::SubscriptionRevenue, iqd(dec!(1000))),
            )
            .unwrap();
        ledger
            .post(
                Transaction::new("Commission")
                    .debit(LedgerAccount::CommissionExpense, iqd(dec!(100)))
                    .credit(LedgerAccount::Cash, iqd(dec!(100))),
            )
            .unwrap();

        let tb = ledger.trial_balance();
        assert!(tb.is_balanced);
        assert_eq!(tb.total_debits.amount(), dec!(1000));
        assert_eq!(tb.total_credits.amount(), dec!(1000));

        let revenue = tb
            .entries
            .iter()
            .find(|e| e.account == LedgerAccount::SubscriptionRevenue)
            .unwrap();
        assert_eq!(revenue.credit.amount(), dec!(1000));
        assert!(revenue.debit.is_zero());
    }
}
