//! Custom Test Assertions
//!
//! Assertion helpers that give clearer failure messages than `assert_eq!`
//! on whole domain structs.

use core_kernel::Money;
use domain_settlement::{
    AgentFinancialSettlement, ManagerFinancialSettlement, SettlementStatus, TrialBalance,
};
use rust_decimal::Decimal;

/// Asserts equal currency and amount
pub fn assert_money_eq(actual: &Money, expected: &Money) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );
    assert_eq!(
        actual.amount(),
        expected.amount(),
        "Amount mismatch: actual={}, expected={}",
        actual.amount(),
        expected.amount()
    );
}

/// Asserts a Money value in its own currency equals `amount`
pub fn assert_amount(money: &Money, amount: Decimal) {
    assert_eq!(
        money.amount(),
        amount,
        "Expected {} {}, got {}",
        money.currency().code(),
        amount,
        money
    );
}

/// Asserts that money values sum to a total
pub fn assert_money_sum_equals(parts: &[Money], total: &Money) {
    let sum = Money::sum(parts, total.currency()).expect("Currency mismatch in sum");
    assert_eq!(
        sum.amount(),
        total.amount(),
        "Sum of parts ({}) doesn't equal total ({})",
        sum.amount(),
        total.amount()
    );
}

/// Collected cash splits into commissions kept and cash handed over
pub fn assert_agent_settlement_consistent(settlement: &AgentFinancialSettlement) {
    let split = settlement
        .total_commissions
        .checked_add(&settlement.net_amount)
        .expect("Currency mismatch in settlement");
    assert_eq!(
        split.amount(),
        settlement.total_collected.amount(),
        "Settlement {}: commissions {} + net {} != collected {}",
        settlement.settlement_number,
        settlement.total_commissions,
        settlement.net_amount,
        settlement.total_collected
    );
}

/// Revenue splits into agent commissions, company share, and manager share
pub fn assert_manager_settlement_consistent(settlement: &ManagerFinancialSettlement) {
    let split = Money::sum(
        [
            &settlement.total_agent_commissions,
            &settlement.company_share_amount,
            &settlement.manager_share_amount,
        ],
        settlement.total_revenue.currency(),
    )
    .expect("Currency mismatch in settlement");
    assert_eq!(
        split.amount(),
        settlement.total_revenue.amount(),
        "Settlement {}: shares {} != revenue {}",
        settlement.settlement_number,
        split,
        settlement.total_revenue
    );
    assert!(
        !settlement.manager_share_amount.is_negative(),
        "Settlement {} has a negative manager share",
        settlement.settlement_number
    );
}

pub fn assert_agent_status(settlement: &AgentFinancialSettlement, expected: SettlementStatus) {
    assert_eq!(
        settlement.status, expected,
        "Settlement {} is {}, expected {}",
        settlement.settlement_number, settlement.status, expected
    );
}

/// Asserts debits equal credits and the report says so
pub fn assert_trial_balance_balanced(report: &TrialBalance) {
    assert!(
        report.is_balanced,
        "Trial balance off by {}: debits={}, credits={}",
        report.difference,
        report.total_debits,
        report.total_credits
    );
    assert_eq!(report.total_debits.amount(), report.total_credits.amount());
}

/// Asserts that a result is Ok and returns the value
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($result:expr, $msg:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("{}: {:?}", $msg, e),
        }
    };
}

/// Asserts that an error matches a specific variant
#[macro_export]
macro_rules! assert_err_variant {
    ($result:expr, $pattern:pat) => {
        match $result {
            Ok(value) => panic!("Expected Err matching {}, got Ok({:?})", stringify!($pattern), value),
            Err(ref e) => {
                assert!(
                    matches!(e, $pattern),
                    "Error {:?} does not match pattern {}",
                    e,
                    stringify!($pattern)
                );
            }
        }
    };
}
