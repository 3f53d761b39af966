//! Balance bookkeeping over a loan's append-only payment history.
//!
//! Nothing here is persisted: callers re-derive the ledger on every read.
//! `principal` must already be positive; `validation` rejects anything else.

use rust_decimal::Decimal;

use crate::models::{LedgerState, Loan, PaymentRecord};

pub fn total_paid(history: &[PaymentRecord]) -> Decimal {
    history.iter().map(|payment| payment.amount).sum()
}

pub fn reconcile(principal: Decimal, history: &[PaymentRecord]) -> LedgerState {
    let total_paid = total_paid(history);
    LedgerState {
        total_paid,
        remaining_balance: principal - total_paid,
        progress_percent: total_paid / principal * Decimal::ONE_HUNDRED,
    }
}

/// Largest amount the next payment may carry before overpayment tolerance.
pub fn next_payment_cap(principal: Decimal, history: &[PaymentRecord]) -> Decimal {
    principal - total_paid(history)
}

/// Informational only; a loan's status is never changed from here.
pub fn is_fully_paid(state: &LedgerState) -> bool {
    state.remaining_balance <= Decimal::ZERO
}

pub fn reconcile_loan(loan: &Loan) -> LedgerState {
    reconcile(loan.terms.principal, &loan.payment_history)
}

/// Appends an already validated payment, keeping insertion order.
pub fn append_payment(loan: &mut Loan, payment: PaymentRecord) -> LedgerState {
    loan.payment_history.push(payment);
    reconcile_loan(loan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentMethod;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn payment(amount: Decimal, day: u32) -> PaymentRecord {
        PaymentRecord {
            id: Uuid::new_v4(),
            amount,
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            method: PaymentMethod::Cash,
            note: None,
        }
    }

    #[test]
    fn empty_history_leaves_full_balance() {
        let state = reconcile(dec!(1000), &[]);
        assert_eq!(state.total_paid, Decimal::ZERO);
        assert_eq!(state.remaining_balance, dec!(1000));
        assert_eq!(state.progress_percent, Decimal::ZERO);
        assert!(!is_fully_paid(&state));
    }

    #[test]
    fn sums_payments_against_principal() {
        let history = vec![payment(dec!(300), 1), payment(dec!(200), 2)];
        let state = reconcile(dec!(1000), &history);
        assert_eq!(state.total_paid, dec!(500));
        assert_eq!(state.remaining_balance, dec!(500));
        assert_eq!(state.progress_percent, dec!(50));
    }

    #[test]
    fn reconcile_is_repeatable() {
        let history = vec![payment(dec!(123.45), 4), payment(dec!(76.55), 9)];
        assert_eq!(reconcile(dec!(900), &history), reconcile(dec!(900), &history));
    }

    #[test]
    fn payment_order_does_not_change_totals() {
        let a = payment(dec!(10.10), 1);
        let b = payment(dec!(250), 20);
        let c = payment(dec!(0.90), 5);
        let forward = reconcile(dec!(1000), &[a.clone(), b.clone(), c.clone()]);
        let shuffled = reconcile(dec!(1000), &[c, a, b]);
        assert_eq!(forward.total_paid, shuffled.total_paid);
        assert_eq!(forward.remaining_balance, shuffled.remaining_balance);
    }

    #[test]
    fn overpaid_history_goes_negative() {
        let state = reconcile(dec!(100), &[payment(dec!(120), 1)]);
        assert_eq!(state.remaining_balance, dec!(-20));
        assert_eq!(state.progress_percent, dec!(120));
        assert!(is_fully_paid(&state));
    }

    #[test]
    fn cap_tracks_remaining_balance() {
        let history = vec![payment(dec!(400), 1)];
        assert_eq!(next_payment_cap(dec!(1000), &history), dec!(600));
        assert_eq!(next_payment_cap(dec!(1000), &[]), dec!(1000));
    }

    #[test]
    fn exact_payoff_is_fully_paid() {
        let state = reconcile(dec!(750), &[payment(dec!(500), 1), payment(dec!(250), 2)]);
        assert_eq!(state.remaining_balance, Decimal::ZERO);
        assert!(is_fully_paid(&state));
    }
}
