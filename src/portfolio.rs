use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::ledger;
use crate::models::{
    BorrowerSummary, Loan, LoanStatus, MonthlyVolume, PortfolioSummary, StatusDistribution,
};

pub const TOP_RISK_LIMIT: usize = 10;

pub fn summarize(loans: &[Loan]) -> PortfolioSummary {
    let total_principal = loans.iter().map(|loan| loan.terms.principal).sum();
    let overdue_count = loans
        .iter()
        .filter(|loan| loan.status == LoanStatus::Overdue)
        .count();

    PortfolioSummary {
        total_loans: loans.len(),
        total_principal,
        overdue_count,
        average_risk: mean_risk(loans.iter()),
    }
}

fn mean_risk<'a>(loans: impl Iterator<Item = &'a Loan>) -> f64 {
    let (count, total) = loans.fold((0usize, 0i64), |(count, total), loan| {
        (count + 1, total + i64::from(loan.risk_score))
    });
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

pub fn status_distribution(loans: &[Loan]) -> StatusDistribution {
    let mut distribution = StatusDistribution::default();
    for loan in loans {
        match loan.status {
            LoanStatus::Active => distribution.active += 1,
            LoanStatus::Overdue => distribution.overdue += 1,
            LoanStatus::Paid => distribution.paid += 1,
            LoanStatus::Defaulted => distribution.defaulted += 1,
        }
    }
    distribution
}

/// Highest risk first; ties keep collection order.
pub fn top_risk(loans: &[Loan], limit: usize) -> Vec<&Loan> {
    let mut ranked: Vec<&Loan> = loans.iter().collect();
    ranked.sort_by(|a, b| b.risk_score.cmp(&a.risk_score));
    ranked.truncate(limit);
    ranked
}

pub fn monthly_volume(loans: &[Loan]) -> Vec<MonthlyVolume> {
    let mut months: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for loan in loans {
        let start = loan.terms.start_date;
        let month = start.with_day(1).unwrap_or(start);
        *months.entry(month).or_insert(Decimal::ZERO) += loan.terms.principal;
    }
    months
        .into_iter()
        .map(|(month, amount)| MonthlyVolume { month, amount })
        .collect()
}

pub fn borrower_summary(borrower_name: &str, loans: &[Loan]) -> Option<BorrowerSummary> {
    let owned: Vec<&Loan> = loans
        .iter()
        .filter(|loan| loan.borrower_name == borrower_name)
        .collect();
    summarize_borrower(borrower_name, &owned)
}

/// One summary per borrower name, sorted by total borrowed, largest first.
pub fn borrower_rollups(loans: &[Loan]) -> Vec<BorrowerSummary> {
    let mut groups: HashMap<&str, Vec<&Loan>> = HashMap::new();
    for loan in loans {
        groups.entry(loan.borrower_name.as_str()).or_default().push(loan);
    }

    let mut summaries: Vec<BorrowerSummary> = groups
        .into_iter()
        .filter_map(|(name, owned)| summarize_borrower(name, &owned))
        .collect();
    summaries.sort_by(|a, b| {
        b.total_borrowed
            .cmp(&a.total_borrowed)
            .then_with(|| a.borrower_name.cmp(&b.borrower_name))
    });
    summaries
}

fn summarize_borrower(borrower_name: &str, loans: &[&Loan]) -> Option<BorrowerSummary> {
    if loans.is_empty() {
        return None;
    }

    let mut summary = BorrowerSummary {
        borrower_name: borrower_name.to_string(),
        loan_count: loans.len(),
        total_borrowed: Decimal::ZERO,
        total_outstanding: Decimal::ZERO,
        total_paid: Decimal::ZERO,
        active_count: 0,
        overdue_count: 0,
        paid_count: 0,
        average_interest_rate: Decimal::ZERO,
        average_risk_score: mean_risk(loans.iter().copied()),
    };

    let mut rate_total = Decimal::ZERO;
    for loan in loans {
        summary.total_borrowed += loan.terms.principal;
        rate_total += loan.terms.annual_rate;
        if loan.status.is_open() {
            summary.total_outstanding += ledger::reconcile_loan(loan).remaining_balance;
        }
        match loan.status {
            LoanStatus::Active => summary.active_count += 1,
            LoanStatus::Overdue => summary.overdue_count += 1,
            LoanStatus::Paid => {
                summary.paid_count += 1;
                summary.total_paid += loan.terms.principal;
            }
            LoanStatus::Defaulted => {}
        }
    }
    summary.average_interest_rate = rate_total / Decimal::from(loans.len());

    Some(summary)
}
