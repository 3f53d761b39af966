//! Imported loans get a flat score keyed on liability kind and the
//! aggregator's overdue flag. This is a separate policy from
//! `risk::score_terms` and the two are never mixed.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use crate::models::{LoanStatus, LoanTerms};
use crate::validation;

const DEFAULT_DUE_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiabilityKind {
    Credit,
    Student,
    Mortgage,
}

impl LiabilityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LiabilityKind::Credit => "credit",
            LiabilityKind::Student => "student",
            LiabilityKind::Mortgage => "mortgage",
        }
    }

    fn default_name(&self) -> &'static str {
        match self {
            LiabilityKind::Credit => "Credit Card",
            LiabilityKind::Student => "Student Loan",
            LiabilityKind::Mortgage => "Mortgage",
        }
    }
}

/// Answers "is this external account behind", not "how risky are these terms".
pub fn aggregator_risk_score(kind: LiabilityKind, is_overdue: bool) -> i32 {
    match (kind, is_overdue) {
        (LiabilityKind::Credit, true) => 75,
        (LiabilityKind::Credit, false) => 30,
        (LiabilityKind::Student, true) => 80,
        (LiabilityKind::Student, false) => 40,
        (LiabilityKind::Mortgage, true) => 85,
        (LiabilityKind::Mortgage, false) => 35,
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LiabilitiesDocument {
    #[serde(default)]
    pub liabilities: Liabilities,
}

#[derive(Debug, Default, Deserialize)]
pub struct Liabilities {
    #[serde(default)]
    pub credit: Vec<CreditLiability>,
    #[serde(default)]
    pub student: Vec<StudentLiability>,
    #[serde(default)]
    pub mortgage: Vec<MortgageLiability>,
}

#[derive(Debug, Deserialize)]
pub struct Apr {
    pub apr_percentage: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct CreditLiability {
    pub name: Option<String>,
    pub last_statement_balance: Option<Decimal>,
    #[serde(default)]
    pub aprs: Vec<Apr>,
    pub next_payment_due_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_overdue: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct StudentLiability {
    pub loan_name: Option<String>,
    pub outstanding_balance: Option<Decimal>,
    pub interest_rate_percentage: Option<Decimal>,
    pub origination_date: Option<NaiveDate>,
    pub next_payment_due_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_overdue: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct MortgageLiability {
    pub property_address: Option<String>,
    pub current_balance: Option<Decimal>,
    pub interest_rate_percentage: Option<Decimal>,
    pub origination_date: Option<NaiveDate>,
    pub next_payment_due_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_overdue: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportedLoan {
    pub kind: LiabilityKind,
    pub borrower_name: String,
    pub terms: LoanTerms,
    pub status: LoanStatus,
    pub risk_score: i32,
}

struct RawLiability {
    kind: LiabilityKind,
    name: Option<String>,
    balance: Option<Decimal>,
    rate: Option<Decimal>,
    start: Option<NaiveDate>,
    due: Option<NaiveDate>,
    is_overdue: bool,
}

fn map_liability(raw: RawLiability, today: NaiveDate) -> Option<ImportedLoan> {
    let principal = raw.balance.unwrap_or(Decimal::ZERO);
    if principal <= Decimal::ZERO {
        warn!(kind = raw.kind.as_str(), "skipping liability without a positive balance");
        return None;
    }

    let annual_rate = raw.rate.unwrap_or(Decimal::ZERO);
    if !validation::rate_in_range(annual_rate) {
        warn!(
            kind = raw.kind.as_str(),
            rate = %annual_rate,
            "skipping liability with an interest rate outside 0-100"
        );
        return None;
    }

    let start_date = raw.start.unwrap_or(today);
    let mut due_date = raw.due.unwrap_or(today + Duration::days(DEFAULT_DUE_DAYS));
    if due_date <= start_date {
        due_date = start_date + Duration::days(DEFAULT_DUE_DAYS);
    }

    Some(ImportedLoan {
        kind: raw.kind,
        borrower_name: raw
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| raw.kind.default_name().to_string()),
        terms: LoanTerms {
            principal,
            annual_rate,
            start_date,
            due_date,
        },
        status: if raw.is_overdue {
            LoanStatus::Overdue
        } else {
            LoanStatus::Active
        },
        risk_score: aggregator_risk_score(raw.kind, raw.is_overdue),
    })
}

pub fn map_liabilities(document: LiabilitiesDocument, today: NaiveDate) -> Vec<ImportedLoan> {
    let Liabilities {
        credit,
        student,
        mortgage,
    } = document.liabilities;

    let credit = credit.into_iter().map(|item| RawLiability {
        kind: LiabilityKind::Credit,
        name: item.name,
        balance: item.last_statement_balance,
        rate: item.aprs.first().and_then(|apr| apr.apr_percentage),
        start: None,
        due: item.next_payment_due_date,
        is_overdue: item.is_overdue.unwrap_or(false),
    });
    let student = student.into_iter().map(|item| RawLiability {
        kind: LiabilityKind::Student,
        name: item.loan_name,
        balance: item.outstanding_balance,
        rate: item.interest_rate_percentage,
        start: item.origination_date,
        due: item.next_payment_due_date,
        is_overdue: item.is_overdue.unwrap_or(false),
    });
    let mortgage = mortgage.into_iter().map(|item| RawLiability {
        kind: LiabilityKind::Mortgage,
        name: item.property_address,
        balance: item.current_balance,
        rate: item.interest_rate_percentage,
        start: item.origination_date,
        due: item.next_payment_due_date,
        is_overdue: item.is_overdue.unwrap_or(false),
    });

    credit
        .chain(student)
        .chain(mortgage)
        .filter_map(|raw| map_liability(raw, today))
        .collect()
}

pub fn parse_liabilities(json: &str) -> anyhow::Result<LiabilitiesDocument> {
    Ok(serde_json::from_str(json)?)
}
