use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Active,
    Overdue,
    Paid,
    Defaulted,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Overdue => "overdue",
            LoanStatus::Paid => "paid",
            LoanStatus::Defaulted => "defaulted",
        }
    }

    /// Active and overdue loans still carry an outstanding balance.
    pub fn is_open(&self) -> bool {
        matches!(self, LoanStatus::Active | LoanStatus::Overdue)
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoanStatus {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(LoanStatus::Active),
            "overdue" => Ok(LoanStatus::Overdue),
            "paid" => Ok(LoanStatus::Paid),
            "defaulted" => Ok(LoanStatus::Defaulted),
            other => anyhow::bail!("unknown loan status '{other}'"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    Check,
    Cash,
    CreditCard,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Check => "check",
            PaymentMethod::Cash => "cash",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::Other => "other",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "check" => Ok(PaymentMethod::Check),
            "cash" => Ok(PaymentMethod::Cash),
            "credit_card" => Ok(PaymentMethod::CreditCard),
            "other" => Ok(PaymentMethod::Other),
            other => anyhow::bail!("unknown payment method '{other}'"),
        }
    }
}

/// Terms a loan is written on. Fixed once the loan exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub principal: Decimal,
    /// Nominal annual rate as a percentage, e.g. `7.5` for 7.5%.
    pub annual_rate: Decimal,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
}

impl LoanTerms {
    pub fn duration_days(&self) -> i64 {
        (self.due_date - self.start_date).num_days()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Loan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub borrower_name: String,
    pub terms: LoanTerms,
    pub status: LoanStatus,
    pub risk_score: i32,
    /// Insertion order, which is not necessarily payment-date order.
    pub payment_history: Vec<PaymentRecord>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "low",
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertSeverity {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(AlertSeverity::Low),
            "medium" => Ok(AlertSeverity::Medium),
            "high" => Ok(AlertSeverity::High),
            other => anyhow::bail!("unknown alert severity '{other}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub user_id: Uuid,
    pub alert_type: String,
    pub message: String,
    pub severity: AlertSeverity,
    pub triggered_at: DateTime<Utc>,
    pub read: bool,
    pub resolved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EsgMetrics {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub esg_score: f64,
    /// Tons of CO2 equivalent.
    pub carbon_footprint: f64,
    pub environmental_score: f64,
    pub social_score: f64,
    pub governance_score: f64,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

/// Balance facts derived from a loan's principal and payment history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerState {
    pub total_paid: Decimal,
    pub remaining_balance: Decimal,
    pub progress_percent: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSummary {
    pub total_loans: usize,
    pub total_principal: Decimal,
    pub overdue_count: usize,
    pub average_risk: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BorrowerSummary {
    pub borrower_name: String,
    pub loan_count: usize,
    pub total_borrowed: Decimal,
    pub total_outstanding: Decimal,
    pub total_paid: Decimal,
    pub active_count: usize,
    pub overdue_count: usize,
    pub paid_count: usize,
    pub average_interest_rate: Decimal,
    pub average_risk_score: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusDistribution {
    pub active: usize,
    pub overdue: usize,
    pub paid: usize,
    pub defaulted: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyVolume {
    /// First day of the month.
    pub month: NaiveDate,
    pub amount: Decimal,
}
