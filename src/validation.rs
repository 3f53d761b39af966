use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{FieldError, ValidationError};
use crate::models::{AlertSeverity, LoanTerms, PaymentMethod, PaymentRecord};

const MIN_NAME_LEN: usize = 2;
const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Clone, Default)]
pub struct LoanDraft {
    pub borrower_name: String,
    pub loan_amount: String,
    pub interest_rate: String,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidLoan {
    pub borrower_name: String,
    pub terms: LoanTerms,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PaymentDraft {
    pub amount: String,
    pub date: Option<NaiveDate>,
    pub method: PaymentMethod,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EsgDraft {
    pub esg_score: String,
    pub carbon_footprint: String,
    pub environmental_score: String,
    pub social_score: String,
    pub governance_score: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidEsg {
    pub esg_score: f64,
    pub carbon_footprint: f64,
    pub environmental_score: f64,
    pub social_score: f64,
    pub governance_score: f64,
    pub notes: String,
}

#[derive(Debug, Clone)]
pub struct AlertDraft {
    pub alert_type: String,
    pub message: String,
    pub severity: AlertSeverity,
}

/// How far a payment may exceed the remaining balance before it is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverpaymentPolicy {
    pub tolerance: Decimal,
}

impl OverpaymentPolicy {
    pub fn allows(&self, amount: Decimal, cap: Decimal) -> bool {
        amount <= cap + self.tolerance
    }
}

pub fn rate_in_range(rate: Decimal) -> bool {
    (Decimal::ZERO..=Decimal::ONE_HUNDRED).contains(&rate)
}

pub fn overpayment(cap: Decimal) -> ValidationError {
    ValidationError {
        errors: vec![over_cap(cap)],
    }
}

fn over_cap(cap: Decimal) -> FieldError {
    FieldError::new("amount", format!("exceeds remaining balance of {cap}"))
}

fn parse_decimal(
    errors: &mut Vec<FieldError>,
    field: &'static str,
    raw: &str,
) -> Option<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() {
        errors.push(FieldError::new(field, "is required"));
        return None;
    }
    match Decimal::from_str(raw) {
        Ok(value) => Some(value),
        Err(_) => {
            errors.push(FieldError::new(field, format!("'{raw}' is not a number")));
            None
        }
    }
}

fn parse_score(errors: &mut Vec<FieldError>, field: &'static str, raw: &str) -> Option<f64> {
    let raw = raw.trim();
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => {
            if (0.0..=100.0).contains(&value) {
                Some(value)
            } else {
                errors.push(FieldError::new(field, "must be between 0 and 100"));
                None
            }
        }
        _ => {
            errors.push(FieldError::new(field, format!("'{raw}' is not a number")));
            None
        }
    }
}

fn finish<T>(errors: Vec<FieldError>, value: Option<T>) -> Result<T, ValidationError> {
    match value {
        Some(value) if errors.is_empty() => Ok(value),
        _ => Err(ValidationError { errors }),
    }
}

pub fn validate_loan(draft: &LoanDraft) -> Result<ValidLoan, ValidationError> {
    let mut errors = Vec::new();

    let name = draft.borrower_name.trim();
    let name_len = name.chars().count();
    if name_len < MIN_NAME_LEN {
        errors.push(FieldError::new(
            "borrower_name",
            format!("must be at least {MIN_NAME_LEN} characters"),
        ));
    } else if name_len > MAX_NAME_LEN {
        errors.push(FieldError::new(
            "borrower_name",
            format!("must be at most {MAX_NAME_LEN} characters"),
        ));
    }

    let principal = parse_decimal(&mut errors, "loan_amount", &draft.loan_amount);
    if let Some(value) = principal {
        if value <= Decimal::ZERO {
            errors.push(FieldError::new("loan_amount", "must be a positive number"));
        }
    }

    let rate = parse_decimal(&mut errors, "interest_rate", &draft.interest_rate);
    if let Some(value) = rate {
        if !rate_in_range(value) {
            errors.push(FieldError::new("interest_rate", "must be between 0 and 100"));
        }
    }

    if draft.start_date.is_none() {
        errors.push(FieldError::new("start_date", "is required"));
    }
    if draft.due_date.is_none() {
        errors.push(FieldError::new("due_date", "is required"));
    }
    if let (Some(start), Some(due)) = (draft.start_date, draft.due_date) {
        if due <= start {
            errors.push(FieldError::new("due_date", "must be after start date"));
        }
    }

    let terms = match (principal, rate, draft.start_date, draft.due_date) {
        (Some(principal), Some(annual_rate), Some(start_date), Some(due_date)) => {
            Some(LoanTerms {
                principal,
                annual_rate,
                start_date,
                due_date,
            })
        }
        _ => None,
    };

    finish(
        errors,
        terms.map(|terms| ValidLoan {
            borrower_name: name.to_string(),
            terms,
            notes: draft
                .notes
                .as_deref()
                .map(str::trim)
                .filter(|notes| !notes.is_empty())
                .map(str::to_string),
        }),
    )
}

/// Checks a payment against the loan's current cap and builds the record to
/// append. `cap` is the remaining balance before this payment.
pub fn validate_payment(
    draft: &PaymentDraft,
    cap: Decimal,
    policy: OverpaymentPolicy,
) -> Result<PaymentRecord, ValidationError> {
    let mut errors = Vec::new();

    let amount = parse_decimal(&mut errors, "amount", &draft.amount);
    if let Some(value) = amount {
        if value <= Decimal::ZERO {
            errors.push(FieldError::new("amount", "must be a positive number"));
        } else if !policy.allows(value, cap) {
            errors.push(over_cap(cap));
        }
    }

    if draft.date.is_none() {
        errors.push(FieldError::new("date", "is required"));
    }

    let record = match (amount, draft.date) {
        (Some(amount), Some(date)) => Some(PaymentRecord {
            id: Uuid::new_v4(),
            amount,
            date,
            method: draft.method,
            note: draft
                .note
                .as_deref()
                .map(str::trim)
                .filter(|note| !note.is_empty())
                .map(str::to_string),
        }),
        _ => None,
    };

    finish(errors, record)
}

pub fn validate_esg(draft: &EsgDraft) -> Result<ValidEsg, ValidationError> {
    let mut errors = Vec::new();

    let esg_score = parse_score(&mut errors, "esg_score", &draft.esg_score);
    let environmental_score =
        parse_score(&mut errors, "environmental_score", &draft.environmental_score);
    let social_score = parse_score(&mut errors, "social_score", &draft.social_score);
    let governance_score =
        parse_score(&mut errors, "governance_score", &draft.governance_score);

    let raw = draft.carbon_footprint.trim();
    let carbon_footprint = match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Some(value),
        Ok(_) => {
            errors.push(FieldError::new("carbon_footprint", "must not be negative"));
            None
        }
        Err(_) => {
            errors.push(FieldError::new(
                "carbon_footprint",
                format!("'{raw}' is not a number"),
            ));
            None
        }
    };

    let metrics = match (
        esg_score,
        carbon_footprint,
        environmental_score,
        social_score,
        governance_score,
    ) {
        (
            Some(esg_score),
            Some(carbon_footprint),
            Some(environmental),
            Some(social),
            Some(governance),
        ) => Some(ValidEsg {
            esg_score,
            carbon_footprint,
            environmental_score: environmental,
            social_score: social,
            governance_score: governance,
            notes: draft.notes.trim().to_string(),
        }),
        _ => None,
    };

    finish(errors, metrics)
}

pub fn validate_alert(draft: &AlertDraft) -> Result<AlertDraft, ValidationError> {
    let mut errors = Vec::new();
    if draft.alert_type.trim().is_empty() {
        errors.push(FieldError::new("type", "is required"));
    }
    if draft.message.trim().is_empty() {
        errors.push(FieldError::new("message", "is required"));
    }
    finish(
        errors,
        Some(AlertDraft {
            alert_type: draft.alert_type.trim().to_string(),
            message: draft.message.trim().to_string(),
            severity: draft.severity,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn loan_draft() -> LoanDraft {
        LoanDraft {
            borrower_name: "Dana Whitfield".to_string(),
            loan_amount: "20000".to_string(),
            interest_rate: "7".to_string(),
            start_date: Some(date(2024, 1, 1)),
            due_date: Some(date(2024, 7, 1)),
            notes: None,
        }
    }

    fn payment_draft(amount: &str) -> PaymentDraft {
        PaymentDraft {
            amount: amount.to_string(),
            date: Some(date(2024, 2, 1)),
            method: PaymentMethod::BankTransfer,
            note: Some("  ".to_string()),
        }
    }

    #[test]
    fn accepts_well_formed_loan() {
        let loan = validate_loan(&loan_draft()).unwrap();
        assert_eq!(loan.borrower_name, "Dana Whitfield");
        assert_eq!(loan.terms.principal, dec!(20000));
        assert_eq!(loan.terms.duration_days(), 182);
        assert_eq!(loan.notes, None);
    }

    #[test]
    fn rejects_non_positive_principal() {
        let mut draft = loan_draft();
        draft.loan_amount = "0".to_string();
        let err = validate_loan(&draft).unwrap_err();
        assert!(err.has_field("loan_amount"));
    }

    #[test]
    fn reports_unparseable_amount_as_field_error() {
        let mut draft = loan_draft();
        draft.loan_amount = "twenty".to_string();
        let err = validate_loan(&draft).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].field, "loan_amount");
        assert!(err.errors[0].message.contains("not a number"));
    }

    #[test]
    fn rate_range_is_inclusive() {
        let mut draft = loan_draft();
        draft.interest_rate = "100".to_string();
        assert!(validate_loan(&draft).is_ok());
        draft.interest_rate = "0".to_string();
        assert!(validate_loan(&draft).is_ok());
        draft.interest_rate = "100.01".to_string();
        assert!(validate_loan(&draft).unwrap_err().has_field("interest_rate"));
    }

    #[test]
    fn name_length_limit_is_inclusive() {
        let mut draft = loan_draft();
        draft.borrower_name = "n".repeat(100);
        assert!(validate_loan(&draft).is_ok());
        draft.borrower_name = "n".repeat(101);
        assert!(validate_loan(&draft).unwrap_err().has_field("borrower_name"));
    }

    #[test]
    fn due_date_must_follow_start_date() {
        let mut draft = loan_draft();
        draft.due_date = draft.start_date;
        let err = validate_loan(&draft).unwrap_err();
        assert_eq!(
            err.errors,
            vec![FieldError::new("due_date", "must be after start date")]
        );
    }

    #[test]
    fn collects_every_failure() {
        let draft = LoanDraft {
            borrower_name: "A".to_string(),
            loan_amount: String::new(),
            interest_rate: "-1".to_string(),
            start_date: None,
            due_date: None,
            notes: None,
        };
        let err = validate_loan(&draft).unwrap_err();
        let fields: Vec<_> = err.errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["borrower_name", "loan_amount", "interest_rate", "start_date", "due_date"]
        );
    }

    #[test]
    fn payment_within_cap_is_accepted() {
        let record =
            validate_payment(&payment_draft("5000"), dec!(20000), OverpaymentPolicy::default())
                .unwrap();
        assert_eq!(record.amount, dec!(5000));
        assert_eq!(record.note, None);
    }

    #[test]
    fn payment_equal_to_cap_is_accepted() {
        let policy = OverpaymentPolicy::default();
        assert!(validate_payment(&payment_draft("250.50"), dec!(250.50), policy).is_ok());
    }

    #[test]
    fn payment_over_cap_is_rejected_not_clamped() {
        let policy = OverpaymentPolicy::default();
        let err = validate_payment(&payment_draft("1000.01"), dec!(1000), policy).unwrap_err();
        assert!(err.errors[0].message.contains("exceeds remaining balance"));
    }

    #[test]
    fn tolerance_widens_the_cap() {
        let policy = OverpaymentPolicy {
            tolerance: dec!(0.05),
        };
        assert!(validate_payment(&payment_draft("1000.05"), dec!(1000), policy).is_ok());
        assert!(validate_payment(&payment_draft("1000.06"), dec!(1000), policy).is_err());
    }

    #[test]
    fn zero_payment_is_rejected() {
        let err = validate_payment(&payment_draft("0"), dec!(1000), OverpaymentPolicy::default())
            .unwrap_err();
        assert_eq!(
            err.errors,
            vec![FieldError::new("amount", "must be a positive number")]
        );
    }

    #[test]
    fn esg_scores_are_bounded() {
        let draft = EsgDraft {
            esg_score: "85".to_string(),
            carbon_footprint: "12.5".to_string(),
            environmental_score: "101".to_string(),
            social_score: "70".to_string(),
            governance_score: "abc".to_string(),
            notes: String::new(),
        };
        let err = validate_esg(&draft).unwrap_err();
        let fields: Vec<_> = err.errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["environmental_score", "governance_score"]);
    }

    #[test]
    fn alert_requires_message() {
        let draft = AlertDraft {
            alert_type: "late_payment".to_string(),
            message: " ".to_string(),
            severity: AlertSeverity::High,
        };
        assert!(validate_alert(&draft).unwrap_err().has_field("message"));
    }
}
