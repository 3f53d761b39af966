use rust_decimal::Decimal;

use crate::models::LoanTerms;

pub const MAX_RISK_SCORE: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskBand::Low => "low",
            RiskBand::Medium => "medium",
            RiskBand::High => "high",
        }
    }
}

/// Snapshot risk of a loan's terms, computed once when the loan is written.
///
/// Terms are assumed to have passed `validation::validate_loan`. The three
/// bands top out at 30 + 30 + 20, so the cap at 100 never binds.
pub fn score_terms(terms: &LoanTerms) -> i32 {
    let total = principal_weight(terms.principal)
        + rate_weight(terms.annual_rate)
        + duration_weight(terms.duration_days());
    total.min(MAX_RISK_SCORE)
}

pub fn principal_weight(principal: Decimal) -> i32 {
    if principal > Decimal::from(100_000) {
        30
    } else if principal > Decimal::from(50_000) {
        20
    } else if principal > Decimal::from(10_000) {
        10
    } else {
        5
    }
}

pub fn rate_weight(annual_rate: Decimal) -> i32 {
    if annual_rate > Decimal::from(15) {
        30
    } else if annual_rate > Decimal::TEN {
        20
    } else if annual_rate > Decimal::from(5) {
        10
    } else {
        5
    }
}

pub fn duration_weight(days: i64) -> i32 {
    match days {
        d if d > 365 => 20,
        d if d > 180 => 15,
        d if d > 90 => 10,
        _ => 5,
    }
}

pub fn risk_band(score: i32) -> RiskBand {
    match score {
        s if s >= 70 => RiskBand::High,
        s if s >= 40 => RiskBand::Medium,
        _ => RiskBand::Low,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use rust_decimal_macros::dec;

    fn terms(principal: Decimal, rate: Decimal, days: i64) -> LoanTerms {
        let start_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        LoanTerms {
            principal,
            annual_rate: rate,
            start_date,
            due_date: start_date + Duration::days(days),
        }
    }

    #[test]
    fn lowest_bands_sum_to_fifteen() {
        assert_eq!(score_terms(&terms(dec!(10000), dec!(5), 90)), 15);
        assert_eq!(score_terms(&terms(dec!(0.01), dec!(0), 1)), 15);
        assert_eq!(score_terms(&terms(dec!(9999.99), dec!(4.99), 45)), 15);
    }

    #[test]
    fn highest_bands_reach_eighty_not_one_hundred() {
        assert_eq!(score_terms(&terms(dec!(100000.01), dec!(15.01), 366)), 80);
        assert_eq!(score_terms(&terms(dec!(5000000), dec!(100), 3650)), 80);
    }

    #[test]
    fn thresholds_are_strict() {
        assert_eq!(principal_weight(dec!(100000)), 20);
        assert_eq!(principal_weight(dec!(50000)), 10);
        assert_eq!(principal_weight(dec!(10000)), 5);
        assert_eq!(rate_weight(dec!(15)), 20);
        assert_eq!(rate_weight(dec!(10)), 10);
        assert_eq!(rate_weight(dec!(5)), 5);
        assert_eq!(duration_weight(365), 15);
        assert_eq!(duration_weight(180), 10);
        assert_eq!(duration_weight(90), 5);
    }

    #[test]
    fn weights_follow_expected_tiers() {
        assert_eq!(principal_weight(dec!(100001)), 30);
        assert_eq!(principal_weight(dec!(75000)), 20);
        assert_eq!(principal_weight(dec!(10000.50)), 10);
        assert_eq!(rate_weight(dec!(18)), 30);
        assert_eq!(rate_weight(dec!(12.5)), 20);
        assert_eq!(rate_weight(dec!(7)), 10);
        assert_eq!(duration_weight(400), 20);
        assert_eq!(duration_weight(181), 15);
        assert_eq!(duration_weight(91), 10);
    }

    #[test]
    fn six_month_loan_scores_thirty_five() {
        let start_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let due_date = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let terms = LoanTerms {
            principal: dec!(20000),
            annual_rate: dec!(7),
            start_date,
            due_date,
        };
        assert_eq!(score_terms(&terms), 35);
    }

    #[test]
    fn bands_split_at_forty_and_seventy() {
        assert_eq!(risk_band(15), RiskBand::Low);
        assert_eq!(risk_band(39), RiskBand::Low);
        assert_eq!(risk_band(40), RiskBand::Medium);
        assert_eq!(risk_band(69), RiskBand::Medium);
        assert_eq!(risk_band(70), RiskBand::High);
    }
}
