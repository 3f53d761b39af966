use std::fmt::Write;

use chrono::NaiveDate;

use crate::ledger;
use crate::models::Loan;
use crate::portfolio;
use crate::risk;

pub fn build_report(generated_on: NaiveDate, loans: &[Loan]) -> String {
    let summary = portfolio::summarize(loans);
    let distribution = portfolio::status_distribution(loans);
    let top = portfolio::top_risk(loans, portfolio::TOP_RISK_LIMIT);
    let borrowers = portfolio::borrower_rollups(loans);
    let volume = portfolio::monthly_volume(loans);

    let mut output = String::new();

    let _ = writeln!(output, "# Loan Portfolio Report");
    let _ = writeln!(output, "Generated on {generated_on}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(output, "- Total loans: {}", summary.total_loans);
    let _ = writeln!(output, "- Total principal: {}", summary.total_principal);
    let _ = writeln!(output, "- Overdue loans: {}", summary.overdue_count);
    let _ = writeln!(output, "- Average risk score: {:.1}", summary.average_risk);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Status Mix");
    if loans.is_empty() {
        let _ = writeln!(output, "No loans in this portfolio.");
    } else {
        for (label, count) in [
            ("active", distribution.active),
            ("overdue", distribution.overdue),
            ("paid", distribution.paid),
            ("defaulted", distribution.defaulted),
        ] {
            if count > 0 {
                let _ = writeln!(output, "- {label}: {count}");
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Risk Loans");
    if top.is_empty() {
        let _ = writeln!(output, "No loans in this portfolio.");
    } else {
        for loan in top {
            let state = ledger::reconcile_loan(loan);
            let _ = writeln!(
                output,
                "- {} ({}) risk {} [{}], {} remaining of {} ({:.1}% paid)",
                loan.borrower_name,
                loan.status,
                loan.risk_score,
                risk::risk_band(loan.risk_score).as_str(),
                state.remaining_balance,
                loan.terms.principal,
                state.progress_percent
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Borrowers");
    if borrowers.is_empty() {
        let _ = writeln!(output, "No borrowers in this portfolio.");
    } else {
        for borrower in borrowers.iter() {
            let _ = writeln!(
                output,
                "- {}: {} loans, borrowed {}, outstanding {}, repaid {}, avg rate {:.2}%, avg risk {:.1}",
                borrower.borrower_name,
                borrower.loan_count,
                borrower.total_borrowed,
                borrower.total_outstanding,
                borrower.total_paid,
                borrower.average_interest_rate,
                borrower.average_risk_score
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Monthly Volume");
    if volume.is_empty() {
        let _ = writeln!(output, "No loans in this portfolio.");
    } else {
        for entry in volume.iter() {
            let _ = writeln!(output, "- {}: {}", entry.month.format("%b %Y"), entry.amount);
        }
    }

    output
}
