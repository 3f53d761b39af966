use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::ledger;
use crate::models::{
    Alert, BorrowerSummary, EsgMetrics, LedgerState, Loan, LoanStatus, PaymentRecord,
    PortfolioSummary,
};
use crate::portfolio;
use crate::risk;
use crate::validation::{self, AlertDraft, EsgDraft, LoanDraft, OverpaymentPolicy, PaymentDraft};

pub const ALERT_LIST_LIMIT: i64 = 50;

pub trait IdentityProvider {
    fn current_user(&self) -> anyhow::Result<Uuid>;
}

/// Identity fixed at startup from configuration.
#[derive(Debug, Clone, Copy)]
pub struct ConfiguredIdentity(pub Option<Uuid>);

impl IdentityProvider for ConfiguredIdentity {
    fn current_user(&self) -> anyhow::Result<Uuid> {
        self.0
            .ok_or_else(|| anyhow::anyhow!("LOAN_LEDGER_USER_ID must be set to act on loans"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppendOutcome {
    Appended(Loan),
    Missing,
    /// Refused; carries the cap seen under the row lock.
    OverCap(Decimal),
}

/// Durable state: loan terms, payment history, alerts and ESG records.
/// Derived ledger values are never stored.
pub trait LoanStore {
    async fn insert_loan(&self, loan: &Loan) -> anyhow::Result<()>;
    async fn fetch_loans(&self, user_id: Uuid) -> anyhow::Result<Vec<Loan>>;
    async fn fetch_loan(&self, user_id: Uuid, loan_id: Uuid) -> anyhow::Result<Option<Loan>>;
    /// Re-checks the cap against the stored history and appends atomically.
    async fn append_payment(
        &self,
        user_id: Uuid,
        loan_id: Uuid,
        payment: &PaymentRecord,
        policy: OverpaymentPolicy,
    ) -> anyhow::Result<AppendOutcome>;
    async fn update_status(
        &self,
        user_id: Uuid,
        loan_id: Uuid,
        status: LoanStatus,
    ) -> anyhow::Result<bool>;
    async fn delete_loan(&self, user_id: Uuid, loan_id: Uuid) -> anyhow::Result<bool>;
    async fn fetch_alerts(
        &self,
        user_id: Uuid,
        loan_id: Option<Uuid>,
        limit: i64,
    ) -> anyhow::Result<Vec<Alert>>;
    async fn insert_alert(&self, alert: &Alert) -> anyhow::Result<()>;
    async fn update_alert(
        &self,
        user_id: Uuid,
        alert_id: Uuid,
        read: Option<bool>,
        resolved: Option<bool>,
    ) -> anyhow::Result<bool>;
    async fn fetch_esg(&self, loan_id: Uuid) -> anyhow::Result<Option<EsgMetrics>>;
    async fn insert_esg(&self, metrics: &EsgMetrics) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct LoanDetail {
    pub loan: Loan,
    pub ledger: LedgerState,
    pub alerts: Vec<Alert>,
    pub esg: Option<EsgMetrics>,
}

pub struct LoanService<S, I> {
    store: S,
    identity: I,
    overpayment: OverpaymentPolicy,
}

impl<S: LoanStore, I: IdentityProvider> LoanService<S, I> {
    pub fn new(store: S, identity: I, overpayment: OverpaymentPolicy) -> Self {
        Self {
            store,
            identity,
            overpayment,
        }
    }

    async fn owned_loan(&self, user_id: Uuid, loan_id: Uuid) -> LedgerResult<Loan> {
        self.store
            .fetch_loan(user_id, loan_id)
            .await?
            .ok_or(LedgerError::NotFound(loan_id))
    }

    pub async fn create_loan(&self, draft: &LoanDraft) -> LedgerResult<Loan> {
        let user_id = self.identity.current_user()?;
        let valid = validation::validate_loan(draft)?;
        let risk_score = risk::score_terms(&valid.terms);

        let loan = Loan {
            id: Uuid::new_v4(),
            user_id,
            borrower_name: valid.borrower_name,
            terms: valid.terms,
            status: LoanStatus::Active,
            risk_score,
            payment_history: Vec::new(),
            notes: valid.notes,
            created_at: Utc::now(),
        };
        self.store.insert_loan(&loan).await?;
        info!(loan_id = %loan.id, borrower = %loan.borrower_name, risk_score, "Loan created");
        Ok(loan)
    }

    pub async fn add_payment(
        &self,
        loan_id: Uuid,
        draft: &PaymentDraft,
    ) -> LedgerResult<(Loan, LedgerState)> {
        let user_id = self.identity.current_user()?;
        let loan = self.owned_loan(user_id, loan_id).await?;

        let cap = ledger::next_payment_cap(loan.terms.principal, &loan.payment_history);
        let payment = validation::validate_payment(draft, cap, self.overpayment)?;
        let amount = payment.amount;

        let loan = match self
            .store
            .append_payment(user_id, loan_id, &payment, self.overpayment)
            .await?
        {
            AppendOutcome::Appended(loan) => loan,
            AppendOutcome::Missing => return Err(LedgerError::NotFound(loan_id)),
            AppendOutcome::OverCap(cap) => {
                warn!(loan_id = %loan_id, %amount, %cap, "Payment refused at append");
                return Err(validation::overpayment(cap).into());
            }
        };
        let state = ledger::reconcile_loan(&loan);
        info!(
            loan_id = %loan_id,
            %amount,
            remaining = %state.remaining_balance,
            "Payment recorded"
        );
        Ok((loan, state))
    }

    pub async fn set_status(&self, loan_id: Uuid, status: LoanStatus) -> LedgerResult<()> {
        let user_id = self.identity.current_user()?;
        if !self.store.update_status(user_id, loan_id, status).await? {
            return Err(LedgerError::NotFound(loan_id));
        }
        info!(loan_id = %loan_id, status = %status, "Status updated");
        Ok(())
    }

    pub async fn delete_loan(&self, loan_id: Uuid) -> LedgerResult<()> {
        let user_id = self.identity.current_user()?;
        if !self.store.delete_loan(user_id, loan_id).await? {
            return Err(LedgerError::NotFound(loan_id));
        }
        info!(loan_id = %loan_id, "Loan deleted");
        Ok(())
    }

    pub async fn loan_detail(&self, loan_id: Uuid) -> LedgerResult<LoanDetail> {
        let user_id = self.identity.current_user()?;
        let loan = self.owned_loan(user_id, loan_id).await?;
        let alerts = self
            .store
            .fetch_alerts(user_id, Some(loan_id), ALERT_LIST_LIMIT)
            .await?;
        let esg = self.store.fetch_esg(loan_id).await?;
        Ok(LoanDetail {
            ledger: ledger::reconcile_loan(&loan),
            loan,
            alerts,
            esg,
        })
    }

    pub async fn loans(&self) -> LedgerResult<Vec<Loan>> {
        let user_id = self.identity.current_user()?;
        Ok(self.store.fetch_loans(user_id).await?)
    }

    pub async fn portfolio(&self) -> LedgerResult<(Vec<Loan>, PortfolioSummary)> {
        let loans = self.loans().await?;
        let summary = portfolio::summarize(&loans);
        Ok((loans, summary))
    }

    pub async fn borrower(&self, borrower_name: &str) -> LedgerResult<Option<BorrowerSummary>> {
        let loans = self.loans().await?;
        Ok(portfolio::borrower_summary(borrower_name, &loans))
    }

    pub async fn alerts(&self) -> LedgerResult<Vec<Alert>> {
        let user_id = self.identity.current_user()?;
        Ok(self
            .store
            .fetch_alerts(user_id, None, ALERT_LIST_LIMIT)
            .await?)
    }

    pub async fn raise_alert(&self, loan_id: Uuid, draft: &AlertDraft) -> LedgerResult<Alert> {
        let user_id = self.identity.current_user()?;
        let draft = validation::validate_alert(draft)?;
        self.owned_loan(user_id, loan_id).await?;

        let alert = Alert {
            id: Uuid::new_v4(),
            loan_id,
            user_id,
            alert_type: draft.alert_type,
            message: draft.message,
            severity: draft.severity,
            triggered_at: Utc::now(),
            read: false,
            resolved: false,
        };
        self.store.insert_alert(&alert).await?;
        info!(alert_id = %alert.id, loan_id = %loan_id, severity = %alert.severity, "Alert raised");
        Ok(alert)
    }

    pub async fn mark_alert_read(&self, alert_id: Uuid) -> LedgerResult<()> {
        let user_id = self.identity.current_user()?;
        if !self
            .store
            .update_alert(user_id, alert_id, Some(true), None)
            .await?
        {
            return Err(LedgerError::AlertNotFound(alert_id));
        }
        Ok(())
    }

    pub async fn resolve_alert(&self, alert_id: Uuid) -> LedgerResult<()> {
        let user_id = self.identity.current_user()?;
        if !self
            .store
            .update_alert(user_id, alert_id, None, Some(true))
            .await?
        {
            return Err(LedgerError::AlertNotFound(alert_id));
        }
        info!(alert_id = %alert_id, "Alert resolved");
        Ok(())
    }

    pub async fn record_esg(&self, loan_id: Uuid, draft: &EsgDraft) -> LedgerResult<EsgMetrics> {
        let user_id = self.identity.current_user()?;
        let valid = validation::validate_esg(draft)?;
        self.owned_loan(user_id, loan_id).await?;

        let metrics = EsgMetrics {
            id: Uuid::new_v4(),
            loan_id,
            esg_score: valid.esg_score,
            carbon_footprint: valid.carbon_footprint,
            environmental_score: valid.environmental_score,
            social_score: valid.social_score,
            governance_score: valid.governance_score,
            notes: valid.notes,
            created_at: Utc::now(),
        };
        self.store.insert_esg(&metrics).await?;
        info!(loan_id = %loan_id, esg_score = metrics.esg_score, "ESG metrics added");
        Ok(metrics)
    }
}

pub fn esg_rating(score: f64) -> &'static str {
    if score >= 80.0 {
        "Excellent"
    } else if score >= 60.0 {
        "Good"
    } else if score >= 40.0 {
        "Fair"
    } else {
        "Poor"
    }
}
