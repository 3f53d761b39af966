use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool, Row};
use tracing::{info, warn};
use uuid::Uuid;

use crate::aggregator::ImportedLoan;
use crate::ledger;
use crate::models::{Alert, EsgMetrics, Loan, LoanStatus, LoanTerms, PaymentMethod, PaymentRecord};
use crate::risk;
use crate::service::{AppendOutcome, LoanStore};
use crate::validation::{self, LoanDraft, OverpaymentPolicy};

const LOAN_COLUMNS: &str = "id, user_id, borrower_name, loan_amount, interest_rate, \
     start_date, due_date, status, risk_score, payment_history, notes, created_at";

const ALERT_COLUMNS: &str =
    "id, loan_id, user_id, alert_type, message, severity, triggered_at, read, resolved";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn loan_from_row(row: &PgRow) -> anyhow::Result<Loan> {
    let status: String = row.try_get("status")?;
    let Json(payment_history): Json<Vec<PaymentRecord>> = row.try_get("payment_history")?;

    Ok(Loan {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        borrower_name: row.try_get("borrower_name")?,
        terms: LoanTerms {
            principal: row.try_get("loan_amount")?,
            annual_rate: row.try_get("interest_rate")?,
            start_date: row.try_get("start_date")?,
            due_date: row.try_get("due_date")?,
        },
        status: status.parse()?,
        risk_score: row.try_get("risk_score")?,
        payment_history,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
    })
}

fn alert_from_row(row: &PgRow) -> anyhow::Result<Alert> {
    let severity: String = row.try_get("severity")?;
    Ok(Alert {
        id: row.try_get("id")?,
        loan_id: row.try_get("loan_id")?,
        user_id: row.try_get("user_id")?,
        alert_type: row.try_get("alert_type")?,
        message: row.try_get("message")?,
        severity: severity.parse()?,
        triggered_at: row.try_get("triggered_at")?,
        read: row.try_get("read")?,
        resolved: row.try_get("resolved")?,
    })
}

struct NewLoanRow<'a> {
    user_id: Uuid,
    borrower_name: &'a str,
    terms: &'a LoanTerms,
    status: LoanStatus,
    risk_score: i32,
    notes: Option<&'a str>,
    source_key: Option<&'a str>,
    created_at: DateTime<Utc>,
}

/// Returns false when this user already imported `source_key`.
async fn insert_loan_row<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    row: NewLoanRow<'_>,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO loan_ledger.loans
        (id, user_id, borrower_name, loan_amount, interest_rate, start_date, due_date,
         status, risk_score, payment_history, notes, source_key, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, '[]'::jsonb, $10, $11, $12)
        ON CONFLICT (user_id, source_key) DO NOTHING
        "#,
    )
    .bind(id)
    .bind(row.user_id)
    .bind(row.borrower_name)
    .bind(row.terms.principal)
    .bind(row.terms.annual_rate)
    .bind(row.terms.start_date)
    .bind(row.terms.due_date)
    .bind(row.status.as_str())
    .bind(row.risk_score)
    .bind(row.notes)
    .bind(row.source_key)
    .bind(row.created_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Postgres-backed [`LoanStore`], scoped per user on every query.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn fetch_alert(
        &self,
        user_id: Uuid,
        alert_id: Uuid,
    ) -> anyhow::Result<Option<Alert>> {
        let row = sqlx::query(&format!(
            "SELECT {ALERT_COLUMNS} FROM loan_ledger.alerts WHERE id = $1 AND user_id = $2"
        ))
        .bind(alert_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(alert_from_row).transpose()
    }
}

impl LoanStore for PgStore {
    async fn insert_loan(&self, loan: &Loan) -> anyhow::Result<()> {
        insert_loan_row(
            &self.pool,
            loan.id,
            NewLoanRow {
                user_id: loan.user_id,
                borrower_name: &loan.borrower_name,
                terms: &loan.terms,
                status: loan.status,
                risk_score: loan.risk_score,
                notes: loan.notes.as_deref(),
                source_key: None,
                created_at: loan.created_at,
            },
        )
        .await?;
        Ok(())
    }

    async fn fetch_loans(&self, user_id: Uuid) -> anyhow::Result<Vec<Loan>> {
        let rows = sqlx::query(&format!(
            "SELECT {LOAN_COLUMNS} FROM loan_ledger.loans \
             WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(loan_from_row).collect()
    }

    async fn fetch_loan(&self, user_id: Uuid, loan_id: Uuid) -> anyhow::Result<Option<Loan>> {
        let row = sqlx::query(&format!(
            "SELECT {LOAN_COLUMNS} FROM loan_ledger.loans WHERE id = $1 AND user_id = $2"
        ))
        .bind(loan_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(loan_from_row).transpose()
    }

    async fn append_payment(
        &self,
        user_id: Uuid,
        loan_id: Uuid,
        payment: &PaymentRecord,
        policy: OverpaymentPolicy,
    ) -> anyhow::Result<AppendOutcome> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {LOAN_COLUMNS} FROM loan_ledger.loans \
             WHERE id = $1 AND user_id = $2 FOR UPDATE"
        ))
        .bind(loan_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            return Ok(AppendOutcome::Missing);
        };
        let mut loan = loan_from_row(&row)?;

        let cap = ledger::next_payment_cap(loan.terms.principal, &loan.payment_history);
        if !policy.allows(payment.amount, cap) {
            return Ok(AppendOutcome::OverCap(cap));
        }

        sqlx::query(
            "UPDATE loan_ledger.loans \
             SET payment_history = payment_history || $2, updated_at = now() \
             WHERE id = $1",
        )
        .bind(loan_id)
        .bind(Json([payment]))
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        ledger::append_payment(&mut loan, payment.clone());
        Ok(AppendOutcome::Appended(loan))
    }

    async fn update_status(
        &self,
        user_id: Uuid,
        loan_id: Uuid,
        status: LoanStatus,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE loan_ledger.loans SET status = $3, updated_at = now() \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(loan_id)
        .bind(user_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_loan(&self, user_id: Uuid, loan_id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM loan_ledger.loans WHERE id = $1 AND user_id = $2")
            .bind(loan_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn fetch_alerts(
        &self,
        user_id: Uuid,
        loan_id: Option<Uuid>,
        limit: i64,
    ) -> anyhow::Result<Vec<Alert>> {
        let mut query =
            format!("SELECT {ALERT_COLUMNS} FROM loan_ledger.alerts WHERE user_id = $1");
        if loan_id.is_some() {
            query.push_str(" AND loan_id = $3");
        }
        query.push_str(" ORDER BY triggered_at DESC LIMIT $2");

        let mut rows = sqlx::query(&query).bind(user_id).bind(limit);
        if let Some(value) = loan_id {
            rows = rows.bind(value);
        }

        let records = rows.fetch_all(&self.pool).await?;
        records.iter().map(alert_from_row).collect()
    }

    async fn insert_alert(&self, alert: &Alert) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO loan_ledger.alerts
            (id, loan_id, user_id, alert_type, message, severity, triggered_at, read, resolved)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(alert.id)
        .bind(alert.loan_id)
        .bind(alert.user_id)
        .bind(&alert.alert_type)
        .bind(&alert.message)
        .bind(alert.severity.as_str())
        .bind(alert.triggered_at)
        .bind(alert.read)
        .bind(alert.resolved)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_alert(
        &self,
        user_id: Uuid,
        alert_id: Uuid,
        read: Option<bool>,
        resolved: Option<bool>,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE loan_ledger.alerts
            SET read = COALESCE($3, read), resolved = COALESCE($4, resolved)
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(alert_id)
        .bind(user_id)
        .bind(read)
        .bind(resolved)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn fetch_esg(&self, loan_id: Uuid) -> anyhow::Result<Option<EsgMetrics>> {
        let row = sqlx::query(
            r#"
            SELECT id, loan_id, esg_score, carbon_footprint, environmental_score,
                   social_score, governance_score, notes, created_at
            FROM loan_ledger.esg_metrics
            WHERE loan_id = $1
            "#,
        )
        .bind(loan_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(EsgMetrics {
            id: row.try_get("id")?,
            loan_id: row.try_get("loan_id")?,
            esg_score: row.try_get("esg_score")?,
            carbon_footprint: row.try_get("carbon_footprint")?,
            environmental_score: row.try_get("environmental_score")?,
            social_score: row.try_get("social_score")?,
            governance_score: row.try_get("governance_score")?,
            notes: row.try_get("notes")?,
            created_at: row.try_get("created_at")?,
        }))
    }

    async fn insert_esg(&self, metrics: &EsgMetrics) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO loan_ledger.esg_metrics
            (id, loan_id, esg_score, carbon_footprint, environmental_score,
             social_score, governance_score, notes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (loan_id) DO UPDATE
            SET esg_score = EXCLUDED.esg_score,
                carbon_footprint = EXCLUDED.carbon_footprint,
                environmental_score = EXCLUDED.environmental_score,
                social_score = EXCLUDED.social_score,
                governance_score = EXCLUDED.governance_score,
                notes = EXCLUDED.notes
            "#,
        )
        .bind(metrics.id)
        .bind(metrics.loan_id)
        .bind(metrics.esg_score)
        .bind(metrics.carbon_footprint)
        .bind(metrics.environmental_score)
        .bind(metrics.social_score)
        .bind(metrics.governance_score)
        .bind(&metrics.notes)
        .bind(metrics.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

pub async fn seed(pool: &PgPool, user_id: Uuid) -> anyhow::Result<usize> {
    let date = |y: i32, m: u32, d: u32| {
        NaiveDate::from_ymd_opt(y, m, d).context("invalid seed date")
    };

    let loans = vec![
        (
            "seed-001",
            "Avery Lee",
            "20000",
            "7",
            date(2024, 1, 1)?,
            date(2024, 7, 1)?,
            LoanStatus::Active,
            vec![("5000", date(2024, 2, 1)?, PaymentMethod::BankTransfer)],
        ),
        (
            "seed-002",
            "Jules Moreno",
            "125000",
            "16.5",
            date(2023, 6, 15)?,
            date(2026, 6, 15)?,
            LoanStatus::Overdue,
            vec![
                ("2500", date(2023, 7, 15)?, PaymentMethod::Check),
                ("2500", date(2023, 8, 15)?, PaymentMethod::Check),
            ],
        ),
        (
            "seed-003",
            "Kiara Patel",
            "8000",
            "4.25",
            date(2024, 3, 1)?,
            date(2024, 5, 1)?,
            LoanStatus::Paid,
            vec![("8000", date(2024, 4, 30)?, PaymentMethod::Cash)],
        ),
        (
            "seed-004",
            "Avery Lee",
            "60000",
            "11",
            date(2024, 9, 1)?,
            date(2025, 9, 1)?,
            LoanStatus::Active,
            Vec::new(),
        ),
    ];

    let mut inserted = 0usize;
    for (source_key, name, amount, rate, start_date, due_date, status, payments) in loans {
        let valid = validation::validate_loan(&LoanDraft {
            borrower_name: name.to_string(),
            loan_amount: amount.to_string(),
            interest_rate: rate.to_string(),
            start_date: Some(start_date),
            due_date: Some(due_date),
            notes: None,
        })?;
        let id = Uuid::new_v4();
        let fresh = insert_loan_row(
            pool,
            id,
            NewLoanRow {
                user_id,
                borrower_name: &valid.borrower_name,
                terms: &valid.terms,
                status,
                risk_score: risk::score_terms(&valid.terms),
                notes: None,
                source_key: Some(source_key),
                created_at: Utc::now(),
            },
        )
        .await?;
        if !fresh {
            continue;
        }

        let history: Vec<PaymentRecord> = payments
            .into_iter()
            .map(|(amount, date, method)| -> anyhow::Result<PaymentRecord> {
                Ok(PaymentRecord {
                    id: Uuid::new_v4(),
                    amount: amount.parse::<Decimal>()?,
                    date,
                    method,
                    note: None,
                })
            })
            .collect::<anyhow::Result<_>>()?;

        sqlx::query("UPDATE loan_ledger.loans SET payment_history = $2 WHERE id = $1")
            .bind(id)
            .bind(Json(&history))
            .execute(pool)
            .await?;
        inserted += 1;
    }

    Ok(inserted)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportStats {
    pub inserted: usize,
    pub duplicates: usize,
    pub rejected: usize,
}

pub async fn import_csv(
    pool: &PgPool,
    user_id: Uuid,
    csv_path: &std::path::Path,
) -> anyhow::Result<ImportStats> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        borrower_name: String,
        loan_amount: String,
        interest_rate: String,
        start_date: NaiveDate,
        due_date: NaiveDate,
        source_key: Option<String>,
        notes: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut stats = ImportStats::default();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        let draft = LoanDraft {
            borrower_name: row.borrower_name,
            loan_amount: row.loan_amount,
            interest_rate: row.interest_rate,
            start_date: Some(row.start_date),
            due_date: Some(row.due_date),
            notes: row.notes,
        };
        let valid = match validation::validate_loan(&draft) {
            Ok(valid) => valid,
            Err(err) => {
                warn!(line = index + 2, error = %err, "skipping invalid loan row");
                stats.rejected += 1;
                continue;
            }
        };

        let source_key = row
            .source_key
            .filter(|key| !key.trim().is_empty())
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let fresh = insert_loan_row(
            pool,
            Uuid::new_v4(),
            NewLoanRow {
                user_id,
                borrower_name: &valid.borrower_name,
                terms: &valid.terms,
                status: LoanStatus::Active,
                risk_score: risk::score_terms(&valid.terms),
                notes: valid.notes.as_deref(),
                source_key: Some(&source_key),
                created_at: Utc::now(),
            },
        )
        .await?;

        if fresh {
            stats.inserted += 1;
        } else {
            stats.duplicates += 1;
        }
    }

    info!(
        inserted = stats.inserted,
        duplicates = stats.duplicates,
        rejected = stats.rejected,
        "csv import finished"
    );
    Ok(stats)
}

/// All rows land or none do.
pub async fn import_liabilities(
    pool: &PgPool,
    user_id: Uuid,
    loans: &[ImportedLoan],
) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await?;
    for loan in loans {
        insert_loan_row(
            &mut *tx,
            Uuid::new_v4(),
            NewLoanRow {
                user_id,
                borrower_name: &loan.borrower_name,
                terms: &loan.terms,
                status: loan.status,
                risk_score: loan.risk_score,
                notes: Some(loan.kind.as_str()),
                source_key: None,
                created_at: Utc::now(),
            },
        )
        .await
        .with_context(|| format!("failed to import liability '{}'", loan.borrower_name))?;
    }
    tx.commit().await?;

    info!(imported = loans.len(), "liability import finished");
    Ok(loans.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::models::AlertSeverity;
    use crate::service::{ConfiguredIdentity, LoanService};
    use crate::validation::{AlertDraft, PaymentDraft};
    use rust_decimal_macros::dec;
    use sqlx::postgres::PgPoolOptions;

    async fn connect() -> PgPool {
        let url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a scratch database");
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect(&url)
            .await
            .unwrap();
        init_db(&pool).await.unwrap();
        pool
    }

    fn service(pool: &PgPool) -> LoanService<PgStore, ConfiguredIdentity> {
        LoanService::new(
            PgStore::new(pool.clone()),
            ConfiguredIdentity(Some(Uuid::new_v4())),
            OverpaymentPolicy::default(),
        )
    }

    fn loan_draft(notes: Option<String>) -> LoanDraft {
        LoanDraft {
            borrower_name: "Tomasz Wren".to_string(),
            loan_amount: "20000".to_string(),
            interest_rate: "7".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            due_date: NaiveDate::from_ymd_opt(2024, 7, 1),
            notes,
        }
    }

    fn payment(amount: &str, note: Option<String>) -> PaymentDraft {
        PaymentDraft {
            amount: amount.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 2, 1),
            method: PaymentMethod::BankTransfer,
            note,
        }
    }

    #[tokio::test]
    #[ignore = "requires Postgres, run with DATABASE_URL set and --ignored"]
    async fn long_histories_and_notes_are_stored() {
        let pool = connect().await;
        let service = service(&pool);

        let loan = service
            .create_loan(&loan_draft(Some("x".repeat(9000))))
            .await
            .unwrap();
        for _ in 0..120 {
            service.add_payment(loan.id, &payment("10", None)).await.unwrap();
        }
        service
            .add_payment(loan.id, &payment("10", Some("y".repeat(9000))))
            .await
            .unwrap();

        let detail = service.loan_detail(loan.id).await.unwrap();
        assert_eq!(detail.loan.payment_history.len(), 121);
        assert_eq!(detail.ledger.total_paid, dec!(1210));
        assert_eq!(detail.loan.notes.map(|notes| notes.len()), Some(9000));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[ignore = "requires Postgres, run with DATABASE_URL set and --ignored"]
    async fn concurrent_payments_cannot_overdraw() {
        let pool = connect().await;
        let service = service(&pool);
        let loan = service.create_loan(&loan_draft(None)).await.unwrap();

        let first_payment = payment("15000", None);
        let second_payment = payment("15000", None);
        let (first, second) = tokio::join!(
            service.add_payment(loan.id, &first_payment),
            service.add_payment(loan.id, &second_payment)
        );
        assert_eq!(usize::from(first.is_ok()) + usize::from(second.is_ok()), 1);
        let rejected = first.err().or(second.err()).unwrap();
        assert!(matches!(rejected, LedgerError::Invalid(ref v) if v.has_field("amount")));

        let detail = service.loan_detail(loan.id).await.unwrap();
        assert_eq!(detail.ledger.total_paid, dec!(15000));
        assert_eq!(detail.ledger.remaining_balance, dec!(5000));
    }

    #[tokio::test]
    #[ignore = "requires Postgres, run with DATABASE_URL set and --ignored"]
    async fn alerts_filter_by_loan() {
        let pool = connect().await;
        let service = service(&pool);
        let first = service.create_loan(&loan_draft(None)).await.unwrap();
        let second = service.create_loan(&loan_draft(None)).await.unwrap();

        for loan_id in [first.id, first.id, second.id] {
            let draft = AlertDraft {
                alert_type: "late_payment".to_string(),
                message: "Payment 10 days late".to_string(),
                severity: AlertSeverity::High,
            };
            service.raise_alert(loan_id, &draft).await.unwrap();
        }

        assert_eq!(service.alerts().await.unwrap().len(), 3);
        let detail = service.loan_detail(first.id).await.unwrap();
        assert_eq!(detail.alerts.len(), 2);
        assert!(detail.alerts.iter().all(|alert| alert.loan_id == first.id));

        let alert = &detail.alerts[0];
        service.mark_alert_read(alert.id).await.unwrap();
        let store = PgStore::new(pool.clone());
        let stored = store.fetch_alert(alert.user_id, alert.id).await.unwrap().unwrap();
        assert!(stored.read);
        assert!(!stored.resolved);
    }

    #[tokio::test]
    #[ignore = "requires Postgres, run with DATABASE_URL set and --ignored"]
    async fn csv_import_skips_duplicates_and_invalid_rows() {
        let pool = connect().await;
        let user_id = Uuid::new_v4();
        let path = std::env::temp_dir().join(format!("loan-ledger-{}.csv", Uuid::new_v4()));
        std::fs::write(
            &path,
            "borrower_name,loan_amount,interest_rate,start_date,due_date,source_key,notes\n\
             Avery Lee,20000,7,2024-01-01,2024-07-01,row-1,\n\
             Kiara Patel,8000,4.25,2024-03-01,2024-05-01,row-2,bridge loan\n\
             Bad Dates,5000,3,2024-05-01,2024-04-01,row-3,\n",
        )
        .unwrap();

        let first = import_csv(&pool, user_id, &path).await.unwrap();
        assert_eq!(
            first,
            ImportStats {
                inserted: 2,
                duplicates: 0,
                rejected: 1
            }
        );
        let second = import_csv(&pool, user_id, &path).await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.duplicates, 2);

        // Source keys are scoped per user.
        let other = import_csv(&pool, Uuid::new_v4(), &path).await.unwrap();
        assert_eq!(other.inserted, 2);
        std::fs::remove_file(&path).unwrap();

        let loans = PgStore::new(pool.clone()).fetch_loans(user_id).await.unwrap();
        assert_eq!(loans.len(), 2);
        assert!(loans.iter().all(|loan| loan.status == LoanStatus::Active));
    }

    #[tokio::test]
    #[ignore = "requires Postgres, run with DATABASE_URL set and --ignored"]
    async fn liability_import_lands_every_row() {
        let pool = connect().await;
        let user_id = Uuid::new_v4();
        let document = crate::aggregator::parse_liabilities(
            r#"{"liabilities": {"credit": [
                {"name": "Everyday Card", "last_statement_balance": 800, "aprs": [{"apr_percentage": 19.99}]},
                {"name": "Payday Line", "last_statement_balance": 400, "aprs": [{"apr_percentage": 120}]}
            ]}}"#,
        )
        .unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
        let loans = crate::aggregator::map_liabilities(document, today);

        assert_eq!(import_liabilities(&pool, user_id, &loans).await.unwrap(), 1);
        let stored = PgStore::new(pool.clone()).fetch_loans(user_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].risk_score, 30);
    }
}
