use serde::Deserialize;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::PgStore;
use crate::models::{Alert, Loan};
use crate::portfolio;
use crate::service::LoanStore;

pub const CHANNEL: &str = "loan_ledger_changes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangedTable {
    Loans,
    Alerts,
}

/// Notifications carry keys only; Postgres caps a payload at 8000 bytes and
/// payment histories grow without bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ChangeNotice {
    pub table: ChangedTable,
    pub op: ChangeKind,
    pub id: Uuid,
    pub user_id: Uuid,
}

/// A notice with the row as re-read after it; `None` when the row is gone.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    Loan(ChangeKind, Uuid, Option<Loan>),
    Alert(ChangeKind, Uuid, Option<Alert>),
}

pub fn decode_notice(payload: &str) -> anyhow::Result<ChangeNotice> {
    Ok(serde_json::from_str(payload)?)
}

/// Inserts go to the front, matching newest-first listings.
pub fn apply_loan_change(loans: &mut Vec<Loan>, kind: ChangeKind, id: Uuid, loan: Option<Loan>) {
    match (kind, loan) {
        (ChangeKind::Delete, _) | (_, None) => loans.retain(|current| current.id != id),
        (ChangeKind::Insert, Some(loan)) => {
            loans.retain(|current| current.id != id);
            loans.insert(0, loan);
        }
        (ChangeKind::Update, Some(loan)) => {
            if let Some(slot) = loans.iter_mut().find(|current| current.id == id) {
                *slot = loan;
            }
        }
    }
}

pub fn apply_alert_change(
    alerts: &mut Vec<Alert>,
    kind: ChangeKind,
    id: Uuid,
    alert: Option<Alert>,
) {
    match (kind, alert) {
        (ChangeKind::Delete, _) | (_, None) => alerts.retain(|current| current.id != id),
        (ChangeKind::Insert, Some(alert)) => {
            alerts.retain(|current| current.id != id);
            alerts.insert(0, alert);
        }
        (ChangeKind::Update, Some(alert)) => {
            if let Some(slot) = alerts.iter_mut().find(|current| current.id == id) {
                *slot = alert;
            }
        }
    }
}

pub fn apply_event(loans: &mut Vec<Loan>, alerts: &mut Vec<Alert>, event: ChangeEvent) {
    match event {
        ChangeEvent::Loan(kind, id, loan) => {
            match (kind, &loan) {
                (ChangeKind::Insert, Some(loan)) => {
                    info!(loan_id = %id, borrower = %loan.borrower_name, "New loan added")
                }
                (ChangeKind::Delete, _) => info!(loan_id = %id, "Loan deleted"),
                _ => info!(loan_id = %id, "Loan updated"),
            }
            apply_loan_change(loans, kind, id, loan);
        }
        ChangeEvent::Alert(kind, id, alert) => {
            if let (ChangeKind::Insert, Some(alert)) = (kind, &alert) {
                warn!(
                    alert_id = %id,
                    severity = %alert.severity,
                    "New alert: {}",
                    alert.message
                );
            }
            apply_alert_change(alerts, kind, id, alert);
        }
    }
}

async fn resolve(store: &PgStore, notice: ChangeNotice) -> anyhow::Result<ChangeEvent> {
    let reread = notice.op != ChangeKind::Delete;
    Ok(match notice.table {
        ChangedTable::Loans => {
            let loan = if reread {
                store.fetch_loan(notice.user_id, notice.id).await?
            } else {
                None
            };
            ChangeEvent::Loan(notice.op, notice.id, loan)
        }
        ChangedTable::Alerts => {
            let alert = if reread {
                store.fetch_alert(notice.user_id, notice.id).await?
            } else {
                None
            };
            ChangeEvent::Alert(notice.op, notice.id, alert)
        }
    })
}

pub async fn watch(
    pool: &PgPool,
    user_id: Uuid,
    mut loans: Vec<Loan>,
    mut alerts: Vec<Alert>,
) -> anyhow::Result<()> {
    let store = PgStore::new(pool.clone());
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(CHANNEL).await?;
    info!(channel = CHANNEL, loans = loans.len(), "watching for changes");

    loop {
        let notification = listener.recv().await?;
        let notice = match decode_notice(notification.payload()) {
            Ok(notice) => notice,
            Err(err) => {
                warn!(error = %err, "ignoring malformed change notification");
                continue;
            }
        };
        if notice.user_id != user_id {
            debug!("change belongs to another user");
            continue;
        }

        let event = resolve(&store, notice).await?;
        apply_event(&mut loans, &mut alerts, event);

        let summary = portfolio::summarize(&loans);
        let unread = alerts.iter().filter(|alert| !alert.read).count();
        println!(
            "{} loans, {} principal, {} overdue, average risk {:.1}, {} unread alerts",
            summary.total_loans,
            summary.total_principal,
            summary.overdue_count,
            summary.average_risk,
            unread
        );
    }
}
