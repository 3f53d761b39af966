use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use uuid::Uuid;

mod aggregator;
mod config;
mod db;
mod error;
mod ledger;
mod models;
mod portfolio;
mod realtime;
mod report;
mod risk;
mod service;
mod validation;

use crate::config::Config;
use crate::db::PgStore;
use crate::models::{AlertSeverity, LoanStatus, PaymentMethod};
use crate::service::{ConfiguredIdentity, IdentityProvider, LoanService};
use crate::validation::{AlertDraft, EsgDraft, LoanDraft, PaymentDraft};

#[derive(Parser)]
#[command(name = "loan-ledger")]
#[command(about = "Loan portfolio tracker with risk scoring and payment reconciliation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a small realistic portfolio for the current user
    Seed,
    /// Import loans from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Import liabilities already fetched from a bank aggregator
    ImportLiabilities {
        #[arg(long)]
        json: PathBuf,
    },
    /// Create a loan; its risk score is computed from the terms
    Create {
        #[arg(long)]
        borrower: String,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        rate: String,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        due: NaiveDate,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Record a payment against a loan
    Pay {
        loan_id: Uuid,
        #[arg(long)]
        amount: String,
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "bank_transfer")]
        method: PaymentMethod,
        #[arg(long)]
        note: Option<String>,
    },
    /// Set a loan's status explicitly
    Status { loan_id: Uuid, status: LoanStatus },
    /// Delete a loan with its payments, alerts and ESG metrics
    Delete { loan_id: Uuid },
    /// Show one loan with its reconciled balance
    Show { loan_id: Uuid },
    /// List loans, newest first
    List {
        #[arg(long)]
        status: Option<LoanStatus>,
        #[arg(long, default_value_t = 25)]
        limit: usize,
    },
    /// Portfolio totals
    Summary,
    /// Rollup for a single borrower
    Borrower { name: String },
    /// Most recent alerts
    Alerts,
    /// Raise an alert on a loan
    RaiseAlert {
        loan_id: Uuid,
        #[arg(long = "type")]
        alert_type: String,
        #[arg(long)]
        message: String,
        #[arg(long, default_value = "medium")]
        severity: AlertSeverity,
    },
    /// Mark an alert as read
    ReadAlert { alert_id: Uuid },
    /// Mark an alert as resolved
    ResolveAlert { alert_id: Uuid },
    /// Record ESG metrics for a loan
    Esg {
        loan_id: Uuid,
        #[arg(long)]
        score: String,
        #[arg(long)]
        carbon: String,
        #[arg(long)]
        environmental: String,
        #[arg(long)]
        social: String,
        #[arg(long)]
        governance: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Follow loan and alert changes as they happen
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    let identity = ConfiguredIdentity(config.user_id);
    let service = LoanService::new(PgStore::new(pool.clone()), identity, config.overpayment);
    let today = Utc::now().date_naive();

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let inserted = db::seed(&pool, identity.current_user()?).await?;
            println!("Seeded {inserted} loans.");
        }
        Commands::Import { csv } => {
            let stats = db::import_csv(&pool, identity.current_user()?, &csv).await?;
            println!(
                "Inserted {} loans from {} ({} duplicates, {} rejected).",
                stats.inserted,
                csv.display(),
                stats.duplicates,
                stats.rejected
            );
        }
        Commands::ImportLiabilities { json } => {
            let raw = std::fs::read_to_string(&json)
                .with_context(|| format!("failed to read {}", json.display()))?;
            let document = aggregator::parse_liabilities(&raw)
                .with_context(|| format!("{} is not a liabilities document", json.display()))?;
            let loans = aggregator::map_liabilities(document, today);
            let inserted =
                db::import_liabilities(&pool, identity.current_user()?, &loans).await?;
            println!("Imported {inserted} liabilities from {}.", json.display());
        }
        Commands::Create {
            borrower,
            amount,
            rate,
            start,
            due,
            notes,
        } => {
            let loan = service
                .create_loan(&LoanDraft {
                    borrower_name: borrower,
                    loan_amount: amount,
                    interest_rate: rate,
                    start_date: Some(start),
                    due_date: Some(due),
                    notes,
                })
                .await?;
            println!(
                "Created loan {} for {} with risk score {} ({}).",
                loan.id,
                loan.borrower_name,
                loan.risk_score,
                risk::risk_band(loan.risk_score).as_str()
            );
        }
        Commands::Pay {
            loan_id,
            amount,
            date,
            method,
            note,
        } => {
            let (_, state) = service
                .add_payment(
                    loan_id,
                    &PaymentDraft {
                        amount,
                        date: Some(date.unwrap_or(today)),
                        method,
                        note,
                    },
                )
                .await?;
            println!(
                "Payment recorded. Paid {} so far, {} remaining ({:.1}%).",
                state.total_paid, state.remaining_balance, state.progress_percent
            );
        }
        Commands::Status { loan_id, status } => {
            service.set_status(loan_id, status).await?;
            println!("Loan {loan_id} is now {status}.");
        }
        Commands::Delete { loan_id } => {
            service.delete_loan(loan_id).await?;
            println!("Loan {loan_id} deleted.");
        }
        Commands::Show { loan_id } => {
            let detail = service.loan_detail(loan_id).await?;
            let loan = &detail.loan;
            println!("{} ({})", loan.borrower_name, loan.id);
            println!(
                "  {} at {}% from {} to {} ({} days)",
                loan.terms.principal,
                loan.terms.annual_rate,
                loan.terms.start_date,
                loan.terms.due_date,
                loan.terms.duration_days()
            );
            println!(
                "  status {}, risk {} ({})",
                loan.status,
                loan.risk_score,
                risk::risk_band(loan.risk_score).as_str()
            );
            println!(
                "  paid {}, remaining {}, progress {:.1}%{}",
                detail.ledger.total_paid,
                detail.ledger.remaining_balance,
                detail.ledger.progress_percent,
                if ledger::is_fully_paid(&detail.ledger) {
                    ", fully paid"
                } else {
                    ""
                }
            );
            if loan.payment_history.is_empty() {
                println!("  No payments recorded.");
            } else {
                println!("  Payments:");
                for payment in &loan.payment_history {
                    println!(
                        "  - {} {} via {}{}",
                        payment.date,
                        payment.amount,
                        payment.method,
                        payment
                            .note
                            .as_deref()
                            .map(|note| format!(" ({note})"))
                            .unwrap_or_default()
                    );
                }
            }
            for alert in &detail.alerts {
                println!(
                    "  ! [{}] {}{}",
                    alert.severity,
                    alert.message,
                    if alert.resolved { " (resolved)" } else { "" }
                );
            }
            if let Some(esg) = &detail.esg {
                println!(
                    "  ESG {:.0} ({}): E {:.0} / S {:.0} / G {:.0}, {:.2} t CO2",
                    esg.esg_score,
                    crate::service::esg_rating(esg.esg_score),
                    esg.environmental_score,
                    esg.social_score,
                    esg.governance_score,
                    esg.carbon_footprint
                );
            }
        }
        Commands::List { status, limit } => {
            let loans = service.loans().await?;
            let mut shown = 0usize;
            for loan in loans
                .iter()
                .filter(|loan| status.map_or(true, |wanted| loan.status == wanted))
                .take(limit)
            {
                let state = ledger::reconcile_loan(loan);
                println!(
                    "- {} {} {} due {} risk {} remaining {}",
                    loan.id,
                    loan.borrower_name,
                    loan.status,
                    loan.terms.due_date,
                    loan.risk_score,
                    state.remaining_balance
                );
                shown += 1;
            }
            if shown == 0 {
                println!("No loans found.");
            }
        }
        Commands::Summary => {
            let (loans, summary) = service.portfolio().await?;
            let distribution = portfolio::status_distribution(&loans);
            println!("Total loans: {}", summary.total_loans);
            println!("Total principal: {}", summary.total_principal);
            println!("Overdue: {}", summary.overdue_count);
            println!("Average risk: {:.1}", summary.average_risk);
            println!(
                "Active {} / overdue {} / paid {} / defaulted {}",
                distribution.active,
                distribution.overdue,
                distribution.paid,
                distribution.defaulted
            );
        }
        Commands::Borrower { name } => match service.borrower(&name).await? {
            Some(borrower) => {
                println!("{}: {} loans", borrower.borrower_name, borrower.loan_count);
                println!("  borrowed {}", borrower.total_borrowed);
                println!("  outstanding {}", borrower.total_outstanding);
                println!("  repaid {}", borrower.total_paid);
                println!(
                    "  active {}, overdue {}, paid {}",
                    borrower.active_count, borrower.overdue_count, borrower.paid_count
                );
                println!(
                    "  average rate {:.2}%, average risk {:.1}",
                    borrower.average_interest_rate, borrower.average_risk_score
                );
            }
            None => println!("No loans found for {name}."),
        },
        Commands::Alerts => {
            let alerts = service.alerts().await?;
            if alerts.is_empty() {
                println!("No alerts.");
            }
            let unread = alerts.iter().filter(|alert| !alert.read).count();
            for alert in &alerts {
                println!(
                    "- {} [{}] {} on loan {} at {}{}{}",
                    alert.id,
                    alert.severity,
                    alert.message,
                    alert.loan_id,
                    alert.triggered_at.format("%Y-%m-%d %H:%M"),
                    if alert.read { "" } else { " (unread)" },
                    if alert.resolved { " (resolved)" } else { "" }
                );
            }
            if unread > 0 {
                println!("{unread} unread.");
            }
        }
        Commands::RaiseAlert {
            loan_id,
            alert_type,
            message,
            severity,
        } => {
            let alert = service
                .raise_alert(
                    loan_id,
                    &AlertDraft {
                        alert_type,
                        message,
                        severity,
                    },
                )
                .await?;
            println!("Raised alert {}.", alert.id);
        }
        Commands::ReadAlert { alert_id } => {
            service.mark_alert_read(alert_id).await?;
            println!("Alert {alert_id} marked read.");
        }
        Commands::ResolveAlert { alert_id } => {
            service.resolve_alert(alert_id).await?;
            println!("Alert {alert_id} resolved.");
        }
        Commands::Esg {
            loan_id,
            score,
            carbon,
            environmental,
            social,
            governance,
            notes,
        } => {
            let metrics = service
                .record_esg(
                    loan_id,
                    &EsgDraft {
                        esg_score: score,
                        carbon_footprint: carbon,
                        environmental_score: environmental,
                        social_score: social,
                        governance_score: governance,
                        notes,
                    },
                )
                .await?;
            println!(
                "ESG metrics saved: {:.0} ({}).",
                metrics.esg_score,
                crate::service::esg_rating(metrics.esg_score)
            );
        }
        Commands::Report { out } => {
            let loans = service.loans().await?;
            let report = report::build_report(today, &loans);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Watch => {
            let user_id = identity.current_user()?;
            let loans = service.loans().await?;
            let alerts = service.alerts().await?;
            info!(%user_id, "starting realtime watch");
            realtime::watch(&pool, user_id, loans, alerts).await?;
        }
    }

    Ok(())
}
