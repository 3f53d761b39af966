use std::str::FromStr;

use anyhow::Context;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::validation::OverpaymentPolicy;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub user_id: Option<Uuid>,
    pub max_connections: u32,
    pub overpayment: OverpaymentPolicy,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL")
            .context("DATABASE_URL must be set to a production Postgres instance")?;

        let user_id = lookup("LOAN_LEDGER_USER_ID")
            .map(|raw| Uuid::parse_str(raw.trim()))
            .transpose()
            .context("LOAN_LEDGER_USER_ID must be a UUID")?;

        let max_connections = lookup("LOAN_LEDGER_MAX_CONNECTIONS")
            .map(|raw| raw.trim().parse::<u32>())
            .transpose()
            .context("LOAN_LEDGER_MAX_CONNECTIONS must be a positive integer")?
            .unwrap_or(DEFAULT_MAX_CONNECTIONS)
            .max(1);

        let tolerance = lookup("LOAN_LEDGER_PAYMENT_TOLERANCE")
            .map(|raw| Decimal::from_str(raw.trim()))
            .transpose()
            .context("LOAN_LEDGER_PAYMENT_TOLERANCE must be a decimal amount")?
            .unwrap_or(Decimal::ZERO);
        if tolerance < Decimal::ZERO {
            anyhow::bail!("LOAN_LEDGER_PAYMENT_TOLERANCE must not be negative");
        }

        Ok(Self {
            database_url,
            user_id,
            max_connections,
            overpayment: OverpaymentPolicy { tolerance },
        })
    }
}
