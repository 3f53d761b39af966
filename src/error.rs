use uuid::Uuid;

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Every reason a draft was rejected, in field order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", join_errors(.errors))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

#[cfg(test)]
impl ValidationError {
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|error| error.field == field)
    }
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("loan {0} not found")]
    NotFound(Uuid),

    #[error("alert {0} not found")]
    AlertNotFound(Uuid),

    #[error("rejected: {0}")]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_every_field() {
        let err = ValidationError {
            errors: vec![
                FieldError::new("loan_amount", "must be positive"),
                FieldError::new("due_date", "must be after start date"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "loan_amount: must be positive; due_date: must be after start date"
        );
        assert!(err.has_field("due_date"));
        assert!(!err.has_field("interest_rate"));
    }

    #[test]
    fn ledger_error_wraps_rejections() {
        let err: LedgerError = ValidationError {
            errors: vec![FieldError::new("amount", "must be positive")],
        }
        .into();
        assert_eq!(err.to_string(), "rejected: amount: must be positive");
    }
}
