use chrono::NaiveDate;
use thiserror::Error;

use crate::types::{CustomerId, PackageId, PaymentId, PaymentStatus};

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("invalid argument: {message}")]
    InvalidArgument {
        message: String,
    },

    #[error("invalid date {value:?}: expected YYYY-MM-DD")]
    InvalidDate {
        value: String,
    },

    #[error("invalid amount: {message}")]
    InvalidAmount {
        message: String,
    },

    #[error("unknown payment method {value:?}: expected one of DAILY, WEEKLY, MONTHLY")]
    InvalidPaymentMethod {
        value: String,
    },

    #[error("invalid payment status {value:?}: expected one of {}", .valid_values.join(", "))]
    InvalidStatus {
        value: String,
        valid_values: Vec<String>,
    },

    #[error("payment dates already paid: {}", join_dates(.dates))]
    DuplicatePaymentDate {
        dates: Vec<NaiveDate>,
    },

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    #[error("customer not found: {id}")]
    CustomerNotFound {
        id: CustomerId,
    },

    #[error("package not found: {id}")]
    PackageNotFound {
        id: PackageId,
    },

    #[error("payment not found: {id}")]
    PaymentNotFound {
        id: PaymentId,
    },

    #[error("permission denied: {message}")]
    PermissionDenied {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("storage failure: {message}")]
    Storage {
        message: String,
    },

    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// coarse error taxonomy surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    Conflict,
    NotFound,
    PermissionDenied,
    Internal,
}

impl PaymentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PaymentError::InvalidArgument { .. }
            | PaymentError::InvalidDate { .. }
            | PaymentError::InvalidAmount { .. }
            | PaymentError::InvalidPaymentMethod { .. }
            | PaymentError::InvalidStatus { .. } => ErrorKind::InvalidArgument,
            PaymentError::DuplicatePaymentDate { .. } | PaymentError::InvalidTransition { .. } => {
                ErrorKind::Conflict
            }
            PaymentError::CustomerNotFound { .. }
            | PaymentError::PackageNotFound { .. }
            | PaymentError::PaymentNotFound { .. } => ErrorKind::NotFound,
            PaymentError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            PaymentError::InvalidConfiguration { .. }
            | PaymentError::Storage { .. }
            | PaymentError::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// status code of the HTTP binding; conflicts are reported as 400
    pub fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::InvalidArgument | ErrorKind::Conflict => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::PermissionDenied => 403,
            ErrorKind::Internal => 500,
        }
    }

    /// offending dates of a duplicate-payment rejection
    pub fn duplicate_dates(&self) -> Option<&[NaiveDate]> {
        match self {
            PaymentError::DuplicatePaymentDate { dates } => Some(dates),
            _ => None,
        }
    }

    /// accepted values of an enumerated field
    pub fn valid_values(&self) -> Option<&[String]> {
        match self {
            PaymentError::InvalidStatus { valid_values, .. } => Some(valid_values),
            _ => None,
        }
    }

    pub(crate) fn storage(message: impl Into<String>) -> Self {
        PaymentError::Storage {
            message: message.into(),
        }
    }

    /// a money value left the representable range
    pub(crate) fn amount_overflow(what: &str) -> Self {
        PaymentError::InvalidAmount {
            message: format!("{} exceeds the supported amount range", what),
        }
    }

    /// a stored total could not be summed
    pub(crate) fn total_overflow(what: &str) -> Self {
        PaymentError::storage(format!("{} overflows the supported amount range", what))
    }
}

fn join_dates(dates: &[NaiveDate]) -> String {
    dates
        .iter()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, PaymentError>;
