use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ErrorKind, PaymentError, Result};
use crate::ledger::PaidDateSet;
use crate::reporting::PaymentSummary;
use crate::state::Payment;

/// body of a successful confirmation, sent with `201 Created`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmPaymentResponse {
    pub success: bool,
    pub message: String,
    pub payment: Payment,
}

impl ConfirmPaymentResponse {
    pub const STATUS: u16 = 201;

    pub fn new(payment: Payment) -> Self {
        Self {
            success: true,
            message: "Payment confirmed successfully".to_string(),
            payment,
        }
    }
}

/// body of a status update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentStatusResponse {
    pub success: bool,
    pub message: String,
    pub payment: Payment,
}

impl PaymentStatusResponse {
    pub fn new(payment: Payment) -> Self {
        Self {
            success: true,
            message: format!("Payment status updated to {}", payment.status),
            payment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaidDatesResponse {
    pub paid_dates: Vec<String>,
}

impl From<&PaidDateSet> for PaidDatesResponse {
    fn from(dates: &PaidDateSet) -> Self {
        Self {
            paid_dates: dates.to_strings(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummaryResponse {
    pub success: bool,
    #[serde(flatten)]
    pub summary: PaymentSummary,
}

impl From<PaymentSummary> for PaymentSummaryResponse {
    fn from(summary: PaymentSummary) -> Self {
        Self { success: true, summary }
    }
}

/// error body; conflict and enum errors carry their extra payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_dates: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_values: Option<Vec<String>>,
}

impl ErrorResponse {
    pub fn status(err: &PaymentError) -> u16 {
        err.http_status()
    }
}

impl From<&PaymentError> for ErrorResponse {
    fn from(err: &PaymentError) -> Self {
        let error = match err.kind() {
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::PermissionDenied => "PERMISSION_DENIED",
            ErrorKind::Internal => "INTERNAL",
        };
        Self {
            success: false,
            error: error.to_string(),
            message: err.to_string(),
            duplicate_dates: err
                .duplicate_dates()
                .map(|dates| dates.iter().map(|d| crate::ledger::format_date(*d)).collect()),
            valid_values: err.valid_values().map(<[String]>::to_vec),
        }
    }
}

/// status code and json body ready for a transport
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    /// `ok_status` on success, the error's mapped status otherwise
    pub fn from_result<T: Serialize>(result: Result<T>, ok_status: u16) -> Self {
        let outcome = result.and_then(|value| serde_json::to_value(value).map_err(PaymentError::from));
        match outcome {
            Ok(body) => Self { status: ok_status, body },
            Err(err) => {
                if err.kind() == ErrorKind::Internal {
                    tracing::error!(error = %err, "request failed");
                }
                let body = serde_json::to_value(ErrorResponse::from(&err)).unwrap_or(Value::Null);
                Self {
                    status: ErrorResponse::status(&err),
                    body,
                }
            }
        }
    }
}
