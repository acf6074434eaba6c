use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{PaymentError, Result};

/// customer (user) identifier, owned by the account system
pub type CustomerId = i64;

/// package identifier, owned by the catalog
pub type PackageId = i64;

/// identifier of any authenticated user acting on the engine
pub type UserId = i64;

/// unique identifier for a payment record
pub type PaymentId = Uuid;

/// accrual cadence of a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    /// each selected date is one billing unit
    Daily,
    /// billed per started block of 7 dates
    Weekly,
    /// billed per started block of 30 dates
    Monthly,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::Daily,
        PaymentMethod::Weekly,
        PaymentMethod::Monthly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Daily => "DAILY",
            PaymentMethod::Weekly => "WEEKLY",
            PaymentMethod::Monthly => "MONTHLY",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DAILY" => Ok(PaymentMethod::Daily),
            "WEEKLY" => Ok(PaymentMethod::Weekly),
            "MONTHLY" => Ok(PaymentMethod::Monthly),
            _ => Err(PaymentError::InvalidPaymentMethod {
                value: s.to_string(),
            }),
        }
    }
}

/// payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    /// recorded but not yet credited
    Pending,
    /// credited to the customer's ledger and totals
    Confirmed,
    /// terminal; nothing is credited
    Canceled,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 3] = [
        PaymentStatus::Pending,
        PaymentStatus::Confirmed,
        PaymentStatus::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Confirmed => "CONFIRMED",
            PaymentStatus::Canceled => "CANCELED",
        }
    }

    pub fn valid_values() -> Vec<String> {
        Self::ALL.iter().map(|s| s.as_str().to_string()).collect()
    }

    pub fn is_credited(&self) -> bool {
        matches!(self, PaymentStatus::Confirmed)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(PaymentStatus::Pending),
            "CONFIRMED" => Ok(PaymentStatus::Confirmed),
            "CANCELED" => Ok(PaymentStatus::Canceled),
            _ => Err(PaymentError::InvalidStatus {
                value: s.to_string(),
                valid_values: PaymentStatus::valid_values(),
            }),
        }
    }
}

/// user roles; source data mixes casing so parsing normalizes once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Reseller,
    Customer,
}

impl FromStr for Role {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "RESELLER" => Ok(Role::Reseller),
            "CUSTOMER" => Ok(Role::Customer),
            _ => Err(PaymentError::InvalidArgument {
                message: format!("unknown role {:?}", s),
            }),
        }
    }
}

/// authenticated caller, as handed over by the auth layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    pub fn admin(id: UserId) -> Self {
        Self::new(id, Role::Admin)
    }

    pub fn reseller(id: UserId) -> Self {
        Self::new(id, Role::Reseller)
    }

    pub fn customer(id: CustomerId) -> Self {
        Self::new(id, Role::Customer)
    }
}

/// package record as supplied by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub id: PackageId,
    pub name: String,
    pub payment_method: PaymentMethod,
    /// rate per billing period
    pub payment_amount: Money,
    /// length of the plan in calendar months
    pub payment_months: Option<u32>,
}

impl Package {
    pub fn new(
        id: PackageId,
        name: impl Into<String>,
        payment_method: PaymentMethod,
        payment_amount: Money,
        payment_months: Option<u32>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            payment_method,
            payment_amount,
            payment_months,
        }
    }

    /// check the catalog invariants
    pub fn validate(&self) -> Result<()> {
        if !self.payment_amount.is_positive() {
            return Err(PaymentError::InvalidAmount {
                message: format!(
                    "package {} payment_amount must be positive, got {}",
                    self.id, self.payment_amount
                ),
            });
        }
        if self.payment_months == Some(0) {
            return Err(PaymentError::InvalidArgument {
                message: format!("package {} payment_months must be at least 1", self.id),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parsing_normalizes_case() {
        assert_eq!("daily".parse::<PaymentMethod>().unwrap(), PaymentMethod::Daily);
        assert_eq!(" Weekly ".parse::<PaymentMethod>().unwrap(), PaymentMethod::Weekly);
        assert!("fortnightly".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_status_parsing_lists_valid_values() {
        assert_eq!("confirmed".parse::<PaymentStatus>().unwrap(), PaymentStatus::Confirmed);

        let err = "paid".parse::<PaymentStatus>().unwrap_err();
        assert_eq!(
            err.valid_values(),
            Some(&["PENDING".to_string(), "CONFIRMED".to_string(), "CANCELED".to_string()][..])
        );
    }

    #[test]
    fn test_serde_uses_upper_case_tags() {
        let json = serde_json::to_string(&PaymentStatus::Canceled).unwrap();
        assert_eq!(json, "\"CANCELED\"");

        let method: PaymentMethod = serde_json::from_str("\"MONTHLY\"").unwrap();
        assert_eq!(method, PaymentMethod::Monthly);
    }

    #[test]
    fn test_package_validation() {
        let ok = Package::new(1, "basic", PaymentMethod::Daily, Money::from_major(10_000), Some(3));
        assert!(ok.validate().is_ok());

        let free = Package::new(2, "free", PaymentMethod::Daily, Money::ZERO, None);
        assert!(free.validate().is_err());

        let empty_term = Package::new(3, "x", PaymentMethod::Weekly, Money::from_major(1), Some(0));
        assert!(empty_term.validate().is_err());
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("RESELLER".parse::<Role>().unwrap(), Role::Reseller);
        assert!("root".parse::<Role>().is_err());
    }
}
