use serde::{Deserialize, Serialize};

use crate::errors::{PaymentError, Result};
use crate::types::PaymentMethod;

/// engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub amount_policy: AmountPolicy,
    pub record_model: RecordModel,
    pub ledger_scope: LedgerScope,
    pub cadence_fallback: CadenceFallback,
    /// reject selected dates outside the customer's obligation schedule
    pub enforce_schedule_window: bool,
}

/// where the confirmed amount comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountPolicy {
    /// always computed from cadence, rate and date count; a differing caller amount is rejected
    Derived,
    /// caller amount wins when present, derived amount otherwise
    CallerOverride,
}

/// how confirmations map onto payment rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordModel {
    /// one growing confirmed row per (customer, package)
    Accumulate,
    /// a fresh row for every confirmation
    PerConfirmation,
}

/// which confirmed payments a duplicate-date check scans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerScope {
    /// a date can be paid once per customer
    Customer,
    /// a date can be paid once per customer and package
    CustomerPackage,
}

/// handling of cadence strings that are not DAILY, WEEKLY or MONTHLY
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CadenceFallback {
    Reject,
    Daily,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            amount_policy: AmountPolicy::Derived,
            record_model: RecordModel::Accumulate,
            ledger_scope: LedgerScope::Customer,
            cadence_fallback: CadenceFallback::Reject,
            enforce_schedule_window: false,
        }
    }
}

impl EngineConfig {
    /// strict settings for interactive confirmation
    pub fn strict() -> Self {
        Self {
            enforce_schedule_window: true,
            ..Self::default()
        }
    }

    /// settings for importing historical payments as they were recorded
    pub fn legacy_import() -> Self {
        Self {
            amount_policy: AmountPolicy::CallerOverride,
            record_model: RecordModel::PerConfirmation,
            ledger_scope: LedgerScope::Customer,
            cadence_fallback: CadenceFallback::Daily,
            enforce_schedule_window: false,
        }
    }

    /// load from a json document; missing keys take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| PaymentError::InvalidConfiguration {
            message: e.to_string(),
        })
    }

    pub fn with_amount_policy(mut self, policy: AmountPolicy) -> Self {
        self.amount_policy = policy;
        self
    }

    pub fn with_record_model(mut self, model: RecordModel) -> Self {
        self.record_model = model;
        self
    }

    pub fn with_ledger_scope(mut self, scope: LedgerScope) -> Self {
        self.ledger_scope = scope;
        self
    }

    pub fn with_cadence_fallback(mut self, fallback: CadenceFallback) -> Self {
        self.cadence_fallback = fallback;
        self
    }

    /// parse a cadence string under the configured fallback
    pub fn parse_cadence(&self, raw: &str) -> Result<PaymentMethod> {
        match raw.parse::<PaymentMethod>() {
            Ok(method) => Ok(method),
            Err(err) => match self.cadence_fallback {
                CadenceFallback::Reject => Err(err),
                CadenceFallback::Daily => {
                    tracing::warn!(cadence = raw, "unknown cadence, treating as DAILY");
                    Ok(PaymentMethod::Daily)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_strict_about_amounts() {
        let config = EngineConfig::default();
        assert_eq!(config.amount_policy, AmountPolicy::Derived);
        assert_eq!(config.record_model, RecordModel::Accumulate);
        assert_eq!(config.ledger_scope, LedgerScope::Customer);
        assert!(!config.enforce_schedule_window);
        assert!(EngineConfig::strict().enforce_schedule_window);
    }

    #[test]
    fn test_from_json_fills_missing_keys() {
        let config = EngineConfig::from_json_str(
            r#"{ "amount_policy": "caller_override", "ledger_scope": "customer_package" }"#,
        )
        .unwrap();

        assert_eq!(config.amount_policy, AmountPolicy::CallerOverride);
        assert_eq!(config.ledger_scope, LedgerScope::CustomerPackage);
        assert_eq!(config.record_model, RecordModel::Accumulate);
    }

    #[test]
    fn test_from_json_rejects_unknown_policy() {
        let err = EngineConfig::from_json_str(r#"{ "amount_policy": "whatever" }"#).unwrap_err();
        assert!(matches!(err, PaymentError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_cadence_fallback() {
        let strict = EngineConfig::default();
        assert!(strict.parse_cadence("biweekly").is_err());
        assert_eq!(strict.parse_cadence("weekly").unwrap(), PaymentMethod::Weekly);

        let lenient = EngineConfig::legacy_import();
        assert_eq!(lenient.parse_cadence("biweekly").unwrap(), PaymentMethod::Daily);
    }
}
