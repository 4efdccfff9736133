use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Whole-number percentages (reconciliation weights summing to 100).
pub type Pct = Decimal;

/// Qualitative confidence tag attached to a comparable sale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTag {
    High,
    #[default]
    Medium,
    Low,
}

/// Uniform result envelope returned by every approach calculator.
///
/// An approach with any validation error reports `indicated_value == 0`;
/// callers must check `errors` before trusting `indicated_value`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationResult {
    /// Generated work-file identifier
    pub workfile_id: String,
    /// Indicated value of the subject property
    pub indicated_value: Money,
    /// Confidence score in [0, 1]
    pub confidence: Decimal,
    /// Ordered human-readable rationale
    pub rationale: Vec<String>,
    /// Accumulated validation/calculation errors
    pub errors: Vec<String>,
}

impl ValuationResult {
    /// Errors-only envelope: indicated value 0, confidence 0.
    pub fn failed(workfile_id: String, errors: Vec<String>) -> Self {
        ValuationResult {
            workfile_id,
            indicated_value: Decimal::ZERO,
            confidence: Decimal::ZERO,
            rationale: Vec::new(),
            errors,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Deterministic work-file identifier: `{prefix}-{property_id}-{YYYYMMDD}`.
pub fn workfile_id(prefix: &str, property_id: &str, as_of: NaiveDate) -> String {
    format!("{prefix}-{property_id}-{}", as_of.format("%Y%m%d"))
}

/// Tolerance when checking that comparable weights sum to 1.0.
pub const WEIGHT_SUM_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 3); // 0.001

/// Tolerance when checking that approach weights sum to 100.
pub const PCT_SUM_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2); // 0.01

/// True when `sum` is within `tolerance` of `target`.
pub fn sums_to(sum: Decimal, target: Decimal, tolerance: Decimal) -> bool {
    (sum - target).abs() <= tolerance
}
