//! Shared confidence scoring.
//!
//! Each calculator decides *which* penalties apply; the arithmetic of
//! turning a base score and a penalty list into a clamped score lives
//! here so the three approaches cannot drift apart.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::AppraisalError;

/// Floor of every confidence score. Keeps the score inside (0, 1].
pub const MIN_CONFIDENCE: Decimal = Decimal::from_parts(5, 0, 0, false, 2); // 0.05

/// A single deduction from the base confidence score.
#[derive(Debug, Clone)]
pub struct ConfidencePenalty {
    /// Human-readable reason, surfaced in the result rationale
    pub reason: String,
    /// Deduction amount (0.05 = five points)
    pub amount: Decimal,
}

impl ConfidencePenalty {
    pub fn new(reason: impl Into<String>, amount: Decimal) -> Self {
        ConfidencePenalty {
            reason: reason.into(),
            amount,
        }
    }
}

/// Injectable scoring seam. Calculators call through this trait so tests
/// can force the failure path without patching internals.
pub trait ConfidenceStrategy {
    fn score(
        &self,
        base: Decimal,
        penalties: &[ConfidencePenalty],
    ) -> Result<Decimal, AppraisalError>;
}

/// Default strategy: base minus the sum of penalties, clamped to
/// [MIN_CONFIDENCE, 1.0].
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardConfidence;

impl ConfidenceStrategy for StandardConfidence {
    fn score(
        &self,
        base: Decimal,
        penalties: &[ConfidencePenalty],
    ) -> Result<Decimal, AppraisalError> {
        let total: Decimal = penalties.iter().map(|p| p.amount).sum();
        Ok((base - total).clamp(MIN_CONFIDENCE, Decimal::ONE))
    }
}

/// Strategy that always fails. Exercises each calculator's
/// "calculation failed" conversion path in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingConfidence;

impl ConfidenceStrategy for FailingConfidence {
    fn score(
        &self,
        _base: Decimal,
        _penalties: &[ConfidencePenalty],
    ) -> Result<Decimal, AppraisalError> {
        Err(AppraisalError::ConfidenceUnavailable(
            "confidence scoring unavailable".into(),
        ))
    }
}

/// Convenience wrapper for the common case.
pub fn score(base: Decimal, penalties: &[ConfidencePenalty]) -> Decimal {
    StandardConfidence
        .score(base, penalties)
        .unwrap_or(dec!(0.05))
}
