use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::confidence::{ConfidencePenalty, ConfidenceStrategy, StandardConfidence};
use crate::types::{sums_to, workfile_id, Money, Pct, ValuationResult, PCT_SUM_TOLERANCE};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Appraiser-assigned approach weights in whole percents, summing to 100.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ApproachWeights {
    pub income: Pct,
    pub sales: Pct,
    pub cost: Pct,
}

impl ApproachWeights {
    pub fn total(&self) -> Pct {
        self.income + self.sales + self.cost
    }

    /// Adopt AI-suggested weights. Deliberately the only path from a
    /// suggestion to active weights; the engine never applies one itself.
    pub fn from_suggestion(suggestion: &AiSuggestedWeights) -> Self {
        suggestion.weights
    }
}

/// Advisory weight suggestion. Echoed back untouched, never substituted
/// for the appraiser-set weights.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AiSuggestedWeights {
    pub weights: ApproachWeights,
    /// Suggestion model's own confidence in [0, 1]
    pub confidence: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationRequest {
    pub property_id: String,
    pub as_of: NaiveDate,
    /// Indicated value from the income capitalization approach
    pub income_value: Money,
    /// Indicated value from the sales comparison approach
    pub sales_value: Money,
    /// Indicated value from the cost approach
    pub cost_value: Money,
    pub weights: ApproachWeights,
    /// Appraiser override; preferred as the final value when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_override: Option<Money>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_suggested: Option<AiSuggestedWeights>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationOutput {
    /// Envelope whose indicated value is the final value
    pub result: ValuationResult,
    /// Weighted combination of the three indications, never mutated by
    /// an override (kept for audit/comparison)
    pub weighted_value: Money,
    /// Override when present, weighted value otherwise
    pub final_value: Money,
    pub override_applied: bool,
    pub weights: ApproachWeights,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_suggested: Option<AiSuggestedWeights>,
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const BASE_CONFIDENCE: Decimal = dec!(0.95);
const HUNDRED: Decimal = dec!(100);

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Combine the three approach indications into one final opinion of value.
pub fn reconcile(req: &ReconciliationRequest) -> ReconciliationOutput {
    reconcile_with(req, &StandardConfidence)
}

pub fn reconcile_with(
    req: &ReconciliationRequest,
    strategy: &dyn ConfidenceStrategy,
) -> ReconciliationOutput {
    let wf = workfile_id("RC", &req.property_id, req.as_of);
    let mut errors: Vec<String> = Vec::new();

    if req.property_id.trim().is_empty() {
        errors.push("Property ID is required".into());
    }
    if req.weights.income < Decimal::ZERO
        || req.weights.sales < Decimal::ZERO
        || req.weights.cost < Decimal::ZERO
    {
        errors.push("Approach weights must be non-negative".into());
    }
    if !sums_to(req.weights.total(), HUNDRED, PCT_SUM_TOLERANCE) {
        errors.push("Approach weights must sum to 100".into());
    }

    if !errors.is_empty() {
        return ReconciliationOutput {
            result: ValuationResult::failed(wf, errors),
            weighted_value: Decimal::ZERO,
            final_value: Decimal::ZERO,
            override_applied: false,
            weights: req.weights,
            ai_suggested: req.ai_suggested,
        };
    }

    let weighted_value = req.income_value * (req.weights.income / HUNDRED)
        + req.sales_value * (req.weights.sales / HUNDRED)
        + req.cost_value * (req.weights.cost / HUNDRED);

    let final_value = req.final_override.unwrap_or(weighted_value);
    let override_applied = req.final_override.is_some();

    // --- Confidence from dispersion of the three indications ---
    let penalties = dispersion_penalties(&[req.income_value, req.sales_value, req.cost_value]);
    let confidence = match strategy.score(BASE_CONFIDENCE, &penalties) {
        Ok(c) => c,
        Err(e) => {
            return ReconciliationOutput {
                result: ValuationResult::failed(
                    wf,
                    vec![format!("Reconciliation calculation failed: {e}")],
                ),
                weighted_value: Decimal::ZERO,
                final_value: Decimal::ZERO,
                override_applied: false,
                weights: req.weights,
                ai_suggested: req.ai_suggested,
            };
        }
    };

    let mut rationale = vec![format!(
        "Weighted {:.0}% income / {:.0}% sales / {:.0}% cost",
        req.weights.income, req.weights.sales, req.weights.cost
    )];
    if override_applied {
        rationale.push(format!(
            "Appraiser override of {:.0} supersedes weighted value {:.0}",
            final_value, weighted_value
        ));
    }
    rationale.extend(penalties.iter().map(|p| p.reason.clone()));
    rationale.extend(req.notes.iter().cloned());

    ReconciliationOutput {
        result: ValuationResult {
            workfile_id: wf,
            indicated_value: final_value,
            confidence,
            rationale,
            errors,
        },
        weighted_value,
        final_value,
        override_applied,
        weights: req.weights,
        ai_suggested: req.ai_suggested,
    }
}

// ---------------------------------------------------------------------------
// Dispersion
// ---------------------------------------------------------------------------

/// Coefficient of variation across the non-zero indications. Widely
/// scattered approach values mean a weaker reconciled opinion.
fn dispersion_penalties(values: &[Money]) -> Vec<ConfidencePenalty> {
    let live: Vec<Money> = values.iter().copied().filter(|v| !v.is_zero()).collect();
    if live.len() < 2 {
        return Vec::new();
    }

    let count = Decimal::from(live.len() as u32);
    let mean: Decimal = live.iter().copied().sum::<Decimal>() / count;
    if mean <= Decimal::ZERO {
        return Vec::new();
    }

    let variance: Decimal = live
        .iter()
        .map(|v| {
            let diff = *v - mean;
            diff * diff
        })
        .sum::<Decimal>()
        / count;
    let cv = variance.sqrt().unwrap_or(Decimal::ZERO) / mean;

    let amount = if cv > dec!(0.30) {
        dec!(0.25)
    } else if cv > dec!(0.20) {
        dec!(0.15)
    } else if cv > dec!(0.10) {
        dec!(0.05)
    } else {
        return Vec::new();
    };

    vec![ConfidencePenalty::new(
        format!("Approach indications diverge ({:.1}% variation)", cv * HUNDRED),
        amount,
    )]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
